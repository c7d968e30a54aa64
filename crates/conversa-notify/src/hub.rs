use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::warn;

use conversa_protocol::OutboundFrame;

const BROADCAST_CAPACITY: usize = 256;
/// Bound on a polling client's queued frames. Once exceeded, the oldest
/// queued frame is dropped to make room for the newest one.
const MAX_QUEUED_PER_CLIENT: usize = 500;

/// Registry of connected clients and fan-out for the three event kinds
/// (`message`, `dialogue_update`, `stream_chunk`).
///
/// WS-connected clients subscribe to the broadcast channel directly; clients
/// without a live socket (HTTP long-poll / terminal bridges) are served from
/// a bounded per-participant queue drained by `GET /api/notify/*`.
pub struct NotificationHub {
    broadcast_tx: broadcast::Sender<OutboundFrame>,
    queues: DashMap<String, Vec<OutboundFrame>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            broadcast_tx: tx,
            queues: DashMap::new(),
        }
    }

    /// A new WS connection subscribes to the live fan-out stream.
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundFrame> {
        self.broadcast_tx.subscribe()
    }

    /// Push a frame to every connected WS client (best-effort; a client
    /// whose receiver has fallen behind the broadcast capacity simply
    /// misses frames rather than blocking the sender) and queue it for the
    /// named participant's poll-based inbox.
    pub fn publish(&self, participant_id: &str, frame: OutboundFrame) {
        let _ = self.broadcast_tx.send(frame.clone());
        self.enqueue(participant_id, frame);
    }

    fn enqueue(&self, participant_id: &str, frame: OutboundFrame) {
        let mut queue = self.queues.entry(participant_id.to_string()).or_default();
        if queue.len() >= MAX_QUEUED_PER_CLIENT {
            warn!(participant_id, "notification queue full, dropping oldest frame");
            queue.remove(0);
        }
        queue.push(frame);
    }

    /// Drain and return all pending frames queued for a participant.
    pub fn drain(&self, participant_id: &str) -> Vec<OutboundFrame> {
        self.queues
            .remove(participant_id)
            .map(|(_, frames)| frames)
            .unwrap_or_default()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drain_returns_queued_frames_in_order_and_empties_the_queue() {
        let hub = NotificationHub::new();
        hub.publish("p1", OutboundFrame::message(json!({"id": 1})));
        hub.publish("p1", OutboundFrame::message(json!({"id": 2})));

        let drained = hub.drain("p1");
        assert_eq!(drained.len(), 2);
        assert!(hub.drain("p1").is_empty());
    }

    #[test]
    fn queue_drops_oldest_frame_once_bound_is_exceeded() {
        let hub = NotificationHub::new();
        for i in 0..MAX_QUEUED_PER_CLIENT + 5 {
            hub.publish("p1", OutboundFrame::message(json!({"id": i})));
        }
        let drained = hub.drain("p1");
        assert_eq!(drained.len(), MAX_QUEUED_PER_CLIENT);
        assert_eq!(drained[0].data["id"], 5);
    }

    #[tokio::test]
    async fn subscribers_receive_published_frames() {
        let hub = NotificationHub::new();
        let mut rx = hub.subscribe();
        hub.publish("p1", OutboundFrame::message(json!({"id": 1})));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.data["id"], 1);
    }
}
