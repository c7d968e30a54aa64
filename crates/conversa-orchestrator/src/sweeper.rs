use std::time::Duration;

use tokio::sync::watch;
use tracing::error;

use crate::turn::TurnManager;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that periodically transitions expired pending Turns to
/// `unresponded`: a `tokio::select!` between a fixed tick interval and a
/// `watch` shutdown signal, so the caller can bring the loop down cleanly
/// on server shutdown rather than aborting it mid-sweep.
pub async fn run(turns: TurnManager, mut shutdown: watch::Receiver<bool>) {
    if let Err(err) = turns.sweep() {
        error!(error = %err, "initial turn sweep failed");
    }

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = turns.sweep() {
                    error!(error = %err, "turn sweep failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversa_core::ConversaConfig;
    use conversa_store::Store;
    use std::sync::Arc;

    #[tokio::test]
    async fn shutdown_signal_stops_the_sweep_loop() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(ConversaConfig::default());
        let turns = TurnManager::new(store, config);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(turns, rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper did not stop after shutdown signal")
            .unwrap();
    }
}
