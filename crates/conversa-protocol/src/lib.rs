pub mod frames;

pub use frames::{InboundFrame, OutboundFrame, OutboundFrameType, StreamChunk};
