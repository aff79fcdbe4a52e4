pub mod channel;
pub mod envelope;

pub use channel::{Channel, ChannelError};
pub use envelope::{normalize_content, ClientFrame, Envelope, EventKind};
