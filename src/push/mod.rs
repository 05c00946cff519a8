pub mod transport;
pub mod vapid;

pub use transport::{PushSendError, PushTransport, WebPushTransport};
