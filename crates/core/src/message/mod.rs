//! Message and MessageHandler
mod encoder;
pub use encoder::Decoder;
pub use encoder::Encoder;
pub use encoder::Header;

mod payload;
pub use payload::MessagePayload;

pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::HandleMsg;
pub use handlers::MessageHandler;
pub use handlers::MessageHandlerEvent;
