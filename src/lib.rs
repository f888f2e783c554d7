// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod model;
pub mod observability;
pub mod session;
pub mod stream;
pub mod transcript;

// Re-exports
pub use client::{ChatPayload, DuckChat};
pub use error::{Error, Result};
pub use model::Model;
pub use observability::register_biometrics;
pub use session::{Reply, Session, SessionStats};
pub use stream::{EventLine, EventLineCodec, FragmentStream, parse_event_line};
pub use transcript::{Message, Role, Transcript};
