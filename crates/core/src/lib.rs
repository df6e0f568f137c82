pub mod config;
pub mod error;
pub mod event_bus;
pub mod insight;
pub mod rule;
pub mod types;

pub use config::AppConfig;
pub use error::{AdWatchError, AdWatchResult, ClientError};
pub use event_bus::EventSink;
