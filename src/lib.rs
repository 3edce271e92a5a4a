// Supporting modules
pub mod config;
pub mod error;
pub mod telemetry;
pub mod template;

// Domain layer
pub mod notification;
pub mod wiki;

pub use error::{NotifyError, Result};
