pub mod message;
pub mod units;

pub use message::{LinkMessage, Role, Severity, SourceId};
