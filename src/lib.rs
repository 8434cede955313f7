/// lucien library
///
/// A text-command interpreter: typed lines are routed to built-in commands
/// or to a chat model, and sequences of lines can be recorded as spells
/// and cast again later.

pub mod chat;
pub mod config;
pub mod console;
pub mod core;
pub mod error;
pub mod logging;
pub mod store;
pub mod tools;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{Outcome, Session};
pub use error::{LucienError, Result};
