/// Error types for lucien
///
/// Every failure a command handler can hit ends up here. The session turns
/// these into printed diagnostics; none of them end the interactive loop.
/// Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Main error type for lucien operations
#[derive(Error, Debug)]
pub enum LucienError {
    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// HTTP transport errors from the chat providers
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Line editor failures
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Missing or malformed command arguments; carries the usage line
    #[error("{0}")]
    Usage(String),

    /// Chat provider answered with something we can't use
    #[error("Chat error: {0}")]
    Chat(String),

    /// A child process failed
    #[error("Process error: {0}")]
    Process(String),

    /// Something took longer than its budget
    #[error("{what} timed out after {secs} seconds")]
    Timeout { what: String, secs: u64 },

    /// Path rejected by validation
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Input refused by a safety check
    #[error("Blocked: {0}")]
    Blocked(String),

    /// Spell name already taken
    #[error("Spell already exists: {0}")]
    SpellExists(String),

    /// Spell missing from the spell book
    #[error("Spell not found: {0}")]
    SpellNotFound(String),

    /// `stop recording` without an active session
    #[error("No spell is being recorded")]
    NotRecording,

    /// A second `record spell` while one is active
    #[error("Already recording spell: {0}")]
    AlreadyRecording(String),

    /// A spell that ends up casting itself
    #[error("Spell '{0}' is already being cast")]
    RecursiveCast(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feature not available on this platform
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for lucien operations
pub type Result<T> = std::result::Result<T, LucienError>;

/// Convert LucienError to a user-friendly error message
impl LucienError {
    pub fn user_message(&self) -> String {
        match self {
            LucienError::Usage(usage) => format!("Usage: {}", usage),
            LucienError::Io(e) => {
                format!("✗ File system error. Check permissions. Details: {}", e)
            }
            LucienError::Serialization(e) => format!("✗ Data format error: {}", e),
            LucienError::Git(e) => format!("✗ Git operation failed: {}", e.message()),
            LucienError::Http(e) => format!("✗ Request failed: {}", e),
            LucienError::Readline(e) => format!("✗ Input error: {}", e),
            LucienError::Chat(msg) => format!("[ERROR] {}", msg),
            LucienError::Process(msg) => format!("✗ {}", msg),
            LucienError::Timeout { what, secs } => {
                format!("✗ {} timed out after {} seconds", what, secs)
            }
            LucienError::InvalidPath(reason) => format!("✗ Invalid path: {}", reason),
            LucienError::Blocked(reason) => {
                format!("✗ Security validation failed: {}", reason)
            }
            LucienError::SpellExists(name) => format!(
                "✗ Spell '{}' already exists. Use 'delete spell {}' first.",
                name, name
            ),
            LucienError::SpellNotFound(name) => format!("✗ Spell '{}' not found", name),
            LucienError::NotRecording => "✗ No spell being recorded".to_string(),
            LucienError::AlreadyRecording(name) => format!(
                "✗ Already recording spell '{}'. Type 'stop recording' first.",
                name
            ),
            LucienError::RecursiveCast(name) => {
                format!("✗ Spell '{}' is already being cast; refusing to recurse", name)
            }
            LucienError::Config(msg) => format!("✗ Configuration issue: {}", msg),
            LucienError::Unsupported(msg) => format!("✗ Not supported: {}", msg),
        }
    }

    pub(crate) fn usage(text: &str) -> Self {
        LucienError::Usage(text.to_string())
    }
}
