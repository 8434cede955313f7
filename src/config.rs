/// Runtime configuration
///
/// Everything comes from the environment (optionally seeded from a `.env`
/// file). Missing values fall back to defaults that work out of the box
/// with a local Ollama install.

use crate::error::{LucienError, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/chat";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MEMORY_FILE: &str = "lucien_memory.json";
const DEFAULT_SPELLS_FILE: &str = ".lucien/spells.json";

#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub groq_api_url: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    /// Initial provider selection; `true` picks the hosted provider.
    pub use_internet: bool,
    pub request_timeout_secs: u64,
    /// Budget for shell, python and git subprocesses.
    pub command_timeout_secs: u64,
    pub memory_file: PathBuf,
    pub spells_file: PathBuf,
    pub python: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_api_url: DEFAULT_GROQ_API_URL.to_string(),
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            use_internet: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            memory_file: PathBuf::from(DEFAULT_MEMORY_FILE),
            spells_file: PathBuf::from(DEFAULT_SPELLS_FILE),
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        // A missing .env is the normal case
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cfg = Self {
            groq_api_url: get("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            groq_api_key: get("GROQ_API_KEY"),
            groq_model: get("GROQ_MODEL").unwrap_or(defaults.groq_model),
            ollama_url: get("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: get("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            use_internet: match get("USE_INTERNET") {
                Some(v) => v.trim().eq_ignore_ascii_case("true"),
                None => defaults.use_internet,
            },
            request_timeout_secs: parse_secs(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            command_timeout_secs: parse_secs(get("COMMAND_TIMEOUT_SECS"), "COMMAND_TIMEOUT_SECS")?
                .unwrap_or(defaults.command_timeout_secs),
            memory_file: get("MEMORY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.memory_file),
            spells_file: get("SPELLS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.spells_file),
            python: get("PYTHON").unwrap_or(defaults.python),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(LucienError::Config(
                "REQUEST_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }
        if self.command_timeout_secs == 0 {
            return Err(LucienError::Config(
                "COMMAND_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }
        if self.groq_api_url.trim().is_empty() || self.ollama_url.trim().is_empty() {
            return Err(LucienError::Config(
                "provider URLs must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Readline history file under the home directory, if there is one.
    pub fn history_file(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lucien_history"))
    }
}

fn parse_secs(value: Option<String>, key: &str) -> Result<Option<u64>> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| LucienError::Config(format!("{} must be a whole number of seconds", key)))
        })
        .transpose()
}
