// Runs small python snippets in a child interpreter
//
// Snippets are screened with a block-list first. It's a speed bump,
// not a sandbox.

use crate::error::{LucienError, Result};
use crate::tools::process::run_with_timeout;
use regex::Regex;
use std::io::Write;
use std::time::Duration;
use tokio::process::Command;

// Anything bigger than this isn't a "snippet"
const MAX_CODE_LENGTH: usize = 10_000;

// Whole words we refuse to see in a snippet
const BLOCKED_NAMES: &[&str] = &[
    "os",
    "sys",
    "subprocess",
    "shutil",
    "importlib",
    "__import__",
    "eval",
    "exec",
    "compile",
    "open",
    "file",
    "input",
    "raw_input",
];

// Regexes for ways around the name list
const BLOCKED_PATTERNS: &[&str] = &[
    r"__.*__",    // dunder access
    r"\..*os.*",  // os reached through another module
    r"subprocess",
    r"system\(",
    r"popen\(",
    r"eval\(",
    r"exec\(",
    r"compile\(",
];

/// What the interpreter printed
#[derive(Debug, Default)]
pub struct PythonOutput {
    pub stdout: String,
    pub stderr: String,
}

pub struct PythonRunner {
    interpreter: String,
    timeout: Duration,
    blocked: Vec<(String, Regex)>,
}

impl PythonRunner {
    pub fn new(interpreter: &str, timeout: Duration) -> Self {
        // Compile once; bad patterns are dropped rather than panicking
        let names = BLOCKED_NAMES.iter().filter_map(|name| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
                .ok()
                .map(|re| (format!("Blocked import/function: {}", name), re))
        });
        let patterns = BLOCKED_PATTERNS.iter().filter_map(|pattern| {
            Regex::new(&format!("(?i){}", pattern))
                .ok()
                .map(|re| (format!("Blocked pattern detected: {}", pattern), re))
        });

        Self {
            interpreter: interpreter.to_string(),
            timeout,
            blocked: names.chain(patterns).collect(),
        }
    }

    /// Screen a snippet without running it.
    pub fn validate(&self, code: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(LucienError::Blocked("Code cannot be empty".to_string()));
        }
        if code.len() > MAX_CODE_LENGTH {
            return Err(LucienError::Blocked("Code too long (limit: 10KB)".to_string()));
        }

        match self.blocked.iter().find(|(_, re)| re.is_match(code)) {
            Some((reason, _)) => Err(LucienError::Blocked(reason.clone())),
            None => Ok(()),
        }
    }

    /// Validate, write to a temp file, and run it from the temp directory.
    pub async fn run(&self, code: &str) -> Result<PythonOutput> {
        self.validate(code)?;

        let mut script = tempfile::Builder::new()
            .prefix("lucien-")
            .suffix(".py")
            .tempfile()?;
        script.write_all(code.as_bytes())?;
        script.flush()?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script.path()).current_dir(std::env::temp_dir());

        // The temp file is removed when `script` drops
        let out = run_with_timeout(cmd, self.timeout, "python code").await?;
        Ok(PythonOutput {
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}
