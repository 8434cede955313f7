/// Console I/O for command handlers
///
/// Handlers never touch stdout/stdin directly. They print through the
/// console and read follow-up input (file contents, confirmations,
/// python code) from it, so a session can run against a terminal or
/// against an in-memory transcript.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

pub struct Console {
    out: Box<dyn Write>,
    input: Input,
}

enum Input {
    /// Process stdin. Reads go through std's shared buffer, the same one the
    /// line editor drains when stdin is not a terminal, so the two never
    /// steal lines from each other. The lock is taken per read.
    Stdin,
    Reader(Box<dyn BufRead>),
}

impl Console {
    pub fn new(out: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Self {
            out,
            input: Input::Reader(input),
        }
    }

    /// Console bound to the process stdout/stdin.
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stdout()),
            input: Input::Stdin,
        }
    }

    /// Print one line. Output failures are dropped; there is nowhere left to report them.
    pub fn say(&mut self, msg: impl Display) {
        let _ = writeln!(self.out, "{}", msg);
        let _ = self.out.flush();
    }

    /// Print `label` without a newline and read one line back.
    ///
    /// Returns `None` on end of input.
    pub fn ask(&mut self, label: &str) -> Option<String> {
        let _ = write!(self.out, "{}", label);
        let _ = self.out.flush();
        self.read_line()
    }

    /// Read lines until an empty one (or end of input) and join them with `\n`.
    pub fn read_block(&mut self) -> String {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line() {
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        let read = match &mut self.input {
            Input::Stdin => io::stdin().read_line(&mut buf),
            Input::Reader(reader) => reader.read_line(&mut buf),
        };
        match read {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

#[cfg(test)]
pub use self::capture::Transcript;
