// Captures typed lines into a spell while a recording is active
//
// Flags lines that look like they carry secrets, since spells are plain JSON

use crate::error::{LucienError, Result};
use crate::store::{Spell, SpellBook};
use regex::Regex;
use tracing::{debug, info};

/// The line that ends a recording. Never captured itself.
pub const STOP_DIRECTIVE: &str = "stop recording";

// Anything in a spell file is readable by whoever can read the file
const SENSITIVE_PATTERNS: &[&str] = &[
    r"password\s*=",
    r"pwd\s*=",
    r"passwd\s*=",
    r"token\s*=",
    r"api[_-]?key\s*=",
    r"secret\s*=",
    r"auth\s*=",
    r"bearer\s+",
    r"--password",
    r"--token",
    // -p only carries a password for these clients
    r"\b(?:sshpass|mysql|mysqldump|mariadb)\b.*\s-p\s*\S",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording { name: String, captured: Vec<String> },
}

/// What `capture` did with a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Not recording, or the line was the stop directive
    Skipped,
    Captured { sensitive: bool },
}

/// How a recording ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stopped {
    /// Nothing was captured; nothing written
    Empty { name: String },
    Saved { name: String, count: usize },
}

pub struct Recorder {
    state: RecorderState,
    sensitive_regex: Vec<Regex>,
}

impl Recorder {
    pub fn new() -> Self {
        // Build all the regex patterns once so we don't recompile them every time
        let sensitive_regex = SENSITIVE_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            state: RecorderState::Idle,
            sensitive_regex,
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Name of the spell being recorded, if any.
    pub fn active(&self) -> Option<&str> {
        match &self.state {
            RecorderState::Recording { name, .. } => Some(name),
            RecorderState::Idle => None,
        }
    }

    pub fn captured(&self) -> &[String] {
        match &self.state {
            RecorderState::Recording { captured, .. } => captured,
            RecorderState::Idle => &[],
        }
    }

    /// Begin recording `name`.
    ///
    /// Fails without touching the current state if a recording is already
    /// running or the name is taken in the spell book.
    pub fn start(&mut self, name: &str, book: &SpellBook) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LucienError::usage("record spell <name>"));
        }
        if let Some(active) = self.active() {
            return Err(LucienError::AlreadyRecording(active.to_string()));
        }
        if book.contains(name) {
            return Err(LucienError::SpellExists(name.to_string()));
        }

        info!(spell = name, "recording started");
        self.state = RecorderState::Recording {
            name: name.to_string(),
            captured: Vec::new(),
        };
        Ok(())
    }

    /// Append `line` verbatim to the active recording.
    pub fn capture(&mut self, line: &str) -> Capture {
        if is_stop_directive(line) {
            return Capture::Skipped;
        }

        let sensitive = self.contains_sensitive_data(line);
        match &mut self.state {
            RecorderState::Recording { captured, .. } => {
                captured.push(line.to_string());
                debug!(count = captured.len(), "line captured");
                Capture::Captured { sensitive }
            }
            RecorderState::Idle => Capture::Skipped,
        }
    }

    /// End the recording and save it if anything was captured.
    ///
    /// The recorder is back to idle afterwards whatever the outcome.
    pub fn stop(&mut self, book: &SpellBook) -> Result<Stopped> {
        let (name, captured) = match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Recording { name, captured } => (name, captured),
            RecorderState::Idle => return Err(LucienError::NotRecording),
        };

        if captured.is_empty() {
            info!(spell = %name, "recording discarded, nothing captured");
            return Ok(Stopped::Empty { name });
        }

        let count = captured.len();
        book.insert(&name, Spell::new(captured))?;
        info!(spell = %name, count, "spell saved");
        Ok(Stopped::Saved { name, count })
    }

    /// Drop an active recording without saving. Returns its name.
    pub fn abandon(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Recording { name, .. } => Some(name),
            RecorderState::Idle => None,
        }
    }

    fn contains_sensitive_data(&self, line: &str) -> bool {
        let lowercase = line.to_lowercase();

        self.sensitive_regex
            .iter()
            .any(|regex| regex.is_match(&lowercase))
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_stop_directive(line: &str) -> bool {
    line.trim() == STOP_DIRECTIVE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::InMemoryStore;
    use crate::store::SpellMap;

    fn book() -> (SpellBook, InMemoryStore<SpellMap>) {
        let store = InMemoryStore::<SpellMap>::default();
        (SpellBook::new(Box::new(store.clone())), store)
    }

    #[test]
    fn test_record_and_stop() {
        let (book, store) = book();
        let mut rec = Recorder::new();

        rec.start("morning", &book).unwrap();
        assert_eq!(rec.active(), Some("morning"));

        assert_eq!(rec.capture("remember a"), Capture::Captured { sensitive: false });
        assert_eq!(rec.capture("show memory"), Capture::Captured { sensitive: false });
        assert_eq!(rec.capture("stop recording"), Capture::Skipped);

        let stopped = rec.stop(&book).unwrap();
        assert_eq!(
            stopped,
            Stopped::Saved {
                name: "morning".to_string(),
                count: 2
            }
        );
        assert_eq!(*rec.state(), RecorderState::Idle);

        let spell = book.get("morning").unwrap();
        assert_eq!(spell.commands, vec!["remember a", "show memory"]);
        assert_eq!(spell.count, 2);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_empty_stop_writes_nothing() {
        let (book, store) = book();
        let mut rec = Recorder::new();

        rec.start("nothing", &book).unwrap();
        let stopped = rec.stop(&book).unwrap();

        assert_eq!(stopped, Stopped::Empty { name: "nothing".to_string() });
        assert_eq!(store.saves(), 0);
        assert!(book.all().is_empty());
        assert_eq!(rec.active(), None);
    }

    #[test]
    fn test_stop_when_idle() {
        let (book, _) = book();
        let mut rec = Recorder::new();
        assert!(matches!(rec.stop(&book), Err(LucienError::NotRecording)));
    }

    #[test]
    fn test_existing_name_rejected() {
        let (book, store) = book();
        book.insert("morning", Spell::new(vec!["help".to_string()])).unwrap();

        let mut rec = Recorder::new();
        assert!(matches!(
            rec.start("morning", &book),
            Err(LucienError::SpellExists(_))
        ));
        assert_eq!(rec.active(), None);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_second_start_keeps_active_capture() {
        let (book, _) = book();
        let mut rec = Recorder::new();

        rec.start("first", &book).unwrap();
        rec.capture("remember a");

        assert!(matches!(
            rec.start("second", &book),
            Err(LucienError::AlreadyRecording(name)) if name == "first"
        ));
        assert_eq!(rec.active(), Some("first"));
        assert_eq!(rec.captured(), ["remember a".to_string()]);
    }

    #[test]
    fn test_empty_name_is_usage_error() {
        let (book, _) = book();
        let mut rec = Recorder::new();
        assert!(matches!(rec.start("  ", &book), Err(LucienError::Usage(_))));
    }

    #[test]
    fn test_sensitive_lines_flagged_but_kept() {
        let (book, _) = book();
        let mut rec = Recorder::new();
        rec.start("deploy", &book).unwrap();

        assert_eq!(
            rec.capture("run shell curl -H 'Authorization: Bearer abc'"),
            Capture::Captured { sensitive: true }
        );
        assert_eq!(
            rec.capture("run shell export API_KEY=xyz"),
            Capture::Captured { sensitive: true }
        );
        assert_eq!(rec.captured().len(), 2);
    }

    #[test]
    fn test_short_p_flag_only_flagged_for_password_clients() {
        let (book, _) = book();
        let mut rec = Recorder::new();
        rec.start("setup", &book).unwrap();

        for line in [
            "run shell mkdir -p build",
            "run shell ssh -p 22 host",
            "run shell cp -p a.txt b.txt",
        ] {
            assert_eq!(
                rec.capture(line),
                Capture::Captured { sensitive: false },
                "line: {}",
                line
            );
        }
        for line in [
            "run shell sshpass -p hunter2 ssh host",
            "run shell mysql -u root -psecret shop",
        ] {
            assert_eq!(
                rec.capture(line),
                Capture::Captured { sensitive: true },
                "line: {}",
                line
            );
        }
    }

    #[test]
    fn test_capture_when_idle_is_skipped() {
        let mut rec = Recorder::new();
        assert_eq!(rec.capture("remember a"), Capture::Skipped);
        assert_eq!(rec.abandon(), None);
    }
}
