/// Command registry
///
/// Ordered list of (name, handler) pairs built once at startup. Names may
/// span several words ("show memory"). Lookup always picks the longest
/// registered name that prefixes the line on a word boundary, so the
/// order commands are registered in never changes which one runs.

use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub struct DuplicateCommand(pub String);

impl fmt::Display for DuplicateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command '{}' is registered twice", self.0)
    }
}

impl std::error::Error for DuplicateCommand {}

#[derive(Debug, Clone)]
pub struct Registry<H> {
    entries: Vec<(String, H)>,
}

impl<H: Copy> Registry<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a command. Names are unique.
    pub fn register(&mut self, name: &str, handler: H) -> Result<(), DuplicateCommand> {
        let name = name.trim();
        if self.entries.iter().any(|(n, _)| n == name) {
            return Err(DuplicateCommand(name.to_string()));
        }
        self.entries.push((name.to_string(), handler));
        Ok(())
    }

    /// Handler for `line` plus the trimmed argument text after its name.
    pub fn lookup(&self, line: &str) -> Option<(H, String)> {
        let line = line.trim();

        self.entries
            .iter()
            .filter_map(|(name, handler)| {
                let rest = line.strip_prefix(name.as_str())?;
                // Must end exactly at the name or at whitespace after it
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    Some((name.len(), *handler, rest.trim()))
                } else {
                    None
                }
            })
            // max_by_key keeps the last maximum; names are unique so lengths
            // only tie between names that can't both match
            .max_by_key(|(len, _, _)| *len)
            .map(|(_, handler, rest)| (handler, rest.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: Copy> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
