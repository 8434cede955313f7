/// Notes and settings held for the whole session
///
/// Loaded once at startup. Written back by explicit commands
/// (`remember`, `clear memory`) and once more when the session ends.

use crate::error::Result;
use crate::store::document::{JsonStore, Store};
use crate::store::models::MemoryDoc;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::path::Path;
use tracing::debug;

pub struct Memory {
    doc: MemoryDoc,
    store: Box<dyn Store<MemoryDoc>>,
}

/// A note matched by a memory search
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    /// 1-based position in `show memory`
    pub index: usize,
    pub note: String,
    pub score: i64,
}

impl Memory {
    pub fn new(store: Box<dyn Store<MemoryDoc>>) -> Self {
        let doc = store.load();
        debug!(notes = doc.notes.len(), "memory loaded");
        Self { doc, store }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::new(Box::new(JsonStore::new(path)))
    }

    pub fn notes(&self) -> &[String] {
        &self.doc.notes
    }

    /// Append a note and persist right away.
    pub fn remember(&mut self, text: &str) -> Result<()> {
        self.doc.notes.push(text.to_string());
        self.flush()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.doc.notes.clear();
        self.flush()
    }

    /// Fuzzy search over notes, best match first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<NoteMatch> {
        let matcher = SkimMatcherV2::default();

        let mut results: Vec<NoteMatch> = self
            .doc
            .notes
            .iter()
            .enumerate()
            .filter_map(|(i, note)| {
                matcher.fuzzy_match(note, query).map(|score| NoteMatch {
                    index: i + 1,
                    note: note.clone(),
                    score,
                })
            })
            .collect();

        // Stable sort keeps older notes first on ties
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);
        results
    }

    pub fn internet(&self) -> Option<bool> {
        self.doc.internet
    }

    /// Remember the provider choice; persisted with the next flush.
    pub fn set_internet(&mut self, online: bool) {
        self.doc.internet = Some(online);
    }

    /// Write the whole document back.
    pub fn flush(&self) -> Result<()> {
        self.store.save(&self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::InMemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_remember_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");

        let mut memory = Memory::open(&path);
        memory.remember("buy milk").unwrap();

        let reopened = Memory::open(&path);
        assert_eq!(reopened.notes(), &["buy milk".to_string()]);
    }

    #[test]
    fn test_clear() {
        let store = InMemoryStore::<MemoryDoc>::default();
        let mut memory = Memory::new(Box::new(store.clone()));
        memory.remember("a").unwrap();
        memory.remember("b").unwrap();

        memory.clear().unwrap();

        assert!(memory.notes().is_empty());
        assert!(store.snapshot().notes.is_empty());
        assert_eq!(store.saves(), 3);
    }

    #[test]
    fn test_search_ranks_and_indexes() {
        let mut doc = MemoryDoc::default();
        doc.notes = vec![
            "call the dentist".to_string(),
            "buy milk".to_string(),
            "buy oat milk too".to_string(),
        ];
        let memory = Memory::new(Box::new(InMemoryStore::with(doc)));

        let results = memory.search("milk", 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.note.contains("milk")));
        assert!(results.iter().any(|m| m.index == 2));

        // Typos still land
        assert!(!memory.search("dntist", 10).is_empty());
        assert!(memory.search("zebra", 10).is_empty());
    }

    #[test]
    fn test_internet_setting_waits_for_flush() {
        let store = InMemoryStore::<MemoryDoc>::default();
        let mut memory = Memory::new(Box::new(store.clone()));

        memory.set_internet(false);
        assert_eq!(store.snapshot().internet, None);

        memory.flush().unwrap();
        assert_eq!(store.snapshot().internet, Some(false));
        assert_eq!(memory.internet(), Some(false));
    }
}
