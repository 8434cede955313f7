/// Spell book
///
/// Reads the spell document fresh on every access and writes it back whole
/// on every change, so edits made to the file between commands are seen.

use crate::error::{LucienError, Result};
use crate::store::document::{JsonStore, Store};
use crate::store::models::{Spell, SpellMap};
use std::path::Path;
use tracing::info;

pub struct SpellBook {
    store: Box<dyn Store<SpellMap>>,
}

impl SpellBook {
    pub fn new(store: Box<dyn Store<SpellMap>>) -> Self {
        Self { store }
    }

    /// Spell book backed by a JSON file.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::new(Box::new(JsonStore::new(path)))
    }

    /// Every stored spell, in storage order.
    pub fn all(&self) -> SpellMap {
        let mut spells = self.store.load();
        for spell in spells.values_mut() {
            spell.count = spell.commands.len();
        }
        spells
    }

    pub fn get(&self, name: &str) -> Option<Spell> {
        self.all().shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.load().contains_key(name)
    }

    /// Add a new spell. Existing names are never overwritten.
    pub fn insert(&self, name: &str, spell: Spell) -> Result<()> {
        let mut spells = self.store.load();
        if spells.contains_key(name) {
            return Err(LucienError::SpellExists(name.to_string()));
        }

        let count = spell.count;
        spells.insert(name.to_string(), spell);
        self.store.save(&spells)?;

        info!(spell = name, count, "spell saved");
        Ok(())
    }

    /// Remove a spell. Nothing is written when it doesn't exist.
    pub fn remove(&self, name: &str) -> Result<Spell> {
        let mut spells = self.store.load();
        let removed = spells
            .shift_remove(name)
            .ok_or_else(|| LucienError::SpellNotFound(name.to_string()))?;
        self.store.save(&spells)?;

        info!(spell = name, "spell deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::InMemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn spell(lines: &[&str]) -> Spell {
        Spell::new(lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn test_insert_and_get() {
        let dir = TempDir::new().unwrap();
        let book = SpellBook::open(dir.path().join("spells.json"));

        book.insert("morning", spell(&["git pull", "git status"])).unwrap();

        let loaded = book.get("morning").unwrap();
        assert_eq!(loaded.commands, vec!["git pull", "git status"]);
        assert_eq!(loaded.count, 2);
        assert!(book.contains("morning"));
        assert!(book.get("evening").is_none());
    }

    #[test]
    fn test_insert_refuses_overwrite() {
        let store = InMemoryStore::<SpellMap>::default();
        let book = SpellBook::new(Box::new(store.clone()));

        book.insert("morning", spell(&["a"])).unwrap();
        let result = book.insert("morning", spell(&["b", "c"]));

        assert!(matches!(result, Err(LucienError::SpellExists(_))));
        assert_eq!(store.saves(), 1);
        assert_eq!(store.snapshot()["morning"].commands, vec!["a"]);
    }

    #[test]
    fn test_remove_missing_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spells.json");
        let book = SpellBook::open(&path);
        book.insert("morning", spell(&["a"])).unwrap();
        let before = fs::read(&path).unwrap();

        let result = book.remove("ghost");

        assert!(matches!(result, Err(LucienError::SpellNotFound(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_remove_keeps_order_of_the_rest() {
        let book = SpellBook::new(Box::new(InMemoryStore::<SpellMap>::default()));
        for name in ["one", "two", "three"] {
            book.insert(name, spell(&[name])).unwrap();
        }

        book.remove("two").unwrap();

        let names: Vec<String> = book.all().keys().cloned().collect();
        assert_eq!(names, vec!["one", "three"]);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let store: JsonStore<SpellMap> = JsonStore::new(dir.path().join("spells.json"));

        for size in [0usize, 1, 5] {
            let mut spells = SpellMap::new();
            for i in 0..size {
                let lines: Vec<String> = (0..=i).map(|j| format!("remember note {}", j)).collect();
                spells.insert(format!("spell-{}", i), Spell::new(lines));
            }

            store.save(&spells).unwrap();
            assert_eq!(store.load(), spells);
        }
    }

    #[test]
    fn test_count_rederived_on_load() {
        let mut doc = SpellMap::new();
        let mut bad = spell(&["a", "b"]);
        bad.count = 7;
        doc.insert("bad".to_string(), bad);

        let book = SpellBook::new(Box::new(InMemoryStore::with(doc)));
        assert_eq!(book.get("bad").unwrap().count, 2);
    }
}
