/// Persistence for spells and memory
///
/// Two independent JSON documents, each read and written whole.

pub mod document;
pub mod memory;
pub mod models;
pub mod spells;

pub use document::{JsonStore, Store};
pub use memory::{Memory, NoteMatch};
pub use models::{MemoryDoc, Spell, SpellMap};
pub use spells::SpellBook;
