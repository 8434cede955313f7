/// Whole-document persistence
///
/// Each store holds one value that is read in full and written back in
/// full. There is no locking; a single interactive session is assumed.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load/save contract for a persisted document.
pub trait Store<T> {
    /// Read the document. Missing or unreadable storage yields `T::default()`.
    fn load(&self) -> T;

    /// Replace the stored document with `value`.
    fn save(&self, value: &T) -> Result<()>;
}

/// JSON file on disk, pretty-printed and replaced atomically.
pub struct JsonStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Store<T> for JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> T {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "unreadable document, using empty");
                return T::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "corrupt document, using empty");
                T::default()
            }
        }
    }

    fn save(&self, value: &T) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut buf = serde_json::to_string_pretty(value)?;
        buf.push('\n');

        // Write next to the target, then rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(buf.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), bytes = buf.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
pub use self::memory_backed::InMemoryStore;

#[cfg(test)]
mod memory_backed {
    use super::Store;
    use crate::error::Result;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Store kept in memory that counts how often it was saved.
    /// Clones share the same document.
    #[derive(Clone, Default)]
    pub struct InMemoryStore<T> {
        doc: Rc<RefCell<T>>,
        saves: Rc<Cell<usize>>,
    }

    impl<T: Clone + Default> InMemoryStore<T> {
        pub fn with(doc: T) -> Self {
            Self {
                doc: Rc::new(RefCell::new(doc)),
                saves: Rc::new(Cell::new(0)),
            }
        }

        pub fn saves(&self) -> usize {
            self.saves.get()
        }

        pub fn snapshot(&self) -> T {
            self.doc.borrow().clone()
        }
    }

    impl<T: Clone + Default> Store<T> for InMemoryStore<T> {
        fn load(&self) -> T {
            self.doc.borrow().clone()
        }

        fn save(&self, value: &T) -> Result<()> {
            *self.doc.borrow_mut() = value.clone();
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
    }
}
