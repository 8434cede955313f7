/// Persisted document shapes
///
/// Both documents are plain JSON objects so they stay readable and
/// hand-editable, and so files written by older versions keep loading.

use chrono::{DateTime, Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Spell book document: spell name to definition, in insertion order.
pub type SpellMap = IndexMap<String, Spell>;

/// A recorded, replayable sequence of command lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    /// Lines exactly as typed, in execution order
    pub commands: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: Option<NaiveDateTime>,
    /// Always `commands.len()`; kept in the file for display
    #[serde(default)]
    pub count: usize,
}

impl Spell {
    pub fn new(commands: Vec<String>) -> Self {
        let count = commands.len();
        Self {
            commands,
            description: format!("Recorded spell with {} commands", count),
            created: Some(Local::now().naive_local()),
            count,
        }
    }

    /// Date part of the creation timestamp, or `unknown`.
    pub fn created_date(&self) -> String {
        self.created
            .map(|ts| ts.date().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Accept naive ISO timestamps and RFC 3339 ones; anything else becomes `None`
/// instead of failing the whole document.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        s.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.naive_local()))
    }))
}

/// Notes and settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDoc {
    #[serde(default)]
    pub notes: Vec<String>,

    /// Last provider choice made with `internet on|off`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet: Option<bool>,

    /// Keys we don't know about are carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
