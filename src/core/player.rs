// Replays a stored spell through the dispatcher, one line at a time

use crate::core::session::{Outcome, Session};
use crate::error::{LucienError, Result};
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Deepest chain of spells casting spells we follow
pub const MAX_CAST_DEPTH: usize = 8;

const SEPARATOR_WIDTH: usize = 40;

impl Session {
    /// Run every line of spell `name` as if it had been typed.
    ///
    /// Exit words inside the spell are ignored and lines replayed here are
    /// never captured into an active recording (see `dispatch`).
    pub async fn cast(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LucienError::usage("cast spell <name>"));
        }
        if self.casting.iter().any(|active| active == name) {
            return Err(LucienError::RecursiveCast(name.to_string()));
        }
        if self.casting.len() >= MAX_CAST_DEPTH {
            return Err(LucienError::Blocked(format!(
                "spells nested deeper than {} levels",
                MAX_CAST_DEPTH
            )));
        }

        let spell = self
            .spells
            .get(name)
            .ok_or_else(|| LucienError::SpellNotFound(name.to_string()))?;
        let total = spell.commands.len();

        info!(spell = name, total, depth = self.casting.len(), "casting");
        self.say(format!("🔮 Casting spell '{}' ({} commands)...", name, total));

        self.casting.push(name.to_string());
        for (i, line) in spell.commands.iter().enumerate() {
            self.say(format!("\n[{}/{}] Executing: {}", i + 1, total, line));

            // dispatch -> run -> cast -> dispatch; box to give the cycle a size
            let nested: Pin<Box<dyn Future<Output = Outcome> + '_>> = Box::pin(self.dispatch(line));
            nested.await;

            self.say("-".repeat(SEPARATOR_WIDTH));
        }
        self.casting.pop();

        self.say(format!("✓ Spell '{}' completed!", name));
        Ok(())
    }
}
