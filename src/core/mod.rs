/// Command routing and spells
///
/// The registry maps typed lines to commands, the session dispatches them,
/// the recorder captures lines into spells and the player replays them.

pub mod commands;
pub mod player;
pub mod recorder;
pub mod registry;
pub mod session;

pub use commands::Command;
pub use recorder::{Recorder, RecorderState};
pub use registry::Registry;
pub use session::{Outcome, Session};
