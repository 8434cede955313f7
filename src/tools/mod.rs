/// External collaborators invoked by registered commands
///
/// Plain request/response helpers: files, system info, git, subprocesses
/// and python snippets. None of them hold state between calls.

pub mod files;
pub mod git;
pub mod process;
pub mod python;
pub mod system;

pub use python::{PythonOutput, PythonRunner};
