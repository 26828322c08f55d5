//! Operator console for the Notesly agent.
//!
//! Polls the agent's status and config catalog, projects live module state
//! onto the fixed pipeline topology, and stages config edits that are
//! committed (optionally followed by a restart) through a single sequencer.

pub mod agent;
pub mod cli;
pub mod config;
pub mod console;
pub mod editing;
pub mod infra;
pub mod logging;
pub mod sources;
pub mod topology;
