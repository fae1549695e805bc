//! In-memory adapters for tests and deterministic local runs.

mod analyzer;
mod file_source;
mod task_store;

pub use analyzer::{InMemoryAnalyzer, ScriptedResponse};
pub use file_source::InMemoryFileSource;
pub use task_store::InMemoryTaskStore;
