//! Adapter implementations for audit ports.

pub mod fs;
pub mod memory;
pub mod postgres;
mod timeout;

pub use fs::DirectoryFileSource;
pub use timeout::TimeoutAnalyzer;
