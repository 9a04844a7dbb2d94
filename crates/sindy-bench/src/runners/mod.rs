pub mod harness;

// Re-export for easier usage
pub use harness::{Harness, RunOutcome, RunReport, RunRequest, RunState};
