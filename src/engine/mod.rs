//! Validation engine module.
//!
//! Provides the run orchestrator, the per-run event sink, the completion
//! barrier it joins rules on, and result aggregation.

pub mod barrier;
pub mod orchestrator;
pub mod result;
pub mod sink;
