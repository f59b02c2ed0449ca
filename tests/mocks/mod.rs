//! Scripted network and document fixtures for integration tests.
//!
//! The fetcher answers from a per-URL script instead of the network, so
//! redirect chains, broken resources and slow hosts can be reproduced
//! deterministically. Scripted rules stand in for real ones when a test needs
//! a rule to fault, share a link or report late.

pub mod fetch;
pub mod fixtures;
pub mod rules;

pub use fetch::*;
pub use fixtures::*;
pub use rules::*;
