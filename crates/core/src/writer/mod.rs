//! Result writer abstraction.
//!
//! Persists extracted follower counts, keyed by target. Writes are
//! last-write-wins with no change detection.

mod types;

pub use types::*;
