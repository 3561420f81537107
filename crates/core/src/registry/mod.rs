//! Target registry abstraction.
//!
//! This module provides a `TargetRegistry` trait for loading the set of
//! profile identifiers to poll from an external store.

mod types;

pub use types::*;
