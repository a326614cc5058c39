//! Test utilities for the posting-list crates.
//!
//! - Synthetic collections with uniform and clustered docids
//! - Persisting an index through a temporary file

pub mod data_gen;
pub mod files;
