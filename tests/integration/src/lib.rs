//! Integration test utilities for the mirror
//!
//! Helpers for driving the sync engine end to end and reading the result back
//! through the HTTP API.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
