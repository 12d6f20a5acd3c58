//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built `/proc` scenarios for both
//! counter layouts, so the collector can be exercised without Linux.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
