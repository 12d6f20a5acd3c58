//! iostat: block device and CPU throughput reporter.
//!
//! Provides:
//! - `collector`: counter discovery and sampling from `/proc` (legacy and modern layouts)
//! - `storage`: raw counter records and the two-generation sample store
//! - `rates`: per-interval delta and rate computation
//! - `fmt`: column and JSON rendering of computed rates
//! - `config`: report configuration shared by collector and renderer

pub mod collector;
pub mod config;
pub mod fmt;
pub mod rates;
pub mod storage;
