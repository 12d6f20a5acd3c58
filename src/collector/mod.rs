//! Block device and CPU counter collector for Linux.
//!
//! This module discovers the monitored devices and re-reads their cumulative
//! counters on every tick, with support for mocking on other platforms.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │   DeviceRegistry    │   │        CounterAbi           │  │
//! │  │  - discovery        │   │  - Legacy: /proc/partitions │  │
//! │  │  - visibility       │   │  - Modern: /proc/diskstats  │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬──────────────┘                 │
//! │                            │    /proc/stat, /proc/cpuinfo   │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!                      ┌───────┴───────┐
//!                      │               │
//!               ┌──────▼──────┐ ┌──────▼──────┐
//!               │   RealFs    │ │   MockFs    │
//!               │ (Linux)     │ │ (Testing)   │
//!               └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use iostat::collector::{Collector, MockFs};
//! use iostat::config::ReportConfig;
//!
//! let fs = MockFs::modern_system();
//! let collector = Collector::open(fs, "/proc", &ReportConfig::default()).unwrap();
//! let sample = collector.read_all().unwrap();
//! assert_eq!(sample.devices.len(), collector.registry().len());
//! ```

pub mod abi;
#[allow(clippy::module_inception)]
mod collector;
mod error;
pub mod mock;
pub mod procfs;
pub mod registry;
pub mod traits;

pub use abi::{CounterAbi, DiscoveryRecord};
pub use collector::Collector;
pub use error::{ConfigError, SourceReadError};
pub use mock::MockFs;
pub use registry::{DeviceIdentity, DeviceRegistry, Visibility};
pub use traits::{FileSystem, RealFs};
