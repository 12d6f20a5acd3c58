//! Raw counter records and the sample store.
//!
//! Only two generations of counters are ever kept: the previous sample and
//! the current one. Nothing is persisted.

pub mod model;
mod store;

pub use model::{DeviceId, RawCpuCounters, RawDeviceCounters, Sample};
pub use store::SampleStore;
