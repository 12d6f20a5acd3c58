//! Raw cumulative counters as read from the kernel.
//!
//! Every counter here only grows between device resets. Rates are derived
//! from the difference of two samples in [`crate::rates`].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Block device number pair. Unique key of a monitored device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

impl DeviceId {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Cumulative I/O counters of one block device.
///
/// Source: `/proc/diskstats` (modern) or `/proc/partitions` (legacy).
/// Fields the active layout does not expose are zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RawDeviceCounters {
    /// Read requests completed.
    pub read_ios: u64,
    /// Adjacent read requests merged.
    pub read_merges: u64,
    /// 512-byte sectors read.
    pub read_sectors: u64,
    /// Milliseconds spent on reads (queue + service).
    pub read_ticks_ms: u64,
    /// Write requests completed.
    pub write_ios: u64,
    /// Adjacent write requests merged.
    pub write_merges: u64,
    /// 512-byte sectors written.
    pub write_sectors: u64,
    /// Milliseconds spent on writes (queue + service).
    pub write_ticks_ms: u64,
    /// Milliseconds during which at least one request was outstanding.
    pub io_ticks_ms: u64,
    /// Weighted milliseconds of queued requests (queue length integral).
    pub queue_time_ms: u64,
}

/// System-wide CPU tick counters, summed over all processors.
///
/// Source: aggregate `cpu` line of `/proc/stat`. `nice` is already folded
/// into `user`; `irq` and `softirq` into `system` when the line carries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RawCpuCounters {
    pub user_ticks: u64,
    pub system_ticks: u64,
    pub idle_ticks: u64,
    /// Zero when the kernel does not report iowait.
    pub iowait_ticks: u64,
}

impl RawCpuCounters {
    /// Sum of the four accounted categories.
    pub fn total(&self) -> u64 {
        self.user_ticks
            .saturating_add(self.system_ticks)
            .saturating_add(self.idle_ticks)
            .saturating_add(self.iowait_ticks)
    }
}

/// One complete read of the counter sources.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Sample {
    /// Counters of registered devices present in the source.
    pub devices: HashMap<DeviceId, RawDeviceCounters>,
    pub cpu: RawCpuCounters,
}

impl Sample {
    pub fn device(&self, id: DeviceId) -> Option<&RawDeviceCounters> {
        self.devices.get(&id)
    }
}
