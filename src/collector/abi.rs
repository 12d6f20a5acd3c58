//! Block device counter layouts.
//!
//! Two kernel interfaces expose block I/O counters in incompatible text
//! layouts. The layout is chosen once at start-up and then owns both the
//! discovery record shape and the counter field mapping:
//!
//! | Layout   | File               | Columns before counters      |
//! |----------|--------------------|------------------------------|
//! | `Legacy` | `/proc/partitions` | `major minor #blocks name`   |
//! | `Modern` | `/proc/diskstats`  | `major minor name`           |

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::collector::error::ConfigError;
use crate::collector::procfs::parser::{
    CounterLine, parse_diskstats_line, parse_partitions_line, valid_device_name,
};
use crate::collector::traits::FileSystem;
use crate::storage::model::{DeviceId, RawDeviceCounters};

/// Counter columns in a whole-device record (including the skipped
/// in-flight column).
const FULL_RECORD_FIELDS: usize = 11;

/// Counter columns in a reduced modern partition record.
const PARTITION_RECORD_FIELDS: usize = 4;

/// Kernel counter layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterAbi {
    /// 2.4 kernels: extended statistics appended to `/proc/partitions`.
    Legacy,
    /// 2.6+ kernels: `/proc/diskstats`.
    Modern,
}

/// A device seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    pub id: DeviceId,
    pub name: String,
    /// Completed reads so far; zero means the device was never used.
    pub reads: u64,
}

impl CounterAbi {
    /// Picks the layout by which counter file is readable.
    ///
    /// `/proc/diskstats` wins when both exist.
    pub fn detect<F: FileSystem>(fs: &F, proc_path: &str) -> Result<Self, ConfigError> {
        for abi in [CounterAbi::Modern, CounterAbi::Legacy] {
            let path = abi.source_path(proc_path);
            match fs.read_to_string(&path) {
                Ok(_) => {
                    debug!("counter source {} is readable", path.display());
                    return Ok(abi);
                }
                Err(e) => debug!("counter source {} unavailable: {}", path.display(), e),
            }
        }
        Err(ConfigError::NoCounterSource {
            proc_path: proc_path.to_string(),
        })
    }

    /// Classic kernel series number of the layout (4 or 6).
    pub fn version(self) -> u8 {
        match self {
            CounterAbi::Legacy => 4,
            CounterAbi::Modern => 6,
        }
    }

    /// File holding the device counters for this layout.
    pub fn source_path(self, proc_path: &str) -> PathBuf {
        let file = match self {
            CounterAbi::Legacy => "partitions",
            CounterAbi::Modern => "diskstats",
        };
        PathBuf::from(format!("{}/{}", proc_path, file))
    }

    /// Whether the CPU iowait category is meaningful.
    pub fn reports_iowait(self) -> bool {
        matches!(self, CounterAbi::Modern)
    }

    /// Splits a line according to this layout's leading columns.
    pub fn parse_line(self, line: &str) -> Option<CounterLine<'_>> {
        match self {
            CounterAbi::Legacy => parse_partitions_line(line),
            CounterAbi::Modern => parse_diskstats_line(line),
        }
    }

    /// Reads a discovery record: identity, name and read count.
    pub fn discovery_record(self, line: &str) -> Option<DiscoveryRecord> {
        let rec = self.parse_line(line)?;
        let reads = *rec.values.first()?;
        if !valid_device_name(rec.name) {
            return None;
        }
        Some(DiscoveryRecord {
            id: DeviceId::new(rec.major, rec.minor),
            name: rec.name.to_string(),
            reads,
        })
    }

    /// Maps a parsed line to counters, or `None` if its shape is unknown.
    pub fn device_counters(self, rec: &CounterLine<'_>) -> Option<RawDeviceCounters> {
        match self {
            CounterAbi::Legacy => legacy_counters(rec),
            CounterAbi::Modern => modern_counters(rec),
        }
    }
}

/// `/proc/partitions` extended record.
///
/// Only request and sector totals are taken; merge, tick and queue
/// columns are left at zero.
pub fn legacy_counters(rec: &CounterLine<'_>) -> Option<RawDeviceCounters> {
    if rec.values.len() < FULL_RECORD_FIELDS {
        return None;
    }
    Some(RawDeviceCounters {
        read_ios: rec.value(0),
        read_sectors: rec.value(2),
        write_ios: rec.value(4),
        write_sectors: rec.value(6),
        ..RawDeviceCounters::default()
    })
}

/// `/proc/diskstats` record, whole device or reduced partition.
///
/// A reduced partition record carries `rd_ios rd_sectors wr_ios wr_sectors`
/// but is read with the whole-device field order, so the sector totals land
/// in the merge and tick slots. They are moved back into the sector fields
/// and everything else is zeroed: the kernel reports nothing more for
/// partitions in this form.
pub fn modern_counters(rec: &CounterLine<'_>) -> Option<RawDeviceCounters> {
    let n = rec.values.len();
    if n >= FULL_RECORD_FIELDS {
        // Column 8 is requests in flight, not a cumulative counter.
        Some(RawDeviceCounters {
            read_ios: rec.value(0),
            read_merges: rec.value(1),
            read_sectors: rec.value(2),
            read_ticks_ms: rec.value(3),
            write_ios: rec.value(4),
            write_merges: rec.value(5),
            write_sectors: rec.value(6),
            write_ticks_ms: rec.value(7),
            io_ticks_ms: rec.value(9),
            queue_time_ms: rec.value(10),
        })
    } else if n == PARTITION_RECORD_FIELDS {
        let read_merges_field = rec.value(1);
        let read_ticks_field = rec.value(3);
        Some(RawDeviceCounters {
            read_sectors: read_merges_field,
            write_sectors: read_ticks_field,
            ..RawDeviceCounters::default()
        })
    } else {
        None
    }
}
