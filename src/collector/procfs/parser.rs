//! Parsers for `/proc` counter files.
//!
//! These are pure functions over string input. Line parsers follow the
//! kernel's fixed field order and read numeric columns left to right until
//! the first non-numeric token, so both short (partition) and long
//! (whole-device, newer kernel) records come back with their field count
//! intact for the layout code in [`crate::collector::abi`] to classify.

use crate::storage::model::RawCpuCounters;

/// Longest device name accepted in a discovery record.
pub const MAX_NAME_LEN: usize = 31;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// One block device line split into its identity and numeric columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterLine<'a> {
    pub major: u32,
    pub minor: u32,
    pub name: &'a str,
    /// Numeric columns following the name, in file order.
    pub values: Vec<u64>,
}

impl CounterLine<'_> {
    /// Value at `idx`, or zero when the record is shorter.
    pub fn value(&self, idx: usize) -> u64 {
        self.values.get(idx).copied().unwrap_or(0)
    }
}

fn leading_numbers<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<u64> {
    tokens.map_while(|t| t.parse::<u64>().ok()).collect()
}

/// Parses a `/proc/diskstats` line.
///
/// Format: `major minor name rd_ios rd_merges rd_sectors rd_ticks wr_ios
/// wr_merges wr_sectors wr_ticks in_flight io_ticks time_in_queue [...]`.
/// Old 2.6 kernels print partitions as `major minor name rd_ios rd_sectors
/// wr_ios wr_sectors`.
pub fn parse_diskstats_line(line: &str) -> Option<CounterLine<'_>> {
    let mut tokens = line.split_whitespace();
    let major = tokens.next()?.parse().ok()?;
    let minor = tokens.next()?.parse().ok()?;
    let name = tokens.next()?;

    Some(CounterLine {
        major,
        minor,
        name,
        values: leading_numbers(tokens),
    })
}

/// Parses a `/proc/partitions` line.
///
/// Format: `major minor #blocks name rio rmerge rsect ruse wio wmerge wsect
/// wuse running use aveq`. Kernels without extended statistics stop after
/// the name. The header line does not parse.
pub fn parse_partitions_line(line: &str) -> Option<CounterLine<'_>> {
    let mut tokens = line.split_whitespace();
    let major = tokens.next()?.parse().ok()?;
    let minor = tokens.next()?.parse().ok()?;
    let _blocks: u64 = tokens.next()?.parse().ok()?;
    let name = tokens.next()?;

    Some(CounterLine {
        major,
        minor,
        name,
        values: leading_numbers(tokens),
    })
}

/// Returns true when `name` fits a discovery record.
pub fn valid_device_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LEN
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Format: `cpu user nice system idle [iowait irq softirq ...]`.
/// `nice` is folded into `user`. With seven or more fields `irq` and
/// `softirq` are folded into `system`; with only four, iowait is zero.
pub fn parse_stat(content: &str) -> Result<RawCpuCounters, ParseError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ParseError::new("no aggregate cpu line"))?;

    let values = leading_numbers(line.split_whitespace().skip(1).take(7));
    if values.len() < 4 {
        return Err(ParseError::new(format!(
            "cpu line has {} fields, expected at least 4",
            values.len()
        )));
    }

    let mut cpu = RawCpuCounters {
        user_ticks: values[0].saturating_add(values[1]),
        system_ticks: values[2],
        idle_ticks: values[3],
        iowait_ticks: values.get(4).copied().unwrap_or(0),
    };
    if values.len() == 7 {
        cpu.system_ticks = cpu
            .system_ticks
            .saturating_add(values[5])
            .saturating_add(values[6]);
    }

    Ok(cpu)
}

/// Counts processors listed in `/proc/cpuinfo`.
pub fn count_processors(content: &str) -> usize {
    content
        .lines()
        .filter(|l| l.starts_with("processor\t:"))
        .count()
}
