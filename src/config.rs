//! Report configuration consumed by the collector and the renderer.

/// Legacy registry limit.
pub const DEFAULT_CAPACITY: usize = 64;

/// Scheduler ticks per second exposed in `/proc/stat` (USER_HZ).
pub const DEFAULT_CLOCK_TICKS: u64 = 100;

/// What to monitor and how to report it.
///
/// Built once by the command line layer and passed explicitly to
/// [`Collector::open`](crate::collector::Collector::open) and
/// [`Renderer::new`](crate::fmt::Renderer::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Show whole disks (not only partitions).
    pub show_whole_device: bool,
    /// Show partitions of known disk classes.
    pub show_partitions: bool,
    /// One line per device with the full extended column set.
    pub extended: bool,
    /// Read/write rates and busy percent instead of throughput.
    pub utilization: bool,
    /// Append CPU percentages to the report.
    pub cpu: bool,
    /// Explicit device names; when non-empty only these are monitored.
    pub name_filter: Vec<String>,
    /// Maximum number of registered devices.
    pub capacity: usize,
    /// Scheduler ticks per second used to turn CPU ticks into milliseconds.
    pub clock_ticks: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            show_whole_device: true,
            show_partitions: false,
            extended: false,
            utilization: false,
            cpu: false,
            name_filter: Vec::new(),
            capacity: DEFAULT_CAPACITY,
            clock_ticks: DEFAULT_CLOCK_TICKS,
        }
    }
}

impl ReportConfig {
    /// Sets the explicit device name filter.
    pub fn with_devices<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_filter = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the registry capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_classic_tool() {
        let cfg = ReportConfig::default();
        assert!(cfg.show_whole_device);
        assert!(!cfg.show_partitions);
        assert_eq!(cfg.capacity, 64);
        assert_eq!(cfg.clock_ticks, 100);
        assert!(cfg.name_filter.is_empty());
    }

    #[test]
    fn builders_set_filter_and_capacity() {
        let cfg = ReportConfig::default()
            .with_devices(["sdb", "sda"])
            .with_capacity(2);
        assert_eq!(cfg.name_filter, vec!["sdb".to_string(), "sda".to_string()]);
        assert_eq!(cfg.capacity, 2);
    }
}
