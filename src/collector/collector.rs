//! Main collector: device discovery at start-up and counter sampling per tick.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::collector::abi::CounterAbi;
use crate::collector::error::{ConfigError, SourceReadError};
use crate::collector::procfs::parser::{count_processors, parse_stat};
use crate::collector::registry::{DeviceRegistry, Visibility};
use crate::collector::traits::FileSystem;
use crate::config::ReportConfig;
use crate::storage::model::{DeviceId, RawCpuCounters, Sample};

/// Reads block device and CPU counters for a fixed set of devices.
///
/// The counter layout, processor count and device registry are fixed at
/// [`Collector::open`]; every [`Collector::read_all`] re-reads the files
/// from the beginning.
pub struct Collector<F: FileSystem> {
    fs: F,
    proc_path: String,
    abi: CounterAbi,
    cpu_count: usize,
    registry: DeviceRegistry,
}

impl<F: FileSystem> Collector<F> {
    /// Detects the counter layout, counts processors and builds the registry.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `config` - Name filter, visibility flags and registry capacity
    pub fn open(
        fs: F,
        proc_path: impl Into<String>,
        config: &ReportConfig,
    ) -> Result<Self, ConfigError> {
        let proc_path = proc_path.into();

        let cpuinfo_path = PathBuf::from(format!("{}/cpuinfo", proc_path));
        let cpuinfo = fs
            .read_to_string(&cpuinfo_path)
            .map_err(|source| ConfigError::Unreadable {
                path: cpuinfo_path.clone(),
                source,
            })?;
        let cpu_count = count_processors(&cpuinfo);
        if cpu_count == 0 {
            return Err(ConfigError::NoProcessors);
        }

        let abi = CounterAbi::detect(&fs, &proc_path)?;
        let source = abi.source_path(&proc_path);
        let content = read_source(&fs, &source)?;

        let visibility = Visibility {
            show_whole_device: config.show_whole_device,
            show_partitions: config.show_partitions,
        };
        let registry = DeviceRegistry::discover(
            content.lines().filter_map(|line| abi.discovery_record(line)),
            &config.name_filter,
            visibility,
            config.capacity,
        )?;

        info!(
            "counter layout {} ({}), {} cpus, {} devices",
            abi.version(),
            source.display(),
            cpu_count,
            registry.len()
        );

        Ok(Self {
            fs,
            proc_path,
            abi,
            cpu_count,
            registry,
        })
    }

    pub fn abi(&self) -> CounterAbi {
        self.abi
    }

    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Reads counters for all registered devices and the CPU.
    ///
    /// Lines of unknown shape and devices outside the registry are skipped.
    pub fn read_all(&self) -> Result<Sample, SourceReadError> {
        let start = Instant::now();

        let source = self.abi.source_path(&self.proc_path);
        let content = read_source(&self.fs, &source)?;

        let mut sample = Sample::default();
        for line in content.lines() {
            let Some(rec) = self.abi.parse_line(line) else {
                continue;
            };
            let id = DeviceId::new(rec.major, rec.minor);
            if !self.registry.contains(id) {
                continue;
            }
            match self.abi.device_counters(&rec) {
                Some(counters) => {
                    sample.devices.insert(id, counters);
                }
                None => trace!("ignoring {} record with {} fields", rec.name, rec.values.len()),
            }
        }

        sample.cpu = self.read_cpu()?;

        debug!(
            "read {} of {} devices in {:?}",
            sample.devices.len(),
            self.registry.len(),
            start.elapsed()
        );

        Ok(sample)
    }

    fn read_cpu(&self) -> Result<RawCpuCounters, SourceReadError> {
        let path = PathBuf::from(format!("{}/stat", self.proc_path));
        let content = read_source(&self.fs, &path)?;
        parse_stat(&content).map_err(|source| SourceReadError::Malformed { path, source })
    }
}

fn read_source<F: FileSystem>(fs: &F, path: &Path) -> Result<String, SourceReadError> {
    fs.read_to_string(path)
        .map_err(|source| SourceReadError::Io {
            path: path.to_path_buf(),
            source,
        })
}
