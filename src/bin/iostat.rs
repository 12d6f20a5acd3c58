//! iostat - block device and CPU utilization report.
//!
//! Samples /proc counters every INTERVAL seconds and prints per-device
//! throughput and CPU percentages for each elapsed interval.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use iostat::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use iostat::collector::mock::MockFs;
use iostat::collector::{Collector, FileSystem, SourceReadError};
use iostat::config::{DEFAULT_CAPACITY, DEFAULT_CLOCK_TICKS, ReportConfig};
use iostat::fmt::{Renderer, render_json};
use iostat::rates::{RateCalculator, RateContext};
use iostat::storage::SampleStore;

/// Block device and CPU utilization report.
#[derive(Parser, Debug)]
#[command(name = "iostat", version, about = "Report block device and CPU statistics")]
struct Args {
    /// Print CPU usage.
    #[arg(short = 'c')]
    cpu: bool,

    /// Print basic disk info (kps, tps, svc_t).
    #[arg(short = 'd', overrides_with = "utilization")]
    disk: bool,

    /// Print disk utilization (r/s, w/s, %b).
    #[arg(short = 'D', overrides_with = "disk")]
    utilization: bool,

    /// Print partitions as well as whole disks.
    #[arg(short = 'p')]
    partitions: bool,

    /// Print partitions only.
    #[arg(short = 'P')]
    partitions_only: bool,

    /// Print extended disk statistics.
    #[arg(short = 'x')]
    extended: bool,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, env = "IOSTAT_PROC_PATH", default_value = "/proc")]
    proc_path: String,

    /// Maximum number of monitored devices.
    #[arg(long, env = "IOSTAT_MAX_DEVICES", default_value_t = DEFAULT_CAPACITY)]
    max_devices: usize,

    /// Scheduler ticks per second of /proc/stat (USER_HZ).
    #[arg(long, env = "IOSTAT_CLOCK_TICKS", default_value_t = DEFAULT_CLOCK_TICKS)]
    clock_ticks: u64,

    /// Print one JSON object per interval instead of columns.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,

    /// [DEVICE...] [INTERVAL [COUNT]]
    #[arg(value_name = "OPERAND")]
    operands: Vec<String>,
}

impl Args {
    fn any_report_flag(&self) -> bool {
        self.cpu
            || self.disk
            || self.utilization
            || self.partitions
            || self.partitions_only
            || self.extended
    }
}

/// Positional operands after splitting.
#[derive(Debug, Default, PartialEq, Eq)]
struct Operands {
    devices: Vec<String>,
    interval: Option<u64>,
    count: Option<u64>,
}

/// Splits `[DEVICE...] [INTERVAL [COUNT]]`.
///
/// Leading operands that do not start with a digit are device names.
fn split_operands(operands: &[String]) -> Result<Operands, String> {
    let n_devices = operands
        .iter()
        .take_while(|op| !op.starts_with(|c: char| c.is_ascii_digit()))
        .count();
    let (devices, numbers) = operands.split_at(n_devices);

    if numbers.len() > 2 {
        return Err(format!("unexpected operand '{}'", numbers[2]));
    }

    let mut parsed = Vec::with_capacity(numbers.len());
    for op in numbers {
        let n = op
            .parse::<u64>()
            .map_err(|_| format!("invalid number '{}'", op))?;
        parsed.push(n);
    }

    let interval = parsed.first().copied();
    let count = parsed.get(1).copied();
    if interval == Some(0) {
        return Err("interval must be at least 1 second".to_string());
    }
    if count == Some(0) {
        return Err("count must be at least 1".to_string());
    }

    Ok(Operands {
        devices: devices.to_vec(),
        interval,
        count,
    })
}

/// Builds the report configuration from flags and device operands.
fn report_config(args: &Args, devices: Vec<String>) -> ReportConfig {
    ReportConfig {
        show_whole_device: !args.partitions_only,
        show_partitions: args.partitions || args.partitions_only,
        extended: args.extended,
        utilization: args.utilization,
        cpu: args.cpu || !args.any_report_flag(),
        name_filter: devices,
        capacity: args.max_devices,
        clock_ticks: args.clock_ticks,
    }
}

/// Sampling schedule: seconds between samples and reported interval limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Schedule {
    interval: Duration,
    /// `None` repeats until interrupted.
    reports: Option<u64>,
}

impl Schedule {
    fn from_operands(ops: &Operands) -> Self {
        let reports = match (ops.interval, ops.count) {
            (None, _) => Some(1),
            (Some(_), count) => count,
        };
        Self {
            interval: Duration::from_secs(ops.interval.unwrap_or(1)),
            reports,
        }
    }
}

/// Initializes the tracing subscriber on stderr; stdout carries the report.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("iostat={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fatal(err: &dyn std::error::Error) -> ! {
    error!("{}", err);
    eprintln!("iostat: {}", err);
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let operands = match split_operands(&args.operands) {
        Ok(ops) => ops,
        Err(msg) => Args::command().error(ErrorKind::ValueValidation, msg).exit(),
    };
    let schedule = Schedule::from_operands(&operands);
    let config = report_config(&args, operands.devices);

    info!("iostat {} starting", env!("CARGO_PKG_VERSION"));
    debug!("config: {:?}, schedule: {:?}", config, schedule);

    #[cfg(target_os = "linux")]
    let fs = RealFs::new();
    #[cfg(not(target_os = "linux"))]
    let fs = MockFs::modern_system();

    let collector = match Collector::open(fs, args.proc_path.as_str(), &config) {
        Ok(c) => c,
        Err(e) => fatal(&e),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut reporter = Reporter::new(&collector, &config, args.json);
    run(&mut reporter, schedule, &running, &mut std::io::stdout().lock());
}

/// Outcome of one sampling tick.
#[derive(Debug, PartialEq)]
enum Tick {
    /// First sample; carries the header when one is printed.
    Baseline(Option<String>),
    /// A computed interval, ready to print.
    Report(String),
    /// The interval could not be computed; nothing is printed.
    Skipped,
}

/// Per-tick pipeline: read, store, compute, render.
struct Reporter<'a, F: FileSystem> {
    collector: &'a Collector<F>,
    calculator: RateCalculator,
    renderer: Renderer,
    store: SampleStore,
    json: bool,
}

impl<'a, F: FileSystem> Reporter<'a, F> {
    fn new(collector: &'a Collector<F>, config: &ReportConfig, json: bool) -> Self {
        let ctx = RateContext::new(collector.cpu_count(), config.clock_ticks, collector.abi());
        Self {
            collector,
            calculator: RateCalculator::new(ctx, config.cpu),
            renderer: Renderer::new(config, collector.abi(), collector.registry()),
            store: SampleStore::new(),
            json,
        }
    }

    fn tick(&mut self) -> Result<Tick, SourceReadError> {
        let sample = self.collector.read_all()?;
        self.store.advance(sample);

        let Some((previous, current)) = self.store.pair() else {
            let header = (!self.json).then(|| self.renderer.render_baseline());
            return Ok(Tick::Baseline(header));
        };

        let report = match self
            .calculator
            .compute(self.collector.registry(), previous, current)
        {
            Ok(report) => report,
            Err(e) => {
                warn!("Skipping interval: {}", e);
                return Ok(Tick::Skipped);
            }
        };

        if !self.json {
            return Ok(Tick::Report(self.renderer.render(&report)));
        }
        match render_json(&report, self.collector.abi(), Utc::now()) {
            Ok(line) => Ok(Tick::Report(line + "\n")),
            Err(e) => {
                warn!("Skipping interval: {}", e);
                Ok(Tick::Skipped)
            }
        }
    }
}

/// Polling loop: tick, print, sleep. Returns the number of reported intervals.
///
/// Only computed intervals count toward the schedule limit.
fn run<F: FileSystem, W: Write>(
    reporter: &mut Reporter<'_, F>,
    schedule: Schedule,
    running: &AtomicBool,
    out: &mut W,
) -> u64 {
    let mut reported: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let text = match reporter.tick() {
            Ok(Tick::Baseline(header)) => header,
            Ok(Tick::Report(text)) => {
                reported += 1;
                Some(text)
            }
            Ok(Tick::Skipped) => None,
            Err(e) => fatal(&e),
        };

        if let Some(text) = text
            && let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush())
        {
            debug!("stdout closed: {}", e);
            break;
        }

        if schedule.reports.is_some_and(|limit| reported >= limit) {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = schedule.interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    debug!("{} intervals reported", reported);
    reported
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(target_os = "linux")]
    use iostat::collector::MockFs;

    fn ops(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn parse(items: &[&str]) -> Args {
        let mut argv = vec!["iostat"];
        argv.extend_from_slice(items);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_split_operands_devices_and_numbers() {
        let parsed = split_operands(&ops(&["sda", "hdb", "5", "3"])).unwrap();
        assert_eq!(parsed.devices, vec!["sda", "hdb"]);
        assert_eq!(parsed.interval, Some(5));
        assert_eq!(parsed.count, Some(3));
    }

    #[test]
    fn test_split_operands_empty() {
        assert_eq!(split_operands(&[]).unwrap(), Operands::default());
    }

    #[test]
    fn test_split_operands_rejects_extra_numbers() {
        assert!(split_operands(&ops(&["1", "2", "3"])).is_err());
    }

    #[test]
    fn test_split_operands_rejects_name_after_number() {
        assert!(split_operands(&ops(&["2", "sda"])).is_err());
    }

    #[test]
    fn test_split_operands_rejects_zero_interval() {
        assert!(split_operands(&ops(&["0"])).is_err());
        assert!(split_operands(&ops(&["1", "0"])).is_err());
    }

    #[test]
    fn test_schedule() {
        let once = Schedule::from_operands(&Operands::default());
        assert_eq!(once.interval, Duration::from_secs(1));
        assert_eq!(once.reports, Some(1));

        let forever = Schedule::from_operands(&split_operands(&ops(&["2"])).unwrap());
        assert_eq!(forever.interval, Duration::from_secs(2));
        assert_eq!(forever.reports, None);

        let bounded = Schedule::from_operands(&split_operands(&ops(&["2", "5"])).unwrap());
        assert_eq!(bounded.reports, Some(5));
    }

    #[test]
    fn test_no_flags_enables_cpu() {
        let args = parse(&[]);
        let config = report_config(&args, Vec::new());
        assert!(config.cpu);
        assert!(config.show_whole_device);
        assert!(!config.show_partitions);
        assert!(!config.utilization);
    }

    #[test]
    fn test_disk_flag_disables_default_cpu() {
        let args = parse(&["-d"]);
        let config = report_config(&args, Vec::new());
        assert!(!config.cpu);

        let args = parse(&["-d", "-c"]);
        assert!(report_config(&args, Vec::new()).cpu);
    }

    #[test]
    fn test_last_of_d_and_upper_d_wins() {
        let args = parse(&["-d", "-D"]);
        assert!(report_config(&args, Vec::new()).utilization);

        let args = parse(&["-D", "-d"]);
        assert!(!report_config(&args, Vec::new()).utilization);
    }

    #[test]
    fn test_partition_flags() {
        let config = report_config(&parse(&["-p"]), Vec::new());
        assert!(config.show_whole_device);
        assert!(config.show_partitions);

        let config = report_config(&parse(&["-P"]), Vec::new());
        assert!(!config.show_whole_device);
        assert!(config.show_partitions);
    }

    #[test]
    fn test_operands_and_options() {
        let args = parse(&["-x", "--max-devices", "8", "--clock-ticks", "250", "sda", "1", "2"]);
        let operands = split_operands(&args.operands).unwrap();
        let config = report_config(&args, operands.devices);
        assert!(config.extended);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.clock_ticks, 250);
        assert_eq!(config.name_filter, vec!["sda"]);
    }

    fn open_mock(config: &ReportConfig) -> (Collector<MockFs>, MockFs) {
        let fs = MockFs::modern_system();
        let handle = fs.clone();
        (Collector::open(fs, "/proc", config).unwrap(), handle)
    }

    #[test]
    fn test_tick_baseline_then_report() {
        let config = ReportConfig::default().with_devices(["sda"]);
        let (collector, handle) = open_mock(&config);
        let mut reporter = Reporter::new(&collector, &config, false);

        match reporter.tick().unwrap() {
            Tick::Baseline(Some(header)) => assert!(header.contains("sda")),
            other => panic!("expected header, got {:?}", other),
        }

        handle.add_file("/proc/stat", "cpu  10100 500 3100 80200 1000 200 100 0 0 0\n");
        match reporter.tick().unwrap() {
            Tick::Report(text) => assert!(text.ends_with('\n')),
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_tick_skips_interval_without_cpu_ticks() {
        let config = ReportConfig::default();
        let (collector, _handle) = open_mock(&config);
        let mut reporter = Reporter::new(&collector, &config, false);

        reporter.tick().unwrap();
        assert_eq!(reporter.tick().unwrap(), Tick::Skipped);
    }

    #[test]
    fn test_tick_json_has_no_baseline_output() {
        let config = ReportConfig::default();
        let (collector, handle) = open_mock(&config);
        let mut reporter = Reporter::new(&collector, &config, true);

        assert_eq!(reporter.tick().unwrap(), Tick::Baseline(None));
        handle.add_file("/proc/stat", "cpu  10100 500 3100 80200 1000 200 100 0 0 0\n");
        match reporter.tick().unwrap() {
            Tick::Report(line) => assert!(line.starts_with("{\"timestamp\"")),
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_run_does_not_count_skipped_intervals() {
        let config = ReportConfig::default();
        let (collector, _handle) = open_mock(&config);
        let mut reporter = Reporter::new(&collector, &config, false);

        // Baseline first; every later tick pairs with it.
        reporter.tick().unwrap();
        let schedule = Schedule {
            interval: Duration::ZERO,
            reports: Some(1),
        };
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        // Unchanged counters: every interval is skipped and never counted,
        // so only the shutdown flag ends the loop.
        let reported = std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(Duration::from_millis(200));
                running.store(false, Ordering::SeqCst);
            });
            run(&mut reporter, schedule, &running, &mut out)
        });

        assert_eq!(reported, 0);
        assert!(out.is_empty());
    }
}
