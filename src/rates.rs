//! Per-interval delta and rate computation.
//!
//! Rates are derived from two consecutive [`Sample`]s. The interval length
//! is not taken from a wall clock: it is derived from the CPU tick delta
//! of the same two samples, so device rates and CPU percentages always
//! describe exactly the same span even if the polling loop was delayed.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::collector::{CounterAbi, DeviceIdentity, DeviceRegistry};
use crate::storage::model::{RawCpuCounters, RawDeviceCounters, Sample};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Counter delta; a regression (device reset) counts as no activity.
pub fn delta(curr: u64, prev: u64) -> u64 {
    curr.saturating_sub(prev)
}

fn device_delta(prev: &RawDeviceCounters, curr: &RawDeviceCounters) -> RawDeviceCounters {
    RawDeviceCounters {
        read_ios: delta(curr.read_ios, prev.read_ios),
        read_merges: delta(curr.read_merges, prev.read_merges),
        read_sectors: delta(curr.read_sectors, prev.read_sectors),
        read_ticks_ms: delta(curr.read_ticks_ms, prev.read_ticks_ms),
        write_ios: delta(curr.write_ios, prev.write_ios),
        write_merges: delta(curr.write_merges, prev.write_merges),
        write_sectors: delta(curr.write_sectors, prev.write_sectors),
        write_ticks_ms: delta(curr.write_ticks_ms, prev.write_ticks_ms),
        io_ticks_ms: delta(curr.io_ticks_ms, prev.io_ticks_ms),
        queue_time_ms: delta(curr.queue_time_ms, prev.queue_time_ms),
    }
}

fn cpu_delta(prev: &RawCpuCounters, curr: &RawCpuCounters) -> RawCpuCounters {
    RawCpuCounters {
        user_ticks: delta(curr.user_ticks, prev.user_ticks),
        system_ticks: delta(curr.system_ticks, prev.system_ticks),
        idle_ticks: delta(curr.idle_ticks, prev.idle_ticks),
        iowait_ticks: delta(curr.iowait_ticks, prev.iowait_ticks),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An interval for which no rates can be computed.
///
/// Not fatal: the caller skips output for the interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComputeError {
    /// Processor count of zero.
    NoProcessors,
    /// Clock tick rate of zero.
    ZeroClockRate,
    /// No CPU ticks elapsed, or a non-positive interval was supplied.
    NonPositiveElapsed { elapsed_ms: f64 },
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::NoProcessors => write!(f, "processor count is zero"),
            ComputeError::ZeroClockRate => write!(f, "clock tick rate is zero"),
            ComputeError::NonPositiveElapsed { elapsed_ms } => {
                write!(f, "non-positive interval ({} ms)", elapsed_ms)
            }
        }
    }
}

impl std::error::Error for ComputeError {}

fn check_elapsed(elapsed_ms: f64) -> Result<(), ComputeError> {
    if elapsed_ms > 0.0 && elapsed_ms.is_finite() {
        Ok(())
    } else {
        Err(ComputeError::NonPositiveElapsed { elapsed_ms })
    }
}

// ---------------------------------------------------------------------------
// Rate records
// ---------------------------------------------------------------------------

/// Rates of one device over one interval.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DeviceRate {
    /// Read merges per second.
    pub merge_rate_read: f64,
    /// Write merges per second.
    pub merge_rate_write: f64,
    pub iops_read: f64,
    pub iops_write: f64,
    /// KiB read per second.
    pub kbs_read: f64,
    /// KiB written per second.
    pub kbs_write: f64,
    /// Read plus write requests per second.
    pub iops_total: f64,
    /// KiB transferred per second.
    pub kbs_total: f64,
    /// Average KiB per request.
    pub avg_request_size_kb: f64,
    pub avg_queue_length: f64,
    /// Average queue plus service time per request.
    pub avg_wait_ms: f64,
    /// Average busy time per request.
    pub avg_service_time_ms: f64,
    /// Share of the interval with at least one request outstanding, 0..=100.
    pub percent_busy: f64,
}

/// System-wide CPU time split over one interval, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CpuRate {
    pub percent_user: f64,
    pub percent_system: f64,
    /// `None` when the counter layout has no iowait accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_iowait: Option<f64>,
    pub percent_idle: f64,
}

/// Computes device rates from two counter generations.
///
/// Fails when `elapsed_ms` is not positive.
pub fn device_rate(
    prev: &RawDeviceCounters,
    curr: &RawDeviceCounters,
    elapsed_ms: f64,
) -> Result<DeviceRate, ComputeError> {
    check_elapsed(elapsed_ms)?;

    let d = device_delta(prev, curr);
    let per_sec = |x: f64| 1000.0 * x / elapsed_ms;

    // Summed in f64: each delta alone may span the full u64 range.
    let n_ios = d.read_ios as f64 + d.write_ios as f64;
    let n_ticks = d.read_ticks_ms as f64 + d.write_ticks_ms as f64;
    let n_kbytes = (d.read_sectors as f64 + d.write_sectors as f64) / 2.0;
    let per_io = |x: f64| if n_ios > 0.0 { x / n_ios } else { 0.0 };

    Ok(DeviceRate {
        merge_rate_read: per_sec(d.read_merges as f64),
        merge_rate_write: per_sec(d.write_merges as f64),
        iops_read: per_sec(d.read_ios as f64),
        iops_write: per_sec(d.write_ios as f64),
        kbs_read: per_sec(d.read_sectors as f64) / 2.0,
        kbs_write: per_sec(d.write_sectors as f64) / 2.0,
        iops_total: per_sec(n_ios),
        kbs_total: per_sec(n_kbytes),
        avg_request_size_kb: per_io(n_kbytes),
        avg_queue_length: d.queue_time_ms as f64 / elapsed_ms,
        avg_wait_ms: per_io(n_ticks),
        avg_service_time_ms: per_io(d.io_ticks_ms as f64),
        percent_busy: (100.0 * d.io_ticks_ms as f64 / elapsed_ms).clamp(0.0, 100.0),
    })
}

/// Computes the CPU time split between two samples.
///
/// Fails when no ticks elapsed.
pub fn cpu_rate(
    prev: &RawCpuCounters,
    curr: &RawCpuCounters,
    reports_iowait: bool,
) -> Result<CpuRate, ComputeError> {
    let d = cpu_delta(prev, curr);
    let total = d.total();
    if total == 0 {
        return Err(ComputeError::NonPositiveElapsed { elapsed_ms: 0.0 });
    }
    let pct = |x: u64| 100.0 * x as f64 / total as f64;

    Ok(CpuRate {
        percent_user: pct(d.user_ticks),
        percent_system: pct(d.system_ticks),
        percent_iowait: reports_iowait.then(|| pct(d.iowait_ticks)),
        percent_idle: pct(d.idle_ticks),
    })
}

// ---------------------------------------------------------------------------
// Interval computation
// ---------------------------------------------------------------------------

/// Platform facts the calculation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateContext {
    pub cpu_count: usize,
    /// Scheduler ticks per second (USER_HZ).
    pub clock_ticks: u64,
    pub abi: CounterAbi,
}

impl RateContext {
    pub fn new(cpu_count: usize, clock_ticks: u64, abi: CounterAbi) -> Self {
        Self {
            cpu_count,
            clock_ticks,
            abi,
        }
    }

    /// Interval length in milliseconds, derived from the CPU tick delta.
    ///
    /// Ticks are summed over all processors, so the total is divided by
    /// the processor count.
    pub fn elapsed_ms(
        &self,
        prev: &RawCpuCounters,
        curr: &RawCpuCounters,
    ) -> Result<f64, ComputeError> {
        if self.cpu_count == 0 {
            return Err(ComputeError::NoProcessors);
        }
        if self.clock_ticks == 0 {
            return Err(ComputeError::ZeroClockRate);
        }

        let ticks = cpu_delta(prev, curr).total();
        let elapsed_ms = 1000.0 * ticks as f64 / self.cpu_count as f64 / self.clock_ticks as f64;
        check_elapsed(elapsed_ms)?;
        Ok(elapsed_ms)
    }
}

/// Rates of one registered device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    #[serde(flatten)]
    pub device: DeviceIdentity,
    #[serde(flatten)]
    pub rate: DeviceRate,
}

/// Everything computed for one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalReport {
    pub elapsed_ms: f64,
    /// One entry per registered device, in registry order.
    pub devices: Vec<DeviceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuRate>,
}

/// Turns two samples into an [`IntervalReport`].
#[derive(Debug, Clone, Copy)]
pub struct RateCalculator {
    ctx: RateContext,
    report_cpu: bool,
}

impl RateCalculator {
    pub fn new(ctx: RateContext, report_cpu: bool) -> Self {
        Self { ctx, report_cpu }
    }

    /// Computes rates for every registered device and, if enabled, the CPU.
    ///
    /// A device missing from either sample reports zero rates.
    pub fn compute(
        &self,
        registry: &DeviceRegistry,
        previous: &Sample,
        current: &Sample,
    ) -> Result<IntervalReport, ComputeError> {
        let elapsed_ms = self.ctx.elapsed_ms(&previous.cpu, &current.cpu)?;

        let mut devices = Vec::with_capacity(registry.len());
        for device in registry.iter() {
            let rate = match (previous.device(device.id), current.device(device.id)) {
                (Some(prev), Some(curr)) => device_rate(prev, curr, elapsed_ms)?,
                _ => {
                    trace!("{} missing from sample, reporting idle", device.name);
                    DeviceRate::default()
                }
            };
            devices.push(DeviceReport {
                device: device.clone(),
                rate,
            });
        }

        let cpu = if self.report_cpu {
            Some(cpu_rate(
                &previous.cpu,
                &current.cpu,
                self.ctx.abi.reports_iowait(),
            )?)
        } else {
            None
        };

        Ok(IntervalReport {
            elapsed_ms,
            devices,
            cpu,
        })
    }
}
