//! Report rendering: fixed-width columns for terminals, JSON lines for tools.
//!
//! Pure formatting over [`IntervalReport`]; nothing here touches counters.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::collector::{CounterAbi, DeviceRegistry};
use crate::config::ReportConfig;
use crate::rates::{CpuRate, IntervalReport};

/// Non-extended reports repeat the header every this many lines.
pub const HEADER_PERIOD: usize = 21;

const EXTENDED_CAPTION: &str = "extended device statistics                       ";
const EXTENDED_COLUMNS: &str =
    "device mgr/s mgw/s    r/s    w/s    kr/s    kw/s   size queue   wait svc_t  %b ";

/// Which column set to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// kps, tps, svc_t per device on one line.
    Basic,
    /// r/s, w/s, %b per device on one line.
    Utilization,
    /// One line per device with every rate.
    Extended,
}

impl Layout {
    pub fn from_config(config: &ReportConfig) -> Self {
        if config.extended {
            Layout::Extended
        } else if config.utilization {
            Layout::Utilization
        } else {
            Layout::Basic
        }
    }
}

/// Stateful column renderer; tracks when the header is due.
#[derive(Debug, Clone)]
pub struct Renderer {
    layout: Layout,
    cpu: bool,
    abi: CounterAbi,
    names: Vec<String>,
    lineno: usize,
}

impl Renderer {
    pub fn new(config: &ReportConfig, abi: CounterAbi, registry: &DeviceRegistry) -> Self {
        Self {
            layout: Layout::from_config(config),
            cpu: config.cpu,
            abi,
            names: registry.iter().map(|d| d.name.clone()).collect(),
            lineno: 0,
        }
    }

    /// Output for the baseline sample: the header only.
    ///
    /// The extended layout prints its header with every interval, so the
    /// baseline prints nothing there.
    pub fn render_baseline(&mut self) -> String {
        let out = if self.layout == Layout::Extended {
            String::new()
        } else {
            self.header()
        };
        self.advance();
        out
    }

    /// Output for one computed interval, header included when due.
    pub fn render(&mut self, report: &IntervalReport) -> String {
        let mut out = String::new();
        if self.lineno == 0 || self.layout == Layout::Extended {
            out.push_str(&self.header());
        }

        match self.layout {
            Layout::Extended => {
                for (idx, dev) in report.devices.iter().enumerate() {
                    let r = &dev.rate;
                    let _ = write!(
                        out,
                        "{:<6} {:5.0} {:5.0} {:6.1} {:6.1} {:7.1} {:7.1} {:6.1} {:5.1} {:6.1} {:5.1} {:3.0} ",
                        dev.device.name,
                        r.merge_rate_read,
                        r.merge_rate_write,
                        r.iops_read,
                        r.iops_write,
                        r.kbs_read,
                        r.kbs_write,
                        r.avg_request_size_kb,
                        r.avg_queue_length,
                        r.avg_wait_ms,
                        r.avg_service_time_ms,
                        r.percent_busy,
                    );
                    if idx == 0
                        && let Some(cpu) = &report.cpu
                    {
                        out.push_str(&cpu_columns(cpu));
                    }
                    out.push('\n');
                }
                if report.devices.is_empty()
                    && let Some(cpu) = &report.cpu
                {
                    out.push_str(&cpu_columns(cpu));
                    out.push('\n');
                }
            }
            Layout::Utilization | Layout::Basic => {
                for dev in &report.devices {
                    let r = &dev.rate;
                    if self.layout == Layout::Utilization {
                        let _ = write!(
                            out,
                            "{:4.0} {:4.0} {:4.0}  ",
                            r.iops_read, r.iops_write, r.percent_busy
                        );
                    } else {
                        let _ = write!(
                            out,
                            "{:5.0} {:3.0} {:5.1} ",
                            r.kbs_total, r.iops_total, r.avg_service_time_ms
                        );
                    }
                }
                if let Some(cpu) = &report.cpu {
                    out.push_str(&cpu_columns(cpu));
                }
                out.push('\n');
            }
        }

        self.advance();
        out
    }

    fn advance(&mut self) {
        self.lineno = (self.lineno + 1) % HEADER_PERIOD;
    }

    /// The two header lines.
    pub fn header(&self) -> String {
        let mut out = String::new();

        if self.layout == Layout::Extended {
            let _ = write!(out, "{:>78}", EXTENDED_CAPTION);
        } else {
            for name in &self.names {
                let _ = write!(out, "{:>9}       ", name);
            }
        }
        if self.cpu {
            out.push_str("      cpu");
        }
        out.push('\n');

        match self.layout {
            Layout::Extended => out.push_str(EXTENDED_COLUMNS),
            Layout::Utilization => {
                for _ in &self.names {
                    out.push_str(" r/s  w/s   %b  ");
                }
            }
            Layout::Basic => {
                for _ in &self.names {
                    out.push_str("  kps tps svc_t ");
                }
            }
        }
        if self.cpu {
            out.push_str(match self.abi {
                CounterAbi::Legacy => " us  sy  id",
                CounterAbi::Modern => " us  sy  wt  id",
            });
        }
        out.push('\n');

        out
    }
}

fn cpu_columns(cpu: &CpuRate) -> String {
    let mut out = format!("{:3.0} {:3.0} ", cpu.percent_user, cpu.percent_system);
    if let Some(iowait) = cpu.percent_iowait {
        let _ = write!(out, "{:3.0} ", iowait);
    }
    let _ = write!(out, "{:3.0}", cpu.percent_idle);
    out
}

#[derive(Serialize)]
struct JsonInterval<'a> {
    timestamp: String,
    abi: CounterAbi,
    #[serde(flatten)]
    report: &'a IntervalReport,
}

/// One JSON object for an interval, without a trailing newline.
pub fn render_json(
    report: &IntervalReport,
    abi: CounterAbi,
    at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&JsonInterval {
        timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
        abi,
        report,
    })
}
