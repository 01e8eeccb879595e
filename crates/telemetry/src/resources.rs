//! Process memory and CPU sampling.
//!
//! Reads `/proc/self/status` and `/proc/self/stat`. On platforms without
//! procfs every sample is empty and the gauges stay at zero.

use std::time::{Duration, Instant};

use crate::metrics::metrics;

/// Clock ticks per second in `/proc/<pid>/stat` (`USER_HZ`).
///
/// This is part of the procfs ABI and stays 100 whatever the kernel's
/// internal `HZ` is. Resident memory comes from `VmRSS` in kilobytes, so
/// no page size is involved.
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// One resource reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    pub memory_bytes: Option<u64>,
    pub cpu_percent: Option<f64>,
}

/// Samples process resources and publishes them as gauges.
///
/// CPU usage needs two readings, so the first sample only reports memory.
#[derive(Debug, Default)]
pub struct ResourceSampler {
    last_cpu: Option<(Instant, u64)>,
}

impl ResourceSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reading and updates `memory_bytes` and `cpu_usage_basis_points`.
    pub fn sample(&mut self) -> ResourceSample {
        let memory_bytes = std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| parse_status_resident(&s));

        let now = Instant::now();
        let ticks = std::fs::read_to_string("/proc/self/stat")
            .ok()
            .and_then(|s| parse_stat_cpu_ticks(&s));

        let cpu_percent = match (self.last_cpu, ticks) {
            (Some((then, before)), Some(after)) => {
                cpu_percent(after.saturating_sub(before), now.duration_since(then))
            }
            _ => None,
        };
        if let Some(ticks) = ticks {
            self.last_cpu = Some((now, ticks));
        }

        if let Some(bytes) = memory_bytes {
            metrics().memory_bytes.set(bytes);
        }
        if let Some(pct) = cpu_percent {
            metrics()
                .cpu_usage_basis_points
                .set((pct * 100.0).round() as u64);
        }

        ResourceSample {
            memory_bytes,
            cpu_percent,
        }
    }
}

/// Resident set size in bytes from the `VmRSS:` line of `status`.
pub fn parse_status_resident(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => value.checked_mul(1024),
        Some(_) => None,
    }
}

/// User plus system CPU ticks from a `stat` line.
///
/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`.
pub fn parse_stat_cpu_ticks(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    // utime and stime are fields 14 and 15; `rest` starts at field 3
    let utime: u64 = fields.nth(11)?.parse().ok()?;
    let stime: u64 = fields.next()?.parse().ok()?;
    Some(utime + stime)
}

/// CPU percentage for `ticks` spent over `elapsed` wall time.
pub fn cpu_percent(ticks: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some(ticks as f64 / CLOCK_TICKS_PER_SEC / secs * 100.0)
}
