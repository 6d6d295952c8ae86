//! Delta-based CPU and memory usage sampling.
//!
//! CPU counters are cumulative since boot, so a usage percentage needs two
//! reads: the [`Sampler`] keeps the previous [`CounterSnapshot`] and diffs the
//! current read against it on every call. The first call only establishes the
//! baseline and reports CPU as unavailable.
//!
//! A counter that went backwards (wraparound or reset) or a zero-length delta
//! makes CPU unavailable for that tick. The snapshot is replaced either way so
//! the next tick computes a valid delta again.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use crate::source::{CounterSource, CpuCounters, MemoryCounters};

/// CPU counters captured at one instant.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub cpu: CpuCounters,
    pub captured_at: Instant,
}

/// Everything derived from one sampler call.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// System-wide CPU usage in percent, `None` when unavailable.
    pub cpu: Option<f64>,
    /// CPU usage of this process in percent of all cores, `None` when unavailable.
    pub cpu_process: Option<f64>,
    /// Raw memory counters, `None` when the memory query failed.
    pub memory: Option<MemoryCounters>,
    /// Time between the previous snapshot and this one.
    pub elapsed: Option<std::time::Duration>,
}

impl Sample {
    /// Physical memory usage in percent.
    pub fn ram(&self) -> Option<f64> {
        self.memory
            .and_then(|m| ram_percent(m.total_bytes, m.free_bytes))
    }

    /// RAM + swap usage in percent.
    pub fn virtual_ram(&self) -> Option<f64> {
        self.memory.and_then(|m| {
            ram_percent(
                m.total_bytes.saturating_add(m.swap_total_bytes),
                m.free_bytes.saturating_add(m.swap_free_bytes),
            )
        })
    }
}

/// Computes system CPU usage from two cumulative counter reads.
///
/// Returns `None` when any counter decreased or no ticks elapsed. Only the
/// aggregated idle, total and busy counters are compared, so a single state
/// (user, nice, system) going backwards while another advances further is
/// not detected.
pub fn cpu_percent(previous: &CpuCounters, current: &CpuCounters) -> Option<f64> {
    let previous_busy = previous.total_ticks.checked_sub(previous.idle_ticks)?;
    let current_busy = current.total_ticks.checked_sub(current.idle_ticks)?;

    if current.total_ticks < previous.total_ticks
        || current.idle_ticks < previous.idle_ticks
        || current_busy < previous_busy
    {
        return None;
    }

    let total_delta = current.total_ticks - previous.total_ticks;
    if total_delta == 0 {
        return None;
    }
    let idle_delta = current.idle_ticks - previous.idle_ticks;
    let busy_delta = total_delta.saturating_sub(idle_delta);

    Some(clamp_percent(100.0 * busy_delta as f64 / total_delta as f64))
}

/// Computes this process's share of all CPU time between two reads.
pub fn process_cpu_percent(previous: &CpuCounters, current: &CpuCounters) -> Option<f64> {
    let (prev_ticks, cur_ticks) = (previous.process_ticks?, current.process_ticks?);

    if cur_ticks < prev_ticks || current.total_ticks < previous.total_ticks {
        return None;
    }

    let total_delta = current.total_ticks - previous.total_ticks;
    if total_delta == 0 {
        return None;
    }

    Some(clamp_percent(
        100.0 * (cur_ticks - prev_ticks) as f64 / total_delta as f64,
    ))
}

/// Computes memory usage as `100 * (total - free) / total`.
///
/// A zero total means the platform query failed and yields `None`.
pub fn ram_percent(total_bytes: u64, free_bytes: u64) -> Option<f64> {
    if total_bytes == 0 {
        return None;
    }
    let used = total_bytes.saturating_sub(free_bytes);
    Some(clamp_percent(100.0 * used as f64 / total_bytes as f64))
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Stateful sampler owning the previous counter snapshot.
///
/// Shared instances are safe to call concurrently: the read of the current
/// counters and the replacement of the snapshot happen under one lock, so
/// every delta is taken between two consecutive reads.
pub struct Sampler {
    source: Arc<dyn CounterSource>,
    previous: Mutex<Option<CounterSnapshot>>,
}

impl Sampler {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        Self {
            source,
            previous: Mutex::new(None),
        }
    }

    /// Creates a sampler whose baseline is read immediately.
    pub fn primed(source: Arc<dyn CounterSource>) -> Self {
        let sampler = Self::new(source);
        sampler.prime();
        sampler
    }

    pub fn source(&self) -> &Arc<dyn CounterSource> {
        &self.source
    }

    /// Replaces the stored snapshot with a fresh read without computing usage.
    pub fn prime(&self) {
        let mut guard = self.lock_previous();
        match self.source.read_cpu() {
            Ok(cpu) => {
                *guard = Some(CounterSnapshot {
                    cpu,
                    captured_at: Instant::now(),
                });
            }
            Err(e) => debug!("Failed to read CPU baseline from {}: {}", self.source.name(), e),
        }
    }

    /// Returns the snapshot the next call will diff against.
    pub fn last_snapshot(&self) -> Option<CounterSnapshot> {
        *self.lock_previous()
    }

    /// Takes one sample and advances the stored snapshot.
    pub fn sample(&self) -> Sample {
        let (cpu, cpu_process, elapsed) = self.sample_cpu();

        let memory = match self.source.read_memory() {
            Ok(memory) => Some(memory),
            Err(e) => {
                debug!("Memory query failed on {}: {}", self.source.name(), e);
                None
            }
        };

        Sample {
            cpu,
            cpu_process,
            memory,
            elapsed,
        }
    }

    fn sample_cpu(&self) -> (Option<f64>, Option<f64>, Option<std::time::Duration>) {
        let mut guard = self.lock_previous();

        let current = match self.source.read_cpu() {
            Ok(cpu) => CounterSnapshot {
                cpu,
                captured_at: Instant::now(),
            },
            Err(e) => {
                // Keep the old baseline; the next successful read diffs against it
                debug!("CPU query failed on {}: {}", self.source.name(), e);
                return (None, None, None);
            }
        };

        let result = match guard.as_ref() {
            Some(previous) => {
                let cpu = cpu_percent(&previous.cpu, &current.cpu);
                if cpu.is_none() {
                    debug!(
                        "No valid CPU delta (previous total={}, current total={})",
                        previous.cpu.total_ticks, current.cpu.total_ticks
                    );
                }
                (
                    cpu,
                    process_cpu_percent(&previous.cpu, &current.cpu),
                    Some(current.captured_at.duration_since(previous.captured_at)),
                )
            }
            None => (None, None, None),
        };

        *guard = Some(current);
        result
    }

    fn lock_previous(&self) -> std::sync::MutexGuard<'_, Option<CounterSnapshot>> {
        // A panic while holding the lock cannot leave the snapshot half-written
        self.previous
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
