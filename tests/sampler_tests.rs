//! Integration tests for the delta sampler.
//!
//! These tests drive `Sampler` through scripted counter sequences and check
//! the percentage math against its invariants.

use herakles_pulse::{
    cpu_percent, ram_percent, CounterSource, CpuCounters, MemoryCounters, SampleError, Sampler,
};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Source replaying (idle, total) CPU reads; memory is fixed.
struct ReplaySource {
    reads: Mutex<VecDeque<(u64, u64)>>,
    memory: (u64, u64),
}

impl ReplaySource {
    fn new(reads: Vec<(u64, u64)>) -> Self {
        Self {
            reads: Mutex::new(reads.into()),
            memory: (8000, 2000),
        }
    }
}

impl CounterSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn read_cpu(&self) -> Result<CpuCounters, SampleError> {
        let (idle_ticks, total_ticks) = self
            .reads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(SampleError::Query("script exhausted"))?;
        Ok(CpuCounters {
            idle_ticks,
            total_ticks,
            process_ticks: None,
        })
    }

    fn read_memory(&self) -> Result<MemoryCounters, SampleError> {
        let (total_bytes, free_bytes) = self.memory;
        Ok(MemoryCounters {
            total_bytes,
            free_bytes,
            swap_total_bytes: 0,
            swap_free_bytes: 0,
            process_resident_bytes: None,
            process_virtual_bytes: None,
        })
    }
}

fn counters(idle_ticks: u64, total_ticks: u64) -> CpuCounters {
    CpuCounters {
        idle_ticks,
        total_ticks,
        process_ticks: None,
    }
}

#[test]
fn test_first_call_only_sets_baseline() {
    let sampler = Sampler::new(Arc::new(ReplaySource::new(vec![(100, 1000), (150, 1100)])));

    let first = sampler.sample();
    assert_eq!(first.cpu, None);
    assert_eq!(first.ram(), Some(75.0));

    let second = sampler.sample();
    assert_eq!(second.cpu, Some(50.0));
}

#[test]
fn test_counter_reset_yields_sentinel_then_recovers() {
    let sampler = Sampler::primed(Arc::new(ReplaySource::new(vec![
        (1000, 10_000),
        (1100, 10_200),
        (10, 100),
        (60, 300),
    ])));

    assert_eq!(sampler.sample().cpu, Some(50.0));
    // Counters went backwards
    assert_eq!(sampler.sample().cpu, None);
    // Baseline was replaced by the post-reset read
    assert_eq!(sampler.sample().cpu, Some(75.0));
}

#[test]
fn test_unchanged_counters_are_unavailable() {
    assert_eq!(cpu_percent(&counters(500, 1000), &counters(500, 1000)), None);
}

#[test]
fn test_failed_read_keeps_baseline() {
    let source = Arc::new(ReplaySource::new(vec![(0, 1000)]));
    let sampler = Sampler::primed(source.clone());

    // Script exhausted: this read fails
    assert_eq!(sampler.sample().cpu, None);
    assert_eq!(sampler.last_snapshot().map(|s| s.cpu.total_ticks), Some(1000));

    source.reads.lock().unwrap().push_back((100, 1200));
    assert_eq!(sampler.sample().cpu, Some(50.0));
}

#[test]
fn test_ram_percent_examples() {
    assert_eq!(ram_percent(8000, 2000), Some(75.0));
    assert_eq!(ram_percent(8000, 8000), Some(0.0));
    assert_eq!(ram_percent(8000, 0), Some(100.0));
    assert_eq!(ram_percent(0, 0), None);
}

proptest! {
    #[test]
    fn prop_monotonic_counters_stay_in_range(
        steps in prop::collection::vec((0u64..10_000, 0u64..10_000), 1..50)
    ) {
        let mut idle = 0u64;
        let mut total = 0u64;
        let mut reads = vec![(idle, total)];
        for (idle_step, busy_step) in &steps {
            idle += idle_step;
            total += idle_step + busy_step;
            reads.push((idle, total));
        }

        let sampler = Sampler::primed(Arc::new(ReplaySource::new(reads)));
        for (idle_step, busy_step) in steps {
            let cpu = sampler.sample().cpu;
            if idle_step + busy_step == 0 {
                prop_assert_eq!(cpu, None);
            } else {
                let cpu = cpu.unwrap();
                prop_assert!((0.0..=100.0).contains(&cpu));
                let expected = 100.0 * busy_step as f64 / (idle_step + busy_step) as f64;
                prop_assert!((cpu - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn prop_decreasing_total_is_unavailable(
        idle in 0u64..1_000,
        total in 1_000u64..1_000_000,
        drop in 1u64..1_000,
    ) {
        let previous = counters(idle, total);
        let current = counters(idle, total - drop);
        prop_assert_eq!(cpu_percent(&previous, &current), None);
    }

    #[test]
    fn prop_ram_percent_in_range(total in 1u64..u64::MAX / 2, free in 0u64..u64::MAX / 2) {
        let ram = ram_percent(total, free).unwrap();
        prop_assert!((0.0..=100.0).contains(&ram));
    }
}
