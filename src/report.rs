//! Wire representation of usage samples.
//!
//! Unavailable metrics are encoded as the sentinel `-1` so clients always see
//! a number in every field.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::sampler::Sample;

/// Sentinel written for metrics that are unavailable this tick.
pub const UNAVAILABLE: f64 = -1.0;

/// Status sent with every stream frame.
pub const STATUS_CONNECTED: &str = "connected";

fn percent_or_sentinel<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(value.unwrap_or(UNAVAILABLE))
}

fn bytes_or_sentinel<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(bytes) => s.serialize_u64(*bytes),
        None => s.serialize_i64(-1),
    }
}

/// Point-in-time CPU and RAM usage, the body of `GET /metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageReport {
    #[serde(serialize_with = "percent_or_sentinel")]
    pub cpu: Option<f64>,
    #[serde(serialize_with = "percent_or_sentinel")]
    pub ram: Option<f64>,
}

impl From<&Sample> for UsageReport {
    fn from(sample: &Sample) -> Self {
        Self {
            cpu: sample.cpu,
            ram: sample.ram(),
        }
    }
}

/// One event of the `/metrics/stream` feed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreamFrame {
    pub status: &'static str,
    #[serde(flatten)]
    pub usage: UsageReport,
}

impl StreamFrame {
    pub fn connected(usage: UsageReport) -> Self {
        Self {
            status: STATUS_CONNECTED,
            usage,
        }
    }
}

/// Usage plus the raw byte figures and this process's own footprint.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedReport {
    #[serde(serialize_with = "percent_or_sentinel")]
    pub cpu: Option<f64>,
    #[serde(serialize_with = "percent_or_sentinel")]
    pub ram: Option<f64>,
    #[serde(serialize_with = "percent_or_sentinel")]
    pub virtual_ram: Option<f64>,
    #[serde(serialize_with = "percent_or_sentinel")]
    pub cpu_process: Option<f64>,
    /// Time span the CPU figures cover, in milliseconds.
    #[serde(serialize_with = "percent_or_sentinel")]
    pub sample_window_ms: Option<f64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub total_ram: Option<u64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub used_ram: Option<u64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub process_ram: Option<u64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub total_virtual_ram: Option<u64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub used_virtual_ram: Option<u64>,
    #[serde(serialize_with = "bytes_or_sentinel")]
    pub process_virtual_ram: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Sample> for DetailedReport {
    fn from(sample: &Sample) -> Self {
        let memory = sample.memory;

        Self {
            cpu: sample.cpu,
            ram: sample.ram(),
            virtual_ram: sample.virtual_ram(),
            cpu_process: sample.cpu_process,
            sample_window_ms: sample.elapsed.map(|d| d.as_secs_f64() * 1000.0),
            total_ram: memory.map(|m| m.total_bytes),
            used_ram: memory.map(|m| m.total_bytes.saturating_sub(m.free_bytes)),
            process_ram: memory.and_then(|m| m.process_resident_bytes),
            total_virtual_ram: memory.map(|m| m.total_bytes.saturating_add(m.swap_total_bytes)),
            used_virtual_ram: memory.map(|m| {
                m.total_bytes
                    .saturating_sub(m.free_bytes)
                    .saturating_add(m.swap_total_bytes.saturating_sub(m.swap_free_bytes))
            }),
            process_virtual_ram: memory.and_then(|m| m.process_virtual_bytes),
            timestamp: Utc::now(),
        }
    }
}
