//! Herakles Pulse Library
//!
//! Live host CPU and memory usage over HTTP. Usage percentages are derived
//! from cumulative OS counters by diffing consecutive reads, and delivered
//! either per request (`GET /metrics`) or as a Server-Sent-Events stream
//! (`GET /metrics/stream`).
//!
//! # Features
//!
//! - **Delta Sampling**: CPU usage from cumulative tick counters with wraparound detection
//! - **Platform Sources**: /proc on Linux, Win32 system times on Windows
//! - **Poll and Push**: JSON endpoint and SSE stream on the same sampler
//! - **Sentinel Values**: unavailable metrics are reported as `-1`, never as errors
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use herakles_pulse::{ProcfsSource, Sampler, UsageReport};
//!
//! let sampler = Sampler::primed(Arc::new(ProcfsSource::default()));
//! std::thread::sleep(std::time::Duration::from_millis(500));
//!
//! let report = UsageReport::from(&sampler.sample());
//! println!("cpu={:?} ram={:?}", report.cpu, report.ram);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health_stats;
pub mod publisher;
pub mod report;
pub mod sampler;
pub mod server;
pub mod source;
pub mod startup_checks;
pub mod state;
pub mod system;

// Re-export main types for convenience
pub use config::{Config, SamplerScope, SamplingMode};
pub use error::SampleError;
pub use publisher::{MetricsPublisher, PublisherSettings};
pub use report::{DetailedReport, StreamFrame, UsageReport, UNAVAILABLE};
pub use sampler::{cpu_percent, ram_percent, CounterSnapshot, Sample, Sampler};
pub use server::build_router;
pub use source::{default_source, CounterSource, CpuCounters, MemoryCounters, ProcfsSource};
pub use state::{AppState, SharedState};
