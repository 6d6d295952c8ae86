//! Health statistics and monitoring for the server.
//!
//! This module provides types and functionality for tracking server health,
//! including sampling performance, stream lifecycle and HTTP request metrics.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only last 10 minutes of timestamps to avoid unbounded growth
            if let Some(cutoff) = now.checked_sub(Duration::from_secs(600)) {
                while guard.front().is_some_and(|&t| t < cutoff) {
                    guard.pop_front();
                }
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            match Instant::now().checked_sub(Duration::from_secs(60)) {
                Some(cutoff) => guard.iter().filter(|&&t| t >= cutoff).count() as u64,
                None => guard.len() as u64,
            }
        } else {
            0
        }
    }
}

/// Health statistics for the server.
pub struct HealthStats {
    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,
    pub poll_requests: AtomicU64,

    // Streams
    pub streams_opened: AtomicU64,
    pub active_streams: AtomicU64,
    pub frames_sent: AtomicU64,

    // Sampling
    pub samples_taken: AtomicU64,
    pub cpu_unavailable: AtomicU64,
    pub memory_unavailable: AtomicU64,
    pub sample_duration_ms: Stat,

    // Timing
    pub start_time: Instant,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            http_request_timestamps: RequestTimestamps::default(),
            poll_requests: AtomicU64::new(0),
            streams_opened: AtomicU64::new(0),
            active_streams: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            samples_taken: AtomicU64::new(0),
            cpu_unavailable: AtomicU64::new(0),
            memory_unavailable: AtomicU64::new(0),
            sample_duration_ms: Stat::default(),
            start_time: Instant::now(),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_poll_request(&self) {
        self.poll_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self, duration: Duration, cpu_ok: bool, memory_ok: bool) {
        self.samples_taken.fetch_add(1, Ordering::Relaxed);
        self.sample_duration_ms
            .add_sample(duration.as_secs_f64() * 1000.0);
        if !cpu_ok {
            self.cpu_unavailable.fetch_add(1, Ordering::Relaxed);
        }
        if !memory_ok {
            self.memory_unavailable.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Counts a new stream and returns its sequence number.
    pub fn stream_opened(&self) -> u64 {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
        self.streams_opened.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn stream_closed(&self) {
        // Saturating so a stray double close cannot wrap the gauge
        let _ = self
            .active_streams
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_streams(&self) -> u64 {
        self.active_streams.load(Ordering::Relaxed)
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_table(&self) -> String {
        let (sd_cur, sd_avg, sd_max, sd_min, _) = self.sample_duration_ms.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - SERVER INTERNAL STATS").ok();
        writeln!(out, "=======================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SAMPLING").ok();
        writeln!(out, "--------").ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "sample_duration (ms)",
            format!("{:.3}", sd_cur),
            format!("{:.3}", sd_avg),
            format!("{:.3}", sd_max),
            format!("{:.3}", sd_min),
            left = left_col,
            col = col_w
        )
        .ok();

        let counters = [
            ("samples_taken", self.samples_taken.load(Ordering::Relaxed)),
            ("cpu_unavailable", self.cpu_unavailable.load(Ordering::Relaxed)),
            (
                "memory_unavailable",
                self.memory_unavailable.load(Ordering::Relaxed),
            ),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {:^col$}", name, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(out, "HTTP / STREAMS").ok();
        writeln!(out, "--------------").ok();

        let counters = [
            (
                "requests_last_minute",
                self.http_request_timestamps.count_last_minute(),
            ),
            ("poll_requests", self.poll_requests.load(Ordering::Relaxed)),
            ("streams_opened", self.streams_opened.load(Ordering::Relaxed)),
            ("active_streams", self.active_streams()),
            ("frames_sent", self.frames_sent.load(Ordering::Relaxed)),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {:^col$}", name, value, left = left_col, col = col_w).ok();
        }

        out
    }
}
