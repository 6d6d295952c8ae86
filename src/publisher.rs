//! Poll and push delivery of usage reports.
//!
//! The publisher owns the process-wide sampler used by poll requests and hands
//! out one frame stream per push client. A frame stream is driven by its own
//! interval timer and holds no buffer: when the client goes away, the HTTP
//! layer drops the stream and with it the timer and any per-stream sampler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, Stream};
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::debug;

use crate::config::{Config, SamplerScope, SamplingMode};
use crate::health_stats::HealthStats;
use crate::report::{DetailedReport, StreamFrame, UsageReport};
use crate::sampler::{Sample, Sampler};
use crate::source::CounterSource;

/// Timing and isolation settings for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherSettings {
    pub interval: Duration,
    pub mode: SamplingMode,
    pub window: Duration,
    pub scope: SamplerScope,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PublisherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.interval(),
            mode: config.sampling_mode.unwrap_or_default(),
            window: config.window(),
            scope: config.sampler_scope.unwrap_or_default(),
        }
    }
}

/// Samples usage on demand (poll) or on a timer (push).
pub struct MetricsPublisher {
    shared: Arc<Sampler>,
    settings: PublisherSettings,
    stats: Arc<HealthStats>,
}

impl MetricsPublisher {
    /// Creates a publisher and reads the baseline of its shared sampler.
    pub fn new(
        source: Arc<dyn CounterSource>,
        settings: PublisherSettings,
        stats: Arc<HealthStats>,
    ) -> Self {
        Self {
            shared: Arc::new(Sampler::primed(source)),
            settings,
            stats,
        }
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn shared_sampler(&self) -> &Arc<Sampler> {
        &self.shared
    }

    /// Takes exactly one sample for a poll request.
    pub async fn poll(&self) -> UsageReport {
        let sample = take_sample(&self.shared, &self.settings, &self.stats).await;
        UsageReport::from(&sample)
    }

    /// Takes exactly one sample and reports it with byte figures.
    pub async fn details(&self) -> DetailedReport {
        let sample = take_sample(&self.shared, &self.settings, &self.stats).await;
        DetailedReport::from(&sample)
    }

    /// Returns an endless stream yielding one frame per tick.
    ///
    /// The baseline is read when the stream is created and the first frame
    /// follows one interval later. Ticks missed by a slow consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = StreamFrame> + Send + 'static {
        let settings = self.settings;
        let sampler = match (settings.mode, settings.scope) {
            (SamplingMode::Delta, SamplerScope::PerStream) => {
                Arc::new(Sampler::primed(self.shared.source().clone()))
            }
            _ => self.shared.clone(),
        };
        let guard = StreamGuard::open(self.stats.clone());

        let mut ticker = interval_at(
            tokio::time::Instant::now() + settings.interval,
            settings.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        stream::unfold(
            (ticker, sampler, guard),
            move |(mut ticker, sampler, mut guard)| async move {
                ticker.tick().await;
                let sample = take_sample(&sampler, &settings, &guard.stats).await;
                guard.frame_sent();
                let frame = StreamFrame::connected(UsageReport::from(&sample));
                Some((frame, (ticker, sampler, guard)))
            },
        )
    }
}

/// Takes one sample according to the configured mode and records its cost.
async fn take_sample(
    sampler: &Sampler,
    settings: &PublisherSettings,
    stats: &HealthStats,
) -> Sample {
    let started = Instant::now();

    let sample = match settings.mode {
        SamplingMode::Delta => sampler.sample(),
        SamplingMode::Window => {
            let local = Sampler::primed(sampler.source().clone());
            tokio::time::sleep(settings.window).await;
            local.sample()
        }
    };

    stats.record_sample(
        started.elapsed(),
        sample.cpu.is_some(),
        sample.memory.is_some(),
    );
    sample
}

/// Tracks one open stream in the health stats for as long as it lives.
struct StreamGuard {
    stats: Arc<HealthStats>,
    id: u64,
    frames: u64,
    opened: Instant,
}

impl StreamGuard {
    fn open(stats: Arc<HealthStats>) -> Self {
        let id = stats.stream_opened();
        debug!("Stream {} opened ({} active)", id, stats.active_streams());
        Self {
            stats,
            id,
            frames: 0,
            opened: Instant::now(),
        }
    }

    fn frame_sent(&mut self) {
        self.frames += 1;
        self.stats.record_frame_sent();
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stats.stream_closed();
        debug!(
            "Stream {} closed after {} frames in {:.1}s ({} active)",
            self.id,
            self.frames,
            self.opened.elapsed().as_secs_f64(),
            self.stats.active_streams()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SampleError;
    use crate::source::{CpuCounters, MemoryCounters};
    use futures::StreamExt;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Source whose counters advance by 100 ticks per read, 25 of them busy.
    #[derive(Default)]
    struct SteadySource {
        reads: AtomicU64,
    }

    impl CounterSource for SteadySource {
        fn name(&self) -> &'static str {
            "steady"
        }

        fn read_cpu(&self) -> Result<CpuCounters, SampleError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CpuCounters {
                idle_ticks: n * 75,
                total_ticks: n * 100,
                process_ticks: None,
            })
        }

        fn read_memory(&self) -> Result<MemoryCounters, SampleError> {
            Ok(MemoryCounters {
                total_bytes: 8000,
                free_bytes: 2000,
                swap_total_bytes: 0,
                swap_free_bytes: 0,
                process_resident_bytes: None,
                process_virtual_bytes: None,
            })
        }
    }

    fn publisher(settings: PublisherSettings) -> (MetricsPublisher, Arc<HealthStats>) {
        let stats = Arc::new(HealthStats::new());
        let publisher = MetricsPublisher::new(Arc::new(SteadySource::default()), settings, stats.clone());
        (publisher, stats)
    }

    #[tokio::test]
    async fn test_poll_uses_primed_baseline() {
        let (publisher, stats) = publisher(PublisherSettings::default());
        let report = publisher.poll().await;
        assert_eq!(report.cpu, Some(25.0));
        assert_eq!(report.ram, Some(75.0));
        assert_eq!(stats.samples_taken.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_yields_frames_and_releases_guard() {
        let settings = PublisherSettings {
            interval: Duration::from_millis(500),
            ..PublisherSettings::default()
        };
        let (publisher, stats) = publisher(settings);

        let started = tokio::time::Instant::now();
        let frames: Vec<StreamFrame> = publisher.stream().take(3).collect().await;
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.status, "connected");
            assert_eq!(frame.usage.cpu, Some(25.0));
        }
        assert_eq!(stats.frames_sent.load(Ordering::Relaxed), 3);
        assert_eq!(stats.active_streams(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_skips_missed_ticks() {
        let (publisher, stats) = publisher(PublisherSettings::default());
        let mut stream = Box::pin(publisher.stream());

        let started = tokio::time::Instant::now();
        stream.next().await;
        tokio::time::sleep(Duration::from_millis(1600)).await;
        stream.next().await;
        stream.next().await;

        // Missed ticks fire once at 2100 ms, then the schedule resumes at 2500 ms
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
        assert_eq!(stats.frames_sent.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_mode_is_self_contained() {
        let settings = PublisherSettings {
            mode: SamplingMode::Window,
            window: Duration::from_millis(100),
            ..PublisherSettings::default()
        };
        let (publisher, _stats) = publisher(settings);

        assert_eq!(publisher.poll().await.cpu, Some(25.0));
        assert_eq!(publisher.poll().await.cpu, Some(25.0));
    }
}
