//! Integration tests for health stats module.
//!
//! These tests verify that HealthStats tracks sampling outcomes and stream
//! lifecycles, and that they show up in the rendered table.

use herakles_pulse::health_stats::HealthStats;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_health_stats_fields_initialize() {
    let stats = HealthStats::new();

    let (sd_cur, sd_avg, _, _, sd_count) = stats.sample_duration_ms.snapshot();
    assert_eq!(sd_count, 0);
    assert_eq!(sd_cur, 0.0);
    assert_eq!(sd_avg, 0.0);

    assert_eq!(stats.samples_taken.load(Ordering::Relaxed), 0);
    assert_eq!(stats.cpu_unavailable.load(Ordering::Relaxed), 0);
    assert_eq!(stats.memory_unavailable.load(Ordering::Relaxed), 0);
    assert_eq!(stats.poll_requests.load(Ordering::Relaxed), 0);
    assert_eq!(stats.active_streams(), 0);
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 0);
}

#[test]
fn test_health_stats_recording_methods() {
    let stats = HealthStats::new();

    stats.record_sample(Duration::from_millis(4), true, true);
    stats.record_sample(Duration::from_millis(2), false, true);
    stats.record_sample(Duration::from_millis(3), false, false);

    assert_eq!(stats.samples_taken.load(Ordering::Relaxed), 3);
    assert_eq!(stats.cpu_unavailable.load(Ordering::Relaxed), 2);
    assert_eq!(stats.memory_unavailable.load(Ordering::Relaxed), 1);

    let (cur, avg, max, min, count) = stats.sample_duration_ms.snapshot();
    assert_eq!(count, 3);
    assert!((cur - 3.0).abs() < 1e-6);
    assert!((avg - 3.0).abs() < 1e-6);
    assert!((max - 4.0).abs() < 1e-6);
    assert!((min - 2.0).abs() < 1e-6);

    stats.record_http_request();
    stats.record_http_request();
    stats.record_poll_request();
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 2);
    assert_eq!(stats.poll_requests.load(Ordering::Relaxed), 1);
}

#[test]
fn test_stream_lifecycle_counters() {
    let stats = HealthStats::new();

    let first = stats.stream_opened();
    let second = stats.stream_opened();
    assert_ne!(first, second);
    assert_eq!(stats.active_streams(), 2);

    stats.record_frame_sent();
    stats.record_frame_sent();
    stats.stream_closed();

    assert_eq!(stats.active_streams(), 1);
    assert_eq!(stats.streams_opened.load(Ordering::Relaxed), 2);
    assert_eq!(stats.frames_sent.load(Ordering::Relaxed), 2);
}

#[test]
fn test_concurrent_stream_accounting() {
    let stats = Arc::new(HealthStats::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let stats = stats.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    stats.stream_opened();
                    stats.record_frame_sent();
                    stats.stream_closed();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.active_streams(), 0);
    assert_eq!(stats.streams_opened.load(Ordering::Relaxed), 800);
    assert_eq!(stats.frames_sent.load(Ordering::Relaxed), 800);
}

#[test]
fn test_health_stats_render_table_contains_sections() {
    let stats = Arc::new(HealthStats::new());

    stats.record_sample(Duration::from_millis(1), true, true);
    stats.stream_opened();
    stats.record_frame_sent();

    let output = stats.render_table();

    assert!(
        output.contains("HEALTH ENDPOINT - SERVER INTERNAL STATS"),
        "Should contain the table title"
    );
    assert!(output.contains("SAMPLING"), "Should contain SAMPLING section");
    assert!(
        output.contains("HTTP / STREAMS"),
        "Should contain HTTP / STREAMS section"
    );
    assert!(
        output.contains("sample_duration (ms)"),
        "Should contain sample_duration metric"
    );
    assert!(
        output.contains("frames_sent"),
        "Should contain frames_sent metric"
    );
}
