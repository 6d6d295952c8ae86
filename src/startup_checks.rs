//! Startup requirement validation for herakles-pulse.
//!
//! This module validates that at least one metric source can be read and
//! warns about privilege problems before the server binds its socket.

use tracing::{error, info, warn};

use crate::source::CounterSource;

/// Validate all runtime requirements.
///
/// Fails only when neither CPU nor memory counters can be read; a single
/// unreadable source degrades that metric to the sentinel value.
pub fn validate_requirements(source: &dyn CounterSource, port: u16) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_port_privileges(port);
    check_sources(source)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Warn when binding a privileged port without root.
#[cfg(unix)]
fn check_port_privileges(port: u16) {
    use nix::unistd::geteuid;

    if port < 1024 && !geteuid().is_root() {
        warn!("⚠️  Port {} is privileged and the server is not running as root", port);
        warn!("   Binding will fail unless CAP_NET_BIND_SERVICE is granted");
        warn!("   Recommendation: use --port 8080 or setcap cap_net_bind_service+ep /path/to/binary");
    }
}

#[cfg(not(unix))]
fn check_port_privileges(_port: u16) {}

/// Check that the counter source answers.
fn check_sources(source: &dyn CounterSource) -> Result<(), ValidationError> {
    let cpu = source.read_cpu();
    let memory = source.read_memory();

    match (&cpu, &memory) {
        (Ok(_), Ok(_)) => {
            info!("✅ {}: CPU and memory counters readable", source.name());
            Ok(())
        }
        (Err(e), Ok(_)) => {
            warn!("⚠️  {}: CPU counters unreadable ({}) - cpu will be reported as -1", source.name(), e);
            Ok(())
        }
        (Ok(_), Err(e)) => {
            warn!("⚠️  {}: memory counters unreadable ({}) - ram will be reported as -1", source.name(), e);
            Ok(())
        }
        (Err(cpu_err), Err(mem_err)) => {
            error!("❌ {}: no metric source readable", source.name());
            error!("   CPU: {}", cpu_err);
            error!("   Memory: {}", mem_err);
            Err(ValidationError::NoMetricSource {
                source_name: source.name(),
                cpu: cpu_err.to_string(),
                memory: mem_err.to_string(),
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No metric source readable on {source_name} (cpu: {cpu}; memory: {memory})")]
    NoMetricSource {
        source_name: &'static str,
        cpu: String,
        memory: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ProcfsSource;

    #[test]
    fn test_missing_proc_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = ProcfsSource::new(dir.path());
        let err = validate_requirements(&source, 8080).unwrap_err();
        assert!(err.to_string().contains("procfs"));
    }

    #[test]
    fn test_memory_only_is_degraded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meminfo"), "MemTotal: 100 kB\nMemAvailable: 50 kB\n")
            .unwrap();
        let source = ProcfsSource::new(dir.path());
        assert!(validate_requirements(&source, 8080).is_ok());
    }
}
