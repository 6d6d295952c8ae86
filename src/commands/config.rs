//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use herakles_pulse::cli::ConfigFormat;
use herakles_pulse::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-pulse.yaml"));

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Pulse Configuration
# ============================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 80                     # HTTP port (ports below 1024 need root or CAP_NET_BIND_SERVICE)
# cors_origin: "http://localhost"  # Access-Control-Allow-Origin on every response
#
# Sampling
# --------
# interval_ms: 500             # Stream tick interval
# sampling_mode: delta         # delta = diff against previous call, window = two reads per call
# window_ms: 100               # Gap between the two reads in window mode
# sampler_scope: per_stream    # per_stream = own baseline per stream, shared = one baseline
# proc_root: "/proc"           # Where to read Linux counters from
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
