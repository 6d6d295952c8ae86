//! Configuration management for herakles-pulse.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use axum::http::HeaderValue;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_WINDOW_MS: u64 = 100;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost";
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Longest accepted tick interval.
pub const MAX_INTERVAL_MS: u64 = 3_600_000;

/// How CPU deltas are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// One read per call, diffed against the previous call.
    #[default]
    Delta,
    /// Two reads per call separated by `window_ms`.
    Window,
}

/// Which sampler a push stream diffs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplerScope {
    /// Every stream owns its own baseline.
    #[default]
    PerStream,
    /// All streams and polls share one process-wide baseline.
    Shared,
}

/// Enhanced configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "cors-origin")]
    pub cors_origin: Option<String>,

    // Sampling
    #[serde(alias = "interval-ms")]
    pub interval_ms: Option<u64>,
    #[serde(alias = "sampling-mode")]
    pub sampling_mode: Option<SamplingMode>,
    #[serde(alias = "window-ms")]
    pub window_ms: Option<u64>,
    #[serde(alias = "sampler-scope")]
    pub sampler_scope: Option<SamplerScope>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Feature flags
    pub enable_health: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            cors_origin: Some(DEFAULT_CORS_ORIGIN.to_string()),
            interval_ms: Some(DEFAULT_INTERVAL_MS),
            sampling_mode: Some(SamplingMode::Delta),
            window_ms: Some(DEFAULT_WINDOW_MS),
            sampler_scope: Some(SamplerScope::PerStream),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.unwrap_or(DEFAULT_WINDOW_MS))
    }

    pub fn cors_origin(&self) -> &str {
        self.cors_origin.as_deref().unwrap_or(DEFAULT_CORS_ORIGIN)
    }

    /// Effective log level; unknown names were rejected by validation.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|name| LogLevel::from_str(name, true).ok())
            .unwrap_or(LogLevel::Info)
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let interval_ms = cfg.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS);
    if interval_ms == 0 {
        return Err("interval_ms must be greater than 0".into());
    }
    if interval_ms > MAX_INTERVAL_MS {
        return Err(format!(
            "interval_ms {} exceeds the maximum of {} ms",
            interval_ms, MAX_INTERVAL_MS
        )
        .into());
    }

    if cfg.sampling_mode.unwrap_or_default() == SamplingMode::Window {
        let window_ms = cfg.window_ms.unwrap_or(DEFAULT_WINDOW_MS);
        if window_ms == 0 {
            return Err("window_ms must be greater than 0 in window sampling mode".into());
        }
        if window_ms >= interval_ms {
            return Err(format!(
                "window_ms ({}) must be shorter than interval_ms ({})",
                window_ms, interval_ms
            )
            .into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!(
                "log_level '{}' is not one of off, error, warn, info, debug, trace",
                level
            )
            .into());
        }
    }

    let origin = cfg.cors_origin();
    if origin.is_empty() || HeaderValue::from_str(origin).is_err() {
        return Err(format!("cors_origin '{}' is not a valid header value", origin).into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("bind '{}' is not a valid IP address", bind).into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                for (label, file) in [("certificate", cert), ("private key", key)] {
                    match fs::metadata(file) {
                        Ok(meta) if meta.len() == 0 => {
                            return Err(format!("TLS {} file is empty: {}", label, file).into());
                        }
                        Ok(_) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                            return Err(format!("TLS {} file not found: {}", label, file).into());
                        }
                        Err(e) => {
                            return Err(format!(
                                "TLS {} file is not readable: {} ({})",
                                label, file, e
                            )
                            .into());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(origin) = &args.cors_origin {
        config.cors_origin = Some(origin.clone());
    }

    // Sampling settings
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = Some(interval_ms);
    }
    if let Some(mode) = args.sampling_mode {
        config.sampling_mode = Some(mode);
    }
    if let Some(window_ms) = args.window_ms {
        config.window_ms = Some(window_ms);
    }
    if let Some(scope) = args.sampler_scope {
        config.sampler_scope = Some(scope);
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }

    if let Some(level) = &args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => {
            // Try default locations
            let defaults = [
                "/etc/herakles/pulse.yaml",
                "/etc/herakles/pulse.yml",
                "/etc/herakles/pulse.json",
                "./herakles-pulse.yaml",
                "./herakles-pulse.yml",
                "./herakles-pulse.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)?;

    // Missing keys fall back to defaults, not to None
    let defaults = Config::default();
    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            // Default to YAML
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(loaded, defaults))
}

fn merge_defaults(loaded: Config, defaults: Config) -> Config {
    Config {
        port: loaded.port.or(defaults.port),
        bind: loaded.bind.or(defaults.bind),
        cors_origin: loaded.cors_origin.or(defaults.cors_origin),
        interval_ms: loaded.interval_ms.or(defaults.interval_ms),
        sampling_mode: loaded.sampling_mode.or(defaults.sampling_mode),
        window_ms: loaded.window_ms.or(defaults.window_ms),
        sampler_scope: loaded.sampler_scope.or(defaults.sampler_scope),
        proc_root: loaded.proc_root.or(defaults.proc_root),
        enable_health: loaded.enable_health.or(defaults.enable_health),
        log_level: loaded.log_level.or(defaults.log_level),
        enable_tls: loaded.enable_tls.or(defaults.enable_tls),
        tls_cert_path: loaded.tls_cert_path.or(defaults.tls_cert_path),
        tls_key_path: loaded.tls_key_path.or(defaults.tls_key_path),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
