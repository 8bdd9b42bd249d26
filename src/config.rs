//! Runtime configuration.
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. An optional YAML file ([`Config::from_yaml_str`], [`Config::load`])
//! 3. Environment variables ([`Config::apply_env`])
//!
//! | Variable | Field |
//! |---|---|
//! | `SLIPSTREAM_BIND_ADDR` | `capture.bind_addr` (IP only, port kept) |
//! | `SLIPSTREAM_UDP_PORT` | `capture.bind_addr` port |
//! | `TELEMETRY_MAXLEN` | `store.capacity` (`0` = unbounded) |
//! | `LOG_DIR` | `store.dump_dir` |
//! | `DEBUG_LEVEL` | `log_level` |
//! | `SLIPSTREAM_TIME_JITTER_MS` | `segmentation.time_jitter_ms` |
//! | `SLIPSTREAM_DISTANCE_JITTER_M` | `segmentation.distance_jitter_m` |
//!
//! ```rust
//! use slipstream::Config;
//!
//! let config = Config::from_yaml_str("store:\n  capacity: 5000\n").unwrap();
//! assert_eq!(config.store.capacity(), Some(5000));
//! assert_eq!(config.capture.bind_addr.port(), 20777);
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::{Result, TelemetryError};

/// Standard EA/Codemasters telemetry port.
pub const DEFAULT_UDP_PORT: u16 = 20777;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub store: StoreConfig,
    pub segmentation: SegmentationConfig,
    /// Default `tracing` level when `RUST_LOG` is unset.
    pub log_level: LogLevel,
}

/// Log level names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(TelemetryError::config(format!("unknown log level '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub bind_addr: SocketAddr,
    /// Requested `SO_RCVBUF`; the OS may clamp it.
    pub recv_buffer_bytes: usize,
    /// Sleep between polls when the socket has nothing to read.
    pub idle_sleep_ms: u64,
    /// In-game "UDP send rate", used to normalise live feed rates.
    pub send_rate_hz: u32,
    /// Interval of the packets-per-second status line.
    pub status_interval_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_UDP_PORT),
            recv_buffer_bytes: 1 << 20,
            idle_sleep_ms: 1,
            send_rate_hz: 60,
            status_interval_secs: 5,
        }
    }
}

impl CaptureConfig {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms.max(1))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum retained samples; `None` or `0` keeps everything.
    pub capacity: Option<usize>,
    /// Directory receiving JSON dumps.
    pub dump_dir: PathBuf,
    /// Samples written by a default dump.
    pub dump_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: None, dump_dir: PathBuf::from("logs"), dump_limit: 20_000 }
    }
}

impl StoreConfig {
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.filter(|&c| c > 0)
    }
}

/// Lap restart heuristics. These thresholds were tuned on practice and
/// time-trial sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Lap time regression beyond this starts a new segment.
    pub time_jitter_ms: u32,
    /// Lap distance regression beyond this starts a new segment.
    pub distance_jitter_m: f32,
    /// A lap time of exactly zero after exceeding this is a reset.
    pub zero_reset_min_ms: u32,
    /// Segments kept per lap number; oldest superseded ones are dropped.
    pub max_segments_per_lap: usize,
    /// Samples kept across every segment. Least recently updated laps lose
    /// their oldest samples first.
    pub max_retained_samples: usize,
    /// Lap numbers kept; the least recently updated lap is dropped.
    pub max_laps: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            time_jitter_ms: 250,
            distance_jitter_m: 50.0,
            zero_reset_min_ms: 1_000,
            max_segments_per_lap: 8,
            max_retained_samples: 36_000,
            max_laps: 100,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            TelemetryError::config_with_source("failed to parse YAML configuration", Box::new(e))
        })
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|e| {
                    TelemetryError::config_with_source(
                        format!("failed to read {}", path.display()),
                        Box::new(e),
                    )
                })?;
                Self::from_yaml_str(&yaml)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ip) = parse_var::<IpAddr, _>(&lookup, "SLIPSTREAM_BIND_ADDR") {
            self.capture.bind_addr.set_ip(ip);
        }
        if let Some(port) = parse_var::<u16, _>(&lookup, "SLIPSTREAM_UDP_PORT") {
            self.capture.bind_addr.set_port(port);
        }
        if let Some(maxlen) = parse_var::<usize, _>(&lookup, "TELEMETRY_MAXLEN") {
            self.store.capacity = (maxlen > 0).then_some(maxlen);
        }
        if let Some(dir) = lookup("LOG_DIR").filter(|d| !d.trim().is_empty()) {
            self.store.dump_dir = PathBuf::from(dir);
        }
        if let Some(level) = parse_var::<LogLevel, _>(&lookup, "DEBUG_LEVEL") {
            self.log_level = level;
        }
        if let Some(ms) = parse_var::<u32, _>(&lookup, "SLIPSTREAM_TIME_JITTER_MS") {
            self.segmentation.time_jitter_ms = ms;
        }
        if let Some(m) = parse_var::<f32, _>(&lookup, "SLIPSTREAM_DISTANCE_JITTER_M") {
            self.segmentation.distance_jitter_m = m;
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}
