//! Daemon configuration loading.
//!
//! Configuration comes from an optional YAML file; the binary then applies CLI
//! overrides on top.  Every field is optional in the file and falls back to
//! the defaults below.
//!
//! The expected YAML structure is:
//! ```yaml
//! rpc:
//!   address: "127.0.0.1:8336"
//!   username: "rpcuser"
//!   password: ""
//!   cookie_path: "/var/lib/namecoin/.cookie"
//!   timeout_ms: 1500
//! calendar:
//!   margin: 72h
//!   quantum: 72h
//!   query_interval: 10m
//!   ics_path: "/var/lib/nccald/names.ics"
//!   caldav_url: "https://dav.example.org/cal/names.ics"
//!   caldav_username: "alice"
//!   caldav_password: "secret"
//!   name: "nccald calendar"
//! once: false
//! ```

pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

pub use duration::{parse_duration, DurationError};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    rpc: RpcSection,
    calendar: CalendarSection,
    once: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RpcSection {
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    cookie_path: Option<PathBuf>,
    timeout_ms: Option<u64>,
}

/// Durations stay raw here; they are parsed with file context attached.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalendarSection {
    margin: Option<DurationValue>,
    quantum: Option<DurationValue>,
    query_interval: Option<DurationValue>,
    ics_path: Option<PathBuf>,
    caldav_url: Option<String>,
    caldav_username: Option<String>,
    caldav_password: Option<String>,
    name: Option<String>,
}

/// YAML reads `72h` as a string but a bare `0` as an integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Text(String),
    Number(u64),
}

impl DurationValue {
    fn as_text(&self) -> String {
        match self {
            DurationValue::Text(s) => s.clone(),
            DurationValue::Number(n) => n.to_string(),
        }
    }
}

// ── Public data structures ────────────────────────────────────────────────────

/// Connection settings for the Namecoin Core JSON-RPC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    /// `host:port`, or a full `http://` URL.
    pub address: String,
    pub username: String,
    pub password: String,
    /// Cookie file used when `password` is empty.
    pub cookie_path: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:8336"),
            username: String::new(),
            password: String::new(),
            cookie_path: None,
            timeout_ms: 1500,
        }
    }
}

/// Estimation and output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
    pub margin: Duration,
    pub quantum: Duration,
    pub query_interval: Duration,
    /// Write an ICS file here when set.
    pub ics_path: Option<PathBuf>,
    /// Update this CalDAV resource when set.
    pub caldav_url: Option<String>,
    pub caldav_username: String,
    pub caldav_password: String,
    /// Calendar display name.
    pub name: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            margin: Duration::from_secs(72 * 3600),
            quantum: Duration::from_secs(72 * 3600),
            query_interval: Duration::from_secs(10 * 60),
            ics_path: None,
            caldav_url: None,
            caldav_username: String::new(),
            caldav_password: String::new(),
            name: String::from("nccald calendar"),
        }
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub rpc: RpcConfig,
    pub calendar: CalendarConfig,
    /// Publish once and exit instead of running as a daemon.
    pub once: bool,
}

impl Config {
    /// Parse the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, or a duration value does not parse.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse configuration from YAML text.  An empty document yields the
    /// defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        let defaults = Config::default();
        let rpc = RpcConfig {
            address: file.rpc.address.unwrap_or(defaults.rpc.address),
            username: file.rpc.username.unwrap_or_default(),
            password: file.rpc.password.unwrap_or_default(),
            cookie_path: file.rpc.cookie_path.filter(|p| !p.as_os_str().is_empty()),
            timeout_ms: file.rpc.timeout_ms.unwrap_or(defaults.rpc.timeout_ms),
        };

        let cal = file.calendar;
        let calendar = CalendarConfig {
            margin: duration_or(cal.margin.as_ref(), "calendar.margin", defaults.calendar.margin)?,
            quantum: duration_or(
                cal.quantum.as_ref(),
                "calendar.quantum",
                defaults.calendar.quantum,
            )?,
            query_interval: duration_or(
                cal.query_interval.as_ref(),
                "calendar.query_interval",
                defaults.calendar.query_interval,
            )?,
            ics_path: cal.ics_path.filter(|p| !p.as_os_str().is_empty()),
            caldav_url: cal.caldav_url.filter(|u| !u.is_empty()),
            caldav_username: cal.caldav_username.unwrap_or_default(),
            caldav_password: cal.caldav_password.unwrap_or_default(),
            name: cal
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or(defaults.calendar.name),
        };

        debug!(
            address = %rpc.address,
            margin = ?calendar.margin,
            quantum = ?calendar.quantum,
            interval = ?calendar.query_interval,
            ics_path = ?calendar.ics_path,
            caldav_url = ?calendar.caldav_url,
            "configuration parsed"
        );

        Ok(Config {
            rpc,
            calendar,
            once: file.once,
        })
    }
}

fn duration_or(value: Option<&DurationValue>, key: &str, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(v) => parse_duration(&v.as_text()).with_context(|| format!("Invalid value for {key}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
