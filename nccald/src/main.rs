/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use nccald::config::{parse_duration, Config};
use nccald::server::{run_once, PollScheduler};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Namecoin name expiry calendar daemon.
///
/// Example:
///   nccald --config /etc/nccald.yaml --ics-path /var/lib/nccald/names.ics
#[derive(Debug, Parser)]
#[command(
    name = "nccald",
    about = "Publishes estimated Namecoin name expiry dates as an iCalendar feed",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Namecoin RPC address (host:port or URL).
    #[arg(long = "rpc-address")]
    rpc_address: Option<String>,

    /// Namecoin RPC username.
    #[arg(long = "rpc-username")]
    rpc_username: Option<String>,

    /// Namecoin RPC password.
    #[arg(long = "rpc-password")]
    rpc_password: Option<String>,

    /// Namecoin RPC cookie file, used when no password is given.
    #[arg(long = "rpc-cookie-path")]
    rpc_cookie_path: Option<PathBuf>,

    /// Namecoin RPC request timeout in milliseconds.
    #[arg(long = "rpc-timeout-ms")]
    rpc_timeout_ms: Option<u64>,

    /// Subtracted from each estimate to err on the early side (e.g. 72h).
    #[arg(long = "margin", value_parser = parse_duration)]
    margin: Option<Duration>,

    /// Estimates are floored to a multiple of this (e.g. 72h).
    #[arg(long = "quantum", value_parser = parse_duration)]
    quantum: Option<Duration>,

    /// Time between registry queries (e.g. 10m).
    #[arg(long = "interval", value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Write the calendar to this ICS file.
    #[arg(long = "ics-path")]
    ics_path: Option<PathBuf>,

    /// PUT the calendar to this CalDAV URL.
    #[arg(long = "caldav-url")]
    caldav_url: Option<String>,

    /// CalDAV username.
    #[arg(long = "caldav-username")]
    caldav_username: Option<String>,

    /// CalDAV password.
    #[arg(long = "caldav-password")]
    caldav_password: Option<String>,

    /// Publish once and exit.
    #[arg(long = "once", default_value_t = false)]
    once: bool,
}

impl Cli {
    /// Lay command-line values over `config`.  An empty `--caldav-url`
    /// disables the remote sink.
    fn apply(self, config: &mut Config) {
        let rpc = &mut config.rpc;
        if let Some(v) = self.rpc_address {
            rpc.address = v;
        }
        if let Some(v) = self.rpc_username {
            rpc.username = v;
        }
        if let Some(v) = self.rpc_password {
            rpc.password = v;
        }
        if let Some(v) = self.rpc_cookie_path {
            rpc.cookie_path = Some(v);
        }
        if let Some(v) = self.rpc_timeout_ms {
            rpc.timeout_ms = v;
        }

        let cal = &mut config.calendar;
        if let Some(v) = self.margin {
            cal.margin = v;
        }
        if let Some(v) = self.quantum {
            cal.quantum = v;
        }
        if let Some(v) = self.interval {
            cal.query_interval = v;
        }
        if let Some(v) = self.ics_path {
            cal.ics_path = Some(v);
        }
        if let Some(v) = self.caldav_url {
            cal.caldav_url = Some(v).filter(|u| !u.is_empty());
        }
        if let Some(v) = self.caldav_username {
            cal.caldav_username = v;
        }
        if let Some(v) = self.caldav_password {
            cal.caldav_password = v;
        }

        config.once |= self.once;
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut config);

    info!(
        rpc_address = %config.rpc.address,
        margin      = ?config.calendar.margin,
        quantum     = ?config.calendar.quantum,
        interval    = ?config.calendar.query_interval,
        ics_path    = ?config.calendar.ics_path,
        caldav_url  = ?config.calendar.caldav_url,
        once        = config.once,
        "Configuration"
    );

    if config.calendar.ics_path.is_none() && config.calendar.caldav_url.is_none() {
        warn!("No ICS path or CalDAV URL configured, calendars will not be published");
    }

    // ── Build scheduler ───────────────────────────────────────────────────────
    let scheduler = match PollScheduler::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create server: {}", e);
            process::exit(1);
        }
    };

    // ── Run ───────────────────────────────────────────────────────────────────
    if config.once {
        if let Err(e) = run_once(scheduler).await {
            error!("Run failed: {}", e);
            process::exit(1);
        }
        return;
    }

    info!("nccald started, polling every {:?}", scheduler.interval());
    let running = scheduler.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");

    if let Err(e) = running.stop().await {
        error!("Failed to stop server: {}", e);
        process::exit(1);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
