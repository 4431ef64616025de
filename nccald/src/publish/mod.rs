/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Publication of a rendered calendar.
//!
//! Two independent sinks:
//!
//! * [`FileTarget`] – write `<path>.tmp`, then rename over `<path>`.  Anyone
//!   watching the file (inotify etc.) only ever sees a complete calendar.  A
//!   failed rename leaves the `.tmp` file behind.
//! * [`RemoteTarget`] – PUT the same bytes to a calendar server through a
//!   [`CalendarPut`] implementation.
//!
//! The sinks are best effort and do not know about each other: a failure in
//! one neither rolls back nor blocks the other, and nothing is retried within
//! a cycle.  Failures are collected into [`PublishFailures`].

pub mod caldav;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn, Instrument, Span};

pub use caldav::{CalDavClient, CalendarPut, Credentials};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of a single sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("error while writing calendar file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error while renaming {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("calendar server transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("calendar server returned HTTP {status}")]
    Status { status: u16 },
}

/// Per-sink failures of one [`Publisher::publish`] call.
///
/// Only returned when at least one sink failed; a `None` field means that
/// sink either succeeded or is not configured.
#[derive(Debug, Default)]
pub struct PublishFailures {
    pub file: Option<SinkError>,
    pub remote: Option<SinkError>,
}

impl PublishFailures {
    fn is_empty(&self) -> bool {
        self.file.is_none() && self.remote.is_none()
    }
}

impl std::fmt::Display for PublishFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, &self.remote) {
            (Some(file), Some(remote)) => {
                write!(f, "file target: {file}; remote target: {remote}")
            }
            (Some(file), None) => write!(f, "file target: {file}"),
            (None, Some(remote)) => write!(f, "remote target: {remote}"),
            (None, None) => write!(f, "no failures"),
        }
    }
}

impl std::error::Error for PublishFailures {}

// ── Targets ───────────────────────────────────────────────────────────────────

/// Local ICS file, replaced atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    path: PathBuf,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.tmp`, in the same directory so the rename stays on one
    /// filesystem.
    pub fn temp_path(&self) -> PathBuf {
        let mut tmp: OsString = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Write `artifact` to the temp file and rename it over the target.
    pub async fn write_atomic(&self, artifact: &[u8]) -> Result<(), SinkError> {
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, artifact)
            .await
            .map_err(|source| SinkError::Write {
                path: tmp.clone(),
                source,
            })?;

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| SinkError::Rename {
                from: tmp,
                to: self.path.clone(),
                source,
            })
    }
}

/// Remote calendar resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub url: String,
    pub credentials: Option<Credentials>,
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// Fans one rendered calendar out to the configured sinks.
pub struct Publisher {
    file: Option<FileTarget>,
    remote: Option<RemoteTarget>,
    client: Arc<dyn CalendarPut>,
    span: Span,
}

impl Publisher {
    /// A publisher with no sinks.  `client` is used only once a
    /// [`RemoteTarget`] is added.
    pub fn new(client: Arc<dyn CalendarPut>) -> Self {
        Self {
            file: None,
            remote: None,
            client,
            span: Span::none(),
        }
    }

    pub fn with_file(mut self, target: FileTarget) -> Self {
        self.file = Some(target);
        self
    }

    pub fn with_remote(mut self, target: RemoteTarget) -> Self {
        self.remote = Some(target);
        self
    }

    /// Span that publish events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// `true` if at least one sink is configured.
    pub fn is_configured(&self) -> bool {
        self.file.is_some() || self.remote.is_some()
    }

    /// Deliver `artifact` to every configured sink.
    ///
    /// With no sinks configured this logs a warning and does nothing.
    ///
    /// # Errors
    /// [`PublishFailures`] naming each sink that failed.  Sinks that succeeded
    /// have taken effect regardless.
    pub async fn publish(&self, now: DateTime<Utc>, artifact: &str) -> Result<(), PublishFailures> {
        self.publish_to_sinks(now, artifact)
            .instrument(self.span.clone())
            .await
    }

    async fn publish_to_sinks(
        &self,
        now: DateTime<Utc>,
        artifact: &str,
    ) -> Result<(), PublishFailures> {
        if !self.is_configured() {
            warn!("neither ICS path nor CalDAV URL configured, nothing to do");
            return Ok(());
        }

        let mut failures = PublishFailures::default();

        if let Some(file) = &self.file {
            debug!(path = %file.path().display(), "updating ICS file");
            failures.file = file.write_atomic(artifact.as_bytes()).await.err();
        }

        if let Some(remote) = &self.remote {
            debug!(url = %remote.url, "updating CalDAV resource");
            failures.remote = self
                .client
                .put(now, &remote.url, remote.credentials.clone(), artifact)
                .await
                .err();
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
