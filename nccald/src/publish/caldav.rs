/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Remote calendar push.
//!
//! [`CalendarPut`] is the seam the publisher talks to; [`CalDavClient`]
//! implements it as a single HTTP `PUT` of the rendered calendar onto a
//! CalDAV/WebDAV resource.  Because event UIDs are stable, replacing the
//! resource on every cycle acts as an upsert on the server side.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::SinkError;

/// Request timeout for the PUT.
const PUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic credentials for the calendar server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Push a rendered calendar to a remote resource.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarPut: Send + Sync {
    async fn put(
        &self,
        now: DateTime<Utc>,
        url: &str,
        credentials: Option<Credentials>,
        artifact: &str,
    ) -> Result<(), SinkError>;
}

// ── CalDavClient ──────────────────────────────────────────────────────────────

/// [`CalendarPut`] over HTTP.
pub struct CalDavClient {
    http: reqwest::Client,
}

impl CalDavClient {
    pub fn new() -> Result<Self, SinkError> {
        let http = reqwest::Client::builder().timeout(PUT_TIMEOUT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CalendarPut for CalDavClient {
    async fn put(
        &self,
        now: DateTime<Utc>,
        url: &str,
        credentials: Option<Credentials>,
        artifact: &str,
    ) -> Result<(), SinkError> {
        debug!(url, generated_at = %now, bytes = artifact.len(), "PUT calendar resource");

        let mut req = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .body(artifact.to_owned());
        if let Some(c) = &credentials {
            req = req.basic_auth(&c.username, Some(&c.password));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
