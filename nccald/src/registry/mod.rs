/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Name registry access.
//!
//! The poll loop only needs one thing from the registry: the list of names
//! owned by the wallet, each with its registration height and the number of
//! blocks left before it expires.  That contract is the [`NameRegistry`]
//! trait; [`rpc::NamecoinRpcClient`] is the production implementation.
//!
//! ```text
//! NameRegistry::list_names()  ──►  Vec<NameRecord>  ──►  estimator
//! ```

pub mod rpc;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use rpc::{NamecoinRpcClient, RpcCredentials};

// ── NameRecord ────────────────────────────────────────────────────────────────

/// One registry entry as returned by a single `name_list` query.
///
/// Immutable snapshot; a fresh list is fetched on every poll cycle and nothing
/// is persisted between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameRecord {
    /// The registered name, e.g. `d/example`.
    pub name: String,

    /// Block height at which the name was last registered or updated.
    #[serde(rename = "height")]
    pub registration_height: i64,

    /// Blocks remaining until the name expires.  Negative once expired.
    #[serde(rename = "expires_in")]
    pub blocks_remaining: i64,

    /// `true` once the registry considers the name expired.
    #[serde(default)]
    pub expired: bool,
}

impl NameRecord {
    /// Convenience constructor, mostly for tests and fakes.
    pub fn new(
        name: impl Into<String>,
        registration_height: i64,
        blocks_remaining: i64,
        expired: bool,
    ) -> Self {
        Self {
            name: name.into(),
            registration_height,
            blocks_remaining,
            expired,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure of a registry query.
///
/// All variants are treated as transient by the poll loop: the cycle is
/// skipped and the next tick tries again.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP request could not be sent or the response body not read.
    #[error("registry transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The RPC cookie file could not be read.
    #[error("cannot read RPC cookie file {}: {source}", path.display())]
    Cookie {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The RPC cookie file is not of the form `user:password`.
    #[error("malformed RPC cookie file {}", path.display())]
    MalformedCookie { path: PathBuf },

    /// The server rejected the configured credentials.
    #[error("registry rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The server answered with a non-success HTTP status and no RPC error.
    #[error("registry returned HTTP {status}")]
    Status { status: u16 },

    /// The JSON-RPC response carried an `error` object.
    #[error("registry RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response body was not the JSON-RPC shape expected.
    #[error("registry response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response was well-formed JSON-RPC but had no `result`.
    #[error("registry response carried neither result nor error")]
    EmptyResponse,
}

// ── NameRegistry ──────────────────────────────────────────────────────────────

/// The "list names" operation consumed by the poll loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NameRegistry: Send + Sync {
    /// Return every name currently held, in registry order.
    async fn list_names(&self) -> Result<Vec<NameRecord>, RegistryError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
