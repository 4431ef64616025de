/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! JSON-RPC client for a Namecoin Core node.
//!
//! Namecoin Core only speaks JSON-RPC 1.0 over plain HTTP POST, so each query
//! is a single request/response with basic credentials.  Credentials come
//! either from the configured username/password or, when no password is set,
//! from the node's `.cookie` file.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{NameRecord, NameRegistry, RegistryError};
use crate::config::RpcConfig;

// ── Credentials ───────────────────────────────────────────────────────────────

/// Basic-auth credentials for the RPC server.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RpcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RpcCredentials {
    /// Pick credentials from `config`.
    ///
    /// An explicit password always wins.  Otherwise, if a cookie path is set,
    /// the cookie file (`user:password` on one line) is read.  With neither,
    /// the configured username is used with an empty password.
    pub fn resolve(config: &RpcConfig) -> Result<Self, RegistryError> {
        if config.password.is_empty() {
            if let Some(path) = &config.cookie_path {
                return Self::from_cookie_file(path);
            }
        }

        Ok(Self {
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Read a `user:password` cookie file.
    pub fn from_cookie_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Cookie {
            path: path.to_path_buf(),
            source,
        })?;

        let line = content.lines().next().unwrap_or_default();
        match line.split_once(':') {
            Some((user, pass)) if !user.is_empty() => Ok(Self {
                username: user.to_string(),
                password: pass.to_string(),
            }),
            _ => Err(RegistryError::MalformedCookie {
                path: path.to_path_buf(),
            }),
        }
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

// ── NamecoinRpcClient ─────────────────────────────────────────────────────────

/// [`NameRegistry`] backed by a Namecoin Core JSON-RPC endpoint.
pub struct NamecoinRpcClient {
    http: reqwest::Client,
    url: String,
    credentials: RpcCredentials,
    next_id: AtomicU64,
}

impl NamecoinRpcClient {
    /// Build a client from the RPC section of the configuration.
    ///
    /// # Errors
    /// Fails if the cookie file is needed but unreadable, or if the HTTP client
    /// cannot be constructed.  No request is sent here.
    pub fn new(config: &RpcConfig) -> Result<Self, RegistryError> {
        let credentials = RpcCredentials::resolve(config)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let url = endpoint_url(&config.address);
        debug!(url = %url, user = %credentials.username, "RPC client configured");

        Ok(Self {
            http,
            url,
            credentials,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T>(&self, method: &str, params: Vec<serde_json::Value>) -> Result<T, RegistryError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self
            .http
            .post(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RegistryError::Unauthorized {
                status: status.as_u16(),
            });
        }

        // Namecoin Core reports RPC errors with HTTP 500 and a JSON body, so
        // the body is parsed before the status is judged.
        let body = resp.bytes().await?;
        let parsed: RpcResponse<T> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RegistryError::Status {
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(RegistryError::Decode(e)),
        };

        if let Some(err) = parsed.error {
            return Err(RegistryError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        parsed.result.ok_or(RegistryError::EmptyResponse)
    }
}

#[async_trait]
impl NameRegistry for NamecoinRpcClient {
    async fn list_names(&self) -> Result<Vec<NameRecord>, RegistryError> {
        self.call("name_list", Vec::new()).await
    }
}

/// Turn a configured `host:port` into a request URL.  Addresses that already
/// carry a scheme are used verbatim.
fn endpoint_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}/")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
