/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! nccald – Namecoin name expiry calendar daemon
//!
//! Polls a Namecoin node for the names held by its wallet, estimates when each
//! one expires, and publishes the estimates as an iCalendar feed.
//!
//! ```text
//! lib.rs
//! ├── registry/       – name records, NameRegistry trait, JSON-RPC client
//! ├── estimator       – block height → wall-clock expiry estimate
//! ├── calendar/       – name encoding, event building, ICS rendering
//! ├── publish/        – atomic file sink + CalDAV PUT sink
//! ├── server/         – poll scheduler, run-once mode
//! └── config/         – YAML configuration, duration strings
//! ```

pub mod calendar;
pub mod config;
pub mod estimator;
pub mod publish;
pub mod registry;
pub mod server;
