/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors surfaced by the poll scheduler itself.
//!
//! Per-cycle failures (registry query, rendering, publishing) are *not* here:
//! they are logged inside the loop and reported through
//! [`CycleOutcome`](super::CycleOutcome), never propagated.  What remains is
//! construction failure and lifecycle misuse.

use thiserror::Error;

use crate::publish::SinkError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The registry client could not be built (bad cookie file, TLS setup…).
    #[error("cannot create registry client: {0}")]
    Registry(#[from] RegistryError),

    /// The CalDAV client could not be built.
    #[error("cannot create calendar client: {0}")]
    CalendarClient(#[from] SinkError),

    /// The first-poll marker has already been consumed by another waiter.
    #[error("first poll completion was already awaited")]
    FirstPollAlreadyAwaited,

    /// The poll loop ended without signalling its first poll.
    #[error("poll loop exited before completing its first poll")]
    FirstPollLost,

    /// The poll loop task panicked or was aborted.
    #[error("poll loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
