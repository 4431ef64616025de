/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Unit-suffixed duration strings: `"72h"`, `"10m"`, `"1h30m"`, `"500ms"`.
//!
//! Shared by the CLI and the YAML loader.  Parsing is `humantime`'s; this
//! module only adds the bare-`0` shorthand and a typed error.

use std::time::Duration;

use thiserror::Error;

/// Why a duration string was rejected.
#[derive(Debug, Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration '{input}' (expected e.g. 72h or 1h30m): {source}")]
    Invalid {
        input: String,
        source: humantime::DurationError,
    },
}

/// Parse a sequence of `<integer><unit>` groups.
///
/// Units include `ns`, `us`, `ms`, `s`, `m`, `h`, `d`.  A bare `0` is accepted
/// as zero; any other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    humantime::parse_duration(s).map_err(|source| DurationError::Invalid {
        input: input.to_string(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
