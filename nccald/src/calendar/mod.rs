/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Calendar event construction.
//!
//! Turns index-aligned `(NameRecord, ExtraInfo)` pairs into [`CalendarEvent`]s.
//! Pure and deterministic: the same inputs always produce byte-identical
//! events, and every event's UID depends only on the name, so a remote
//! calendar sees repeated polls as updates of the same events.
//!
//! Serialization to iCalendar text lives in [`ics`].

pub mod ics;

use chrono::{DateTime, Utc};

use crate::estimator::ExtraInfo;
use crate::registry::NameRecord;

pub use ics::{render, CalendarMetadata, RenderError};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Suffix appended to the encoded name to form an event UID.
pub const UID_DOMAIN: &str = "nccald";

/// Organizer contact stamped on every event.
pub const ORGANIZER: &str = "nccald@namecoin.org";

// ── CalendarEvent ─────────────────────────────────────────────────────────────

/// One zero-duration calendar entry marking a name's estimated expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// `<encoded name>@nccald`; stable across polls.
    pub uid: String,
    pub created_at: DateTime<Utc>,
    /// Start and end instant (the event has no duration).
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub organizer: String,
}

// ── Name encoding ─────────────────────────────────────────────────────────────

/// Munge a registry name into something safe for UIDs, URLs and paths.
///
/// `[a-z0-9-]` pass through; every other character becomes `_` followed by
/// its code point in lowercase hex, zero-padded to at least two digits.
/// Code points above `0xff` therefore produce more than two hex digits, so
/// decoding is only unambiguous for the 8-bit range.
///
/// ```
/// use nccald::calendar::encode_name;
/// assert_eq!(encode_name("abc-1"), "abc-1");
/// assert_eq!(encode_name("AB"), "_41_42");
/// assert_eq!(encode_name("d/x"), "d_2fx");
/// ```
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
        } else {
            out.push_str(&format!("_{:02x}", u32::from(c)));
        }
    }
    out
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Build one event per record, in input order.
///
/// `records` and `extra` must be the same length (they come from the same
/// poll cycle); a mismatch is a caller bug and only the common prefix is used.
pub fn build_events(
    generated_at: DateTime<Utc>,
    records: &[NameRecord],
    extra: &[ExtraInfo],
) -> Vec<CalendarEvent> {
    debug_assert_eq!(records.len(), extra.len(), "records/extra length mismatch");

    records
        .iter()
        .zip(extra)
        .map(|(record, info)| build_event(generated_at, record, info))
        .collect()
}

fn build_event(generated_at: DateTime<Utc>, record: &NameRecord, info: &ExtraInfo) -> CalendarEvent {
    let name = encode_name(&record.name);

    CalendarEvent {
        uid: format!("{name}@{UID_DOMAIN}"),
        created_at: generated_at,
        timestamp: info.estimated_expiry_time,
        summary: format!(
            "Expiry of Namecoin name \"{name}\" ({})",
            info.expiry_height
        ),
        description: format!(
            "Namecoin name \"{name}\" is estimated to expire around this time (expires at height {})",
            info.expiry_height
        ),
        organizer: ORGANIZER.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
