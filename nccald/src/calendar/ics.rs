/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! iCalendar (RFC 5545) serialization.
//!
//! A thin adapter from [`CalendarEvent`]s onto the `icalendar` crate, which
//! owns line folding, TEXT escaping and the component layout.  On top of that
//! this module enforces one policy: values with control characters (other
//! than TAB and LF) are rejected, so a calendar is either rendered completely
//! or not at all.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, Event, EventLike, Property};
use thiserror::Error;

use super::CalendarEvent;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a calendar could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A property value contains a control character iCalendar cannot carry.
    #[error("property {property} contains control character U+{code:04X}")]
    ControlCharacter { property: &'static str, code: u32 },
}

// ── Metadata ──────────────────────────────────────────────────────────────────

/// Calendar-level properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMetadata {
    pub name: String,
    /// Emitted only when non-empty.
    pub description: String,
    /// Written as `LAST-MODIFIED`.
    pub generated_at: DateTime<Utc>,
}

impl CalendarMetadata {
    /// Default metadata stamped with `generated_at`.
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            name: "nccald calendar".to_string(),
            description: String::new(),
            generated_at,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render `events` as one `VCALENDAR` with a `VEVENT` per event, in order.
///
/// # Errors
/// [`RenderError::ControlCharacter`] if any value cannot be represented.
/// Nothing is returned in that case, so callers never see half a calendar.
pub fn render(events: &[CalendarEvent], meta: &CalendarMetadata) -> Result<String, RenderError> {
    check_controls("NAME", &meta.name)?;
    check_controls("DESCRIPTION", &meta.description)?;

    let mut calendar = Calendar::new();
    calendar
        .name(&meta.name)
        .append_property(Property::new("METHOD", "PUBLISH"))
        .append_property(Property::new(
            "LAST-MODIFIED",
            &format_utc(meta.generated_at),
        ));
    if !meta.description.is_empty() {
        calendar.description(&meta.description);
    }

    for ev in events {
        calendar.push(to_ical_event(ev)?);
    }

    Ok(calendar.done().to_string())
}

fn to_ical_event(ev: &CalendarEvent) -> Result<Event, RenderError> {
    check_controls("UID", &ev.uid)?;
    check_controls("SUMMARY", &ev.summary)?;
    check_controls("DESCRIPTION", &ev.description)?;
    check_controls("ORGANIZER", &ev.organizer)?;

    let organizer = if ev.organizer.contains(':') {
        ev.organizer.clone()
    } else {
        format!("mailto:{}", ev.organizer)
    };

    Ok(Event::new()
        .uid(&ev.uid)
        .timestamp(ev.created_at)
        .add_property("CREATED", format_utc(ev.created_at))
        .starts(ev.timestamp)
        .ends(ev.timestamp)
        .summary(&ev.summary)
        .description(&ev.description)
        .add_property("ORGANIZER", organizer)
        .done())
}

/// `YYYYMMDDTHHMMSSZ`.
fn format_utc(t: DateTime<Utc>) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

fn check_controls(property: &'static str, value: &str) -> Result<(), RenderError> {
    match value
        .chars()
        .find(|c| c.is_control() && *c != '\n' && *c != '\t')
    {
        Some(c) => Err(RenderError::ControlCharacter {
            property,
            code: u32::from(c),
        }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
