/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Expiry estimation: block heights → calendar timestamps.
//!
//! Names expire a fixed number of blocks after their last update.  The chain
//! does not tell us *when* that block will be mined, so the estimate assumes a
//! constant block interval and then biases the result earlier by a safety
//! margin.  Finally the estimate is floored onto a coarse grid (the quantum)
//! so that small height jitter between polls does not move the calendar
//! event every cycle.
//!
//! ```text
//! raw      = now + (expiry_height − current_height) × BLOCK_INTERVAL − margin
//! estimate = floor(raw / quantum) × quantum        (grid anchored at 0001-01-01T00:00:00Z)
//! ```
//!
//! Everything here is pure: no I/O, no clock reads.  `now` is always passed
//! in by the poll cycle.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::registry::NameRecord;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Number of blocks after its last update at which a name expires.
pub const EXPIRY_BLOCKS: i64 = 36_000;

/// Assumed time between blocks.  Not measured; a property of the chain's
/// difficulty target.
pub const BLOCK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Seconds from the zero instant (0001-01-01T00:00:00Z) to the Unix epoch.
/// Quantum grids count from the zero instant.
const ZERO_INSTANT_TO_EPOCH_SECS: i128 = 62_135_596_800;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Numeric policy applied to every estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatePolicy {
    /// Subtracted from the raw estimate so notifications fire early.
    pub margin: Duration,

    /// Rounding granularity.  `Duration::ZERO` disables rounding.
    pub quantum: Duration,
}

impl Default for EstimatePolicy {
    fn default() -> Self {
        Self {
            margin: Duration::from_secs(72 * 3600),
            quantum: Duration::from_secs(72 * 3600),
        }
    }
}

/// Derived per-name data, paired 1:1 by index with the [`NameRecord`] slice it
/// was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraInfo {
    /// Rounded, margin-adjusted expiry estimate.
    pub estimated_expiry_time: DateTime<Utc>,

    /// Height at which the name expires.
    pub expiry_height: i64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Height at which `record` expires.
pub fn expiry_height(record: &NameRecord) -> i64 {
    record.registration_height.saturating_add(EXPIRY_BLOCKS)
}

/// Infer the chain's current height from the first record of a batch.
///
/// `height + EXPIRY_BLOCKS − expires_in` is the height the registry used when
/// it computed `expires_in`.  Only the first record is consulted: one
/// `name_list` response is assumed to share a single view of the chain.
/// Returns `None` for an empty batch.
pub fn infer_current_height(records: &[NameRecord]) -> Option<i64> {
    records.first().map(|r| {
        r.registration_height
            .saturating_add(EXPIRY_BLOCKS)
            .saturating_sub(r.blocks_remaining)
    })
}

/// Estimate the calendar timestamp at which a name expires.
///
/// * `expired` names, and names whose expiry height is already reached,
///   estimate to exactly `now` (no margin, no rounding).
/// * Otherwise the result is `now + blocks_to_go × BLOCK_INTERVAL − margin`
///   floored to a multiple of `policy.quantum` since 0001-01-01T00:00:00Z.
///
/// Arithmetic saturates at the limits of [`DateTime<Utc>`] instead of
/// overflowing for absurd block counts.
pub fn estimate_expiry(
    current_height: i64,
    expiry_height: i64,
    expired: bool,
    now: DateTime<Utc>,
    policy: &EstimatePolicy,
) -> DateTime<Utc> {
    if expired || expiry_height <= current_height {
        return now;
    }

    let raw = expiry_height
        .checked_sub(current_height)
        .and_then(|blocks_to_go| (BLOCK_INTERVAL.as_secs() as i64).checked_mul(blocks_to_go))
        .and_then(TimeDelta::try_seconds)
        .and_then(|time_to_go| now.checked_add_signed(time_to_go))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let raw = TimeDelta::from_std(policy.margin)
        .ok()
        .and_then(|m| raw.checked_sub_signed(m))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    floor_to_quantum(raw, policy.quantum)
}

/// Compute [`ExtraInfo`] for every record, preserving order.
///
/// The output always has exactly `records.len()` entries.
pub fn compute_extra_info(
    now: DateTime<Utc>,
    records: &[NameRecord],
    policy: &EstimatePolicy,
) -> Vec<ExtraInfo> {
    let Some(current_height) = infer_current_height(records) else {
        return Vec::new();
    };

    records
        .iter()
        .map(|r| {
            let expiry_height = expiry_height(r);
            ExtraInfo {
                estimated_expiry_time: estimate_expiry(
                    current_height,
                    expiry_height,
                    r.expired,
                    now,
                    policy,
                ),
                expiry_height,
            }
        })
        .collect()
}

/// Round `t` down to a multiple of `quantum` counted from the zero instant,
/// 0001-01-01T00:00:00Z.
///
/// A zero quantum returns `t` unchanged.  Works in nanoseconds on `i128` so
/// neither the multiplication nor pre-epoch timestamps can overflow.
pub fn floor_to_quantum(t: DateTime<Utc>, quantum: Duration) -> DateTime<Utc> {
    const NANOS: i128 = 1_000_000_000;

    let q = quantum.as_nanos() as i128;
    if q == 0 {
        return t;
    }

    let offset = ZERO_INSTANT_TO_EPOCH_SECS * NANOS;
    let nanos = i128::from(t.timestamp()) * NANOS + i128::from(t.timestamp_subsec_nanos());
    let floored = (nanos + offset).div_euclid(q) * q - offset;

    let secs = floored.div_euclid(NANOS) as i64;
    let sub = floored.rem_euclid(NANOS) as u32;
    DateTime::from_timestamp(secs, sub).unwrap_or(t)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    const H72: Duration = Duration::from_secs(72 * 3600);

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    /// Floor to a multiple of `q` seconds counted from 0001-01-01.
    fn floor_from_zero_instant(secs: i64, q: i64) -> DateTime<Utc> {
        let zero = 62_135_596_800;
        t((secs + zero).div_euclid(q) * q - zero)
    }

    fn policy(margin: Duration, quantum: Duration) -> EstimatePolicy {
        EstimatePolicy { margin, quantum }
    }

    // ── estimate_expiry ───────────────────────────────────────────────────────

    #[test]
    fn reached_height_estimates_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 34, 56).unwrap();
        let p = EstimatePolicy::default();
        assert_eq!(estimate_expiry(100, 100, false, now, &p), now);
        assert_eq!(estimate_expiry(100, 99, false, now, &p), now);
        assert_eq!(estimate_expiry(100, i64::MIN, false, now, &p), now);
    }

    #[test]
    fn expired_flag_overrides_heights() {
        let now = t(1_700_000_123);
        let p = EstimatePolicy::default();
        assert_eq!(estimate_expiry(0, 1_000_000, true, now, &p), now);
    }

    #[test]
    fn scenario_250_days_with_72h_margin_and_quantum() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 7, 0, 0).unwrap();
        let p = policy(H72, H72);

        let got = estimate_expiry(100, 36_100, false, now, &p);

        // 36000 blocks × 10 min = 250 days
        let raw = now + TimeDelta::days(250) - TimeDelta::hours(72);
        let expected = floor_from_zero_instant(raw.timestamp(), 72 * 3600);
        assert_eq!(got, expected);
        assert!(got <= raw);
        assert!(raw - got < TimeDelta::hours(72));
    }

    #[test]
    fn estimate_is_on_grid_and_not_after_raw() {
        let p = policy(Duration::from_secs(3600), Duration::from_secs(86_400));
        for (now_s, cur, exp) in [
            (1_600_000_001_i64, 10_i64, 11_i64),
            (1_650_123_456, 500_000, 536_000),
            (1_700_000_000, 1, 2_000),
            (1_234_567_890, 42, 43),
        ] {
            let now = t(now_s);
            let got = estimate_expiry(cur, exp, false, now, &p);
            let raw = now + TimeDelta::seconds((exp - cur) * 600) - TimeDelta::hours(1);
            assert!(got <= raw, "estimate {got} after raw {raw}");
            assert_eq!(got.timestamp().rem_euclid(86_400), 0);
            assert_eq!(got.timestamp_subsec_nanos(), 0);
        }
    }

    #[test]
    fn zero_quantum_disables_rounding() {
        let now = t(1_700_000_017);
        let p = policy(Duration::ZERO, Duration::ZERO);
        let got = estimate_expiry(0, 1, false, now, &p);
        assert_eq!(got, t(1_700_000_017 + 600));
    }

    #[test]
    fn huge_block_counts_saturate_instead_of_panicking() {
        let now = t(1_700_000_000);
        let p = EstimatePolicy::default();
        let got = estimate_expiry(i64::MIN, i64::MAX, false, now, &p);
        assert!(got > now);
    }

    // ── floor_to_quantum ──────────────────────────────────────────────────────

    #[test]
    fn floor_grid_counts_from_year_one() {
        let zero = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            .and_utc();
        assert_eq!(zero.timestamp(), -62_135_596_800);

        // 0001-01-01 is on the grid; the Unix epoch is two days past a slot.
        assert_eq!(floor_to_quantum(zero, H72), zero);
        assert_eq!(
            floor_to_quantum(t(0), H72),
            Utc.with_ymd_and_hms(1969, 12, 30, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn default_policy_matches_published_calendar_slots() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let p = EstimatePolicy::default();

        // 36000 blocks: 2024-09-07 minus 72h is 2024-09-04, slot starts 09-03.
        assert_eq!(
            estimate_expiry(100_000, 136_000, false, now, &p),
            Utc.with_ymd_and_hms(2024, 9, 3, 0, 0, 0).unwrap()
        );
        // 6000 blocks: 2024-02-08T16:00 falls in the slot starting 02-06.
        assert_eq!(
            estimate_expiry(100_000, 106_000, false, now, &p),
            Utc.with_ymd_and_hms(2024, 2, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn floor_handles_pre_epoch_times() {
        let got = floor_to_quantum(t(-1), Duration::from_secs(60));
        assert_eq!(got, t(-60));
    }

    #[test]
    fn floor_drops_subsecond_part() {
        let at = DateTime::from_timestamp(120, 999_999_999).unwrap();
        assert_eq!(floor_to_quantum(at, Duration::from_secs(60)), t(120));
    }

    // ── infer_current_height / compute_extra_info ─────────────────────────────

    #[test]
    fn current_height_from_first_record_only() {
        let records = vec![
            NameRecord::new("d/a", 1_000, 35_000, false), // implies 2000
            NameRecord::new("d/b", 1_500, 35_000, false), // would imply 2500
        ];
        assert_eq!(infer_current_height(&records), Some(2_000));
        assert_eq!(infer_current_height(&[]), None);
    }

    #[test]
    fn extra_info_is_index_aligned() {
        let now = t(1_700_000_000);
        let records = vec![
            NameRecord::new("d/a", 1_000, 35_000, false),
            NameRecord::new("d/b", 900, -100, true),
            NameRecord::new("d/c", 1_900, 35_900, false),
        ];

        let info = compute_extra_info(now, &records, &EstimatePolicy::default());

        assert_eq!(info.len(), records.len());
        assert_eq!(info[0].expiry_height, 37_000);
        assert_eq!(info[1].expiry_height, 36_900);
        assert_eq!(info[2].expiry_height, 37_900);
        assert_eq!(info[1].estimated_expiry_time, now);
        assert!(info[0].estimated_expiry_time < info[2].estimated_expiry_time);
    }

    #[test]
    fn empty_batch_yields_no_info() {
        let info = compute_extra_info(t(0), &[], &EstimatePolicy::default());
        assert!(info.is_empty());
    }
}
