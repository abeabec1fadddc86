//! # Countdown Arithmetic
//!
//! Turns an absolute departure timestamp into the whole-minute countdown shown
//! on the display. The conversion is total: whatever the feed sends, the
//! result is either a number of minutes or [`Countdown::Unknown`].
//!
//! ## Rounding policy
//! - `diff >= 0.5 min`: floor of the difference (`3 min 30 s` shows `3`)
//! - `diff < 0.5 min`: `0`, which also covers trains that already left but
//!   are still listed by the feed; they show as arriving, never negative

use crate::Departure;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::fmt;

/// Whole minutes until a departure, or unknown if the timestamp was unusable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Countdown {
    Minutes(u32),
    Unknown,
}

impl Countdown {
    /// Countdown for a cached departure. Cancelled trips without a
    /// timestamp are unknown.
    pub fn of<Tz: TimeZone>(departure: &Departure, now: &DateTime<Tz>) -> Self {
        match departure.when.as_deref() {
            Some(when) => minutes_until(when, now),
            None => Countdown::Unknown,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Minutes(m) => f.pad(&m.to_string()),
            Countdown::Unknown => f.pad("--"),
        }
    }
}

/// Parse a feed timestamp, accepting both `Z` and explicit zero offsets.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = timestamp.trim();
    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(stem) => format!("{}+00:00", stem),
        None => trimmed.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized).ok()
}

/// Minutes from `now` until `timestamp`, rounded per the display policy.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use departure_board_lib::time_math::{minutes_until, Countdown};
///
/// let now = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
/// assert_eq!(minutes_until("2025-03-01T11:03:30Z", &now), Countdown::Minutes(3));
/// assert_eq!(minutes_until("not a time", &now), Countdown::Unknown);
/// ```
pub fn minutes_until<Tz: TimeZone>(timestamp: &str, now: &DateTime<Tz>) -> Countdown {
    let Some(departs_at) = parse_timestamp(timestamp) else {
        return Countdown::Unknown;
    };

    let diff_ms = departs_at.signed_duration_since(now.clone()).num_milliseconds();
    let minutes = diff_ms as f64 / 60_000.0;

    if minutes >= 0.5 {
        // Float-to-int casts saturate, so absurd future dates cannot wrap
        Countdown::Minutes(minutes.floor() as u32)
    } else {
        Countdown::Minutes(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap()
    }

    fn iso(instant: DateTime<Utc>) -> String {
        instant.to_rfc3339()
    }

    #[test]
    fn test_floor_above_half_minute() {
        let now = reference_now();
        let when = iso(now + Duration::seconds(3 * 60 + 30));
        assert_eq!(minutes_until(&when, &now), Countdown::Minutes(3));

        let when = iso(now + Duration::seconds(59));
        assert_eq!(minutes_until(&when, &now), Countdown::Minutes(0));

        let when = iso(now + Duration::minutes(12));
        assert_eq!(minutes_until(&when, &now), Countdown::Minutes(12));
    }

    #[test]
    fn test_half_minute_boundary() {
        let now = reference_now();
        assert_eq!(
            minutes_until(&iso(now + Duration::seconds(30)), &now),
            Countdown::Minutes(0)
        );
        assert_eq!(
            minutes_until(&iso(now + Duration::seconds(29)), &now),
            Countdown::Minutes(0)
        );
        assert_eq!(
            minutes_until(&iso(now + Duration::seconds(60)), &now),
            Countdown::Minutes(1)
        );
    }

    #[test]
    fn test_departed_trains_collapse_to_zero() {
        let now = reference_now();
        let when = iso(now - Duration::minutes(4));
        assert_eq!(minutes_until(&when, &now), Countdown::Minutes(0));
    }

    #[test]
    fn test_zulu_and_zero_offset_agree() {
        let now = reference_now();
        let zulu = minutes_until("2025-03-01T11:07:10Z", &now);
        let offset = minutes_until("2025-03-01T11:07:10+00:00", &now);
        let local = minutes_until("2025-03-01T12:07:10+01:00", &now);
        assert_eq!(zulu, Countdown::Minutes(7));
        assert_eq!(zulu, offset);
        assert_eq!(zulu, local);
        assert_eq!(
            parse_timestamp("2025-03-01T11:07:10Z"),
            parse_timestamp("2025-03-01T11:07:10+00:00")
        );
    }

    #[test]
    fn test_now_in_other_timezone() {
        let now = reference_now().with_timezone(&FixedOffset::east_opt(3600).unwrap());
        assert_eq!(
            minutes_until("2025-03-01T11:05:00Z", &now),
            Countdown::Minutes(5)
        );
    }

    #[test]
    fn test_malformed_timestamps_are_unknown() {
        let now = reference_now();
        for bad in [
            "",
            "Z",
            "soon",
            "2025-13-01T11:00:00Z",
            "2025-03-01 11:00",
            "2025-03-01T11:00:00",
        ] {
            assert_eq!(minutes_until(bad, &now), Countdown::Unknown, "input {:?}", bad);
        }
    }

    #[test]
    fn test_countdown_of_cancelled_trip() {
        let dep = Departure {
            line: "U9".to_string(),
            direction: "S+U Osloer Str.".to_string(),
            when: None,
        };
        assert_eq!(Countdown::of(&dep, &reference_now()), Countdown::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(Countdown::Minutes(3).to_string(), "3");
        assert_eq!(Countdown::Minutes(0).to_string(), "0");
        assert_eq!(Countdown::Unknown.to_string(), "--");
    }
}
