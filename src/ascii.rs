//! Plain-text departure board for terminals, used by `--stdout`.

use crate::config::{Config, DirectionConfig};
use crate::time_math::{parse_timestamp, Countdown};
use crate::Departure;
use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write};

/// Departures listed per direction in text mode
pub const ASCII_DEPARTURES_PER_DIRECTION: usize = 3;

const RULE_WIDTH: usize = 50;

/// Render the board as text. Departures are expected to be filtered to the
/// configured line already.
pub fn render_ascii<Tz>(departures: &[Departure], config: &Config, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let title = format!("{} ({})", config.station.name, config.station.line);
    let clock = now.format("%H:%M").to_string();
    let pad = RULE_WIDTH.saturating_sub(title.chars().count() + clock.len()).max(1);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "{}{}{}", title, " ".repeat(pad), clock);
    let _ = writeln!(out, "{}", heavy);

    for direction in &config.directions {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", direction.heading);
        let _ = writeln!(out, "{}", light);
        write_direction(&mut out, departures, direction, now);
    }

    out
}

fn write_direction<Tz>(
    out: &mut String,
    departures: &[Departure],
    direction: &DirectionConfig,
    now: &DateTime<Tz>,
) where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let matching: Vec<&Departure> = departures
        .iter()
        .filter(|d| d.heads_towards(&direction.matches))
        .take(ASCII_DEPARTURES_PER_DIRECTION)
        .collect();

    if matching.is_empty() {
        let _ = writeln!(out, "  no departures");
        return;
    }

    for (i, departure) in matching.iter().enumerate() {
        let countdown = Countdown::of(departure, now);
        let at = departure
            .when
            .as_deref()
            .and_then(parse_timestamp)
            .map(|t| t.with_timezone(&now.timezone()).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        let _ = writeln!(
            out,
            "  {}. {:<4} in {:>2} min  ({})  {}",
            i + 1,
            departure.line,
            countdown,
            at,
            departure.direction
        );
    }
}

/// Print the text board to stdout.
pub fn draw_ascii<Tz>(departures: &[Departure], config: &Config, now: &DateTime<Tz>)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    print!("{}", render_ascii(departures, config, now));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn departure(direction: &str, when: Option<&str>) -> Departure {
        Departure {
            line: "U9".to_string(),
            direction: direction.to_string(),
            when: when.map(str::to_string),
        }
    }

    #[test]
    fn test_header_shows_station_and_clock() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
        let text = render_ascii(&[], &Config::default(), &now);
        let header = text.lines().nth(1).unwrap();
        assert!(header.starts_with("Amrumer Straße (U9)"));
        assert!(header.ends_with("11:00"));
    }

    #[test]
    fn test_empty_directions_say_so() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap();
        let text = render_ascii(&[], &Config::default(), &now);
        assert!(text.contains("→ Osloer Straße"));
        assert!(text.contains("→ Rathaus Steglitz"));
        assert_eq!(text.matches("no departures").count(), 2);
    }

    #[test]
    fn test_lists_three_per_direction_in_local_time() {
        let berlin = FixedOffset::east_opt(3600).unwrap();
        let now = berlin.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let departures = vec![
            departure("S+U Osloer Str.", Some("2025-03-01T11:03:30Z")),
            departure("S+U Rathaus Steglitz", Some("2025-03-01T11:05:00Z")),
            departure("S+U Osloer Str.", Some("2025-03-01T11:08:00Z")),
            departure("S+U Osloer Str.", None),
            departure("S+U Osloer Str.", Some("2025-03-01T11:20:00Z")),
        ];

        let text = render_ascii(&departures, &Config::default(), &now);

        assert!(text.contains("1. U9   in  3 min  (12:03:30)  S+U Osloer Str."));
        assert!(text.contains("2. U9   in  8 min  (12:08:00)  S+U Osloer Str."));
        assert!(text.contains("3. U9   in -- min  (--:--:--)  S+U Osloer Str."));
        assert!(!text.contains("12:20:00"));
        assert!(text.contains("1. U9   in  5 min  (12:05:00)  S+U Rathaus Steglitz"));
    }
}
