//! Text forms of durations and timestamps.
//!
//! Durations are written as a sequence of decimal numbers with unit suffixes
//! (`"10m"`, `"1h30m"`, `"1.5s"`, `"-250ms"`). Accepted units are `ns`, `us`
//! (or `µs`), `ms`, `s`, `m` and `h`. [`format_duration`] emits the shortest
//! canonical spelling, so formatting a parsed canonical string gives the same
//! string back.
//!
//! Timestamps are RFC 3339. Output is always UTC with a `Z` suffix and only
//! as many fractional digits as needed.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Parse a duration string into signed nanoseconds.
pub fn parse_duration(input: &str) -> Result<i64> {
    let invalid = |reason: &str| Error::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid(&format!("unknown unit {unit:?}")))?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };
        total = whole
            .checked_mul(u128::from(scale))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| invalid("duration out of range"))?;

        // Digits beyond nanosecond resolution cannot change the result
        let fraction = &fraction[..fraction.len().min(18)];
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| invalid("bad fraction"))?;
            total += digits * u128::from(scale) / 10u128.pow(fraction.len() as u32);
        }

        if total > u128::from(i64::MAX.unsigned_abs()) + u128::from(negative) {
            return Err(invalid("duration out of range"));
        }
        rest = tail;
    }

    if negative {
        Ok((total as i64).wrapping_neg())
    } else {
        Ok(total as i64)
    }
}

/// Format signed nanoseconds as the canonical duration string.
pub fn format_duration(nanos: i64) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    let abs = nanos.unsigned_abs();

    let hours = abs / NANOS_PER_HOUR;
    let minutes = (abs % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
    let seconds = (abs % NANOS_PER_MINUTE) / NANOS_PER_SECOND;
    let sub = abs % NANOS_PER_SECOND;

    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }

    if seconds > 0 || (sub > 0 && (hours > 0 || minutes > 0)) {
        if sub == 0 {
            out.push_str(&format!("{seconds}s"));
        } else {
            let fraction = format!("{sub:09}");
            out.push_str(&format!("{seconds}.{}s", fraction.trim_end_matches('0')));
        }
    } else if sub > 0 {
        if sub % NANOS_PER_MILLI == 0 {
            out.push_str(&format!("{}ms", sub / NANOS_PER_MILLI));
        } else if sub % NANOS_PER_MICRO == 0 {
            out.push_str(&format!("{}us", sub / NANOS_PER_MICRO));
        } else {
            out.push_str(&format!("{sub}ns"));
        }
    }

    out
}

/// Parse an RFC 3339 timestamp into a UTC instant.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Format a UTC instant as RFC 3339 with a `Z` suffix.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: i64 = 1_000_000_000;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("10m").unwrap(), 600 * S);
        assert_eq!(parse_duration("2h").unwrap(), 7200 * S);
        assert_eq!(parse_duration("250ms").unwrap(), 250_000_000);
        assert_eq!(parse_duration("3us").unwrap(), 3_000);
        assert_eq!(parse_duration("3µs").unwrap(), 3_000);
        assert_eq!(parse_duration("7ns").unwrap(), 7);
        assert_eq!(parse_duration("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), 5400 * S);
        assert_eq!(parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert_eq!(parse_duration(".5h").unwrap(), 1800 * S);
        assert_eq!(parse_duration("-1m").unwrap(), -60 * S);
        assert_eq!(parse_duration("+1m").unwrap(), 60 * S);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "-", "10", "m", "1x", "1.s.", "1..5s", "h1", "5 m"] {
            assert!(
                matches!(parse_duration(input), Err(Error::InvalidDuration { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_range() {
        assert!(parse_duration("2562047h").is_ok());
        assert!(parse_duration("2562048h").is_err());
        assert_eq!(parse_duration("-9223372036854775808ns").unwrap(), i64::MIN);
        assert!(parse_duration("9223372036854775808ns").is_err());
    }

    #[test]
    fn test_format_canonical() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(600 * S), "10m");
        assert_eq!(format_duration(7200 * S), "2h");
        assert_eq!(format_duration(5400 * S), "1h30m");
        assert_eq!(format_duration(90 * S), "1m30s");
        assert_eq!(format_duration(1_500_000_000), "1.5s");
        assert_eq!(format_duration(60 * S + 500_000_000), "1m0.5s");
        assert_eq!(format_duration(250_000_000), "250ms");
        assert_eq!(format_duration(1_500), "1500ns");
        assert_eq!(format_duration(3_000), "3us");
        assert_eq!(format_duration(-60 * S), "-1m");
    }

    #[test]
    fn test_canonical_strings_reproduce() {
        for text in ["10m", "2h", "1h30m", "1.5s", "250ms", "3us", "7ns", "-45s", "1h0m5s"] {
            let nanos = parse_duration(text).unwrap();
            let canonical = format_duration(nanos);
            assert_eq!(parse_duration(&canonical).unwrap(), nanos);
            if text != "1h0m5s" {
                assert_eq!(canonical, text);
            }
        }
        assert_eq!(format_duration(i64::MIN), "-2562047h47m16.854775808s");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let t = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(format_timestamp(&t), "2024-03-01T12:30:00Z");

        let offset = parse_timestamp("2024-03-01T14:30:00.250+02:00").unwrap();
        assert_eq!(format_timestamp(&offset), "2024-03-01T12:30:00.250Z");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(Error::InvalidTimestamp { .. })
        ));
    }
}
