//! Expected-duration text format: `[D ]HH:MM:SS[.ffffff]`
//!
//! Existing clients exchange durations in this form, so it is kept on the wire.
//! Plain integer seconds (`"3600"` or `3600`) are accepted on input.

use chrono::Duration;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Longest accepted duration, in days
pub const MAX_DAYS: i64 = 36_500;

/// Upper bound applied to every parsed duration
pub fn max() -> Duration {
    Duration::days(MAX_DAYS)
}

/// Render a duration as `[D ]HH:MM:SS[.ffffff]`.
pub fn format(duration: &Duration) -> String {
    let whole = duration.num_seconds();
    let frac = (*duration - Duration::seconds(whole))
        .num_microseconds()
        .unwrap_or(0)
        .unsigned_abs();
    let negative = *duration < Duration::zero();

    let secs = whole.unsigned_abs();
    let days = secs / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;
    let seconds = secs % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{} ", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if frac > 0 {
        out.push_str(&format!(".{:06}", frac));
    }
    out
}

/// Parse `[D ]HH:MM:SS[.ffffff]`, `MM:SS`, or bare seconds.
///
/// Negative values and values above [`MAX_DAYS`] are rejected.
pub fn parse(input: &str) -> Option<Duration> {
    let input = input.trim();
    let (days, clock) = match input.split_once(' ') {
        Some((days, rest)) => (days.parse::<i64>().ok().filter(|d| *d >= 0)?, rest.trim()),
        None => (0, input),
    };

    let (whole, frac) = match clock.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (clock, None),
    };

    let parts: Vec<&str> = whole.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut secs: i64 = 0;
    for (idx, part) in parts.iter().enumerate() {
        let value: u32 = part.parse().ok()?;
        // Only the leading component may exceed its clock range
        if idx > 0 && value >= 60 {
            return None;
        }
        secs = secs.checked_mul(60)?.checked_add(i64::from(value))?;
    }

    let micros = match frac {
        None => 0,
        Some(f) if !f.is_empty() && f.len() <= 6 && f.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{:0<6}", f).parse::<i64>().ok()?
        }
        Some(_) => return None,
    };

    let days = Duration::try_days(days)?;
    let clock = Duration::try_seconds(secs)?;
    within_bounds(days.checked_add(&clock)?.checked_add(&Duration::microseconds(micros))?)
}

fn within_bounds(duration: Duration) -> Option<Duration> {
    (duration >= Duration::zero() && duration <= max()).then_some(duration)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: de::Error>(self) -> Result<Duration, E> {
        match self {
            RawDuration::Seconds(secs) => i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(within_bounds)
                .ok_or_else(|| E::custom(format!("duration out of range (max {} days)", MAX_DAYS))),
            RawDuration::Text(text) => parse(&text).ok_or_else(|| {
                E::custom(format!(
                    "invalid duration '{}', expected [D ]HH:MM:SS up to {} days",
                    text, MAX_DAYS
                ))
            }),
        }
    }
}

/// Serde adapter for `Option<Duration>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&format(duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<RawDuration>::deserialize(deserializer)?
            .map(RawDuration::into_duration)
            .transpose()
    }
}

/// Serde adapter for patch fields: absent => `None`, `null` => `Some(None)`.
///
/// Must be combined with `#[serde(default)]`.
pub mod double_option {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<Duration>>, D::Error> {
        super::option::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_existing_clients_expect() {
        assert_eq!(format(&Duration::hours(2)), "02:00:00");
        assert_eq!(format(&Duration::minutes(90)), "01:30:00");
        assert_eq!(format(&(Duration::days(1) + Duration::hours(3))), "1 03:00:00");
        assert_eq!(format(&Duration::milliseconds(1500)), "00:00:01.500000");
    }

    #[test]
    fn parses_clock_and_day_forms() {
        assert_eq!(parse("02:00:00"), Some(Duration::hours(2)));
        assert_eq!(parse("1 03:00:00"), Some(Duration::days(1) + Duration::hours(3)));
        assert_eq!(parse("45:30"), Some(Duration::minutes(45) + Duration::seconds(30)));
        assert_eq!(parse("3600"), Some(Duration::hours(1)));
        assert_eq!(parse("00:00:01.5"), Some(Duration::milliseconds(1500)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("01:75:00"), None);
        assert_eq!(parse("-01:00:00"), None);
        assert_eq!(parse("1:2:3:4"), None);
        assert_eq!(parse("abc"), None);
    }

    #[test]
    fn rejects_durations_beyond_the_limit() {
        assert_eq!(parse("4294967295 00:00:00"), None);
        assert_eq!(parse("36501 00:00:00"), None);
        assert_eq!(parse("36500 00:00:00"), Some(Duration::days(MAX_DAYS)));
        assert_eq!(parse("9223372036854775"), None);
    }

    #[test]
    fn oversized_values_fail_deserialization() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[serde(default, with = "super::option")]
            duration: Option<Duration>,
        }

        for body in [
            r#"{"duration": "4294967295 00:00:00"}"#,
            r#"{"duration": 9223372036854775}"#,
        ] {
            assert!(serde_json::from_str::<Holder>(body).is_err(), "{} should be rejected", body);
        }
        let ok: Holder = serde_json::from_str(r#"{"duration": 5400}"#).unwrap();
        assert_eq!(ok.duration, Some(Duration::minutes(90)));
    }

    #[test]
    fn formats_negative_and_large_values() {
        assert_eq!(format(&Duration::days(MAX_DAYS)), "36500 00:00:00");
        assert_eq!(format(&-Duration::minutes(90)), "-01:30:00");
    }
}
