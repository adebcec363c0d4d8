//! Human-readable durations (`90s`, `15m`, `1h30m`, `24h`)
//!
//! Used for the sync interval and the per-request timeout. Values are a
//! sequence of `<number><unit>` pairs with units `ns`, `us`, `ms`, `s`, `m`
//! and `h`. Numbers may carry a fraction (`1.5h`).

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A duration that reads and writes as `1h30m` style text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Interval(Duration);

impl Interval {
    /// Wrap a duration
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Interval of whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// The wrapped duration
    pub const fn as_duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for Interval {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<Interval> for Duration {
    fn from(interval: Interval) -> Self {
        interval.0
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidInterval {
            input: input.to_string(),
            message: message.to_string(),
        };

        let s = input.trim();
        if s.is_empty() {
            return Err(invalid("empty duration"));
        }
        if s == "0" {
            return Ok(Self(Duration::ZERO));
        }

        let mut total: u128 = 0;
        let mut rest = s;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let number = &rest[..number_len];
            rest = &rest[number_len..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let unit_nanos: u128 = match &rest[..unit_len] {
                "ns" => 1,
                "us" | "µs" => 1_000,
                "ms" => 1_000_000,
                "s" => 1_000_000_000,
                "m" => 60 * 1_000_000_000,
                "h" => 3_600 * 1_000_000_000,
                "" => return Err(invalid("missing unit (use ms, s, m or h)")),
                _ => return Err(invalid("unknown unit (use ms, s, m or h)")),
            };
            rest = &rest[unit_len..];

            let part = scale(number, unit_nanos).ok_or_else(|| invalid("expected a number"))?;
            total = total.saturating_add(part);
        }

        let nanos = u64::try_from(total).map_err(|_| invalid("duration out of range"))?;
        Ok(Self(Duration::from_nanos(nanos)))
    }
}

/// `number` (`5`, `1.5`, `.5`) times `unit_nanos`, truncated to whole nanoseconds
fn scale(number: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(whole) || !digits_only(fraction) {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit_nanos)?;

    // Digits past the 18th cannot change the result
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let value: u128 = fraction.parse().ok()?;
        let scale = 10u128.pow(fraction.len() as u32);
        nanos = nanos.checked_add(value * unit_nanos / scale)?;
    }
    Some(nanos)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_zero() {
            return f.write_str("0s");
        }

        let secs = self.0.as_secs();
        let millis = self.0.subsec_millis();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

        if h > 0 {
            write!(f, "{h}h")?;
        }
        if m > 0 {
            write!(f, "{m}m")?;
        }
        if s > 0 {
            write!(f, "{s}s")?;
        }
        if millis > 0 {
            write!(f, "{millis}ms")?;
        }
        let nanos = self.0.subsec_nanos() % 1_000_000;
        if nanos > 0 {
            write!(f, "{nanos}ns")?;
        }
        Ok(())
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
