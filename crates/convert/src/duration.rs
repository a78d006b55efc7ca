//! Durations as the dialects write them (`15s`, `1m30s`, `500ms`, `1d`) and as
//! the pipeline language renders them (`1m30s`, `1h0m0s`, `1.5s`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

/// A non-negative duration with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub std::time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Duration(std::time::Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Duration(std::time::Duration::from_millis(millis))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// `whole` followed by the non-zero fractional digits of `frac / scale`.
fn with_fraction(whole: u128, frac: u128, scale: u128) -> String {
    if frac == 0 {
        return whole.to_string();
    }
    let digits = scale.to_string().len() - 1;
    let padded = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return write!(f, "0s");
        }
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{}ns", nanos);
        }
        if nanos < NANOS_PER_MILLI {
            let s = with_fraction(nanos / NANOS_PER_MICRO, nanos % NANOS_PER_MICRO, NANOS_PER_MICRO);
            return write!(f, "{}µs", s);
        }
        if nanos < NANOS_PER_SEC {
            let s = with_fraction(nanos / NANOS_PER_MILLI, nanos % NANOS_PER_MILLI, NANOS_PER_MILLI);
            return write!(f, "{}ms", s);
        }

        let secs = nanos / NANOS_PER_SEC;
        let sub = nanos % NANOS_PER_SEC;
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write!(f, "{}s", with_fraction(seconds, sub, NANOS_PER_SEC))
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| DurationError {
            input: input.to_owned(),
            reason: reason.to_owned(),
        };
        let s = input.trim();
        if s == "0" {
            return Ok(Duration::default());
        }
        if s.is_empty() {
            return Err(fail("empty string"));
        }

        let mut total: u128 = 0;
        let mut rest = s;
        while !rest.is_empty() {
            let (whole, frac_digits, after) = split_number(rest);
            if whole.is_empty() && frac_digits.is_empty() {
                return Err(fail("expected a number"));
            }
            let unit_len = after
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(after.len());
            if unit_len == 0 {
                return Err(fail("missing unit"));
            }
            let unit = unit_nanos(&after[..unit_len]).ok_or_else(|| fail("unknown unit"))?;
            let component = component_nanos(whole, frac_digits, unit)
                .ok_or_else(|| fail("value out of range"))?;
            total = total
                .checked_add(component)
                .filter(|t| *t <= u128::from(u64::MAX))
                .ok_or_else(|| fail("value out of range"))?;
            rest = &after[unit_len..];
        }
        let nanos = u64::try_from(total).map_err(|_| fail("value out of range"))?;
        Ok(Duration(std::time::Duration::from_nanos(nanos)))
    }
}

/// Split `s` into its integer digits, fractional digits and the remainder.
fn split_number(s: &str) -> (&str, &str, &str) {
    let int_len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (whole, rest) = s.split_at(int_len);
    let Some(rest) = rest.strip_prefix('.') else {
        return (whole, "", rest);
    };
    let frac_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (frac, rest) = rest.split_at(frac_len);
    (whole, frac, rest)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        "d" => 86_400 * NANOS_PER_SEC,
        "w" => 604_800 * NANOS_PER_SEC,
        "y" => 31_536_000 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

/// `whole.frac` units in whole nanoseconds, truncating below one
/// nanosecond. Fraction digits past the 20th cannot change the result.
fn component_nanos(whole: &str, frac: &str, unit: u128) -> Option<u128> {
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit)?;
    let frac = &frac[..frac.len().min(20)];
    if !frac.is_empty() {
        let digits: u128 = frac.parse().ok()?;
        let scale = 10u128.pow(frac.len() as u32);
        nanos = nanos.checked_add(digits * unit / scale)?;
    }
    Some(nanos)
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Duration {
        s.parse().unwrap()
    }

    #[test]
    fn formats_like_the_pipeline_language() {
        assert_eq!(d("15s").to_string(), "15s");
        assert_eq!(d("1m").to_string(), "1m0s");
        assert_eq!(d("90s").to_string(), "1m30s");
        assert_eq!(d("2h").to_string(), "2h0m0s");
        assert_eq!(d("500ms").to_string(), "500ms");
        assert_eq!(d("1.5s").to_string(), "1.5s");
        assert_eq!(d("250us").to_string(), "250µs");
        assert_eq!(d("1d").to_string(), "24h0m0s");
        assert_eq!(Duration::default().to_string(), "0s");
    }

    #[test]
    fn parses_compound_values() {
        assert_eq!(d("1h30m"), Duration::from_secs(5400));
        assert_eq!(d("0"), Duration::default());
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Duration>().is_err());
        assert!("10".parse::<Duration>().is_err());
        assert!("10parsecs".parse::<Duration>().is_err());
        assert!("s".parse::<Duration>().is_err());
        assert!(".s".parse::<Duration>().is_err());
        assert!("1.5".parse::<Duration>().is_err());
    }

    #[test]
    fn mixed_units_keep_nanosecond_precision() {
        assert_eq!(d("1h0.000000001s").0.as_nanos(), 3_600_000_000_001);
        assert_eq!(d("1h0.000000001s").to_string(), "1h0m0.000000001s");
        assert_eq!(d("1.000000001h").0.as_nanos(), 3_600_000_003_600);
        assert_eq!(d(".5s"), Duration::from_millis(500));
        assert_eq!(d("1.s"), Duration::from_secs(1));
        assert_eq!(d("2562047h47m16.854775807s").0.as_nanos(), 9_223_372_036_854_775_807);
    }

    #[test]
    fn overflowing_values_are_rejected() {
        let err = "600000y".parse::<Duration>().unwrap_err();
        assert_eq!(err.reason, "value out of range");
    }
}
