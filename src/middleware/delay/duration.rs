//! Parsing of human-written durations such as `300ms`, `1.5s` or `1h15m`.
//!
//! Grammar: an optional sign, then one or more `<number><unit>` terms with
//! no separators. Numbers may carry a decimal fraction (`.5s`, `2.s`).
//! Units: `ns`, `us` (also `µs` / `μs`), `ms`, `s`, `m`, `h`. A bare `0`
//! needs no unit. Negative values are accepted and floor to zero since a
//! pause cannot be negative.

use std::fmt;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest accepted duration, in nanoseconds: about 2562047h.
const MAX_NANOS: u128 = i64::MAX as u128;

/// Digits of a fraction kept before the rest is truncated.
const MAX_FRACTION_DIGITS: u32 = 18;

/// Why a duration string was rejected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseDurationError {
    Empty,
    /// A term did not start with a number, e.g. `ms` or `.s`.
    InvalidNumber,
    /// A number without a unit, e.g. `300`.
    MissingUnit,
    UnknownUnit(String),
    /// The total exceeds `i64::MAX` nanoseconds.
    Overflow,
}

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty           => f.write_str("empty duration"),
            Self::InvalidNumber   => f.write_str("invalid number in duration"),
            Self::MissingUnit     => f.write_str("missing unit in duration"),
            Self::UnknownUnit(u)  => write!(f, "unknown unit {u:?} in duration"),
            Self::Overflow        => f.write_str("duration out of range"),
        }
    }
}

impl std::error::Error for ParseDurationError {}

/// Parses `s` into a [`Duration`]. Surrounding whitespace is ignored.
///
/// ```rust
/// use std::time::Duration;
/// use stall::middleware::delay::parse_duration;
///
/// assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
/// assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
/// assert!(parse_duration("soon").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, ParseDurationError> {
    let s = s.trim();
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        Some(_) => (false, s),
        None => return Err(ParseDurationError::Empty),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(ParseDurationError::InvalidNumber);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, fraction, scale, after_number) = split_number(rest)?;
        let (unit, after_unit) = split_unit(after_number)?;
        let per_unit = unit_nanos(unit)?;

        let term = whole
            .checked_mul(per_unit)
            .and_then(|n| n.checked_add(fraction * per_unit / scale))
            .ok_or(ParseDurationError::Overflow)?;
        total = total.checked_add(term).ok_or(ParseDurationError::Overflow)?;
        rest = after_unit;
    }

    if total > MAX_NANOS {
        return Err(ParseDurationError::Overflow);
    }
    let nanos = u64::try_from(total).map_err(|_| ParseDurationError::Overflow)?;
    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos(nanos))
}

/// Splits a leading `123.456` off `s`, returning the whole part, the kept
/// fraction digits as an integer, `10^kept_digits`, and the remainder.
fn split_number(s: &str) -> Result<(u128, u128, u128, &str), ParseDurationError> {
    let bytes = s.as_bytes();
    let mut i = 0;

    let mut whole: u128 = 0;
    let mut whole_digits = 0;
    while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        whole = whole
            .checked_mul(10)
            .and_then(|w| w.checked_add(u128::from(d - b'0')))
            .ok_or(ParseDurationError::Overflow)?;
        whole_digits += 1;
        i += 1;
    }

    let mut fraction: u128 = 0;
    let mut scale: u128 = 1;
    let mut fraction_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let mut kept = 0;
        while let Some(d) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
            if kept < MAX_FRACTION_DIGITS {
                fraction = fraction * 10 + u128::from(d - b'0');
                scale *= 10;
                kept += 1;
            }
            fraction_digits += 1;
            i += 1;
        }
    }

    if whole_digits == 0 && fraction_digits == 0 {
        return Err(ParseDurationError::InvalidNumber);
    }
    Ok((whole, fraction, scale, &s[i..]))
}

/// Splits the unit (everything up to the next number) off `s`.
fn split_unit(s: &str) -> Result<(&str, &str), ParseDurationError> {
    let end = s
        .find(|c: char| c == '.' || c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return Err(ParseDurationError::MissingUnit);
    }
    Ok(s.split_at(end))
}

fn unit_nanos(unit: &str) -> Result<u128, ParseDurationError> {
    match unit {
        "ns"             => Ok(1),
        "us" | "µs" | "μs" => Ok(NANOS_PER_MICRO),
        "ms"             => Ok(NANOS_PER_MILLI),
        "s"              => Ok(NANOS_PER_SEC),
        "m"              => Ok(60 * NANOS_PER_SEC),
        "h"              => Ok(3_600 * NANOS_PER_SEC),
        other            => Err(ParseDurationError::UnknownUnit(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    #[test]
    fn single_terms() {
        assert_eq!(parse_duration("300ms"), Ok(ms(300)));
        assert_eq!(parse_duration("2s"), Ok(ms(2_000)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3_600)));
        assert_eq!(parse_duration("15us"), Ok(Duration::from_micros(15)));
        assert_eq!(parse_duration("15µs"), Ok(Duration::from_micros(15)));
        assert_eq!(parse_duration("15μs"), Ok(Duration::from_micros(15)));
        assert_eq!(parse_duration("7ns"), Ok(Duration::from_nanos(7)));
    }

    #[test]
    fn fractions() {
        assert_eq!(parse_duration("1.5s"), Ok(ms(1_500)));
        assert_eq!(parse_duration(".5s"), Ok(ms(500)));
        assert_eq!(parse_duration("2.s"), Ok(ms(2_000)));
        assert_eq!(parse_duration("0.25m"), Ok(Duration::from_secs(15)));
        assert_eq!(
            parse_duration("1.0000000000000000000001s"),
            Ok(Duration::from_secs(1)),
        );
    }

    #[test]
    fn combined_terms() {
        assert_eq!(parse_duration("1h15m30.5s"), Ok(ms(4_530_500)));
        assert_eq!(parse_duration("1s500ms"), Ok(ms(1_500)));
    }

    #[test]
    fn zero_and_signs() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("-0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("+300ms"), Ok(ms(300)));
        assert_eq!(parse_duration("-300ms"), Ok(Duration::ZERO));
        assert_eq!(parse_duration(" 300ms\t"), Ok(ms(300)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_duration(""), Err(ParseDurationError::Empty));
        assert_eq!(parse_duration("   "), Err(ParseDurationError::Empty));
        assert_eq!(parse_duration("-"), Err(ParseDurationError::InvalidNumber));
        assert_eq!(parse_duration("ms"), Err(ParseDurationError::InvalidNumber));
        assert_eq!(parse_duration(".s"), Err(ParseDurationError::InvalidNumber));
        assert_eq!(parse_duration("300"), Err(ParseDurationError::MissingUnit));
        assert_eq!(parse_duration("1s300"), Err(ParseDurationError::MissingUnit));
        assert_eq!(
            parse_duration("3 days"),
            Err(ParseDurationError::UnknownUnit(" days".to_owned())),
        );
        assert_eq!(
            parse_duration("5sec"),
            Err(ParseDurationError::UnknownUnit("sec".to_owned())),
        );
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_duration("2562047h"), Ok(Duration::from_secs(2_562_047 * 3_600)));
        assert_eq!(parse_duration("2562048h"), Err(ParseDurationError::Overflow));
        assert_eq!(parse_duration("3000000h"), Err(ParseDurationError::Overflow));
        assert_eq!(parse_duration("10000000000h"), Err(ParseDurationError::Overflow));
        assert_eq!(
            parse_duration("99999999999999999999999999999999999999999s"),
            Err(ParseDurationError::Overflow),
        );
    }
}
