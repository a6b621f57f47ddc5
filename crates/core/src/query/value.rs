//! Rendering and parsing of byte sizes and datetimes
//!
//! Byte sizes use decimal (SI) units so that a rendered size always parses
//! back to the exact byte count. Binary suffixes (`KiB`, `MiB`, ...) are
//! accepted on input as well.

use jiff::civil;
use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};

use crate::error::QueryError;

/// Grammar reported when a byte size literal is rejected
pub const BYTE_SIZE_GRAMMAR: &str =
    "a byte size such as 512, 1.5KB or 20 MB (units B, KB, MB, GB, TB; case-insensitive)";

/// Grammar reported when a datetime literal is rejected
pub const DATETIME_GRAMMAR: &str =
    "an ISO-8601 datetime such as 2020-01-01, 2020-01-01T10:30:00 or 2020-01-01T10:30:00-05:00";

/// Format used when rendering datetimes for display and substring search
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Largest number of fractional digits considered when parsing sizes
const MAX_FRACTION_DIGITS: usize = 18;

const DECIMAL_UNITS: &[(&str, u64)] = &[
    ("PB", 1_000_000_000_000_000),
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
];

/// Render a byte count as a human readable string, e.g. `12.3 MB`
pub fn render_bytes(bytes: u64) -> String {
    for (unit, factor) in DECIMAL_UNITS {
        if bytes >= *factor {
            let whole = bytes / factor;
            let rem = bytes % factor;
            if rem == 0 {
                return format!("{whole} {unit}");
            }
            let width = factor.ilog10() as usize;
            let fraction = format!("{rem:0width$}");
            return format!("{whole}.{} {unit}", fraction.trim_end_matches('0'));
        }
    }
    format!("{bytes} B")
}

/// Parse a human readable byte size into a byte count
pub fn parse_bytes(input: &str) -> Result<u64, QueryError> {
    let invalid = || QueryError::ValueParse {
        literal: input.to_string(),
        expected: BYTE_SIZE_GRAMMAR,
    };

    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = (&s[..split], s[split..].trim());

    let multiplier: u128 = match unit.to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "p" | "pb" => 1_000_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        "pib" => 1 << 50,
        _ => return Err(invalid()),
    };

    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    let fractional_bytes = if fraction.is_empty() {
        0
    } else {
        let numerator: u128 = fraction.parse().map_err(|_| invalid())?;
        let denominator = 10u128.pow(fraction.len() as u32);
        // round half up to the nearest byte
        (numerator * multiplier * 2 + denominator) / (denominator * 2)
    };

    whole
        .checked_mul(multiplier)
        .and_then(|b| b.checked_add(fractional_bytes))
        .and_then(|b| u64::try_from(b).ok())
        .ok_or_else(invalid)
}

/// Render a timestamp in the given zone using [`DATETIME_FORMAT`]
pub fn render_datetime(ts: Timestamp, tz: &TimeZone) -> String {
    let zoned = ts.to_zoned(tz.clone());
    jiff::fmt::strtime::format(DATETIME_FORMAT, &zoned).unwrap_or_else(|_| zoned.to_string())
}

/// Parse an ISO-8601 datetime. An explicit offset (or `Z`, or a bracketed
/// zone annotation) is honored; otherwise the value is interpreted in `tz`.
pub fn parse_datetime(input: &str, tz: &TimeZone) -> Result<Timestamp, QueryError> {
    let s = input.trim();

    if let Ok(ts) = s.parse::<Timestamp>() {
        return Ok(ts);
    }
    if let Ok(zoned) = s.parse::<Zoned>() {
        return Ok(zoned.timestamp());
    }

    let naive = s
        .parse::<civil::DateTime>()
        .or_else(|_| s.parse::<civil::Date>().map(|d| d.to_datetime(civil::Time::midnight())));

    naive
        .and_then(|dt| dt.to_zoned(tz.clone()))
        .map(|zoned| zoned.timestamp())
        .map_err(|_| QueryError::ValueParse {
            literal: input.to_string(),
            expected: DATETIME_GRAMMAR,
        })
}
