//! Sort-key extractors for typed table columns.
//!
//! Each column declares its type through `data-type` on the header cell; the
//! extractor maps the displayed cell text to a [`SortKey`] that orders rows
//! the way a reader expects (sizes by bytes, addresses numerically, and so
//! on). Extractors are total: content they cannot read becomes
//! [`SortKey::Missing`] instead of failing the whole sort.

use std::cmp::Ordering;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{normalize_text, Cell};

const YEAR_SECS: f64 = 31_104_000.0;
const MONTH_SECS: f64 = 2_592_000.0;
const DAY_SECS: f64 = 86_400.0;
const HOUR_SECS: f64 = 3_600.0;
const MINUTE_SECS: f64 = 60.0;
const UUID_SIGNIFICANT_CHARS: usize = 8;

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d.,]+)\s*(byte|b|kb|mb|gb|tb|pb)+").unwrap());
static LEADING_INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").unwrap());
static LEADING_FLOAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))").unwrap());
static UPTIME_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,]+").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKind {
    Size,
    Ip,
    TimeSince,
    Timestamp,
    Uuid,
    Uptime,
    PortName,
    Text,
    Unsortable,
}

impl SortKind {
    /// Resolves a header cell: columns without the `sortable` class never
    /// sort, typed ones pick their extractor, the rest sort as text.
    pub fn from_column(sortable: bool, data_type: Option<&str>) -> Self {
        if !sortable {
            return SortKind::Unsortable;
        }
        match data_type.map(str::trim) {
            Some("size") => SortKind::Size,
            Some("ip") => SortKind::Ip,
            Some("timesince") => SortKind::TimeSince,
            Some("timestamp") => SortKind::Timestamp,
            Some("uuid") => SortKind::Uuid,
            Some("uptime") => SortKind::Uptime,
            Some("portname") => SortKind::PortName,
            _ => SortKind::Text,
        }
    }

    pub fn is_sortable(self) -> bool {
        self != SortKind::Unsortable
    }

    pub fn extract(self, cell: &Cell) -> SortKey {
        match self {
            SortKind::Size => size_key(&cell.text),
            SortKind::Ip => ip_key(&cell.text, cell.list_item.as_deref()),
            SortKind::TimeSince => cell
                .seconds
                .map(SortKey::Number)
                .unwrap_or_else(|| leading_float(cell.text.trim()).map_or(SortKey::Missing, SortKey::Number)),
            SortKind::Timestamp => timestamp_key(&cell.text),
            SortKind::Uuid => uuid_key(&cell.text),
            SortKind::Uptime => uptime_key(&cell.text),
            SortKind::PortName => portname_key(&cell.text),
            SortKind::Text => text_key(&cell.text),
            SortKind::Unsortable => SortKey::Missing,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

impl SortKey {
    /// `Missing` orders first, then numbers, then text.
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (SortKey::Missing, _) => Ordering::Less,
            (_, SortKey::Missing) => Ordering::Greater,
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SortKey::Number(value) => Some(*value),
            _ => None,
        }
    }
}

pub fn size_key(text: &str) -> SortKey {
    if let Some(caps) = SIZE_RE.captures(text) {
        let exponent = match caps[2].to_ascii_uppercase().as_str() {
            "KB" => 1,
            "MB" => 2,
            "GB" => 3,
            "TB" => 4,
            "PB" => 5,
            _ => 0,
        };
        let digits = caps[1].replace(',', "");
        if let Some(value) = leading_float(&digits) {
            return SortKey::Number(value * 1024f64.powi(exponent));
        }
    }
    leading_int(text).map_or(SortKey::Missing, |value| SortKey::Number(value as f64))
}

/// Dotted quad to its 32-bit value. Cells that render a list of addresses
/// sort by the first item.
pub fn ip_key(text: &str, list_item: Option<&str>) -> SortKey {
    let source = list_item
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| text.trim());
    let octets = source
        .split('.')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>();
    match octets {
        Some(octets) if octets.len() == 4 => {
            let value = octets
                .iter()
                .fold(0u32, |acc, octet| (acc << 8) | u32::from(*octet));
            SortKey::Number(f64::from(value))
        }
        _ => SortKey::Missing,
    }
}

/// `YYYY-MM-DD[T ]HH:MM:SS[Z]` as UTC epoch milliseconds.
pub fn timestamp_key(text: &str) -> SortKey {
    let cleaned = text
        .trim()
        .chars()
        .map(|ch| match ch {
            '-' | ':' | 'T' | 'Z' => ' ',
            other => other,
        })
        .collect::<String>();
    let parts = cleaned.split_whitespace().collect::<Vec<_>>();
    let part = |index: usize| parts.get(index).and_then(|value| value.parse::<u32>().ok());

    let year = match parts.first().and_then(|value| value.parse::<i32>().ok()) {
        Some(year) => year,
        None => return SortKey::Missing,
    };
    let (month, day) = match (part(1), part(2)) {
        (Some(month), Some(day)) => (month, day),
        _ => return SortKey::Missing,
    };
    let seconds = parts
        .get(5)
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(0.0);
    let whole_seconds = seconds.trunc() as u32;
    let millis = ((seconds - seconds.trunc()) * 1000.0).round() as u32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| {
            date.and_hms_milli_opt(
                part(3).unwrap_or(0),
                part(4).unwrap_or(0),
                whole_seconds,
                millis,
            )
        })
        .map_or(SortKey::Missing, |instant| {
            SortKey::Number(instant.and_utc().timestamp_millis() as f64)
        })
}

/// Approximate lexicographic position as a float: each character's code
/// point is weighted by `100^-i`, so `"SO"` becomes `83.79`. Only the first
/// characters carry weight at `f64` precision.
pub fn uuid_key(text: &str) -> SortKey {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() {
        return SortKey::Missing;
    }
    let value = upper
        .chars()
        .take(UUID_SIGNIFICANT_CHARS)
        .enumerate()
        .fold(0.0, |acc, (index, ch)| {
            acc + f64::from(u32::from(ch)) / 100f64.powi(index as i32)
        });
    SortKey::Number(value)
}

/// Total seconds of the two most significant units, e.g. `"2 years, 3
/// months"` or `"4 days, 1 hour"`. Anything after the second unit is
/// ignored, and a lone unknown unit is read as minutes.
pub fn uptime_key(text: &str) -> SortKey {
    let tokens = UPTIME_SPLIT_RE
        .split(text.trim())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();
    let first = match tokens.first().and_then(|token| uptime_digits(token)) {
        Some(value) => value,
        None => return SortKey::Missing,
    };

    let unit = tokens.get(1).map(|token| token.to_uppercase());
    let (major, minor) = match unit.as_deref() {
        Some("YEAR") | Some("YEARS") => (YEAR_SECS, MONTH_SECS),
        Some("MONTH") | Some("MONTHS") => (MONTH_SECS, DAY_SECS),
        Some("DAY") | Some("DAYS") => (DAY_SECS, HOUR_SECS),
        Some("HOUR") | Some("HOURS") => (HOUR_SECS, MINUTE_SECS),
        _ => return SortKey::Number(first * MINUTE_SECS),
    };

    let mut total = first * major;
    if let Some(token) = tokens.get(2) {
        match uptime_digits(token) {
            Some(value) => total += value * minor,
            None => return SortKey::Missing,
        }
    }
    SortKey::Number(total)
}

pub fn portname_key(text: &str) -> SortKey {
    let trimmed = text.trim().trim_start_matches(|ch: char| !ch.is_ascii_digit());
    leading_int(trimmed).map_or(SortKey::Missing, |value| SortKey::Number(value as f64))
}

pub fn text_key(text: &str) -> SortKey {
    SortKey::Text(normalize_text(text).to_lowercase())
}

fn uptime_digits(token: &str) -> Option<f64> {
    let kept = token
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect::<String>();
    leading_int(&kept).map(|value| value as f64)
}

fn leading_int(text: &str) -> Option<i64> {
    LEADING_INT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<i64>().ok())
}

fn leading_float(text: &str) -> Option<f64> {
    LEADING_FLOAT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}
