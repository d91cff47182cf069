//! Query-string filter helpers shared by the list endpoints.
//!
//! Absent, empty and `all` parameters never narrow a result set. Values that
//! are not part of a vocabulary are compared as-is and so match nothing.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Exact match against an enumerated label.
pub fn matches_tag(param: Option<&str>, value: &str) -> bool {
    match param {
        None => true,
        Some(p) if p.is_empty() || p == "all" => true,
        Some(p) => p == value,
    }
}

/// Substring match against either the stock code or the stock name.
pub fn matches_stock(param: Option<&str>, code: &str, name: &str) -> bool {
    match param {
        None => true,
        Some(p) if p.is_empty() => true,
        Some(p) => code.contains(p) || name.contains(p),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Open,
    At(DateTime<Utc>),
    Invalid,
}

/// Inclusive time window built from `startDate` / `endDate` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Bound,
    end: Bound,
}

impl TimeRange {
    pub fn unbounded() -> Self {
        Self {
            start: Bound::Open,
            end: Bound::Open,
        }
    }

    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (UTC). A plain
    /// end date covers that whole day.
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: parse_bound(start, false),
            end: parse_bound(end, true),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        let after_start = match self.start {
            Bound::Open => true,
            Bound::At(s) => t >= s,
            Bound::Invalid => false,
        };
        let before_end = match self.end {
            Bound::Open => true,
            Bound::At(e) => t <= e,
            Bound::Invalid => false,
        };
        after_start && before_end
    }
}

fn parse_bound(raw: Option<&str>, end_of_day: bool) -> Bound {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Bound::Open;
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Bound::At(ts.with_timezone(&Utc));
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => {
            let midnight = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            match midnight {
                Some(m) if end_of_day => {
                    Bound::At(m + Duration::days(1) - Duration::milliseconds(1))
                }
                Some(m) => Bound::At(m),
                None => Bound::Invalid,
            }
        }
        Err(_) => Bound::Invalid,
    }
}

/// Sort rows so the most recent timestamp comes first.
pub fn sort_newest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}
