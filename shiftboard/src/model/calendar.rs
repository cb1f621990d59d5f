//! Business calendar
//!
//! Dates are opaque strings in whatever calendar the deployment uses.
//! The only operations the model needs are equality, ordering and "today".

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A date in the business calendar, e.g. `"2026-10-19"` or `"1405/07/27"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessDate(String);

impl BusinessDate {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form usable inside a file name (`/` separators become `-`)
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | ' ' => '-',
                other => other,
            })
            .collect()
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BusinessDate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Source of "today" for absence checks and snapshot naming
pub trait BusinessCalendar: Send + Sync {
    fn today(&self) -> BusinessDate;
}

/// ISO dates from the local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct GregorianCalendar;

impl BusinessCalendar for GregorianCalendar {
    fn today(&self) -> BusinessDate {
        BusinessDate(Local::now().format("%Y-%m-%d").to_string())
    }
}

/// Calendar pinned to one date
#[derive(Debug, Clone)]
pub struct FixedCalendar(pub BusinessDate);

impl BusinessCalendar for FixedCalendar {
    fn today(&self) -> BusinessDate {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_replaces_separators() {
        let date = BusinessDate::new("1405/07/27");
        assert_eq!(date.file_stem(), "1405-07-27");
    }

    #[test]
    fn test_gregorian_today_is_iso() {
        let today = GregorianCalendar.today();
        assert_eq!(today.as_str().len(), 10);
        assert_eq!(today.as_str().chars().nth(4), Some('-'));
    }

    #[test]
    fn test_transparent_serde() {
        let date = BusinessDate::new(" 2026-10-19 ");
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2026-10-19\"");
    }
}
