//! Human-readable order numbers.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// An order number of the form `ORD-{YYYY}{MM}-{NNNN}`.
///
/// The sequence is zero-padded to four digits and keeps growing past 9999.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Formats the number for the given date and allocated sequence value.
    pub fn new(date: NaiveDate, sequence: u32) -> Self {
        Self(format!(
            "ORD-{}{:02}-{:04}",
            date.year(),
            date.month(),
            sequence
        ))
    }

    /// Wraps an already formatted value loaded from storage.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the sequence part, if the number is well formed.
    pub fn sequence(&self) -> Option<u32> {
        self.0.rsplit('-').next()?.parse().ok()
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_pads_month_and_sequence() {
        assert_eq!(
            OrderNumber::new(date(2026, 3, 9), 7).as_str(),
            "ORD-202603-0007"
        );
        assert_eq!(
            OrderNumber::new(date(2026, 11, 30), 1234).as_str(),
            "ORD-202611-1234"
        );
    }

    #[test]
    fn test_sequence_overflows_padding() {
        let number = OrderNumber::new(date(2026, 1, 1), 10_001);
        assert_eq!(number.as_str(), "ORD-202601-10001");
        assert_eq!(number.sequence(), Some(10_001));
    }

    #[test]
    fn test_sequence_parses_back() {
        assert_eq!(OrderNumber::new(date(2026, 5, 1), 42).sequence(), Some(42));
        assert_eq!(OrderNumber::from_raw("garbage").sequence(), None);
    }
}
