use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::FacturationError;

/// Documents that draw numbers from their own sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    CreditNote,
    Quote,
}

/// Supplier of pre-generated, unique document numbers.
///
/// Invoice creation only ever consumes a number; generating one is the job of
/// an implementation of this trait.
pub trait NumberSource: Send + Sync {
    fn next_number(&self, kind: DocumentKind, date: NaiveDate) -> Result<String, FacturationError>;
}

/// Gapless document number sequence.
///
/// Generates numbers in the format `{prefix}{year}-{sequential}`,
/// e.g. "FAC-2024-0001", "FAC-2024-0002", etc. The counter restarts at 1
/// with each new year.
#[derive(Debug, Clone)]
pub struct NumberSequence {
    prefix: String,
    year: i32,
    next_number: u64,
    zero_pad: usize,
}

impl NumberSequence {
    /// Create a new sequence starting at 1.
    pub fn new(prefix: impl Into<String>, year: i32) -> Self {
        Self::starting_at(prefix, year, 1)
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(prefix: impl Into<String>, year: i32, next_number: u64) -> Self {
        Self {
            prefix: prefix.into(),
            year,
            next_number,
            zero_pad: 4,
        }
    }

    /// Set zero-padding width (default: 4, so "0001").
    pub fn with_padding(mut self, width: usize) -> Self {
        self.zero_pad = width;
        self
    }

    /// Issue the next number for a document dated `date`.
    ///
    /// Rolls over to a new year automatically; a date in an earlier year than
    /// the sequence is refused, since backdating would break the ordering.
    pub fn issue(&mut self, date: NaiveDate) -> Result<String, FacturationError> {
        if date.year() < self.year {
            return Err(FacturationError::Numbering(format!(
                "document dated {date} precedes sequence year {}",
                self.year
            )));
        }
        self.auto_advance(date);
        let number = self.peek();
        self.next_number += 1;
        Ok(number)
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> String {
        format!(
            "{}{}-{:0>width$}",
            self.prefix,
            self.year,
            self.next_number,
            width = self.zero_pad
        )
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Get the next number that will be issued (without prefix/formatting).
    pub fn next_raw(&self) -> u64 {
        self.next_number
    }

    /// Advance to a new year, resetting the counter to 1.
    pub fn advance_year(&mut self, new_year: i32) -> Result<(), FacturationError> {
        if new_year <= self.year {
            return Err(FacturationError::Numbering(format!(
                "new year {new_year} must be greater than current year {}",
                self.year
            )));
        }
        self.year = new_year;
        self.next_number = 1;
        Ok(())
    }

    /// Auto-advance year if the given date is in a new year.
    /// Returns true if the year was advanced.
    pub fn auto_advance(&mut self, date: NaiveDate) -> bool {
        let date_year = date.year();
        if date_year > self.year {
            self.year = date_year;
            self.next_number = 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sequential_numbering() {
        let mut seq = NumberSequence::new("FAC-", 2024);
        assert_eq!(seq.issue(d(2024, 1, 2)).unwrap(), "FAC-2024-0001");
        assert_eq!(seq.issue(d(2024, 1, 3)).unwrap(), "FAC-2024-0002");
        assert_eq!(seq.next_raw(), 3);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut seq = NumberSequence::new("AV-", 2024);
        assert_eq!(seq.peek(), "AV-2024-0001");
        assert_eq!(seq.peek(), "AV-2024-0001");
        assert_eq!(seq.issue(d(2024, 5, 1)).unwrap(), "AV-2024-0001");
        assert_eq!(seq.peek(), "AV-2024-0002");
    }

    #[test]
    fn starting_at_with_padding() {
        let mut seq = NumberSequence::starting_at("DEV-", 2024, 42).with_padding(6);
        assert_eq!(seq.issue(d(2024, 2, 1)).unwrap(), "DEV-2024-000042");
    }

    #[test]
    fn rolls_over_with_the_year() {
        let mut seq = NumberSequence::new("FAC-", 2024);
        seq.issue(d(2024, 12, 30)).unwrap();
        assert_eq!(seq.issue(d(2025, 1, 1)).unwrap(), "FAC-2025-0001");
        assert_eq!(seq.year(), 2025);
    }

    #[test]
    fn refuses_backdating() {
        let mut seq = NumberSequence::new("FAC-", 2025);
        assert!(seq.issue(d(2024, 12, 31)).is_err());
        assert_eq!(seq.peek(), "FAC-2025-0001");
    }

    #[test]
    fn year_advance_rejects_past() {
        let mut seq = NumberSequence::new("FAC-", 2024);
        assert!(seq.advance_year(2023).is_err());
        assert!(seq.advance_year(2024).is_err());
        seq.advance_year(2026).unwrap();
        assert_eq!(seq.peek(), "FAC-2026-0001");
    }
}
