use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;

use crate::core::{DocumentKind, FacturationError, NumberSequence, NumberSource};

use super::config::NumberingConfig;

/// Thread-safe [`NumberSource`] holding one sequence per document kind and
/// year.
///
/// Each year's sequence is created on its first document, so a late document
/// dated in an earlier year (a recurring run catching up across New Year)
/// continues that year's numbering instead of being refused.
#[derive(Debug)]
pub struct SequenceRegistry {
    config: NumberingConfig,
    sequences: Mutex<HashMap<(DocumentKind, i32), NumberSequence>>,
}

impl SequenceRegistry {
    pub fn new(config: NumberingConfig) -> Self {
        Self {
            config,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    /// Continue an existing sequence, e.g. one restored from storage.
    pub fn resume(&self, kind: DocumentKind, year: i32, next_number: u64) {
        let seq = NumberSequence::starting_at(self.prefix(kind), year, next_number)
            .with_padding(self.config.padding);
        self.sequences.lock().insert((kind, year), seq);
    }

    /// Number the next document of `kind` in `year` would receive, if that
    /// sequence exists.
    pub fn peek(&self, kind: DocumentKind, year: i32) -> Option<String> {
        self.sequences
            .lock()
            .get(&(kind, year))
            .map(NumberSequence::peek)
    }

    fn prefix(&self, kind: DocumentKind) -> &str {
        match kind {
            DocumentKind::Invoice => &self.config.invoice_prefix,
            DocumentKind::CreditNote => &self.config.credit_note_prefix,
            DocumentKind::Quote => &self.config.quote_prefix,
        }
    }
}

impl Default for SequenceRegistry {
    fn default() -> Self {
        Self::new(NumberingConfig::default())
    }
}

impl NumberSource for SequenceRegistry {
    fn next_number(&self, kind: DocumentKind, date: NaiveDate) -> Result<String, FacturationError> {
        let mut sequences = self.sequences.lock();
        let seq = sequences.entry((kind, date.year())).or_insert_with(|| {
            NumberSequence::new(self.prefix(kind), date.year()).with_padding(self.config.padding)
        });
        seq.issue(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn kinds_are_independent() {
        let reg = SequenceRegistry::default();
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2024, 3, 1)).unwrap(),
            "FAC-2024-0001"
        );
        assert_eq!(
            reg.next_number(DocumentKind::CreditNote, d(2024, 3, 1)).unwrap(),
            "AV-2024-0001"
        );
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2024, 3, 2)).unwrap(),
            "FAC-2024-0002"
        );
        assert_eq!(reg.peek(DocumentKind::Quote, 2024), None);
    }

    #[test]
    fn resume_continues_sequence() {
        let reg = SequenceRegistry::default();
        reg.resume(DocumentKind::Invoice, 2024, 120);
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2024, 12, 1)).unwrap(),
            "FAC-2024-0120"
        );
        assert_eq!(
            reg.peek(DocumentKind::Invoice, 2024).as_deref(),
            Some("FAC-2024-0121")
        );
    }

    #[test]
    fn earlier_year_keeps_its_own_sequence() {
        let reg = SequenceRegistry::default();
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2025, 1, 5)).unwrap(),
            "FAC-2025-0001"
        );
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2024, 12, 1)).unwrap(),
            "FAC-2024-0001"
        );
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2025, 1, 6)).unwrap(),
            "FAC-2025-0002"
        );
        assert_eq!(
            reg.next_number(DocumentKind::Invoice, d(2024, 12, 31)).unwrap(),
            "FAC-2024-0002"
        );
    }
}
