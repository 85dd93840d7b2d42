use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Discount, FacturationError, LineItem, Tax};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }
}

/// Template from which the recurring sweep issues invoices.
///
/// Run dates are always derived from `start_date`, so a template started on
/// the 31st runs on the last day of shorter months and returns to the 31st
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub client_id: Uuid,
    pub currency_code: String,
    pub lines: Vec<LineItem>,
    pub taxes: Vec<Tax>,
    pub discount: Option<Discount>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    /// Number of invoices issued so far.
    pub occurrences: u32,
    /// Last run date (inclusive); `None` runs forever.
    pub end_date: Option<NaiveDate>,
    /// Days between issue and due date; the configured default when `None`.
    pub payment_term_days: Option<u32>,
    pub active: bool,
    pub version: u64,
}

impl RecurringTemplate {
    /// Date of the `k`-th run, counting from zero.
    pub fn run_date(&self, k: u32) -> Result<NaiveDate, FacturationError> {
        let months = k
            .checked_mul(self.frequency.months())
            .ok_or_else(|| FacturationError::Validation("recurrence overflow".into()))?;
        self.start_date
            .checked_add_months(Months::new(months))
            .ok_or_else(|| {
                FacturationError::Validation(format!(
                    "run {k} of template {} falls outside the calendar",
                    self.id
                ))
            })
    }

    /// Next date an invoice is owed, or `None` once the template is finished.
    pub fn next_run(&self) -> Result<Option<NaiveDate>, FacturationError> {
        if !self.active {
            return Ok(None);
        }
        let next = self.run_date(self.occurrences)?;
        Ok(match self.end_date {
            Some(end) if next > end => None,
            _ => Some(next),
        })
    }

    /// Whether a run is owed on or before `today`.
    pub fn is_due(&self, today: NaiveDate) -> Result<bool, FacturationError> {
        Ok(self.next_run()?.is_some_and(|next| next <= today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(start: NaiveDate, frequency: Frequency) -> RecurringTemplate {
        RecurringTemplate {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            currency_code: "EUR".into(),
            lines: Vec::new(),
            taxes: Vec::new(),
            discount: None,
            frequency,
            start_date: start,
            occurrences: 0,
            end_date: None,
            payment_term_days: None,
            active: true,
            version: 0,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_end_is_clamped_not_drifting() {
        let t = template(d(2024, 1, 31), Frequency::Monthly);
        assert_eq!(t.run_date(1).unwrap(), d(2024, 2, 29));
        assert_eq!(t.run_date(2).unwrap(), d(2024, 3, 31));
    }

    #[test]
    fn quarterly_and_yearly() {
        assert_eq!(
            template(d(2024, 1, 15), Frequency::Quarterly).run_date(2).unwrap(),
            d(2024, 7, 15)
        );
        assert_eq!(
            template(d(2024, 2, 29), Frequency::Yearly).run_date(1).unwrap(),
            d(2025, 2, 28)
        );
    }

    #[test]
    fn end_date_and_inactive_stop_runs() {
        let mut t = template(d(2024, 1, 1), Frequency::Monthly);
        t.end_date = Some(d(2024, 2, 15));
        t.occurrences = 2;
        assert_eq!(t.next_run().unwrap(), None);

        let mut t = template(d(2024, 1, 1), Frequency::Monthly);
        assert!(t.is_due(d(2024, 1, 1)).unwrap());
        t.active = false;
        assert!(!t.is_due(d(2024, 1, 1)).unwrap());
    }
}
