//! Read-only aggregates over invoice sets for reporting consumers.
//!
//! Cancelled invoices are counted but never contribute to monetary sums.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use super::state::InvoiceStatus;
use super::types::Invoice;

/// Count and TTC volume of the invoices in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCount {
    pub count: usize,
    pub amount_ttc: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoice_count: usize,
    pub by_status: BTreeMap<InvoiceStatus, StatusCount>,
    pub amount_ht: Money,
    pub amount_tva: Money,
    pub amount_ttc: Money,
    pub paid: Money,
    pub credited: Money,
    /// Balance still owed on live invoices.
    pub outstanding: Money,
}

fn counts_in_sums(invoice: &Invoice) -> bool {
    invoice.status != InvoiceStatus::Cancelled
}

fn is_open(invoice: &Invoice) -> bool {
    counts_in_sums(invoice)
        && invoice.status != InvoiceStatus::Draft
        && invoice.amount_remaining.is_positive()
}

pub fn summarize<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> InvoiceSummary {
    let mut summary = InvoiceSummary::default();
    for invoice in invoices {
        summary.invoice_count += 1;
        let entry = summary.by_status.entry(invoice.status).or_default();
        entry.count += 1;
        if !counts_in_sums(invoice) {
            continue;
        }
        entry.amount_ttc += invoice.montant_total();
        summary.amount_ht += invoice.totals.amount_ht;
        summary.amount_tva += invoice.totals.amount_tva;
        summary.amount_ttc += invoice.montant_total();
        summary.paid += invoice.paid_amount;
        summary.credited += invoice.credited_amount;
        if is_open(invoice) {
            summary.outstanding += invoice.amount_remaining;
        }
    }
    summary
}

/// Outstanding balances split by days past due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgingReport {
    pub not_due: Money,
    pub days_1_30: Money,
    pub days_31_60: Money,
    pub days_61_90: Money,
    pub over_90: Money,
}

impl AgingReport {
    pub fn total(&self) -> Money {
        self.not_due + self.days_1_30 + self.days_31_60 + self.days_61_90 + self.over_90
    }
}

/// Age open balances relative to `today`. Invoices without a due date are
/// treated as not yet due.
pub fn aging<'a>(invoices: impl IntoIterator<Item = &'a Invoice>, today: NaiveDate) -> AgingReport {
    let mut report = AgingReport::default();
    for invoice in invoices.into_iter().filter(|i| is_open(i)) {
        let late = invoice
            .due_date
            .map(|due| (today - due).num_days())
            .unwrap_or(0);
        let bucket = match late {
            i64::MIN..=0 => &mut report.not_due,
            1..=30 => &mut report.days_1_30,
            31..=60 => &mut report.days_31_60,
            61..=90 => &mut report.days_61_90,
            _ => &mut report.over_90,
        };
        *bucket += invoice.amount_remaining;
    }
    report
}

/// Open balance per client. Invoices without a client are skipped.
pub fn outstanding_by_client<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
) -> BTreeMap<Uuid, Money> {
    let mut out = BTreeMap::new();
    for invoice in invoices.into_iter().filter(|i| is_open(i)) {
        if let Some(client) = invoice.client_id {
            *out.entry(client).or_insert(Money::ZERO) += invoice.amount_remaining;
        }
    }
    out
}

/// HT revenue of issued invoices keyed by (year, month) of issue.
pub fn revenue_by_month<'a>(
    invoices: impl IntoIterator<Item = &'a Invoice>,
) -> BTreeMap<(i32, u32), Money> {
    let mut out = BTreeMap::new();
    for invoice in invoices {
        if !counts_in_sums(invoice) || invoice.status == InvoiceStatus::Draft {
            continue;
        }
        let key = (invoice.issue_date.year(), invoice.issue_date.month());
        *out.entry(key).or_insert(Money::ZERO) += invoice.totals.amount_ht;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::{InvoiceBuilder, LineItemBuilder};
    use crate::core::reconcile::apply_payment;
    use crate::core::tax::Tax;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn sent(number: &str, issue: NaiveDate, due: NaiveDate, client: Uuid) -> Invoice {
        let mut inv = InvoiceBuilder::new(number, issue)
            .client(client)
            .due_date(due)
            .default_tax(Tax::vat(dec!(20)).unwrap())
            .add_line(LineItemBuilder::new("1", "Forfait", 1, Money::new(dec!(100))).build())
            .build()
            .unwrap();
        inv.send(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .unwrap();
        inv
    }

    #[test]
    fn summary_excludes_cancelled_from_sums() {
        let client = Uuid::new_v4();
        let a = sent("FAC-1", d(1, 1), d(1, 31), client);
        let mut b = sent("FAC-2", d(1, 2), d(2, 1), client);
        let mut c = sent("FAC-3", d(1, 3), d(2, 2), client);
        apply_payment(&mut b, Money::new(dec!(20))).unwrap();
        c.cancel(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
            .unwrap();

        let s = summarize([&a, &b, &c]);
        assert_eq!(s.invoice_count, 3);
        assert_eq!(s.amount_ttc, Money::new(dec!(240)));
        assert_eq!(s.amount_tva, Money::new(dec!(40)));
        assert_eq!(s.paid, Money::new(dec!(20)));
        assert_eq!(s.outstanding, Money::new(dec!(220)));
        assert_eq!(s.by_status[&InvoiceStatus::Cancelled].count, 1);
        assert_eq!(s.by_status[&InvoiceStatus::Cancelled].amount_ttc, Money::ZERO);
        assert_eq!(s.by_status[&InvoiceStatus::PartiallyPaid].count, 1);
    }

    #[test]
    fn aging_buckets() {
        let client = Uuid::new_v4();
        let today = d(6, 30);
        let invoices = [
            sent("FAC-1", d(6, 1), d(7, 1), client),
            sent("FAC-2", d(5, 1), d(6, 10), client),
            sent("FAC-3", d(4, 1), d(5, 15), client),
            sent("FAC-4", d(3, 1), d(4, 20), client),
            sent("FAC-5", d(1, 1), d(2, 1), client),
        ];
        let report = aging(&invoices, today);
        let one = Money::new(dec!(120));
        assert_eq!(report.not_due, one);
        assert_eq!(report.days_1_30, one);
        assert_eq!(report.days_31_60, one);
        assert_eq!(report.days_61_90, one);
        assert_eq!(report.over_90, one);
        assert_eq!(report.total(), Money::new(dec!(600)));
    }

    #[test]
    fn per_client_and_monthly() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let invoices = [
            sent("FAC-1", d(1, 5), d(2, 5), x),
            sent("FAC-2", d(1, 20), d(2, 20), y),
            sent("FAC-3", d(2, 3), d(3, 3), x),
        ];
        let by_client = outstanding_by_client(&invoices);
        assert_eq!(by_client[&x], Money::new(dec!(240)));
        assert_eq!(by_client[&y], Money::new(dec!(120)));

        let monthly = revenue_by_month(&invoices);
        assert_eq!(monthly[&(2024, 1)], Money::new(dec!(200)));
        assert_eq!(monthly[&(2024, 2)], Money::new(dec!(100)));
    }

    #[test]
    fn summary_round_trips_through_json() {
        let s = summarize([&sent("FAC-1", d(1, 1), d(1, 31), Uuid::new_v4())]);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"ENVOYE\""));
        let back: InvoiceSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
