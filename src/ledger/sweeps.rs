//! Periodic sweeps. Each invoice is processed on its own: a failure is
//! logged and reported, and the sweep moves on. Re-running a sweep for the
//! same day changes nothing.

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::{
    DocumentKind, FacturationError, Invoice, InvoiceBuilder, InvoiceStatus, OverdueOutcome,
};

use super::cache::Cache;
use super::recurring::RecurringTemplate;
use super::relance::Relance;
use super::service::{BillingService, ensure_consistent};
use super::store::{ChangeSet, Store};

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub examined: usize,
    pub changed: usize,
    pub skipped: usize,
    pub failures: Vec<(Uuid, FacturationError)>,
}

impl SweepReport {
    fn fail(&mut self, id: Uuid, sweep: &'static str, err: FacturationError) {
        warn!(id = %id, sweep, error = %err, "sweep item failed");
        self.failures.push((id, err));
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<S: Store, C: Cache> BillingService<S, C> {
    /// Move past-due Sent / PartiallyPaid invoices to Overdue.
    pub fn sweep_overdue(&self, today: NaiveDate) -> Result<SweepReport, FacturationError> {
        let candidates: Vec<Uuid> = self
            .store
            .invoices()?
            .into_iter()
            .filter(|i| matches!(i.status, InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid))
            .filter(|i| i.due_date.is_some_and(|due| due < today))
            .map(|i| i.id)
            .take(self.config.overdue_batch.unwrap_or(usize::MAX))
            .collect();

        let mut report = SweepReport::default();
        for id in candidates {
            report.examined += 1;
            match self.mutate_invoice(id, |inv| Ok(inv.mark_overdue(today))) {
                Ok((invoice, OverdueOutcome::Marked)) => {
                    report.changed += 1;
                    info!(
                        invoice_id = %id,
                        remaining = %invoice.amount_remaining,
                        status = %invoice.status,
                        "invoice overdue"
                    );
                }
                Ok(_) => report.skipped += 1,
                Err(err) => report.fail(id, "overdue", err),
            }
        }
        info!(
            examined = report.examined,
            changed = report.changed,
            failed = report.failures.len(),
            "overdue sweep finished"
        );
        Ok(report)
    }

    /// Issue every invoice owed by active templates up to `today`.
    ///
    /// A template that fell behind catches up one run at a time. Each run
    /// commits the new invoice together with the template's advanced counter,
    /// so a run is never issued twice.
    pub fn generate_recurring(&self, today: NaiveDate) -> Result<SweepReport, FacturationError> {
        let mut report = SweepReport::default();
        for template in self.store.recurring_templates()? {
            report.examined += 1;
            let id = template.id;
            match self.catch_up(template, today) {
                Ok(0) => report.skipped += 1,
                Ok(n) => report.changed += n,
                Err(err) => report.fail(id, "recurring", err),
            }
        }
        info!(
            examined = report.examined,
            issued = report.changed,
            failed = report.failures.len(),
            "recurring sweep finished"
        );
        Ok(report)
    }

    fn catch_up(
        &self,
        mut template: RecurringTemplate,
        today: NaiveDate,
    ) -> Result<usize, FacturationError> {
        let mut issued = 0;
        while template.is_due(today)? {
            let run_date = template.run_date(template.occurrences)?;
            let invoice = self.recurring_invoice(&template, run_date)?;
            let expected = template.version;
            template.occurrences += 1;
            template.version = expected + 1;
            self.store.commit(
                ChangeSet::new()
                    .insert_invoice(invoice.clone())
                    .update_template(template.clone(), expected),
            )?;
            info!(
                invoice_id = %invoice.id,
                number = %invoice.number,
                template_id = %template.id,
                run_date = %run_date,
                "recurring invoice issued"
            );
            issued += 1;
        }
        Ok(issued)
    }

    /// Sent invoice for one run of `template`.
    fn recurring_invoice(
        &self,
        template: &RecurringTemplate,
        run_date: NaiveDate,
    ) -> Result<Invoice, FacturationError> {
        let term = template
            .payment_term_days
            .unwrap_or(self.config.payment_term_days);
        let due = run_date
            .checked_add_days(Days::new(u64::from(term)))
            .ok_or_else(|| FacturationError::Validation("due date out of range".into()))?;
        let number = self.numbers.next_number(DocumentKind::Invoice, run_date)?;
        let mut builder = InvoiceBuilder::new(number, run_date)
            .client(template.client_id)
            .currency(template.currency_code.clone())
            .due_date(due)
            .lines(template.lines.iter().cloned())
            .taxes(template.taxes.iter().cloned())
            .payment_terms(format!("{term} jours"));
        if let Some(discount) = template.discount {
            builder = builder.discount(discount);
        }
        let mut invoice = builder.build()?;
        invoice.send(Utc::now())?;
        ensure_consistent(&invoice)?;
        Ok(invoice)
    }

    /// Schedule the dunning reminders owed by overdue invoices.
    ///
    /// Level `n` becomes due `relance_days[n - 1]` days after the due date.
    /// Levels already scheduled are left alone.
    pub fn schedule_relances(&self, today: NaiveDate) -> Result<SweepReport, FacturationError> {
        let overdue: Vec<Uuid> = self
            .store
            .invoices()?
            .into_iter()
            .filter(|i| i.status == InvoiceStatus::Overdue)
            .map(|i| i.id)
            .collect();

        let mut report = SweepReport::default();
        for id in overdue {
            report.examined += 1;
            match self.locks.with(id, || self.relances_owed(id, today)) {
                Ok(0) => report.skipped += 1,
                Ok(n) => report.changed += n,
                Err(err) => report.fail(id, "relance", err),
            }
        }
        info!(
            examined = report.examined,
            scheduled = report.changed,
            failed = report.failures.len(),
            "relance sweep finished"
        );
        Ok(report)
    }

    /// Caller holds the invoice lock.
    fn relances_owed(&self, id: Uuid, today: NaiveDate) -> Result<usize, FacturationError> {
        let invoice = self.load_invoice(id)?;
        let Some(due) = invoice.due_date else {
            return Ok(0);
        };
        if invoice.status != InvoiceStatus::Overdue || !invoice.amount_remaining.is_positive() {
            return Ok(0);
        }
        let existing = self.store.relances_for(id)?;
        let days_late = (today - due).num_days();

        let mut changes = ChangeSet::new();
        for (index, &days) in self.config.relance_days.iter().enumerate() {
            let level = u8::try_from(index + 1)
                .map_err(|_| FacturationError::Config("too many relance levels".into()))?;
            if days_late < i64::from(days) || existing.iter().any(|r| r.level == level) {
                continue;
            }
            let scheduled_for = due
                .checked_add_days(Days::new(u64::from(days)))
                .ok_or_else(|| FacturationError::Validation("relance date out of range".into()))?;
            changes = changes.insert_relance(Relance {
                id: Uuid::new_v4(),
                invoice_id: id,
                level,
                scheduled_for,
                amount_due: invoice.amount_remaining,
                created_at: Utc::now(),
            });
        }

        let count = changes.relances.len();
        if count > 0 {
            self.store.commit(changes)?;
            info!(invoice_id = %id, count, amount = %invoice.amount_remaining, "relances scheduled");
        }
        Ok(count)
    }
}
