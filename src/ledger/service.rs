use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::stats::{self, AgingReport, InvoiceSummary};
use crate::core::{
    Allocation, CreditNote, CreditNoteBuilder, Discount, FacturationError, Invoice, Money,
    NumberSource, Payment, Settlement, apply_credit_note, apply_payment, validate_arithmetic,
};

use super::cache::Cache;
use super::config::LedgerConfig;
use super::locks::InvoiceLocks;
use super::numbering::SequenceRegistry;
use super::recurring::RecurringTemplate;
use super::relance::Relance;
use super::requests::{NewCreditNote, NewInvoice, NewLine, NewPayment, NewRecurringTemplate, to_line_items};
use super::store::{ChangeSet, Store};

/// Invoice ledger: the only writer of invoices, payments and credit notes.
///
/// Every mutation of an invoice runs under that invoice's lock, re-reads the
/// stored document, applies a pure core operation and commits with the
/// version it read. The cache entry is evicted after the commit.
pub struct BillingService<S, C> {
    pub(super) store: S,
    pub(super) cache: C,
    pub(super) locks: InvoiceLocks,
    pub(super) numbers: Arc<dyn NumberSource>,
    pub(super) config: LedgerConfig,
}

impl<S: Store, C: Cache> BillingService<S, C> {
    pub fn new(store: S, cache: C, config: LedgerConfig) -> Self {
        let numbers = Arc::new(SequenceRegistry::new(config.numbering.clone()));
        Self {
            store,
            cache,
            locks: InvoiceLocks::new(),
            numbers,
            config,
        }
    }

    /// Replace the number source used by the recurring sweep.
    pub fn with_numbers(mut self, numbers: Arc<dyn NumberSource>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn locks(&self) -> &InvoiceLocks {
        &self.locks
    }

    // ── invoices ────────────────────────────────────────────────────────

    pub fn create_invoice(&self, request: &NewInvoice) -> Result<Invoice, FacturationError> {
        let invoice = request.to_invoice(&self.config.default_currency)?;
        self.store
            .commit(ChangeSet::new().insert_invoice(invoice.clone()))?;
        info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            amount = %invoice.montant_total(),
            "invoice created"
        );
        Ok(invoice)
    }

    /// Cached read.
    pub fn invoice(&self, id: Uuid) -> Result<Invoice, FacturationError> {
        if let Some(hit) = self.cache.get(id) {
            debug!(invoice_id = %id, "invoice cache hit");
            return Ok(hit);
        }
        // Filled under the lock: a commit cannot evict between our load and
        // our put, so the cache never takes back an older version.
        self.locks.with(id, || {
            let invoice = self.load_invoice(id)?;
            self.cache.put(invoice.clone());
            Ok(invoice)
        })
    }

    /// Replace the lines (and invoice discount) of a draft invoice.
    pub fn update_lines(
        &self,
        id: Uuid,
        lines: &[NewLine],
        discount: Option<Discount>,
    ) -> Result<Invoice, FacturationError> {
        let items = to_line_items(lines);
        let (invoice, ()) = self.mutate_invoice(id, |inv| inv.update_lines(items, discount))?;
        info!(invoice_id = %id, amount = %invoice.montant_total(), "invoice lines updated");
        Ok(invoice)
    }

    pub fn send_invoice(&self, id: Uuid, at: DateTime<Utc>) -> Result<Invoice, FacturationError> {
        let (invoice, ()) = self.mutate_invoice(id, |inv| inv.send(at))?;
        info!(invoice_id = %id, status = %invoice.status, "invoice sent");
        Ok(invoice)
    }

    pub fn cancel_invoice(&self, id: Uuid, at: DateTime<Utc>) -> Result<Invoice, FacturationError> {
        let (invoice, ()) = self.mutate_invoice(id, |inv| inv.cancel(at))?;
        info!(invoice_id = %id, status = %invoice.status, "invoice cancelled");
        Ok(invoice)
    }

    // ── payments ────────────────────────────────────────────────────────

    /// Record a payment against the invoice it names. The payment and the
    /// updated invoice are committed together.
    pub fn record_payment(
        &self,
        request: &NewPayment,
    ) -> Result<(Payment, Invoice), FacturationError> {
        let invoice_id = request.invoice_id.ok_or_else(|| {
            FacturationError::Validation(
                "payment names no invoice; record it as client credit".into(),
            )
        })?;
        let mut payment = request.to_payment()?;

        self.locks.with(invoice_id, || {
            let mut invoice = self.load_invoice(invoice_id)?;
            let expected = invoice.version;
            if payment.client_id.is_none() {
                payment.client_id = invoice.client_id;
            }
            let settlement = apply_payment(&mut invoice, payment.amount)?;
            invoice.version = expected + 1;
            ensure_consistent(&invoice)?;

            self.store.commit(
                ChangeSet::new()
                    .insert_payment(payment.clone())
                    .update_invoice(invoice.clone(), expected),
            )?;
            self.cache.evict(invoice_id);
            log_settlement("payment recorded", &invoice, &settlement);
            Ok((payment, invoice))
        })
    }

    /// Record an unlinked payment as credit for its client.
    pub fn record_client_credit(&self, request: &NewPayment) -> Result<Payment, FacturationError> {
        if request.invoice_id.is_some() {
            return Err(FacturationError::Validation(
                "client credit must not name an invoice".into(),
            ));
        }
        if request.client_id.is_none() {
            return Err(FacturationError::Validation(
                "client credit needs a client".into(),
            ));
        }
        let payment = request.to_payment()?;
        self.store
            .commit(ChangeSet::new().insert_payment(payment.clone()))?;
        info!(payment_id = %payment.id, amount = %payment.amount, "client credit recorded");
        Ok(payment)
    }

    /// Allocate part of a client credit to an invoice of the same client.
    pub fn allocate_payment(
        &self,
        payment_id: Uuid,
        invoice_id: Uuid,
        amount: Money,
        date: NaiveDate,
    ) -> Result<(Payment, Invoice), FacturationError> {
        self.locks.with(invoice_id, || {
            let mut payment = self
                .store
                .payment(payment_id)?
                .ok_or_else(|| FacturationError::not_found("payment", payment_id))?;
            let mut invoice = self.load_invoice(invoice_id)?;

            if let (Some(payer), Some(client)) = (payment.client_id, invoice.client_id)
                && payer != client
            {
                return Err(FacturationError::Validation(format!(
                    "payment {payment_id} belongs to another client than invoice {}",
                    invoice.number
                )));
            }
            if amount > payment.unallocated() {
                return Err(FacturationError::OverpaymentRejected(format!(
                    "{amount} exceeds the {} left unallocated on payment {payment_id}",
                    payment.unallocated()
                )));
            }

            let invoice_expected = invoice.version;
            let payment_expected = payment.version;
            let settlement = apply_payment(&mut invoice, amount)?;
            invoice.version = invoice_expected + 1;
            ensure_consistent(&invoice)?;
            payment.allocations.push(Allocation {
                invoice_id,
                amount,
                date,
            });
            payment.version = payment_expected + 1;

            self.store.commit(
                ChangeSet::new()
                    .update_payment(payment.clone(), payment_expected)
                    .update_invoice(invoice.clone(), invoice_expected),
            )?;
            self.cache.evict(invoice_id);
            log_settlement("payment allocated", &invoice, &settlement);
            Ok((payment, invoice))
        })
    }

    pub fn payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>, FacturationError> {
        self.store.payments_for_invoice(invoice_id)
    }

    // ── credit notes ────────────────────────────────────────────────────

    pub fn create_credit_note(&self, request: &NewCreditNote) -> Result<CreditNote, FacturationError> {
        let origin = self.load_invoice(request.invoice_id)?;
        let mut builder =
            CreditNoteBuilder::new(request.number.clone(), request.issue_date, &origin, request.kind);
        if let Some(reason) = &request.reason {
            builder = builder.reason(reason.clone());
        }
        builder = match &request.lines {
            Some(lines) => to_line_items(lines)
                .into_iter()
                .fold(builder, |b, line| b.add_line(line)),
            None => builder.lines_from(&origin),
        };
        let note = builder.build()?;
        self.store
            .commit(ChangeSet::new().insert_credit_note(note.clone()))?;
        info!(
            credit_note_id = %note.id,
            invoice_id = %origin.id,
            amount = %note.total(),
            "credit note created"
        );
        Ok(note)
    }

    pub fn credit_note(&self, id: Uuid) -> Result<CreditNote, FacturationError> {
        self.store
            .credit_note(id)?
            .ok_or_else(|| FacturationError::not_found("credit note", id))
    }

    pub fn credit_notes_for_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<CreditNote>, FacturationError> {
        self.store.credit_notes_for_invoice(invoice_id)
    }

    pub fn validate_credit_note(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<CreditNote, FacturationError> {
        let note = self.mutate_credit_note(id, |note| note.validate(at))?;
        info!(credit_note_id = %id, status = %note.status, "credit note validated");
        Ok(note)
    }

    /// Apply `amount` of a validated credit note to its origin invoice.
    pub fn apply_credit_note(
        &self,
        id: Uuid,
        amount: Money,
    ) -> Result<(CreditNote, Invoice), FacturationError> {
        let invoice_id = self.credit_note(id)?.origin_invoice_id;
        self.locks.with(invoice_id, || {
            let mut note = self.credit_note(id)?;
            let mut invoice = self.load_invoice(invoice_id)?;
            let note_expected = note.version;
            let invoice_expected = invoice.version;

            let settlement = apply_credit_note(&mut invoice, &mut note, amount)?;
            invoice.version = invoice_expected + 1;
            note.version = note_expected + 1;
            ensure_consistent(&invoice)?;

            self.store.commit(
                ChangeSet::new()
                    .update_credit_note(note.clone(), note_expected)
                    .update_invoice(invoice.clone(), invoice_expected),
            )?;
            self.cache.evict(invoice_id);
            log_settlement("credit note applied", &invoice, &settlement);
            Ok((note, invoice))
        })
    }

    pub fn refund_credit_note(&self, id: Uuid, amount: Money) -> Result<CreditNote, FacturationError> {
        let note = self.mutate_credit_note(id, |note| note.refund(amount))?;
        info!(
            credit_note_id = %id,
            amount = %amount,
            status = %note.status,
            "credit note refunded"
        );
        Ok(note)
    }

    pub fn cancel_credit_note(&self, id: Uuid) -> Result<CreditNote, FacturationError> {
        let note = self.mutate_credit_note(id, CreditNote::cancel)?;
        info!(credit_note_id = %id, "credit note cancelled");
        Ok(note)
    }

    // ── recurring templates ─────────────────────────────────────────────

    pub fn add_recurring_template(
        &self,
        request: &NewRecurringTemplate,
    ) -> Result<RecurringTemplate, FacturationError> {
        let template = request.to_template(&self.config.default_currency)?;
        self.store
            .commit(ChangeSet::new().insert_template(template.clone()))?;
        info!(
            template_id = %template.id,
            client_id = %template.client_id,
            "recurring template added"
        );
        Ok(template)
    }

    pub fn relances_for(&self, invoice_id: Uuid) -> Result<Vec<Relance>, FacturationError> {
        self.store.relances_for(invoice_id)
    }

    // ── statistics ──────────────────────────────────────────────────────

    pub fn summary(&self) -> Result<InvoiceSummary, FacturationError> {
        Ok(stats::summarize(&self.store.invoices()?))
    }

    pub fn aging(&self, today: NaiveDate) -> Result<AgingReport, FacturationError> {
        Ok(stats::aging(&self.store.invoices()?, today))
    }

    pub fn outstanding_by_client(&self) -> Result<BTreeMap<Uuid, Money>, FacturationError> {
        Ok(stats::outstanding_by_client(&self.store.invoices()?))
    }

    // ── internals ───────────────────────────────────────────────────────

    pub(super) fn load_invoice(&self, id: Uuid) -> Result<Invoice, FacturationError> {
        self.store
            .invoice(id)?
            .ok_or_else(|| FacturationError::not_found("invoice", id))
    }

    /// Read-modify-write of one invoice under its lock.
    ///
    /// Nothing is written when `op` fails or leaves the invoice unchanged.
    pub(super) fn mutate_invoice<T>(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut Invoice) -> Result<T, FacturationError>,
    ) -> Result<(Invoice, T), FacturationError> {
        self.locks.with(id, || {
            let before = self.load_invoice(id)?;
            let mut invoice = before.clone();
            let out = op(&mut invoice)?;
            if invoice == before {
                return Ok((invoice, out));
            }
            invoice.version = before.version + 1;
            ensure_consistent(&invoice)?;
            self.store
                .commit(ChangeSet::new().update_invoice(invoice.clone(), before.version))?;
            self.cache.evict(id);
            Ok((invoice, out))
        })
    }

    /// Credit-note mutations run under the origin invoice's lock.
    fn mutate_credit_note(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut CreditNote) -> Result<(), FacturationError>,
    ) -> Result<CreditNote, FacturationError> {
        let invoice_id = self.credit_note(id)?.origin_invoice_id;
        self.locks.with(invoice_id, || {
            let mut note = self.credit_note(id)?;
            let expected = note.version;
            op(&mut note)?;
            note.version = expected + 1;
            self.store
                .commit(ChangeSet::new().update_credit_note(note.clone(), expected))?;
            Ok(note)
        })
    }
}

/// Refuse to commit an invoice whose stored fields disagree.
pub(super) fn ensure_consistent(invoice: &Invoice) -> Result<(), FacturationError> {
    let errors = validate_arithmetic(invoice);
    if errors.is_empty() {
        return Ok(());
    }
    Err(FacturationError::Validation(
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    ))
}

fn log_settlement(message: &str, invoice: &Invoice, settlement: &Settlement) {
    info!(
        invoice_id = %invoice.id,
        amount = %settlement.applied,
        remaining = %settlement.remaining,
        from = %settlement.previous_status,
        status = %settlement.status,
        "{message}"
    );
}
