//! Payment and credit-note reconciliation against an invoice's remaining
//! balance. Both operations are all-or-nothing: on error neither document is
//! modified.

use super::credit_note::{CreditNote, CreditNoteStatus};
use super::error::FacturationError;
use super::money::Money;
use super::state::InvoiceStatus;
use super::types::Invoice;

/// Outcome of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub applied: Money,
    pub remaining: Money,
    pub previous_status: InvoiceStatus,
    pub status: InvoiceStatus,
}

/// Check whether `amount` may be settled on `invoice` right now.
pub fn can_settle(invoice: &Invoice, amount: Money) -> Result<(), FacturationError> {
    if !amount.is_positive() {
        return Err(FacturationError::InvalidAmount(format!(
            "settlement amount {amount} must be positive"
        )));
    }
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(FacturationError::IllegalStateTransition(format!(
            "invoice {} is {} and accepts no settlement",
            invoice.number, invoice.status
        )));
    }
    if amount > invoice.amount_remaining {
        return Err(FacturationError::OverpaymentRejected(format!(
            "{amount} exceeds the {} remaining on invoice {} (cumulative settlements may not exceed the total {})",
            invoice.amount_remaining,
            invoice.number,
            invoice.montant_total()
        )));
    }
    Ok(())
}

/// Reduce the remaining balance by a payment and advance the status.
pub fn apply_payment(invoice: &mut Invoice, amount: Money) -> Result<Settlement, FacturationError> {
    can_settle(invoice, amount)?;
    let previous_status = invoice.status;

    let mut next = invoice.clone();
    next.paid_amount += amount;
    next.amount_remaining -= amount;
    next.settle_status()?;
    *invoice = next;

    Ok(Settlement {
        applied: amount,
        remaining: invoice.amount_remaining,
        previous_status,
        status: invoice.status,
    })
}

/// Apply part of a validated credit note to its origin invoice.
pub fn apply_credit_note(
    invoice: &mut Invoice,
    credit_note: &mut CreditNote,
    amount: Money,
) -> Result<Settlement, FacturationError> {
    if credit_note.origin_invoice_id != invoice.id {
        return Err(FacturationError::Validation(format!(
            "credit note {} belongs to another invoice than {}",
            credit_note.number, invoice.number
        )));
    }
    if !matches!(
        credit_note.status,
        CreditNoteStatus::Validated | CreditNoteStatus::Applied
    ) {
        return Err(FacturationError::IllegalStateTransition(format!(
            "credit note {} must be {} before it is applied, it is {}",
            credit_note.number,
            CreditNoteStatus::Validated,
            credit_note.status
        )));
    }
    if amount > credit_note.available() {
        return Err(FacturationError::OverpaymentRejected(format!(
            "{amount} exceeds the {} still available on credit note {}",
            credit_note.available(),
            credit_note.number
        )));
    }
    can_settle(invoice, amount)?;
    let previous_status = invoice.status;

    let mut next = invoice.clone();
    next.credited_amount += amount;
    next.amount_remaining -= amount;
    next.settle_status()?;
    *invoice = next;

    credit_note.applied += amount;
    credit_note.status = CreditNoteStatus::Applied;

    Ok(Settlement {
        applied: amount,
        remaining: invoice.amount_remaining,
        previous_status,
        status: invoice.status,
    })
}
