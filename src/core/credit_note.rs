//! Credit notes (avoirs).
//!
//! A credit note references an issued invoice. Once validated it can be
//! applied to the invoice's remaining balance, refunded in cash, or both, as
//! long as `applied + refunded` stays within its total.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculation::calculate_totals;
use super::error::FacturationError;
use super::money::Money;
use super::state::InvoiceStatus;
use super::tax::Tax;
use super::types::{Invoice, LineItem, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditNoteKind {
    Refund,
    Return,
    BillingError,
    CommercialDiscount,
    PartialCancellation,
}

impl CreditNoteKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Refund => "Remboursement",
            Self::Return => "Retour marchandise",
            Self::BillingError => "Erreur de facturation",
            Self::CommercialDiscount => "Geste commercial",
            Self::PartialCancellation => "Annulation partielle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditNoteStatus {
    #[serde(rename = "BROUILLON")]
    Draft,
    #[serde(rename = "VALIDE")]
    Validated,
    #[serde(rename = "APPLIQUE")]
    Applied,
    #[serde(rename = "REMBOURSE")]
    Refunded,
    #[serde(rename = "ANNULE")]
    Cancelled,
}

impl CreditNoteStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Draft => "BROUILLON",
            Self::Validated => "VALIDE",
            Self::Applied => "APPLIQUE",
            Self::Refunded => "REMBOURSE",
            Self::Cancelled => "ANNULE",
        }
    }
}

impl std::fmt::Display for CreditNoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: Uuid,
    pub number: String,
    pub origin_invoice_id: Uuid,
    pub client_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub kind: CreditNoteKind,
    pub status: CreditNoteStatus,
    pub reason: Option<String>,
    pub currency_code: String,
    pub lines: Vec<LineItem>,
    pub taxes: Vec<Tax>,
    pub totals: Totals,
    /// Amount applied to the origin invoice's balance.
    pub applied: Money,
    /// Amount returned to the client.
    pub refunded: Money,
    pub validated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl CreditNote {
    pub fn total(&self) -> Money {
        self.totals.amount_ttc
    }

    /// Credit neither applied nor refunded yet.
    pub fn available(&self) -> Money {
        self.total() - self.applied - self.refunded
    }

    /// BROUILLON → VALIDE.
    pub fn validate(&mut self, at: DateTime<Utc>) -> Result<(), FacturationError> {
        if self.status != CreditNoteStatus::Draft {
            return Err(FacturationError::IllegalStateTransition(format!(
                "credit note {} can only be validated from {}, it is {}",
                self.number,
                CreditNoteStatus::Draft,
                self.status
            )));
        }
        self.status = CreditNoteStatus::Validated;
        self.validated_at = Some(at);
        Ok(())
    }

    /// Return `amount` to the client. Becomes REMBOURSE once nothing is left.
    pub fn refund(&mut self, amount: Money) -> Result<(), FacturationError> {
        if !amount.is_positive() {
            return Err(FacturationError::InvalidAmount(format!(
                "refund amount {amount} must be positive"
            )));
        }
        if !matches!(
            self.status,
            CreditNoteStatus::Validated | CreditNoteStatus::Applied
        ) {
            return Err(FacturationError::IllegalStateTransition(format!(
                "credit note {} cannot be refunded while {}",
                self.number, self.status
            )));
        }
        if amount > self.available() {
            return Err(FacturationError::OverpaymentRejected(format!(
                "refund {amount} exceeds the {} still available on credit note {}",
                self.available(),
                self.number
            )));
        }
        self.refunded += amount;
        if self.available().is_zero() {
            self.status = CreditNoteStatus::Refunded;
        }
        Ok(())
    }

    /// BROUILLON / VALIDE → ANNULE, only while nothing was applied or refunded.
    pub fn cancel(&mut self) -> Result<(), FacturationError> {
        let untouched = self.applied.is_zero() && self.refunded.is_zero();
        if !matches!(
            self.status,
            CreditNoteStatus::Draft | CreditNoteStatus::Validated
        ) || !untouched
        {
            return Err(FacturationError::IllegalStateTransition(format!(
                "credit note {} cannot be cancelled while {}",
                self.number, self.status
            )));
        }
        self.status = CreditNoteStatus::Cancelled;
        Ok(())
    }
}

/// Builder for credit notes against an issued invoice.
pub struct CreditNoteBuilder {
    id: Uuid,
    number: String,
    issue_date: NaiveDate,
    kind: CreditNoteKind,
    reason: Option<String>,
    origin_id: Uuid,
    origin_number: String,
    origin_status: InvoiceStatus,
    origin_total: Money,
    client_id: Option<Uuid>,
    currency_code: String,
    taxes: Vec<Tax>,
    lines: Vec<LineItem>,
}

impl CreditNoteBuilder {
    pub fn new(
        number: impl Into<String>,
        issue_date: NaiveDate,
        origin: &Invoice,
        kind: CreditNoteKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            issue_date,
            kind,
            reason: None,
            origin_id: origin.id,
            origin_number: origin.number.clone(),
            origin_status: origin.status,
            origin_total: origin.montant_total(),
            client_id: origin.client_id,
            currency_code: origin.currency_code.clone(),
            taxes: origin.taxes.clone(),
            lines: Vec::new(),
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    /// Credit the origin invoice's lines one for one.
    pub fn lines_from(mut self, origin: &Invoice) -> Self {
        self.lines.extend(origin.lines.iter().cloned());
        self
    }

    pub fn build(self) -> Result<CreditNote, FacturationError> {
        if matches!(
            self.origin_status,
            InvoiceStatus::Draft | InvoiceStatus::Cancelled
        ) {
            return Err(FacturationError::IllegalStateTransition(format!(
                "no credit note can be issued against invoice {} while {}",
                self.origin_number, self.origin_status
            )));
        }
        if self.lines.is_empty() {
            return Err(FacturationError::Builder(
                "at least one line item is required".into(),
            ));
        }
        let mut lines = self.lines;
        let totals = calculate_totals(&mut lines, &self.taxes, None)?;
        if !totals.amount_ttc.is_positive() {
            return Err(FacturationError::InvalidAmount(
                "credit note total must be positive".into(),
            ));
        }
        if totals.amount_ttc > self.origin_total {
            return Err(FacturationError::InvalidAmount(format!(
                "credit note total {} exceeds invoice {} total {}",
                totals.amount_ttc, self.origin_number, self.origin_total
            )));
        }
        Ok(CreditNote {
            id: self.id,
            number: self.number,
            origin_invoice_id: self.origin_id,
            client_id: self.client_id,
            issue_date: self.issue_date,
            kind: self.kind,
            status: CreditNoteStatus::Draft,
            reason: self.reason,
            currency_code: self.currency_code,
            lines,
            taxes: self.taxes,
            totals,
            applied: Money::ZERO,
            refunded: Money::ZERO,
            validated_at: None,
            version: 0,
        })
    }
}
