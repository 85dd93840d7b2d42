//! Quotes (devis), totalled with the same aggregator as invoices.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::builder::InvoiceBuilder;
use super::calculation::calculate_totals;
use super::error::FacturationError;
use super::tax::Tax;
use super::types::{Discount, Invoice, LineItem, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[serde(rename = "BROUILLON")]
    Draft,
    #[serde(rename = "ENVOYE")]
    Sent,
    #[serde(rename = "ACCEPTE")]
    Accepted,
    #[serde(rename = "REFUSE")]
    Refused,
    #[serde(rename = "EXPIRE")]
    Expired,
}

impl QuoteStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Draft => "BROUILLON",
            Self::Sent => "ENVOYE",
            Self::Accepted => "ACCEPTE",
            Self::Refused => "REFUSE",
            Self::Expired => "EXPIRE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub number: String,
    pub client_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    /// Last day the offer can be accepted.
    pub valid_until: Option<NaiveDate>,
    pub status: QuoteStatus,
    pub currency_code: String,
    pub exchange_rate: Decimal,
    pub lines: Vec<LineItem>,
    pub taxes: Vec<Tax>,
    pub discount: Option<Discount>,
    pub totals: Totals,
    pub notes: Vec<String>,
}

impl Quote {
    fn illegal(&self, action: &str) -> FacturationError {
        FacturationError::IllegalStateTransition(format!(
            "quote {} cannot be {action} while {}",
            self.number,
            self.status.code()
        ))
    }

    pub fn send(&mut self) -> Result<(), FacturationError> {
        if self.status != QuoteStatus::Draft {
            return Err(self.illegal("sent"));
        }
        self.status = QuoteStatus::Sent;
        Ok(())
    }

    /// Accept on `today`; an offer past its validity date expires instead.
    pub fn accept(&mut self, today: NaiveDate) -> Result<(), FacturationError> {
        if self.status != QuoteStatus::Sent {
            return Err(self.illegal("accepted"));
        }
        if self.valid_until.is_some_and(|v| v < today) {
            self.status = QuoteStatus::Expired;
            return Err(self.illegal("accepted"));
        }
        self.status = QuoteStatus::Accepted;
        Ok(())
    }

    pub fn refuse(&mut self) -> Result<(), FacturationError> {
        if self.status != QuoteStatus::Sent {
            return Err(self.illegal("refused"));
        }
        self.status = QuoteStatus::Refused;
        Ok(())
    }

    /// Expire an open quote whose validity date has passed.
    /// Returns true if the status changed.
    pub fn expire(&mut self, today: NaiveDate) -> bool {
        let open = matches!(self.status, QuoteStatus::Draft | QuoteStatus::Sent);
        if open && self.valid_until.is_some_and(|v| v < today) {
            self.status = QuoteStatus::Expired;
            true
        } else {
            false
        }
    }

    /// Draft invoice with the same lines, taxes and discount.
    pub fn to_invoice(
        &self,
        number: impl Into<String>,
        issue_date: NaiveDate,
        due_date: Option<NaiveDate>,
    ) -> Result<Invoice, FacturationError> {
        if self.status != QuoteStatus::Accepted {
            return Err(self.illegal("invoiced"));
        }
        let mut builder = InvoiceBuilder::new(number, issue_date)
            .currency(self.currency_code.clone())
            .exchange_rate(self.exchange_rate)
            .lines(self.lines.iter().cloned())
            .taxes(self.taxes.iter().cloned())
            .quote(self.id)
            .note(format!("Devis {}", self.number));
        if let Some(client) = self.client_id {
            builder = builder.client(client);
        }
        if let Some(due) = due_date {
            builder = builder.due_date(due);
        }
        if let Some(discount) = self.discount {
            builder = builder.discount(discount);
        }
        builder.build()
    }
}

/// Builder for quotes.
pub struct QuoteBuilder {
    number: String,
    client_id: Option<Uuid>,
    issue_date: NaiveDate,
    valid_until: Option<NaiveDate>,
    currency_code: String,
    lines: Vec<LineItem>,
    taxes: Vec<Tax>,
    discount: Option<Discount>,
    notes: Vec<String>,
}

impl QuoteBuilder {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            client_id: None,
            issue_date,
            valid_until: None,
            currency_code: "EUR".to_string(),
            lines: Vec::new(),
            taxes: Vec::new(),
            discount: None,
            notes: Vec::new(),
        }
    }

    pub fn client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn valid_until(mut self, date: NaiveDate) -> Self {
        self.valid_until = Some(date);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    pub fn default_tax(mut self, tax: Tax) -> Self {
        self.taxes.push(tax);
        self
    }

    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn build(self) -> Result<Quote, FacturationError> {
        if self.lines.is_empty() {
            return Err(FacturationError::Builder(
                "at least one line item is required".into(),
            ));
        }
        if self.valid_until.is_some_and(|v| v < self.issue_date) {
            return Err(FacturationError::Builder(
                "validity date precedes issue date".into(),
            ));
        }
        let mut lines = self.lines;
        let totals = calculate_totals(&mut lines, &self.taxes, self.discount.as_ref())?;
        Ok(Quote {
            id: Uuid::new_v4(),
            number: self.number,
            client_id: self.client_id,
            issue_date: self.issue_date,
            valid_until: self.valid_until,
            status: QuoteStatus::Draft,
            currency_code: self.currency_code,
            exchange_rate: Decimal::ONE,
            lines,
            taxes: self.taxes,
            discount: self.discount,
            totals,
            notes: self.notes,
        })
    }
}
