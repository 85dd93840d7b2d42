//! Inbound requests and their explicit conversions into core documents.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{
    Allocation, CreditNoteKind, Discount, FacturationError, Invoice, InvoiceBuilder, LineItem,
    LineItemBuilder, Money, Payment, PaymentMethod, Tax,
};

use super::recurring::{Frequency, RecurringTemplate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLine {
    pub designation: String,
    #[serde(default)]
    pub product_ref: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Money>,
    #[serde(default)]
    pub taxes: Vec<Tax>,
    #[serde(default)]
    pub is_tax_line: bool,
}

impl NewLine {
    pub fn new(designation: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            designation: designation.into(),
            product_ref: None,
            quantity,
            unit_price,
            discount_percent: None,
            discount_amount: None,
            taxes: Vec::new(),
            is_tax_line: false,
        }
    }

    /// Line numbered `position` (1-based) on its document.
    pub fn to_line_item(&self, position: usize) -> LineItem {
        let mut builder = LineItemBuilder::new(
            position.to_string(),
            self.designation.clone(),
            self.quantity,
            self.unit_price,
        );
        if let Some(reference) = &self.product_ref {
            builder = builder.product_ref(reference.clone());
        }
        if let Some(pct) = self.discount_percent {
            builder = builder.discount_percent(pct);
        }
        if let Some(amount) = self.discount_amount {
            builder = builder.discount_amount(amount);
        }
        for tax in &self.taxes {
            builder = builder.tax(tax.clone());
        }
        if self.is_tax_line {
            builder = builder.tax_line();
        }
        builder.build()
    }
}

pub fn to_line_items(lines: &[NewLine]) -> Vec<LineItem> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| l.to_line_item(i + 1))
        .collect()
}

/// Request to create a draft invoice under a pre-generated number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub number: String,
    pub client_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    pub lines: Vec<NewLine>,
    #[serde(default)]
    pub taxes: Vec<Tax>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl NewInvoice {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            number: number.into(),
            client_id: None,
            issue_date,
            due_date: None,
            currency_code: None,
            exchange_rate: None,
            lines: Vec::new(),
            taxes: Vec::new(),
            discount: None,
            payment_terms: None,
            notes: Vec::new(),
        }
    }

    pub fn to_invoice(&self, default_currency: &str) -> Result<Invoice, FacturationError> {
        let mut builder = InvoiceBuilder::new(self.number.clone(), self.issue_date)
            .currency(
                self.currency_code
                    .clone()
                    .unwrap_or_else(|| default_currency.to_string()),
            )
            .lines(to_line_items(&self.lines))
            .taxes(self.taxes.iter().cloned());
        if let Some(client) = self.client_id {
            builder = builder.client(client);
        }
        if let Some(due) = self.due_date {
            builder = builder.due_date(due);
        }
        if let Some(rate) = self.exchange_rate {
            builder = builder.exchange_rate(rate);
        }
        if let Some(discount) = self.discount {
            builder = builder.discount(discount);
        }
        if let Some(terms) = &self.payment_terms {
            builder = builder.payment_terms(terms.clone());
        }
        for note in &self.notes {
            builder = builder.note(note.clone());
        }
        builder.build()
    }
}

/// A payment received. With `invoice_id` it settles that invoice at once;
/// without, it becomes client credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    #[serde(default)]
    pub invoice_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
}

impl NewPayment {
    pub fn to_payment(&self) -> Result<Payment, FacturationError> {
        if !self.amount.is_positive() {
            return Err(FacturationError::InvalidAmount(format!(
                "payment amount {} must be positive",
                self.amount
            )));
        }
        let allocations = self
            .invoice_id
            .map(|invoice_id| Allocation {
                invoice_id,
                amount: self.amount,
                date: self.date,
            })
            .into_iter()
            .collect();
        Ok(Payment {
            id: Uuid::new_v4(),
            client_id: self.client_id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            date: self.date,
            method: self.method,
            reference: self.reference.clone(),
            allocations,
            version: 0,
        })
    }
}

/// Request for a draft credit note against an issued invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCreditNote {
    pub number: String,
    pub invoice_id: Uuid,
    pub issue_date: NaiveDate,
    pub kind: CreditNoteKind,
    #[serde(default)]
    pub reason: Option<String>,
    /// Lines to credit; `None` credits the whole invoice.
    #[serde(default)]
    pub lines: Option<Vec<NewLine>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecurringTemplate {
    pub client_id: Uuid,
    #[serde(default)]
    pub currency_code: Option<String>,
    pub lines: Vec<NewLine>,
    #[serde(default)]
    pub taxes: Vec<Tax>,
    #[serde(default)]
    pub discount: Option<Discount>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_term_days: Option<u32>,
}

impl NewRecurringTemplate {
    pub fn to_template(&self, default_currency: &str) -> Result<RecurringTemplate, FacturationError> {
        if self.lines.is_empty() {
            return Err(FacturationError::Builder(
                "a recurring template needs at least one line".into(),
            ));
        }
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err(FacturationError::Builder(
                "template end date precedes its start date".into(),
            ));
        }
        Ok(RecurringTemplate {
            id: Uuid::new_v4(),
            client_id: self.client_id,
            currency_code: self
                .currency_code
                .clone()
                .unwrap_or_else(|| default_currency.to_string()),
            lines: to_line_items(&self.lines),
            taxes: self.taxes.clone(),
            discount: self.discount,
            frequency: self.frequency,
            start_date: self.start_date,
            occurrences: 0,
            end_date: self.end_date,
            payment_term_days: self.payment_term_days,
            active: true,
            version: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn invoice_request_uses_default_currency() {
        let mut req = NewInvoice::new("FAC-2024-0009", NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        req.taxes.push(Tax::vat(dec!(20)).unwrap());
        req.lines.push(NewLine::new("Conseil", 3, Money::new(dec!(100))));
        let inv = req.to_invoice("EUR").unwrap();
        assert_eq!(inv.currency_code, "EUR");
        assert_eq!(inv.lines[0].id, "1");
        assert_eq!(inv.montant_total(), Money::new(dec!(360)));
    }

    #[test]
    fn conflicting_line_discount_surfaces() {
        let mut line = NewLine::new("Conseil", 1, Money::new(dec!(100)));
        line.discount_percent = Some(dec!(10));
        line.discount_amount = Some(Money::new(dec!(5)));
        let mut req = NewInvoice::new("FAC-1", NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        req.lines.push(line);
        assert!(matches!(
            req.to_invoice("EUR"),
            Err(FacturationError::ConflictingDiscount(_))
        ));
    }

    #[test]
    fn linked_payment_is_fully_allocated() {
        let invoice_id = Uuid::new_v4();
        let p = NewPayment {
            invoice_id: Some(invoice_id),
            client_id: None,
            amount: Money::new(dec!(12.5)),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            method: PaymentMethod::Transfer,
            reference: None,
        }
        .to_payment()
        .unwrap();
        assert_eq!(p.allocated(), p.amount);
        assert_eq!(p.allocations[0].invoice_id, invoice_id);
    }

    #[test]
    fn zero_payment_rejected() {
        let p = NewPayment {
            invoice_id: None,
            client_id: None,
            amount: Money::ZERO,
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            method: PaymentMethod::Cash,
            reference: None,
        };
        assert!(matches!(p.to_payment(), Err(FacturationError::InvalidAmount(_))));
    }
}
