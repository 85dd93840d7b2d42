use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::calculation::recalculate;
use super::error::FacturationError;
use super::money::Money;
use super::state::InvoiceStatus;
use super::tax::Tax;
use super::types::*;
use super::validation;

/// Builder for constructing draft invoices with computed totals.
///
/// ```
/// use facturation::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let invoice = InvoiceBuilder::new("FAC-2024-0001", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
///     .currency("EUR")
///     .default_tax(Tax::vat(dec!(20)).unwrap())
///     .add_line(LineItemBuilder::new("1", "Développement", 10, Money::new(dec!(150.00)))
///         .discount_percent(dec!(5))
///         .build())
///     .build()
///     .unwrap();
/// assert_eq!(invoice.totals.amount_ht, Money::new(dec!(1425)));
/// ```
pub struct InvoiceBuilder {
    id: Uuid,
    number: String,
    client_id: Option<Uuid>,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    currency_code: String,
    exchange_rate: Decimal,
    lines: Vec<LineItem>,
    taxes: Vec<Tax>,
    discount: Option<Discount>,
    payment_terms: Option<String>,
    notes: Vec<String>,
    quote_id: Option<Uuid>,
}

impl InvoiceBuilder {
    pub fn new(number: impl Into<String>, issue_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            client_id: None,
            issue_date,
            due_date: None,
            currency_code: "EUR".to_string(),
            exchange_rate: Decimal::ONE,
            lines: Vec::new(),
            taxes: Vec::new(),
            discount: None,
            payment_terms: None,
            notes: Vec::new(),
            quote_id: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    pub fn exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = rate;
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = LineItem>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn default_tax(mut self, tax: Tax) -> Self {
        self.taxes.push(tax);
        self
    }

    pub fn taxes(mut self, taxes: impl IntoIterator<Item = Tax>) -> Self {
        self.taxes.extend(taxes);
        self
    }

    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn payment_terms(mut self, terms: impl Into<String>) -> Self {
        self.payment_terms = Some(terms.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub(crate) fn quote(mut self, quote_id: Uuid) -> Self {
        self.quote_id = Some(quote_id);
        self
    }

    /// Build the draft invoice, calculating totals and running validation.
    /// Returns all validation errors (not just the first).
    pub fn build(self) -> Result<Invoice, FacturationError> {
        if self.lines.is_empty() {
            return Err(FacturationError::Builder(
                "at least one line item is required".into(),
            ));
        }

        // Input limits to prevent abuse
        if self.lines.len() > 10_000 {
            return Err(FacturationError::Builder(
                "invoice cannot have more than 10,000 line items".into(),
            ));
        }
        if self.number.len() > 200 {
            return Err(FacturationError::Builder(
                "invoice number cannot exceed 200 characters".into(),
            ));
        }
        if self.notes.len() > 100 {
            return Err(FacturationError::Builder(
                "invoice cannot have more than 100 notes".into(),
            ));
        }

        let mut invoice = Invoice {
            id: self.id,
            number: self.number,
            client_id: self.client_id,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: InvoiceStatus::Draft,
            currency_code: self.currency_code,
            exchange_rate: self.exchange_rate,
            lines: self.lines,
            taxes: self.taxes,
            discount: self.discount,
            totals: Totals::default(),
            paid_amount: Money::ZERO,
            credited_amount: Money::ZERO,
            amount_remaining: Money::ZERO,
            payment_terms: self.payment_terms,
            notes: self.notes,
            sent_at: None,
            cancelled_at: None,
            quote_id: self.quote_id,
            version: 0,
        };

        // Typed arithmetic errors first, then the collected field checks
        recalculate(&mut invoice)?;

        let errors = validation::validate_invoice(&invoice);
        if !errors.is_empty() {
            let msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FacturationError::Validation(msg));
        }

        Ok(invoice)
    }
}

/// Builder for LineItem.
pub struct LineItemBuilder {
    id: String,
    designation: String,
    product_ref: Option<String>,
    quantity: u32,
    unit_price: Money,
    discount: Option<Discount>,
    taxes: Vec<Tax>,
    is_tax_line: bool,
}

impl LineItemBuilder {
    pub fn new(
        id: impl Into<String>,
        designation: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            id: id.into(),
            designation: designation.into(),
            product_ref: None,
            quantity,
            unit_price,
            discount: None,
            taxes: Vec::new(),
            is_tax_line: false,
        }
    }

    pub fn product_ref(mut self, reference: impl Into<String>) -> Self {
        self.product_ref = Some(reference.into());
        self
    }

    pub fn discount_percent(mut self, percent: Decimal) -> Self {
        self.discount.get_or_insert_with(Discount::default).percent = Some(percent);
        self
    }

    pub fn discount_amount(mut self, amount: Money) -> Self {
        self.discount.get_or_insert_with(Discount::default).amount = Some(amount);
        self
    }

    /// Tax specific to this line; replaces the invoice defaults.
    pub fn tax(mut self, tax: Tax) -> Self {
        self.taxes.push(tax);
        self
    }

    /// Mark as a tax row: its total goes to TVA, not HT.
    pub fn tax_line(mut self) -> Self {
        self.is_tax_line = true;
        self
    }

    pub fn build(self) -> LineItem {
        LineItem {
            id: self.id,
            designation: self.designation,
            product_ref: self.product_ref,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            taxes: self.taxes,
            is_tax_line: self.is_tax_line,
            line_amount: None,
        }
    }
}
