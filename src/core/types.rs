use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FacturationError;
use super::money::Money;
use super::state::InvoiceStatus;
use super::tax::{Tax, TaxRate};

/// Invoice (facture), the top-level billing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    /// Pre-generated unique number from the numbering collaborator.
    pub number: String,
    pub client_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    /// ISO 4217 currency code, e.g. "EUR".
    pub currency_code: String,
    /// Rate to the company's accounting currency (1 for the home currency).
    pub exchange_rate: Decimal,
    pub lines: Vec<LineItem>,
    /// Default taxes for lines without their own, plus global taxes.
    pub taxes: Vec<Tax>,
    /// Invoice-level discount, applied after line aggregation.
    pub discount: Option<Discount>,
    /// Computed totals (set by `calculate_totals()`).
    pub totals: Totals,
    /// Sum of payments reconciled against this invoice.
    pub paid_amount: Money,
    /// Sum of credit notes applied to this invoice.
    pub credited_amount: Money,
    /// Montant restant = total − paid − credited.
    pub amount_remaining: Money,
    pub payment_terms: Option<String>,
    pub notes: Vec<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Quote this invoice was converted from.
    pub quote_id: Option<Uuid>,
    /// Optimistic-lock counter, bumped by every committed mutation.
    pub version: u64,
}

impl Invoice {
    /// Montant total; always equal to `totals.amount_ttc`.
    pub fn montant_total(&self) -> Money {
        self.totals.amount_ttc
    }

    /// Everything already settled by payments and credit notes.
    pub fn settled_amount(&self) -> Money {
        self.paid_amount + self.credited_amount
    }

    /// Amount converted to the accounting currency.
    pub fn total_in_accounting_currency(&self) -> Result<Money, FacturationError> {
        self.montant_total()
            .checked_scale(self.exchange_rate)
            .ok_or_else(|| {
                FacturationError::InvalidAmount(format!(
                    "{} at exchange rate {} is out of range",
                    self.montant_total(),
                    self.exchange_rate
                ))
            })
    }
}

/// Invoice line (ligne de facture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub designation: String,
    /// Product catalog reference.
    pub product_ref: Option<String>,
    /// Positive integer quantity.
    pub quantity: u32,
    /// Non-negative unit price HT.
    pub unit_price: Money,
    pub discount: Option<Discount>,
    /// Taxes for this line; empty means the invoice defaults apply.
    pub taxes: Vec<Tax>,
    /// Tax rows carry a tax amount, not a product.
    pub is_tax_line: bool,
    /// Calculated line total after the line discount.
    /// Set by `calculate_totals()`.
    pub line_amount: Option<Money>,
}

/// Percentage or absolute discount. Supplying both is a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Discount {
    pub percent: Option<Decimal>,
    pub amount: Option<Money>,
}

impl Discount {
    pub fn percent(percent: Decimal) -> Self {
        Self {
            percent: Some(percent),
            amount: None,
        }
    }

    pub fn amount(amount: Money) -> Self {
        Self {
            percent: None,
            amount: Some(amount),
        }
    }

    /// Apply to `base`, flooring the result at zero.
    pub fn apply(&self, base: Money) -> Result<Money, FacturationError> {
        match (self.percent, self.amount) {
            (Some(p), Some(a)) => Err(FacturationError::ConflictingDiscount(format!(
                "both {p}% and {a} given; supply one of percentage or amount"
            ))),
            (Some(p), None) => {
                if p < Decimal::ZERO || p > Decimal::ONE_HUNDRED {
                    return Err(FacturationError::InvalidAmount(format!(
                        "discount percentage {p} must lie within [0, 100]"
                    )));
                }
                Ok(base.percent(Decimal::ONE_HUNDRED - p).floor_zero())
            }
            (None, Some(a)) => {
                if a.is_negative() {
                    return Err(FacturationError::InvalidAmount(format!(
                        "discount amount {a} must not be negative"
                    )));
                }
                Ok((base - a).floor_zero())
            }
            (None, None) => Ok(base),
        }
    }
}

/// Document totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of product line totals before the invoice-level discount.
    pub line_net_total: Money,
    /// Invoice-level discount actually granted.
    pub discount_total: Money,
    /// Montant HT = line_net_total − discount_total.
    pub amount_ht: Money,
    /// Montant TVA.
    pub amount_tva: Money,
    /// Montant TTC = amount_ht + amount_tva.
    pub amount_ttc: Money,
    /// Tax breakdown by (name, rate).
    pub tax_breakdown: Vec<TaxBreakdown>,
}

/// Tax amount per tax/rate combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub name: String,
    pub rate: TaxRate,
    /// True for fixed-amount taxes and tax lines.
    pub fixed: bool,
    /// Taxable base (zero for tax lines).
    pub taxable_amount: Money,
    pub tax_amount: Money,
}

/// Payment means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Check,
    Transfer,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Check => "CHECK",
            Self::Transfer => "TRANSFER",
            Self::Card => "CARD",
            Self::Other => "OTHER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Espèces",
            Self::Check => "Chèque",
            Self::Transfer => "Virement",
            Self::Card => "Carte bancaire",
            Self::Other => "Autre",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CASH" => Some(Self::Cash),
            "CHECK" => Some(Self::Check),
            "TRANSFER" => Some(Self::Transfer),
            "CARD" => Some(Self::Card),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A received payment (paiement / règlement).
///
/// Linked payments carry `invoice_id` and are fully allocated at creation.
/// Unlinked payments are client credits allocated later, possibly across
/// several invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub allocations: Vec<Allocation>,
    pub version: u64,
}

impl Payment {
    pub fn allocated(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Client credit still available for allocation.
    pub fn unallocated(&self) -> Money {
        self.amount - self.allocated()
    }
}

/// Part of a payment reconciled against one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub invoice_id: Uuid,
    pub amount: Money,
    pub date: NaiveDate,
}
