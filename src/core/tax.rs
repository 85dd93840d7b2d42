//! Tax rates, tax definitions and HT/TTC conversions.
//!
//! Several taxes on one base are computed independently against the same HT
//! base; taxes never compound.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::FacturationError;
use super::money::Money;

/// A tax rate in percent, guaranteed to lie in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub const ZERO: TaxRate = TaxRate(Decimal::ZERO);

    pub fn new(percent: Decimal) -> Result<Self, FacturationError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(FacturationError::InvalidTaxRate(format!(
                "rate {percent}% must lie within [0, 100]"
            )));
        }
        Ok(Self(percent.normalize()))
    }

    pub fn percent(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = FacturationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        TaxRate::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(value: TaxRate) -> Self {
        value.0
    }
}

/// Tax amount on an HT base: `round(ht × rate / 100)`.
pub fn calculate_tax(amount_ht: Money, rate: TaxRate) -> Money {
    amount_ht.percent(rate.0)
}

/// TTC from HT: `round(ht + calculate_tax(ht, rate))`.
pub fn amount_including_tax(amount_ht: Money, rate: TaxRate) -> Money {
    amount_ht + calculate_tax(amount_ht, rate)
}

/// HT from TTC: `round(ttc / (1 + rate / 100))`.
pub fn amount_excluding_tax(amount_ttc: Money, rate: TaxRate) -> Money {
    let divisor = Decimal::ONE + rate.0 / Decimal::ONE_HUNDRED;
    Money::new(amount_ttc.amount() / divisor)
}

/// Where a tax is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxScope {
    /// Evaluated on each product line's HT base.
    #[default]
    Line,
    /// Evaluated once on the invoice HT after the invoice-level discount.
    Global,
}

/// A named tax: rate-based, or a fixed amount overriding the rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tax {
    pub name: String,
    pub rate: TaxRate,
    #[serde(default)]
    pub scope: TaxScope,
    /// Replaces the rate-based computation when set.
    #[serde(default)]
    pub fixed_amount: Option<Money>,
}

impl Tax {
    pub fn new(name: impl Into<String>, rate: Decimal) -> Result<Self, FacturationError> {
        Ok(Self {
            name: name.into(),
            rate: TaxRate::new(rate)?,
            scope: TaxScope::Line,
            fixed_amount: None,
        })
    }

    /// Value-added tax named after its rate, e.g. "TVA 20%".
    pub fn vat(rate: Decimal) -> Result<Self, FacturationError> {
        let rate = TaxRate::new(rate)?;
        Ok(Self {
            name: format!("TVA {}%", rate.percent()),
            rate,
            scope: TaxScope::Line,
            fixed_amount: None,
        })
    }

    /// A flat amount, independent of the base (eco-participation, stamp duty...).
    ///
    /// Scoped [`TaxScope::Global`]: as an invoice default it is charged once
    /// per invoice. Attached to a line it is charged on that line.
    pub fn fixed(name: impl Into<String>, amount: Money) -> Result<Self, FacturationError> {
        if amount.is_negative() {
            return Err(FacturationError::InvalidAmount(format!(
                "fixed tax amount {amount} must not be negative"
            )));
        }
        Ok(Self {
            name: name.into(),
            rate: TaxRate::ZERO,
            scope: TaxScope::Global,
            fixed_amount: Some(amount),
        })
    }

    pub fn global(mut self) -> Self {
        self.scope = TaxScope::Global;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_amount.is_some()
    }

    /// Tax owed on `base`.
    pub fn amount_on(&self, base: Money) -> Money {
        match self.fixed_amount {
            Some(fixed) => fixed,
            None => calculate_tax(base, self.rate),
        }
    }
}

/// Sum of every tax computed independently on the same base.
pub fn taxes_on(base: Money, taxes: &[Tax]) -> Money {
    taxes.iter().map(|t| t.amount_on(base)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(r: Decimal) -> TaxRate {
        TaxRate::new(r).unwrap()
    }

    #[test]
    fn rate_bounds() {
        assert!(TaxRate::new(dec!(0)).is_ok());
        assert!(TaxRate::new(dec!(100)).is_ok());
        assert!(matches!(
            TaxRate::new(dec!(-0.01)),
            Err(FacturationError::InvalidTaxRate(_))
        ));
        assert!(matches!(
            TaxRate::new(dec!(100.5)),
            Err(FacturationError::InvalidTaxRate(_))
        ));
    }

    #[test]
    fn tax_and_conversions() {
        let ht = Money::new(dec!(300));
        assert_eq!(calculate_tax(ht, rate(dec!(20))), Money::new(dec!(60)));
        assert_eq!(amount_including_tax(ht, rate(dec!(20))), Money::new(dec!(360)));
        assert_eq!(
            amount_excluding_tax(Money::new(dec!(360)), rate(dec!(20))),
            Money::new(dec!(300))
        );
        // 19.99 * 5.5% = 1.09945 → 1.10
        assert_eq!(
            calculate_tax(Money::new(dec!(19.99)), rate(dec!(5.5))),
            Money::new(dec!(1.10))
        );
    }

    #[test]
    fn zero_rate_is_identity() {
        let x = Money::new(dec!(42.42));
        assert_eq!(amount_including_tax(x, TaxRate::ZERO), x);
        assert_eq!(amount_excluding_tax(x, TaxRate::ZERO), x);
    }

    #[test]
    fn independent_taxes_share_the_base() {
        let taxes = vec![
            Tax::vat(dec!(20)).unwrap(),
            Tax::new("Taxe locale", dec!(2)).unwrap(),
            Tax::fixed("Eco-participation", Money::new(dec!(1.50))).unwrap(),
        ];
        // 20 + 2 + 1.50, not 20% of (100 + 2)
        assert_eq!(taxes_on(Money::new(dec!(100)), &taxes), Money::new(dec!(23.50)));
    }

    #[test]
    fn vat_name_uses_normalized_rate() {
        assert_eq!(Tax::vat(dec!(20.00)).unwrap().name, "TVA 20%");
        assert_eq!(Tax::vat(dec!(5.5)).unwrap().name, "TVA 5.5%");
    }

    #[test]
    fn fixed_tax_is_global() {
        let tax = Tax::fixed("Droit de timbre", Money::new(dec!(1.50))).unwrap();
        assert_eq!(tax.scope, TaxScope::Global);
        assert_eq!(tax.amount_on(Money::new(dec!(999))), Money::new(dec!(1.50)));
    }

    #[test]
    fn fixed_tax_rejects_negative() {
        assert!(Tax::fixed("x", Money::new(dec!(-1))).is_err());
    }
}
