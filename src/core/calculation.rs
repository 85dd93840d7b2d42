use std::collections::BTreeMap;

use super::error::FacturationError;
use super::money::{MAX_AMOUNT, Money};
use super::state::InvoiceStatus;
use super::tax::{Tax, TaxRate, TaxScope};
use super::types::*;

/// Line total after the line discount: `round(quantity × unit_price)` then
/// the percentage or absolute discount, floored at zero.
pub fn line_total(line: &LineItem) -> Result<Money, FacturationError> {
    if line.quantity == 0 {
        return Err(FacturationError::InvalidAmount(format!(
            "line {}: quantity must be a positive integer",
            line.id
        )));
    }
    if line.unit_price.is_negative() {
        return Err(FacturationError::InvalidAmount(format!(
            "line {}: unit price {} must not be negative",
            line.id, line.unit_price
        )));
    }
    let base = line
        .unit_price
        .checked_times(line.quantity)
        .filter(Money::is_within_limit)
        .ok_or_else(|| {
            FacturationError::InvalidAmount(format!(
                "line {}: {} × {} exceeds the largest supported amount {MAX_AMOUNT}",
                line.id, line.quantity, line.unit_price
            ))
        })?;
    match &line.discount {
        Some(discount) => discount.apply(base),
        None => Ok(base),
    }
}

/// Calculate totals for a set of lines (mutates line amounts on success only).
///
/// Product lines are taxed with their own taxes, or with the default taxes of
/// [`TaxScope::Line`]. Default taxes of [`TaxScope::Global`] are evaluated once
/// on the discounted HT. Tax lines add their total straight to the TVA.
pub fn calculate_totals(
    lines: &mut [LineItem],
    default_taxes: &[Tax],
    discount: Option<&Discount>,
) -> Result<Totals, FacturationError> {
    let (amounts, totals) = compute(lines, default_taxes, discount)?;
    for (line, amount) in lines.iter_mut().zip(amounts) {
        line.line_amount = Some(amount);
    }
    Ok(totals)
}

/// Recompute an invoice's totals and remaining balance.
///
/// Fails without touching the invoice when a line is invalid or when the new
/// total would drop below what has already been settled.
pub fn recalculate(invoice: &mut Invoice) -> Result<(), FacturationError> {
    let (amounts, totals) = compute(&invoice.lines, &invoice.taxes, invoice.discount.as_ref())?;
    let remaining = totals.amount_ttc - invoice.settled_amount();
    if remaining.is_negative() {
        return Err(FacturationError::OverpaymentRejected(format!(
            "new total {} is below the {} already settled on invoice {}",
            totals.amount_ttc,
            invoice.settled_amount(),
            invoice.number
        )));
    }
    for (line, amount) in invoice.lines.iter_mut().zip(amounts) {
        line.line_amount = Some(amount);
    }
    invoice.totals = totals;
    invoice.amount_remaining = remaining;
    Ok(())
}

impl Invoice {
    /// Replace the lines and invoice discount of a draft invoice.
    pub fn update_lines(
        &mut self,
        lines: Vec<LineItem>,
        discount: Option<Discount>,
    ) -> Result<(), FacturationError> {
        if self.status != InvoiceStatus::Draft {
            return Err(FacturationError::IllegalStateTransition(format!(
                "lines of invoice {} are locked once it leaves {}",
                self.number,
                InvoiceStatus::Draft.code()
            )));
        }
        let mut candidate = self.clone();
        candidate.lines = lines;
        candidate.discount = discount;
        recalculate(&mut candidate)?;
        *self = candidate;
        Ok(())
    }
}

pub(crate) fn compute(
    lines: &[LineItem],
    default_taxes: &[Tax],
    discount: Option<&Discount>,
) -> Result<(Vec<Money>, Totals), FacturationError> {
    let amounts = lines
        .iter()
        .map(line_total)
        .collect::<Result<Vec<_>, _>>()?;
    for tax in default_taxes.iter().chain(lines.iter().flat_map(|l| &l.taxes)) {
        check_fixed_amount(tax)?;
    }

    let line_net_total: Money = lines
        .iter()
        .zip(&amounts)
        .filter(|(l, _)| !l.is_tax_line)
        .map(|(_, a)| *a)
        .sum();

    let amount_ht = match discount {
        Some(d) => d.apply(line_net_total)?,
        None => line_net_total,
    };
    let discount_total = line_net_total - amount_ht;

    let bases = distribute(lines, &amounts, line_net_total, amount_ht)?;

    // Group by (name, rate, fixed); BTreeMap keeps the breakdown ordered
    let mut groups: BTreeMap<(String, TaxRate, bool), (Money, Money)> = BTreeMap::new();
    let mut add = |tax: &Tax, base: Money| {
        let entry = groups
            .entry((tax.name.clone(), tax.rate, tax.is_fixed()))
            .or_insert((Money::ZERO, Money::ZERO));
        entry.0 += base;
        entry.1 += tax.amount_on(base);
    };

    let line_defaults: Vec<&Tax> = default_taxes
        .iter()
        .filter(|t| t.scope == TaxScope::Line)
        .collect();

    for (line, base) in lines.iter().zip(&bases) {
        if line.is_tax_line {
            continue;
        }
        if line.taxes.is_empty() {
            for tax in line_defaults.iter().copied() {
                add(tax, *base);
            }
        } else {
            for tax in &line.taxes {
                add(tax, *base);
            }
        }
    }

    for tax in default_taxes.iter().filter(|t| t.scope == TaxScope::Global) {
        add(tax, amount_ht);
    }

    let mut tax_breakdown: Vec<TaxBreakdown> = groups
        .into_iter()
        .map(|((name, rate, fixed), (taxable_amount, tax_amount))| TaxBreakdown {
            name,
            rate,
            fixed,
            taxable_amount,
            tax_amount,
        })
        .collect();

    for (line, amount) in lines.iter().zip(&amounts) {
        if line.is_tax_line {
            tax_breakdown.push(TaxBreakdown {
                name: line.designation.clone(),
                rate: TaxRate::ZERO,
                fixed: true,
                taxable_amount: Money::ZERO,
                tax_amount: *amount,
            });
        }
    }

    let amount_tva: Money = tax_breakdown.iter().map(|b| b.tax_amount).sum();
    let amount_ttc = amount_ht + amount_tva;

    Ok((
        amounts,
        Totals {
            line_net_total,
            discount_total,
            amount_ht,
            amount_tva,
            amount_ttc,
            tax_breakdown,
        },
    ))
}

fn check_fixed_amount(tax: &Tax) -> Result<(), FacturationError> {
    match tax.fixed_amount {
        Some(amount) if !amount.is_within_limit() => Err(FacturationError::InvalidAmount(format!(
            "fixed tax {} of {amount} must lie within [0, {MAX_AMOUNT}]",
            tax.name
        ))),
        _ => Ok(()),
    }
}

/// Spread the invoice-level discount over the product lines in proportion to
/// their totals, in whole cents by largest remainder. Each base stays within
/// `[0, line total]` and the bases add up to the discounted HT exactly. Tax
/// lines get a zero base.
fn distribute(
    lines: &[LineItem],
    amounts: &[Money],
    line_net_total: Money,
    amount_ht: Money,
) -> Result<Vec<Money>, FacturationError> {
    if amount_ht == line_net_total {
        return Ok(lines
            .iter()
            .zip(amounts)
            .map(|(l, a)| if l.is_tax_line { Money::ZERO } else { *a })
            .collect());
    }
    let mut bases = vec![Money::ZERO; lines.len()];
    if line_net_total.is_zero() || amount_ht.is_zero() {
        return Ok(bases);
    }

    let out_of_range = || {
        FacturationError::InvalidAmount(format!(
            "cannot spread the discount over {line_net_total}: amounts out of range"
        ))
    };
    let net = line_net_total.to_minor().ok_or_else(out_of_range)?;
    let ht = amount_ht.to_minor().ok_or_else(out_of_range)?;

    let mut cents = vec![0i128; lines.len()];
    let mut leftovers: Vec<(i128, Money, usize)> = Vec::new();
    let mut spread = 0i128;
    for (i, (line, amount)) in lines.iter().zip(amounts).enumerate() {
        if line.is_tax_line {
            continue;
        }
        let share = amount
            .to_minor()
            .and_then(|a| a.checked_mul(ht))
            .ok_or_else(out_of_range)?;
        cents[i] = share / net;
        spread += cents[i];
        leftovers.push((share % net, *amount, i));
    }

    // Largest leftover first; ties go to the larger line, then the earlier one
    leftovers.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
    let missing = usize::try_from(ht - spread).map_err(|_| out_of_range())?;
    for &(_, _, i) in leftovers.iter().take(missing) {
        cents[i] += 1;
    }

    for (base, c) in bases.iter_mut().zip(cents) {
        *base = Money::checked_from_minor(c).ok_or_else(out_of_range)?;
    }
    Ok(bases)
}
