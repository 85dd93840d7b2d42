use rust_decimal::Decimal;

use super::error::ValidationError;
use super::money::Money;
use super::types::*;

/// Validate an invoice's fields and arithmetic.
/// Returns all validation errors found (not just the first).
pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if invoice.number.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "number",
            "invoice number must not be empty",
            "INV-NUM",
        ));
    }

    if invoice.currency_code.len() != 3 {
        errors.push(ValidationError::with_rule(
            "currency_code",
            "currency code must be 3 characters (ISO 4217)",
            "INV-CUR",
        ));
    } else if !super::currencies::is_known_currency_code(&invoice.currency_code) {
        errors.push(ValidationError::with_rule(
            "currency_code",
            format!(
                "currency code '{}' is not a known ISO 4217 code",
                invoice.currency_code
            ),
            "INV-CUR",
        ));
    } else if super::currencies::minor_units(&invoice.currency_code) == 0 {
        for (i, line) in invoice.lines.iter().enumerate() {
            if !line.unit_price.amount().fract().is_zero() {
                errors.push(ValidationError::with_rule(
                    format!("lines[{i}].unit_price"),
                    format!(
                        "{} has no minor units; unit price {} must be whole",
                        invoice.currency_code, line.unit_price
                    ),
                    "INV-CUR",
                ));
            }
        }
    }

    if invoice.exchange_rate <= Decimal::ZERO {
        errors.push(ValidationError::with_rule(
            "exchange_rate",
            format!("exchange rate {} must be positive", invoice.exchange_rate),
            "INV-FX",
        ));
    }

    if let Some(due) = invoice.due_date
        && due < invoice.issue_date
    {
        errors.push(ValidationError::with_rule(
            "due_date",
            format!("due date {due} precedes issue date {}", invoice.issue_date),
            "INV-DUE",
        ));
    }

    if invoice.lines.is_empty() {
        errors.push(ValidationError::with_rule(
            "lines",
            "invoice must have at least one line item",
            "INV-LINES",
        ));
    }

    for (i, line) in invoice.lines.iter().enumerate() {
        validate_line(line, i, &mut errors);
    }

    for (i, tax) in invoice.taxes.iter().enumerate() {
        if tax.name.trim().is_empty() {
            errors.push(ValidationError::with_rule(
                format!("taxes[{i}].name"),
                "tax name must not be empty",
                "TAX-NAME",
            ));
        }
    }

    errors.extend(validate_arithmetic(invoice));

    errors
}

/// Validate invoice arithmetic: totals and balance invariants.
pub fn validate_arithmetic(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let totals = &invoice.totals;

    let expected_net: Money = invoice
        .lines
        .iter()
        .filter(|l| !l.is_tax_line)
        .filter_map(|l| l.line_amount)
        .sum();
    if totals.line_net_total != expected_net {
        errors.push(ValidationError::with_rule(
            "totals.line_net_total",
            format!(
                "line net total {} does not match sum of line amounts {}",
                totals.line_net_total, expected_net
            ),
            "CALC-NET",
        ));
    }

    let expected_ht = totals.line_net_total - totals.discount_total;
    if totals.amount_ht != expected_ht {
        errors.push(ValidationError::with_rule(
            "totals.amount_ht",
            format!(
                "HT {} does not match net {} - discount {}",
                totals.amount_ht, totals.line_net_total, totals.discount_total
            ),
            "CALC-HT",
        ));
    }

    let breakdown_tva: Money = totals.tax_breakdown.iter().map(|b| b.tax_amount).sum();
    if totals.amount_tva != breakdown_tva {
        errors.push(ValidationError::with_rule(
            "totals.amount_tva",
            format!(
                "TVA {} does not match sum of breakdown amounts {}",
                totals.amount_tva, breakdown_tva
            ),
            "CALC-TVA",
        ));
    }
    if totals.amount_tva.is_negative() {
        errors.push(ValidationError::with_rule(
            "totals.amount_tva",
            format!("TVA {} must not be negative", totals.amount_tva),
            "CALC-TVA-NEG",
        ));
    }

    let expected_ttc = totals.amount_ht + totals.amount_tva;
    if totals.amount_ttc != expected_ttc {
        errors.push(ValidationError::with_rule(
            "totals.amount_ttc",
            format!(
                "TTC {} does not match HT {} + TVA {}",
                totals.amount_ttc, totals.amount_ht, totals.amount_tva
            ),
            "CALC-TTC",
        ));
    }

    let expected_remaining = invoice.montant_total() - invoice.settled_amount();
    if invoice.amount_remaining != expected_remaining {
        errors.push(ValidationError::with_rule(
            "amount_remaining",
            format!(
                "remaining {} does not match total {} - paid {} - credited {}",
                invoice.amount_remaining,
                invoice.montant_total(),
                invoice.paid_amount,
                invoice.credited_amount
            ),
            "BAL-REM",
        ));
    }
    if invoice.amount_remaining.is_negative() || invoice.amount_remaining > invoice.montant_total()
    {
        errors.push(ValidationError::with_rule(
            "amount_remaining",
            format!(
                "remaining {} must lie within [0, {}]",
                invoice.amount_remaining,
                invoice.montant_total()
            ),
            "BAL-RANGE",
        ));
    }

    errors
}

fn validate_line(line: &LineItem, index: usize, errors: &mut Vec<ValidationError>) {
    let prefix = format!("lines[{index}]");

    if line.designation.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.designation"),
            "line designation must not be empty",
            "LINE-NAME",
        ));
    }
    if line.quantity == 0 {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.quantity"),
            "quantity must be a positive integer",
            "LINE-QTY",
        ));
    }
    if line.unit_price.is_negative() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.unit_price"),
            "unit price must not be negative",
            "LINE-PRICE",
        ));
    }
    if let Some(d) = &line.discount
        && d.percent.is_some()
        && d.amount.is_some()
    {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.discount"),
            "percentage and amount discount are mutually exclusive",
            "LINE-DISC",
        ));
    }
    if line.is_tax_line && !line.taxes.is_empty() {
        errors.push(ValidationError::with_rule(
            format!("{prefix}.taxes"),
            "a tax line cannot carry taxes of its own",
            "LINE-TAX",
        ));
    }
}
