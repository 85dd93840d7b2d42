use chrono::{NaiveDate, Utc};
use facturation::core::*;
use rust_decimal_macros::dec;

fn main() -> Result<(), FacturationError> {
    let mut invoice = InvoiceBuilder::new("FAC-2024-0001", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .due_date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
        .default_tax(Tax::vat(dec!(20))?)
        .add_line(LineItemBuilder::new("1", "Développement", 12, Money::new(dec!(450))).build())
        .add_line(
            LineItemBuilder::new("2", "Hébergement (mensuel)", 1, Money::new(dec!(49.90)))
                .discount_percent(dec!(10))
                .build(),
        )
        .add_line(
            LineItemBuilder::new("3", "Livre technique", 2, Money::new(dec!(39)))
                .tax(Tax::vat(dec!(5.5))?)
                .build(),
        )
        .payment_terms("30 jours fin de mois")
        .build()?;

    println!("Facture: {}", invoice.number);
    println!("Date:    {}", invoice.issue_date);
    println!("---");
    for line in &invoice.lines {
        println!(
            "  {} x {} @ {} = {}",
            line.quantity,
            line.designation,
            line.unit_price,
            line.line_amount.unwrap_or(Money::ZERO)
        );
    }
    println!("---");
    for b in &invoice.totals.tax_breakdown {
        println!("  {:<12} base {} → {}", b.name, b.taxable_amount, b.tax_amount);
    }
    println!("HT:      {} {}", invoice.totals.amount_ht, invoice.currency_code);
    println!("TVA:     {} {}", invoice.totals.amount_tva, invoice.currency_code);
    println!("TTC:     {} {}", invoice.totals.amount_ttc, invoice.currency_code);

    invoice.send(Utc::now())?;
    let settlement = apply_payment(&mut invoice, Money::new(dec!(2000)))?;
    println!(
        "Paiement {}: {} → {}, reste {}",
        settlement.applied, settlement.previous_status, settlement.status, settlement.remaining
    );

    match apply_payment(&mut invoice, Money::new(dec!(100000))) {
        Err(e) => println!("Refusé: {e}"),
        Ok(_) => unreachable!("overpayment must be rejected"),
    }
    Ok(())
}
