use chrono::{NaiveDate, Utc};
use facturation::core::*;
use facturation::ledger::telemetry::init_tracing;
use facturation::ledger::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn main() -> Result<(), FacturationError> {
    init_tracing("info", false);

    let config = LedgerConfig::load(None)?;
    let svc = BillingService::new(MemoryStore::new(), MemoryCache::new(), config);
    let client = Uuid::new_v4();
    let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap_or_default();

    let mut request = NewInvoice::new("FAC-2024-0001", d(5, 2));
    request.client_id = Some(client);
    request.due_date = Some(d(6, 1));
    request.taxes.push(Tax::vat(dec!(20))?);
    request.lines.push(NewLine::new("Audit sécurité", 4, Money::new(dec!(650))));
    let invoice = svc.create_invoice(&request)?;
    svc.send_invoice(invoice.id, Utc::now())?;

    svc.record_payment(&NewPayment {
        invoice_id: Some(invoice.id),
        client_id: Some(client),
        amount: Money::new(dec!(1000)),
        date: d(5, 20),
        method: PaymentMethod::Transfer,
        reference: Some("VIR-8841".into()),
    })?;

    svc.sweep_overdue(d(6, 10))?;
    svc.schedule_relances(d(6, 10))?;

    let invoice = svc.invoice(invoice.id)?;
    println!(
        "{} {} reste {} ({} relance(s))",
        invoice.number,
        invoice.status.label(),
        invoice.amount_remaining,
        svc.relances_for(invoice.id)?.len()
    );
    println!("{:?}", svc.aging(d(6, 10))?);
    Ok(())
}
