use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use facturation::core::*;

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn lines(count: u32) -> Vec<LineItem> {
    (1..=count)
        .map(|i| {
            let mut builder =
                LineItemBuilder::new(i.to_string(), format!("Prestation {i}"), 5, Money::new(dec!(120.37)));
            if i % 3 == 0 {
                builder = builder.discount_percent(dec!(7.5));
            }
            if i % 4 == 0 {
                builder = builder.tax(Tax::vat(dec!(5.5)).unwrap());
            }
            builder.build()
        })
        .collect()
}

fn build_invoice(count: u32) -> Invoice {
    InvoiceBuilder::new("FAC-BENCH", test_date())
        .due_date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
        .default_tax(Tax::vat(dec!(20)).unwrap())
        .discount(Discount::percent(dec!(3)))
        .lines(lines(count))
        .build()
        .unwrap()
}

fn bench_build_invoice(c: &mut Criterion) {
    c.bench_function("build_invoice_10_lines", |b| {
        b.iter(|| black_box(build_invoice(10)));
    });
}

fn bench_totals_1000_lines(c: &mut Criterion) {
    let mut items = lines(1000);
    let taxes = vec![Tax::vat(dec!(20)).unwrap()];
    let discount = Discount::percent(dec!(3));
    c.bench_function("calculate_totals_1000_lines", |b| {
        b.iter(|| black_box(calculate_totals(black_box(&mut items), &taxes, Some(&discount))));
    });
}

fn bench_validate(c: &mut Criterion) {
    let invoice = build_invoice(1000);
    c.bench_function("validate_invoice_1000_lines", |b| {
        b.iter(|| black_box(validate_invoice(black_box(&invoice))));
    });
}

fn bench_payment_sequence(c: &mut Criterion) {
    let mut invoice = build_invoice(10);
    invoice
        .send(Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap())
        .unwrap();
    c.bench_function("twelve_payments", |b| {
        b.iter(|| {
            let mut inv = invoice.clone();
            let step = Money::new(inv.montant_total().amount() / dec!(12));
            for _ in 0..11 {
                apply_payment(&mut inv, step).unwrap();
            }
            let rest = inv.amount_remaining;
            black_box(apply_payment(&mut inv, rest).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_build_invoice,
    bench_totals_1000_lines,
    bench_validate,
    bench_payment_sequence,
);
criterion_main!(benches);
