//! Property-based tests for the invoice arithmetic and lifecycle.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::{NaiveDate, TimeZone, Utc};
use facturation::core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build(lines: Vec<LineItem>, discount: Option<Discount>) -> Invoice {
    let mut builder = InvoiceBuilder::new("FAC-2024-PROP", date(2024, 6, 15))
        .due_date(date(2024, 7, 15))
        .default_tax(Tax::vat(dec!(20)).unwrap())
        .lines(lines);
    if let Some(d) = discount {
        builder = builder.discount(d);
    }
    builder.build().unwrap()
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Amount in cents, 0.00 to 99999.99.
fn arb_money() -> impl Strategy<Value = Money> {
    (0i64..10_000_000i64).prop_map(Money::from_minor)
}

fn arb_rate() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(dec!(0)),
        Just(dec!(2.1)),
        Just(dec!(5.5)),
        Just(dec!(10)),
        Just(dec!(20)),
        (0u32..=10_000u32).prop_map(|bp| Decimal::new(i64::from(bp), 2)),
    ]
}

fn arb_line_discount() -> impl Strategy<Value = Option<Discount>> {
    prop_oneof![
        Just(None),
        (0u32..=100u32).prop_map(|p| Some(Discount::percent(Decimal::from(p)))),
        arb_money().prop_map(|a| Some(Discount::amount(a))),
    ]
}

fn arb_line() -> impl Strategy<Value = LineItem> {
    (1u32..=50u32, arb_money(), arb_line_discount(), prop::option::of(arb_rate())).prop_map(
        |(qty, price, discount, own_rate)| {
            let mut line = LineItemBuilder::new("1", "Article", qty, price).build();
            line.discount = discount;
            if let Some(rate) = own_rate {
                line.taxes.push(Tax::vat(rate).unwrap());
            }
            line
        },
    )
}

fn arb_lines() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec(arb_line(), 1..=6).prop_map(|mut lines| {
        for (i, line) in lines.iter_mut().enumerate() {
            line.id = format!("{}", i + 1);
        }
        lines
    })
}

/// A settlement step: payment (true) or credit note (false) of some cents.
fn arb_steps() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 1i64..5_000_000i64), 0..8)
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// Recomputing from the same lines never drifts.
    #[test]
    fn recomputation_is_idempotent(lines in arb_lines(), discount in arb_line_discount()) {
        let inv = build(lines, discount);
        let mut again = inv.clone();
        recalculate(&mut again).unwrap();
        prop_assert_eq!(&again.totals, &inv.totals);
        recalculate(&mut again).unwrap();
        prop_assert_eq!(&again.totals, &inv.totals);
        prop_assert_eq!(again.amount_remaining, inv.amount_remaining);
    }

    /// Built invoices always satisfy the arithmetic checks.
    #[test]
    fn totals_satisfy_arithmetic(lines in arb_lines(), discount in arb_line_discount()) {
        let inv = build(lines, discount);
        let errors = validate_arithmetic(&inv);
        prop_assert!(errors.is_empty(), "arithmetic errors: {:?}", errors);
        prop_assert_eq!(inv.montant_total(), inv.totals.amount_ttc);
    }

    /// Discounts never push a line or the invoice below zero.
    #[test]
    fn discounts_floor_at_zero(lines in arb_lines(), discount in arb_line_discount()) {
        let inv = build(lines, discount);
        for line in &inv.lines {
            prop_assert!(!line.line_amount.unwrap().is_negative());
        }
        prop_assert!(!inv.totals.amount_ht.is_negative());
        prop_assert!(!inv.montant_total().is_negative());
    }

    /// HT → TTC → HT lands within one cent of the start.
    #[test]
    fn tax_round_trip_within_a_cent(x in arb_money(), r in arb_rate()) {
        let rate = TaxRate::new(r).unwrap();
        let back = amount_excluding_tax(amount_including_tax(x, rate), rate);
        let diff = (back.amount() - x.amount()).abs();
        prop_assert!(diff <= dec!(0.01), "{} → {}", x, back);
    }

    /// Accepted settlements keep 0 ≤ remaining ≤ total; rejected ones change nothing.
    #[test]
    fn remaining_stays_in_range(lines in arb_lines(), steps in arb_steps()) {
        let mut inv = build(lines, None);
        inv.send(Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap()).unwrap();

        for (n, (is_payment, cents)) in steps.into_iter().enumerate() {
            let amount = Money::from_minor(cents);
            let before = inv.clone();
            let result = if is_payment {
                apply_payment(&mut inv, amount).map(|_| ())
            } else {
                CreditNoteBuilder::new(format!("AV-{n}"), date(2024, 6, 20), &inv, CreditNoteKind::CommercialDiscount)
                    .add_line(LineItemBuilder::new("1", "Geste", 1, amount).tax(Tax::vat(dec!(0)).unwrap()).build())
                    .build()
                    .and_then(|mut note| {
                        note.validate(Utc.with_ymd_and_hms(2024, 6, 20, 8, 0, 0).unwrap())?;
                        let total = note.total();
                        apply_credit_note(&mut inv, &mut note, total).map(|_| ())
                    })
            };
            if result.is_err() {
                prop_assert_eq!(&inv, &before);
            }
            prop_assert!(!inv.amount_remaining.is_negative());
            prop_assert!(inv.amount_remaining <= inv.montant_total());
            prop_assert_eq!(inv.amount_remaining, inv.montant_total() - inv.settled_amount());
        }
    }

    /// Once Paid or Cancelled, no operation moves the invoice anywhere else.
    #[test]
    fn terminal_states_are_final(lines in arb_lines(), cancel in any::<bool>(), cents in 1i64..1_000_000i64) {
        let mut inv = build(lines, None);
        let at = Utc.with_ymd_and_hms(2024, 6, 16, 8, 0, 0).unwrap();
        inv.send(at).unwrap();
        if cancel || !inv.amount_remaining.is_positive() {
            inv.cancel(at).unwrap();
        } else {
            let total = inv.amount_remaining;
            apply_payment(&mut inv, total).unwrap();
        }
        let terminal = inv.status;
        prop_assert!(terminal.is_terminal());

        let _ = apply_payment(&mut inv, Money::from_minor(cents));
        let _ = inv.cancel(at);
        let _ = inv.send(at);
        let _ = inv.mark_overdue(date(2030, 1, 1));
        let _ = inv.update_lines(inv.lines.clone(), None);
        prop_assert_eq!(inv.status, terminal);
    }
}

// ── Deterministic checks ────────────────────────────────────────────────────

#[test]
fn tax_round_trip_known_values() {
    let rate = TaxRate::new(dec!(20)).unwrap();
    let ttc = amount_including_tax(Money::new(dec!(99.99)), rate);
    assert_eq!(ttc, Money::new(dec!(119.99)));
    assert_eq!(amount_excluding_tax(ttc, rate), Money::new(dec!(99.99)));
}
