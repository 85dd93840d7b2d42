use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::core::{CreditNote, FacturationError, Invoice, Payment};

use super::recurring::RecurringTemplate;
use super::relance::Relance;

/// A persisted document with an identity and an optimistic-lock version.
pub trait Record: Clone {
    const ENTITY: &'static str;
    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
}

impl Record for Invoice {
    const ENTITY: &'static str = "invoice";
    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for Payment {
    const ENTITY: &'static str = "payment";
    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for CreditNote {
    const ENTITY: &'static str = "credit note";
    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
}

impl Record for RecurringTemplate {
    const ENTITY: &'static str = "recurring template";
    fn id(&self) -> Uuid {
        self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
}

/// A record to write, with the version it was read at.
///
/// `expected: None` is an insert: the id must be new and the record must
/// carry version 0. Otherwise the stored version must equal `expected` and
/// the record must carry `expected + 1`.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub record: T,
    pub expected: Option<u64>,
}

/// Everything one operation writes. Committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub invoices: Vec<Versioned<Invoice>>,
    pub payments: Vec<Versioned<Payment>>,
    pub credit_notes: Vec<Versioned<CreditNote>>,
    pub templates: Vec<Versioned<RecurringTemplate>>,
    pub relances: Vec<Relance>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_invoice(mut self, invoice: Invoice) -> Self {
        self.invoices.push(Versioned {
            record: invoice,
            expected: None,
        });
        self
    }

    pub fn update_invoice(mut self, invoice: Invoice, expected: u64) -> Self {
        self.invoices.push(Versioned {
            record: invoice,
            expected: Some(expected),
        });
        self
    }

    pub fn insert_payment(mut self, payment: Payment) -> Self {
        self.payments.push(Versioned {
            record: payment,
            expected: None,
        });
        self
    }

    pub fn update_payment(mut self, payment: Payment, expected: u64) -> Self {
        self.payments.push(Versioned {
            record: payment,
            expected: Some(expected),
        });
        self
    }

    pub fn insert_credit_note(mut self, note: CreditNote) -> Self {
        self.credit_notes.push(Versioned {
            record: note,
            expected: None,
        });
        self
    }

    pub fn update_credit_note(mut self, note: CreditNote, expected: u64) -> Self {
        self.credit_notes.push(Versioned {
            record: note,
            expected: Some(expected),
        });
        self
    }

    pub fn insert_template(mut self, template: RecurringTemplate) -> Self {
        self.templates.push(Versioned {
            record: template,
            expected: None,
        });
        self
    }

    pub fn update_template(mut self, template: RecurringTemplate, expected: u64) -> Self {
        self.templates.push(Versioned {
            record: template,
            expected: Some(expected),
        });
        self
    }

    pub fn insert_relance(mut self, relance: Relance) -> Self {
        self.relances.push(relance);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
            && self.payments.is_empty()
            && self.credit_notes.is_empty()
            && self.templates.is_empty()
            && self.relances.is_empty()
    }
}

/// Persistence boundary of the ledger.
///
/// `commit` must be atomic: either every record of the change set is written
/// or none is, and a version mismatch on any record fails the whole set with
/// [`FacturationError::StaleInvoiceVersion`].
pub trait Store: Send + Sync {
    fn invoice(&self, id: Uuid) -> Result<Option<Invoice>, FacturationError>;
    fn invoices(&self) -> Result<Vec<Invoice>, FacturationError>;
    fn payment(&self, id: Uuid) -> Result<Option<Payment>, FacturationError>;
    fn payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>, FacturationError>;
    fn credit_note(&self, id: Uuid) -> Result<Option<CreditNote>, FacturationError>;
    fn credit_notes_for_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<CreditNote>, FacturationError>;
    fn recurring_templates(&self) -> Result<Vec<RecurringTemplate>, FacturationError>;
    fn relances_for(&self, invoice_id: Uuid) -> Result<Vec<Relance>, FacturationError>;
    fn commit(&self, changes: ChangeSet) -> Result<(), FacturationError>;
}

#[derive(Debug, Default)]
struct Tables {
    invoices: HashMap<Uuid, Invoice>,
    payments: HashMap<Uuid, Payment>,
    credit_notes: HashMap<Uuid, CreditNote>,
    templates: HashMap<Uuid, RecurringTemplate>,
    relances: HashMap<Uuid, Vec<Relance>>,
}

/// In-process [`Store`] backed by hash maps under one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check<T: Record>(
    table: &HashMap<Uuid, T>,
    change: &Versioned<T>,
) -> Result<(), FacturationError> {
    let id = change.record.id();
    let current = table.get(&id).map(T::version);
    match (current, change.expected) {
        (Some(_), None) => {
            return Err(FacturationError::Validation(format!(
                "{} {id} already exists",
                T::ENTITY
            )));
        }
        (None, Some(_)) => return Err(FacturationError::not_found(T::ENTITY, id)),
        (Some(found), Some(expected)) if found != expected => {
            return Err(FacturationError::StaleInvoiceVersion {
                entity: T::ENTITY,
                id: id.to_string(),
                expected,
                found,
            });
        }
        _ => {}
    }
    let next = change.expected.map_or(0, |v| v + 1);
    if change.record.version() != next {
        return Err(FacturationError::Validation(format!(
            "{} {id} must be written with version {next}, got {}",
            T::ENTITY,
            change.record.version()
        )));
    }
    Ok(())
}

fn apply<T: Record>(table: &mut HashMap<Uuid, T>, changes: Vec<Versioned<T>>) {
    for change in changes {
        table.insert(change.record.id(), change.record);
    }
}

impl Store for MemoryStore {
    fn invoice(&self, id: Uuid) -> Result<Option<Invoice>, FacturationError> {
        Ok(self.tables.read().invoices.get(&id).cloned())
    }

    fn invoices(&self) -> Result<Vec<Invoice>, FacturationError> {
        let mut all: Vec<Invoice> = self.tables.read().invoices.values().cloned().collect();
        all.sort_by(|a, b| (a.issue_date, &a.number).cmp(&(b.issue_date, &b.number)));
        Ok(all)
    }

    fn payment(&self, id: Uuid) -> Result<Option<Payment>, FacturationError> {
        Ok(self.tables.read().payments.get(&id).cloned())
    }

    fn payments_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>, FacturationError> {
        let tables = self.tables.read();
        let mut out: Vec<Payment> = tables
            .payments
            .values()
            .filter(|p| p.allocations.iter().any(|a| a.invoice_id == invoice_id))
            .cloned()
            .collect();
        out.sort_by_key(|p| (p.date, p.id));
        Ok(out)
    }

    fn credit_note(&self, id: Uuid) -> Result<Option<CreditNote>, FacturationError> {
        Ok(self.tables.read().credit_notes.get(&id).cloned())
    }

    fn credit_notes_for_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<CreditNote>, FacturationError> {
        let tables = self.tables.read();
        let mut out: Vec<CreditNote> = tables
            .credit_notes
            .values()
            .filter(|c| c.origin_invoice_id == invoice_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(out)
    }

    fn recurring_templates(&self) -> Result<Vec<RecurringTemplate>, FacturationError> {
        let mut out: Vec<RecurringTemplate> =
            self.tables.read().templates.values().cloned().collect();
        out.sort_by_key(|t| (t.start_date, t.id));
        Ok(out)
    }

    fn relances_for(&self, invoice_id: Uuid) -> Result<Vec<Relance>, FacturationError> {
        Ok(self
            .tables
            .read()
            .relances
            .get(&invoice_id)
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), FacturationError> {
        let mut tables = self.tables.write();

        for change in &changes.invoices {
            check(&tables.invoices, change)?;
        }
        for change in &changes.payments {
            check(&tables.payments, change)?;
        }
        for change in &changes.credit_notes {
            check(&tables.credit_notes, change)?;
        }
        for change in &changes.templates {
            check(&tables.templates, change)?;
        }
        for (i, relance) in changes.relances.iter().enumerate() {
            let existing = tables
                .relances
                .get(&relance.invoice_id)
                .is_some_and(|list| list.iter().any(|r| r.level == relance.level));
            let repeated = changes.relances[..i]
                .iter()
                .any(|r| r.invoice_id == relance.invoice_id && r.level == relance.level);
            if existing || repeated {
                return Err(FacturationError::Validation(format!(
                    "relance level {} already scheduled for invoice {}",
                    relance.level, relance.invoice_id
                )));
            }
        }

        apply(&mut tables.invoices, changes.invoices);
        apply(&mut tables.payments, changes.payments);
        apply(&mut tables.credit_notes, changes.credit_notes);
        apply(&mut tables.templates, changes.templates);
        for relance in changes.relances {
            tables
                .relances
                .entry(relance.invoice_id)
                .or_default()
                .push(relance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InvoiceBuilder, LineItemBuilder, Money};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice() -> Invoice {
        InvoiceBuilder::new("FAC-2024-0001", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
            .add_line(LineItemBuilder::new("1", "Licence", 1, Money::new(dec!(50))).build())
            .build()
            .unwrap()
    }

    #[test]
    fn insert_then_update_bumps_version() {
        let store = MemoryStore::new();
        let inv = invoice();
        store.commit(ChangeSet::new().insert_invoice(inv.clone())).unwrap();

        let mut next = inv.clone();
        next.version = 1;
        store.commit(ChangeSet::new().update_invoice(next, 0)).unwrap();
        assert_eq!(store.invoice(inv.id).unwrap().unwrap().version, 1);
    }

    #[test]
    fn stale_update_writes_nothing() {
        let store = MemoryStore::new();
        let inv = invoice();
        store.commit(ChangeSet::new().insert_invoice(inv.clone())).unwrap();
        let mut first = inv.clone();
        first.version = 1;
        store.commit(ChangeSet::new().update_invoice(first, 0)).unwrap();

        let mut late = inv.clone();
        late.version = 1;
        late.notes.push("late".into());
        let other = invoice();
        let err = store
            .commit(
                ChangeSet::new()
                    .insert_invoice(other.clone())
                    .update_invoice(late, 0),
            )
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(store.invoice(other.id).unwrap().is_none());
        assert!(store.invoice(inv.id).unwrap().unwrap().notes.is_empty());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let inv = invoice();
        store.commit(ChangeSet::new().insert_invoice(inv.clone())).unwrap();
        assert!(matches!(
            store.commit(ChangeSet::new().insert_invoice(inv)),
            Err(FacturationError::Validation(_))
        ));
    }
}
