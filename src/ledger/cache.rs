use dashmap::DashMap;
use uuid::Uuid;

use crate::core::Invoice;

/// Read cache for invoices, injected into the service.
///
/// The service evicts an entry synchronously after every committed mutation
/// of that invoice, so a hit is never older than the last commit.
pub trait Cache: Send + Sync {
    fn get(&self, id: Uuid) -> Option<Invoice>;
    fn put(&self, invoice: Invoice);
    fn evict(&self, id: Uuid);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<Uuid, Invoice>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, id: Uuid) -> Option<Invoice> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    fn put(&self, invoice: Invoice) {
        self.entries.insert(invoice.id, invoice);
    }

    fn evict(&self, id: Uuid) {
        self.entries.remove(&id);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _id: Uuid) -> Option<Invoice> {
        None
    }
    fn put(&self, _invoice: Invoice) {}
    fn evict(&self, _id: Uuid) {}
    fn clear(&self) {}
}
