use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

/// One exclusive lock per invoice.
///
/// Every read-modify-write on an invoice runs while holding its lock, so two
/// payments on the same invoice never interleave. Different invoices proceed
/// in parallel.
#[derive(Debug, Default)]
pub struct InvoiceLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl InvoiceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, invoice_id: Uuid) -> Arc<Mutex<()>> {
        // Clone out so the map shard is not held while waiting on the mutex.
        self.locks
            .entry(invoice_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `invoice_id`.
    ///
    /// The entry is dropped again once nobody else holds or waits on it, so
    /// the table only ever contains invoices that are being worked on.
    pub fn with<T>(&self, invoice_id: Uuid, f: impl FnOnce() -> T) -> T {
        let mutex = self.mutex(invoice_id);
        let out = {
            let _guard = mutex.lock();
            f()
        };
        // the map's reference plus ours
        self.locks
            .remove_if(&invoice_id, |_, m| Arc::strong_count(m) == 2);
        out
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn same_invoice_is_serialized() {
        let locks = Arc::new(InvoiceLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..100 {
                        locks.with(id, || {
                            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(locks.is_empty());
    }

    #[test]
    fn entry_lives_only_while_in_use() {
        let locks = InvoiceLocks::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        locks.with(a, || {
            assert_eq!(locks.len(), 1);
            locks.with(b, || assert_eq!(locks.len(), 2));
            assert_eq!(locks.len(), 1);
        });
        assert!(locks.is_empty());
    }

    #[test]
    fn waiting_thread_keeps_the_entry() {
        let locks = Arc::new(InvoiceLocks::new());
        let id = Uuid::new_v4();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks.with(id, || {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };
        entered_rx.recv().unwrap();
        let waiter = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.with(id, || 7))
        };
        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(waiter.join().unwrap(), 7);
        assert!(locks.is_empty());
    }
}
