use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use depotscore_core::{DepotId, Entity, InvoiceId};
use depotscore_scoring::Invoice;

use super::StoreError;

/// Invoice collection.
pub trait InvoiceStore: Send + Sync {
    /// Insert or replace by id. The invoice number is a unique index across
    /// the whole collection.
    fn save(&self, invoice: Invoice) -> Result<(), StoreError>;

    fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    fn find_by_invoice_no(&self, invoice_no: &str) -> Result<Option<Invoice>, StoreError>;

    /// Invoices of a depot dated within `start..=end`, ordered by date ascending.
    fn find_by_depot_and_date_range(
        &self,
        depot_id: DepotId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// All invoices of a depot, ordered by date descending.
    fn find_by_depot(&self, depot_id: DepotId) -> Result<Vec<Invoice>, StoreError>;

    /// Returns whether a document was removed.
    fn delete_by_id(&self, id: InvoiceId) -> Result<bool, StoreError>;

    /// Remove every listed invoice in one step; returns how many existed.
    fn delete_many(&self, ids: &[InvoiceId]) -> Result<usize, StoreError>;

    fn count_by_depot(&self, depot_id: DepotId) -> Result<u64, StoreError>;

    fn count_all(&self) -> Result<u64, StoreError>;

    /// Sum of all invoice amounts in the collection.
    fn total_amount(&self) -> Result<u64, StoreError>;
}

impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    fn save(&self, invoice: Invoice) -> Result<(), StoreError> {
        (**self).save(invoice)
    }

    fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        (**self).find_by_id(id)
    }

    fn find_by_invoice_no(&self, invoice_no: &str) -> Result<Option<Invoice>, StoreError> {
        (**self).find_by_invoice_no(invoice_no)
    }

    fn find_by_depot_and_date_range(
        &self,
        depot_id: DepotId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_by_depot_and_date_range(depot_id, start, end)
    }

    fn find_by_depot(&self, depot_id: DepotId) -> Result<Vec<Invoice>, StoreError> {
        (**self).find_by_depot(depot_id)
    }

    fn delete_by_id(&self, id: InvoiceId) -> Result<bool, StoreError> {
        (**self).delete_by_id(id)
    }

    fn delete_many(&self, ids: &[InvoiceId]) -> Result<usize, StoreError> {
        (**self).delete_many(ids)
    }

    fn count_by_depot(&self, depot_id: DepotId) -> Result<u64, StoreError> {
        (**self).count_by_depot(depot_id)
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        (**self).count_all()
    }

    fn total_amount(&self) -> Result<u64, StoreError> {
        (**self).total_amount()
    }
}

#[derive(Debug, Default)]
struct Collection {
    docs: HashMap<InvoiceId, Invoice>,
    by_number: HashMap<String, InvoiceId>,
}

/// In-memory invoice collection for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    inner: RwLock<Collection>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Collection>, StoreError> {
        self.inner.read().map_err(|_| StoreError::poisoned("invoices"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Collection>, StoreError> {
        self.inner.write().map_err(|_| StoreError::poisoned("invoices"))
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn save(&self, invoice: Invoice) -> Result<(), StoreError> {
        let mut coll = self.write()?;
        let id = invoice.id();

        if let Some(owner) = coll.by_number.get(invoice.invoice_no()) {
            if *owner != id {
                return Err(StoreError::DuplicateInvoiceNo(invoice.invoice_no().to_string()));
            }
        }

        // Renumbering releases the old number.
        if let Some(previous) = coll.docs.get(&id) {
            if previous.invoice_no() != invoice.invoice_no() {
                let old = previous.invoice_no().to_string();
                coll.by_number.remove(&old);
            }
        }

        coll.by_number.insert(invoice.invoice_no().to_string(), id);
        coll.docs.insert(id, invoice);
        Ok(())
    }

    fn find_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.read()?.docs.get(&id).cloned())
    }

    fn find_by_invoice_no(&self, invoice_no: &str) -> Result<Option<Invoice>, StoreError> {
        let coll = self.read()?;
        Ok(coll
            .by_number
            .get(invoice_no)
            .and_then(|id| coll.docs.get(id))
            .cloned())
    }

    fn find_by_depot_and_date_range(
        &self,
        depot_id: DepotId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Invoice>, StoreError> {
        let coll = self.read()?;
        let mut result: Vec<Invoice> = coll
            .docs
            .values()
            .filter(|inv| inv.depot_id() == depot_id && inv.date() >= start && inv.date() <= end)
            .cloned()
            .collect();

        result.sort_by_key(|inv| (inv.date(), inv.created_at(), inv.id()));
        Ok(result)
    }

    fn find_by_depot(&self, depot_id: DepotId) -> Result<Vec<Invoice>, StoreError> {
        let coll = self.read()?;
        let mut result: Vec<Invoice> = coll
            .docs
            .values()
            .filter(|inv| inv.depot_id() == depot_id)
            .cloned()
            .collect();

        result.sort_by_key(|inv| std::cmp::Reverse((inv.date(), inv.created_at(), inv.id())));
        Ok(result)
    }

    fn delete_by_id(&self, id: InvoiceId) -> Result<bool, StoreError> {
        let mut coll = self.write()?;
        match coll.docs.remove(&id) {
            Some(removed) => {
                coll.by_number.remove(removed.invoice_no());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_many(&self, ids: &[InvoiceId]) -> Result<usize, StoreError> {
        let mut coll = self.write()?;
        let mut removed = 0;
        for id in ids {
            if let Some(doc) = coll.docs.remove(id) {
                coll.by_number.remove(doc.invoice_no());
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn count_by_depot(&self, depot_id: DepotId) -> Result<u64, StoreError> {
        let coll = self.read()?;
        Ok(coll.docs.values().filter(|inv| inv.depot_id() == depot_id).count() as u64)
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.docs.len() as u64)
    }

    fn total_amount(&self) -> Result<u64, StoreError> {
        let coll = self.read()?;
        Ok(coll.docs.values().map(Invoice::amount).fold(0u64, u64::saturating_add))
    }
}
