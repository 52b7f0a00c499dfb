use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use depotscore_core::{DepotId, Entity, SettlementId};
use depotscore_scoring::{Quarter, SettlementRecord};

use super::StoreError;

/// Settlement record collection, uniquely indexed by (depot, quarter).
pub trait SettlementStore: Send + Sync {
    /// Insert a new record; fails if the depot's quarter is already recorded.
    fn save(&self, record: SettlementRecord) -> Result<(), StoreError>;

    fn find_by_depot_and_quarter(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> Result<Option<SettlementRecord>, StoreError>;

    /// All records of a depot, oldest quarter first.
    fn list_by_depot(&self, depot_id: DepotId) -> Result<Vec<SettlementRecord>, StoreError>;

    /// Remove a record. Only used to roll back a settlement that failed halfway.
    fn delete(&self, id: SettlementId) -> Result<bool, StoreError>;
}

impl<S> SettlementStore for Arc<S>
where
    S: SettlementStore + ?Sized,
{
    fn save(&self, record: SettlementRecord) -> Result<(), StoreError> {
        (**self).save(record)
    }

    fn find_by_depot_and_quarter(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> Result<Option<SettlementRecord>, StoreError> {
        (**self).find_by_depot_and_quarter(depot_id, quarter)
    }

    fn list_by_depot(&self, depot_id: DepotId) -> Result<Vec<SettlementRecord>, StoreError> {
        (**self).list_by_depot(depot_id)
    }

    fn delete(&self, id: SettlementId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}

/// In-memory settlement records for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySettlementStore {
    inner: RwLock<HashMap<(DepotId, Quarter), SettlementRecord>>,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl SettlementStore for InMemorySettlementStore {
    fn save(&self, record: SettlementRecord) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::poisoned("settlements"))?;
        let key = (record.depot_id(), record.quarter());
        if map.contains_key(&key) {
            return Err(StoreError::DuplicateSettlement(record.quarter().to_string()));
        }
        map.insert(key, record);
        Ok(())
    }

    fn find_by_depot_and_quarter(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> Result<Option<SettlementRecord>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("settlements"))?;
        Ok(map.get(&(depot_id, quarter)).cloned())
    }

    fn list_by_depot(&self, depot_id: DepotId) -> Result<Vec<SettlementRecord>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::poisoned("settlements"))?;
        let mut result: Vec<SettlementRecord> = map
            .iter()
            .filter_map(|((d, _q), r)| if *d == depot_id { Some(r.clone()) } else { None })
            .collect();
        result.sort_by_key(SettlementRecord::quarter);
        Ok(result)
    }

    fn delete(&self, id: SettlementId) -> Result<bool, StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::poisoned("settlements"))?;
        let before = map.len();
        map.retain(|_key, record| record.id() != id);
        Ok(map.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depotscore_scoring::SettlementFigures;

    fn record(depot_id: DepotId, quarter: Quarter, total: u64) -> SettlementRecord {
        SettlementRecord::new(
            SettlementId::new(),
            depot_id,
            quarter,
            &SettlementFigures::from_total(total),
            Utc::now(),
        )
    }

    #[test]
    fn one_record_per_depot_quarter() {
        let store = InMemorySettlementStore::new();
        let depot = DepotId::new();
        let q1 = Quarter::new(2024, 1).unwrap();
        store.save(record(depot, q1, 12_000_000)).unwrap();

        let err = store.save(record(depot, q1, 0)).unwrap_err();
        assert_eq!(err, StoreError::DuplicateSettlement("2024-01".to_string()));

        // Another depot may settle the same quarter.
        store.save(record(DepotId::new(), q1, 0)).unwrap();
        let found = store.find_by_depot_and_quarter(depot, q1).unwrap().unwrap();
        assert_eq!(found.carryover_score(), 13);
    }

    #[test]
    fn history_is_ordered_and_deletable() {
        let store = InMemorySettlementStore::new();
        let depot = DepotId::new();
        let later = record(depot, Quarter::new(2024, 4).unwrap(), 1);
        store.save(later.clone()).unwrap();
        store.save(record(depot, Quarter::new(2024, 1).unwrap(), 1)).unwrap();

        let quarters: Vec<_> = store
            .list_by_depot(depot)
            .unwrap()
            .iter()
            .map(|r| r.quarter().to_string())
            .collect();
        assert_eq!(quarters, vec!["2024-01", "2024-04"]);

        assert!(store.delete(later.id()).unwrap());
        assert!(!store.delete(later.id()).unwrap());
        assert_eq!(store.list_by_depot(depot).unwrap().len(), 1);
    }
}
