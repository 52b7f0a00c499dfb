use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use depotscore_core::{DepotId, Entity};
use depotscore_scoring::Depot;

use super::StoreError;

/// Depot collection.
pub trait DepotStore: Send + Sync {
    /// Insert or replace by id.
    fn save(&self, depot: Depot) -> Result<(), StoreError>;
    fn find_by_id(&self, id: DepotId) -> Result<Option<Depot>, StoreError>;
    /// All depots, newest first.
    fn list(&self) -> Result<Vec<Depot>, StoreError>;
    fn delete(&self, id: DepotId) -> Result<bool, StoreError>;
    fn count(&self) -> Result<u64, StoreError>;
}

impl<S> DepotStore for Arc<S>
where
    S: DepotStore + ?Sized,
{
    fn save(&self, depot: Depot) -> Result<(), StoreError> {
        (**self).save(depot)
    }

    fn find_by_id(&self, id: DepotId) -> Result<Option<Depot>, StoreError> {
        (**self).find_by_id(id)
    }

    fn list(&self) -> Result<Vec<Depot>, StoreError> {
        (**self).list()
    }

    fn delete(&self, id: DepotId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn count(&self) -> Result<u64, StoreError> {
        (**self).count()
    }
}

/// In-memory depot collection for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDepotStore {
    inner: RwLock<HashMap<DepotId, Depot>>,
}

impl InMemoryDepotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl DepotStore for InMemoryDepotStore {
    fn save(&self, depot: Depot) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned("depots"))?;
        map.insert(depot.id(), depot);
        Ok(())
    }

    fn find_by_id(&self, id: DepotId) -> Result<Option<Depot>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("depots"))?;
        Ok(map.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Depot>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("depots"))?;
        let mut result: Vec<Depot> = map.values().cloned().collect();
        result.sort_by_key(|d| std::cmp::Reverse((d.created_at(), d.id())));
        Ok(result)
    }

    fn delete(&self, id: DepotId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned("depots"))?;
        Ok(map.remove(&id).is_some())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned("depots"))?;
        Ok(map.len() as u64)
    }
}
