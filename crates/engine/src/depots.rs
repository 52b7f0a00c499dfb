//! Depot directory. Plain CRUD; nothing here reads or writes invoices or scores.

use std::sync::Arc;

use tracing::instrument;

use depotscore_core::{Clock, DepotId, DomainError, Entity};
use depotscore_infra::DepotStore;
use depotscore_scoring::{Depot, DepotDraft};

use crate::error::EngineResult;

#[derive(Clone)]
pub struct DepotDirectory<D> {
    depots: D,
    clock: Arc<dyn Clock>,
}

impl<D> core::fmt::Debug for DepotDirectory<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DepotDirectory").finish_non_exhaustive()
    }
}

impl<D> DepotDirectory<D>
where
    D: DepotStore,
{
    pub fn new(depots: D, clock: Arc<dyn Clock>) -> Self {
        Self { depots, clock }
    }

    #[instrument(skip(self, draft), fields(name = %draft.name), err)]
    pub fn create_depot(&self, draft: DepotDraft) -> EngineResult<Depot> {
        let depot = Depot::create(DepotId::new(), draft, self.clock.now())?;
        self.depots.save(depot.clone())?;
        tracing::info!(depot_id = %depot.id(), "depot created");
        Ok(depot)
    }

    pub fn get_depot(&self, id: DepotId) -> EngineResult<Depot> {
        self.depots
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("depot").into())
    }

    /// Newest first.
    pub fn list_depots(&self) -> EngineResult<Vec<Depot>> {
        Ok(self.depots.list()?)
    }

    /// Replace the depot's attributes. An absent remaining score resets it to 0.
    #[instrument(skip(self, draft), fields(depot_id = %id), err)]
    pub fn update_depot(&self, id: DepotId, draft: DepotDraft) -> EngineResult<Depot> {
        let mut depot = self.get_depot(id)?;
        depot.revise(draft, self.clock.now())?;
        self.depots.save(depot.clone())?;
        Ok(depot)
    }

    #[instrument(skip(self), fields(depot_id = %id), err)]
    pub fn update_remaining_score(&self, id: DepotId, remaining_score: u64) -> EngineResult<Depot> {
        let mut depot = self.get_depot(id)?;
        depot.set_remaining_score(remaining_score, self.clock.now());
        self.depots.save(depot.clone())?;
        Ok(depot)
    }

    #[instrument(skip(self), fields(depot_id = %id), err)]
    pub fn delete_depot(&self, id: DepotId) -> EngineResult<()> {
        if !self.depots.delete(id)? {
            return Err(DomainError::not_found("depot").into());
        }
        tracing::info!(depot_id = %id, "depot deleted");
        Ok(())
    }

    pub fn depot_count(&self) -> EngineResult<u64> {
        Ok(self.depots.count()?)
    }
}
