//! Quarterly settlement: the one-way transition that closes a depot's quarter.
//!
//! Settling sums the quarter's invoices, records a [`SettlementRecord`] with
//! the derived figures and carryover, and then permanently removes the
//! invoices. Only the record's aggregate fields survive.

use std::sync::Arc;

use tracing::instrument;

use depotscore_core::{Clock, DepotId, DomainError, Entity, InvoiceId, SettlementId};
use depotscore_infra::{InvoiceStore, SettlementStore};
use depotscore_scoring::{Invoice, Quarter, SettlementFigures, SettlementRecord, sum_amounts};

use crate::error::EngineResult;
use crate::locks::EngineLocks;

#[derive(Clone)]
pub struct QuarterSettlement<I, S> {
    invoices: I,
    settlements: S,
    locks: Arc<EngineLocks>,
    clock: Arc<dyn Clock>,
}

impl<I, S> core::fmt::Debug for QuarterSettlement<I, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuarterSettlement").finish_non_exhaustive()
    }
}

impl<I, S> QuarterSettlement<I, S>
where
    I: InvoiceStore,
    S: SettlementStore,
{
    pub fn new(
        invoices: I,
        settlements: S,
        locks: Arc<EngineLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            invoices,
            settlements,
            locks,
            clock,
        }
    }

    /// Close `quarter` for a depot.
    ///
    /// Fails with `AlreadySettled` when a record exists for the quarter. If the
    /// invoices cannot be removed after the record was written, the record is
    /// deleted again before the error is returned.
    #[instrument(skip(self), fields(depot_id = %depot_id, quarter = %quarter), err)]
    pub fn settle_quarter(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<SettlementRecord> {
        self.locks
            .settlement_scope(depot_id, quarter, || self.settle_locked(depot_id, quarter))
    }

    fn settle_locked(&self, depot_id: DepotId, quarter: Quarter) -> EngineResult<SettlementRecord> {
        if self
            .settlements
            .find_by_depot_and_quarter(depot_id, quarter)?
            .is_some()
        {
            return Err(DomainError::already_settled(quarter).into());
        }

        let invoices = self.invoices.find_by_depot_and_date_range(
            depot_id,
            quarter.first_day(),
            quarter.last_day(),
        )?;
        let total_amount = sum_amounts(invoices.iter().map(Invoice::amount))?;
        let figures = SettlementFigures::from_total(total_amount);

        let record = SettlementRecord::new(
            SettlementId::new(),
            depot_id,
            quarter,
            &figures,
            self.clock.now(),
        );
        self.settlements.save(record.clone())?;

        let ids: Vec<InvoiceId> = invoices.iter().map(|invoice| invoice.id()).collect();
        if let Err(err) = self.invoices.delete_many(&ids) {
            tracing::warn!(
                %depot_id,
                %quarter,
                error = %err,
                "invoice purge failed; rolling back settlement record"
            );
            if let Err(rollback) = self.settlements.delete(record.id()) {
                tracing::error!(
                    %depot_id,
                    %quarter,
                    error = %rollback,
                    "settlement rollback failed; record kept without purge"
                );
            }
            return Err(err.into());
        }

        tracing::info!(
            %depot_id,
            %quarter,
            invoices = ids.len(),
            total_amount = figures.total_amount,
            total_score = figures.total_score,
            discount = %figures.discount,
            remainder_score = figures.remainder_score,
            carryover_score = figures.carryover_score,
            "quarter settled"
        );

        Ok(record)
    }

    /// Carryover into `quarter`: the carryover of the immediately preceding
    /// quarter's record, or 0 if that quarter was never settled.
    pub fn carryover_score(&self, depot_id: DepotId, quarter: Quarter) -> EngineResult<u64> {
        let Some(previous) = quarter.previous() else {
            return Ok(0);
        };
        Ok(self
            .settlements
            .find_by_depot_and_quarter(depot_id, previous)?
            .map(|record| record.carryover_score())
            .unwrap_or(0))
    }

    /// Carryover into the quarter containing the clock's current date.
    pub fn current_carryover(&self, depot_id: DepotId) -> EngineResult<u64> {
        self.carryover_score(depot_id, Quarter::containing(self.clock.today()))
    }

    pub fn settlement_for(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<Option<SettlementRecord>> {
        Ok(self.settlements.find_by_depot_and_quarter(depot_id, quarter)?)
    }

    /// Every settled quarter of a depot, oldest first.
    pub fn settlement_history(&self, depot_id: DepotId) -> EngineResult<Vec<SettlementRecord>> {
        Ok(self.settlements.list_by_depot(depot_id)?)
    }
}
