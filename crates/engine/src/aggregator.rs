//! Monthly re-aggregation.
//!
//! A depot's invoices are scored per calendar month as a whole: the month
//! total yields one score and one discount tier, and the score is then shared
//! out across the month's invoices in proportion to their amounts.

use std::sync::Arc;

use tracing::instrument;

use depotscore_core::DepotId;
use depotscore_infra::InvoiceStore;
use depotscore_scoring::{Invoice, PeriodScore, YearMonth, redistribute_score, sum_amounts};

use crate::error::EngineResult;
use crate::locks::EngineLocks;

/// Outcome of recalculating one depot-month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub period: PeriodScore,
    /// The month's invoices as persisted after redistribution, date ascending.
    pub invoices: Vec<Invoice>,
}

impl MonthSummary {
    pub fn invoice_count(&self) -> usize {
        self.invoices.len()
    }

    /// Sum of the redistributed invoice scores. May exceed `period.score`
    /// because of the per-invoice floor.
    pub fn distributed_score(&self) -> u64 {
        self.invoices.iter().map(Invoice::score).sum()
    }
}

#[derive(Debug, Clone)]
pub struct MonthlyAggregator<I> {
    invoices: I,
    locks: Arc<EngineLocks>,
}

impl<I> MonthlyAggregator<I>
where
    I: InvoiceStore,
{
    pub fn new(invoices: I, locks: Arc<EngineLocks>) -> Self {
        Self { invoices, locks }
    }

    /// Recompute and redistribute the scores of a depot-month.
    ///
    /// Returns `None` for a month without invoices; nothing is written then.
    #[instrument(skip(self), fields(depot_id = %depot_id, month = %month), err)]
    pub fn recalculate_month(
        &self,
        depot_id: DepotId,
        month: YearMonth,
    ) -> EngineResult<Option<MonthSummary>> {
        self.locks
            .month_scope(depot_id, [month], || self.recalculate_locked(depot_id, month))
    }

    /// Same as [`recalculate_month`](Self::recalculate_month); the caller must
    /// already hold the month's lock.
    pub(crate) fn recalculate_locked(
        &self,
        depot_id: DepotId,
        month: YearMonth,
    ) -> EngineResult<Option<MonthSummary>> {
        let invoices = self.invoices.find_by_depot_and_date_range(
            depot_id,
            month.first_day(),
            month.last_day(),
        )?;
        if invoices.is_empty() {
            tracing::debug!(%depot_id, %month, "no invoices to redistribute");
            return Ok(None);
        }

        let total = sum_amounts(invoices.iter().map(Invoice::amount))?;
        let period = PeriodScore::from_total(total);

        let mut updated = Vec::with_capacity(invoices.len());
        for mut invoice in invoices {
            let share = redistribute_score(period.score, invoice.amount(), total)?;
            invoice.assign_month_share(share, period.discount);
            self.invoices.save(invoice.clone())?;
            updated.push(invoice);
        }

        tracing::debug!(
            %depot_id,
            %month,
            total_amount = total,
            score = period.score,
            discount = %period.discount,
            invoices = updated.len(),
            "month recalculated"
        );

        Ok(Some(MonthSummary {
            month,
            period,
            invoices: updated,
        }))
    }
}
