//! Invoice create/update/delete orchestration.
//!
//! Every mutation runs inside the lock of each depot-month it touches and
//! re-aggregates those months before the lock is released. The quarter
//! trigger runs after the month lock is dropped, so settlement can take the
//! depot lock first.

use std::sync::Arc;

use tracing::instrument;

use depotscore_core::{Clock, DepotId, DomainError, Entity, InvoiceId};
use depotscore_infra::{DepotStore, InvoiceStore, SettlementStore};
use depotscore_scoring::{Invoice, InvoiceDraft, InvoiceUpdate, Quarter, YearMonth};

use crate::aggregator::{MonthSummary, MonthlyAggregator};
use crate::error::EngineResult;
use crate::locks::EngineLocks;
use crate::settlement::QuarterSettlement;

#[derive(Clone)]
pub struct InvoiceLifecycle<I, S, D> {
    invoices: I,
    depots: D,
    aggregator: MonthlyAggregator<I>,
    settlement: QuarterSettlement<I, S>,
    locks: Arc<EngineLocks>,
    clock: Arc<dyn Clock>,
    auto_settle: bool,
}

impl<I, S, D> core::fmt::Debug for InvoiceLifecycle<I, S, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InvoiceLifecycle")
            .field("auto_settle", &self.auto_settle)
            .finish_non_exhaustive()
    }
}

impl<I, S, D> InvoiceLifecycle<I, S, D>
where
    I: InvoiceStore + Clone,
    S: SettlementStore,
    D: DepotStore,
{
    pub fn new(
        invoices: I,
        depots: D,
        settlement: QuarterSettlement<I, S>,
        locks: Arc<EngineLocks>,
        clock: Arc<dyn Clock>,
        auto_settle: bool,
    ) -> Self {
        let aggregator = MonthlyAggregator::new(invoices.clone(), locks.clone());
        Self {
            invoices,
            depots,
            aggregator,
            settlement,
            locks,
            clock,
            auto_settle,
        }
    }

    /// Record a new invoice and re-aggregate its month.
    ///
    /// Invoices cannot be dated into a quarter that is already settled. When
    /// it is the depot's first invoice in a quarter-opening month (and auto
    /// settlement is enabled) the preceding quarter is settled. A quarter that
    /// is already settled is skipped; any other settlement failure is returned
    /// even though the invoice itself has been stored.
    #[instrument(
        skip(self, draft),
        fields(depot_id = %draft.depot_id, invoice_no = %draft.invoice_no),
        err
    )]
    pub fn create_invoice(&self, draft: InvoiceDraft) -> EngineResult<Invoice> {
        if self.depots.find_by_id(draft.depot_id)?.is_none() {
            return Err(DomainError::not_found("depot").into());
        }

        let invoice =
            Invoice::create(InvoiceId::new(), draft, self.clock.today(), self.clock.now())?;
        let depot_id = invoice.depot_id();
        let month = invoice.month();

        let (stored, first_in_month) = self
            .locks
            .month_scope(depot_id, [month], || self.insert_locked(&invoice))?;

        if first_in_month && self.auto_settle {
            if let Some(closed) = Quarter::closed_by(month) {
                self.settle_closed_quarter(depot_id, closed)?;
            }
        }

        Ok(stored)
    }

    /// Replace an invoice's editable fields and re-aggregate the month it left
    /// (if the date moved to another month) and the month it is now in.
    ///
    /// Moving an invoice into a settled quarter fails with `AlreadySettled`.
    #[instrument(skip(self, update), fields(invoice_id = %id), err)]
    pub fn update_invoice(&self, id: InvoiceId, update: InvoiceUpdate) -> EngineResult<Invoice> {
        let new_month = YearMonth::of(update.date);

        loop {
            let current = self.require(id)?;
            let depot_id = current.depot_id();
            let old_month = current.month();

            let outcome = self.locks.month_scope(depot_id, [old_month, new_month], || {
                self.update_locked(id, &update, old_month, new_month)
            })?;

            match outcome {
                Some(invoice) => return Ok(invoice),
                None => tracing::debug!(invoice_id = %id, "invoice moved during update; retrying"),
            }
        }
    }

    /// Remove an invoice and re-aggregate its former month.
    #[instrument(skip(self), fields(invoice_id = %id), err)]
    pub fn delete_invoice(&self, id: InvoiceId) -> EngineResult<Invoice> {
        loop {
            let current = self.require(id)?;
            let depot_id = current.depot_id();
            let month = current.month();

            let outcome = self
                .locks
                .month_scope(depot_id, [month], || self.delete_locked(id, month))?;

            match outcome {
                Some(invoice) => return Ok(invoice),
                None => tracing::debug!(invoice_id = %id, "invoice moved during delete; retrying"),
            }
        }
    }

    /// Returns the stored invoice and whether it is the first of its month.
    fn insert_locked(&self, invoice: &Invoice) -> EngineResult<(Invoice, bool)> {
        let depot_id = invoice.depot_id();
        let month = invoice.month();

        self.ensure_open(depot_id, month)?;
        if self
            .invoices
            .find_by_invoice_no(invoice.invoice_no())?
            .is_some()
        {
            return Err(DomainError::duplicate_invoice_number(invoice.invoice_no()).into());
        }
        self.invoices.save(invoice.clone())?;

        let summary = self.aggregator.recalculate_locked(depot_id, month)?;
        let first = summary.as_ref().is_some_and(|s| s.invoice_count() == 1);
        Ok((stored_copy(summary, invoice.clone()), first))
    }

    /// `None` when the invoice left `old_month` before the locks were taken.
    fn update_locked(
        &self,
        id: InvoiceId,
        update: &InvoiceUpdate,
        old_month: YearMonth,
        new_month: YearMonth,
    ) -> EngineResult<Option<Invoice>> {
        let mut invoice = self.require(id)?;
        if invoice.month() != old_month {
            return Ok(None);
        }
        let depot_id = invoice.depot_id();

        self.ensure_open(depot_id, new_month)?;
        if let Some(holder) = self.invoices.find_by_invoice_no(update.invoice_no.trim())? {
            if holder.id() != id {
                return Err(DomainError::duplicate_invoice_number(holder.invoice_no()).into());
            }
        }

        invoice.revise(update.clone(), self.clock.now())?;
        self.invoices.save(invoice.clone())?;

        if old_month != new_month {
            self.aggregator.recalculate_locked(depot_id, old_month)?;
        }
        let summary = self.aggregator.recalculate_locked(depot_id, new_month)?;
        Ok(Some(stored_copy(summary, invoice)))
    }

    fn delete_locked(&self, id: InvoiceId, month: YearMonth) -> EngineResult<Option<Invoice>> {
        let invoice = self.require(id)?;
        if invoice.month() != month {
            return Ok(None);
        }
        if !self.invoices.delete_by_id(id)? {
            return Err(DomainError::not_found("invoice").into());
        }
        self.aggregator.recalculate_locked(invoice.depot_id(), month)?;
        Ok(Some(invoice))
    }

    /// Rejects writes into a quarter that already has a settlement record.
    /// Settlement takes the same month locks, so the answer holds while the
    /// caller keeps its lock.
    fn ensure_open(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<()> {
        let quarter = month.quarter();
        if self.settlement.settlement_for(depot_id, quarter)?.is_some() {
            return Err(DomainError::already_settled(quarter).into());
        }
        Ok(())
    }

    fn require(&self, id: InvoiceId) -> EngineResult<Invoice> {
        self.invoices
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("invoice").into())
    }

    fn settle_closed_quarter(&self, depot_id: DepotId, quarter: Quarter) -> EngineResult<()> {
        match self.settlement.settle_quarter(depot_id, quarter) {
            Ok(record) => {
                tracing::info!(
                    %depot_id,
                    %quarter,
                    carryover_score = record.carryover_score(),
                    "previous quarter settled by first invoice of the new quarter"
                );
                Ok(())
            }
            Err(err) if err.is_already_settled() => {
                tracing::warn!(
                    %depot_id,
                    %quarter,
                    "quarter already settled; skipping automatic settlement"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// The persisted form of `invoice` after its month was re-aggregated.
fn stored_copy(summary: Option<MonthSummary>, invoice: Invoice) -> Invoice {
    let id = invoice.id();
    summary
        .and_then(|s| s.invoices.into_iter().find(|candidate| candidate.id() == id))
        .unwrap_or(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use depotscore_core::FixedClock;
    use depotscore_infra::{InMemoryDepotStore, InMemoryInvoiceStore, InMemorySettlementStore};
    use depotscore_scoring::{Depot, DepotDraft, DiscountTier};

    type Lifecycle = InvoiceLifecycle<
        Arc<InMemoryInvoiceStore>,
        Arc<InMemorySettlementStore>,
        Arc<InMemoryDepotStore>,
    >;

    struct Fixture {
        lifecycle: Lifecycle,
        invoices: Arc<InMemoryInvoiceStore>,
        settlements: Arc<InMemorySettlementStore>,
        clock: Arc<FixedClock>,
        depot: DepotId,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(auto_settle: bool) -> Fixture {
        let invoices = InMemoryInvoiceStore::arc();
        let settlements = InMemorySettlementStore::arc();
        let depots = InMemoryDepotStore::arc();
        let clock = Arc::new(FixedClock::at_date(date(2024, 2, 10)));
        let locks = Arc::new(EngineLocks::new());

        let depot = Depot::create(
            DepotId::new(),
            DepotDraft {
                name: "Harbor".to_string(),
                ..DepotDraft::default()
            },
            clock.now(),
        )
        .unwrap();
        let depot_id = depot.id();
        depots.save(depot).unwrap();

        let settlement = QuarterSettlement::new(
            invoices.clone(),
            settlements.clone(),
            locks.clone(),
            clock.clone(),
        );
        let lifecycle = InvoiceLifecycle::new(
            invoices.clone(),
            depots,
            settlement,
            locks,
            clock.clone(),
            auto_settle,
        );

        Fixture {
            lifecycle,
            invoices,
            settlements,
            clock,
            depot: depot_id,
        }
    }

    fn draft(depot_id: DepotId, no: &str, on: Option<NaiveDate>, amount: u64) -> InvoiceDraft {
        InvoiceDraft {
            invoice_no: no.to_string(),
            depot_id,
            date: on,
            phone: None,
            address: None,
            amount,
        }
    }

    fn update_of(invoice: &Invoice, on: NaiveDate, amount: u64) -> InvoiceUpdate {
        InvoiceUpdate {
            invoice_no: invoice.invoice_no().to_string(),
            date: on,
            phone: invoice.phone().map(str::to_string),
            address: invoice.address().map(str::to_string),
            amount,
        }
    }

    #[test]
    fn create_rescores_the_whole_month() {
        let fx = fixture(true);
        let first = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A", Some(date(2024, 2, 1)), 6_000_000))
            .unwrap();
        assert_eq!(first.discount(), DiscountTier::None);

        let second = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "B", Some(date(2024, 2, 2)), 4_000_000))
            .unwrap();
        assert_eq!(second.score(), 4);
        assert_eq!(second.discount(), DiscountTier::Standard);

        let first = fx.invoices.find_by_id(first.id()).unwrap().unwrap();
        assert_eq!(first.score(), 6);
        assert_eq!(first.discount(), DiscountTier::Standard);
        assert_eq!(first.total_after_discount(), 5_700_000);
    }

    #[test]
    fn missing_date_uses_the_clock() {
        let fx = fixture(true);
        let invoice = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A", None, 1_000_000))
            .unwrap();
        assert_eq!(invoice.date(), fx.clock.today());
        assert_eq!(invoice.created_at(), fx.clock.now());
    }

    #[test]
    fn create_rejects_duplicates_and_unknown_depots() {
        let fx = fixture(true);
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A", None, 1_000_000))
            .unwrap();

        let err = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A", None, 2_000_000))
            .unwrap_err();
        assert!(err.is_duplicate_invoice_number());

        let err = fx
            .lifecycle
            .create_invoice(draft(DepotId::new(), "B", None, 2_000_000))
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fx.invoices.count_all().unwrap(), 1);
    }

    #[test]
    fn first_invoice_of_a_settlement_month_closes_the_previous_quarter() {
        let fx = fixture(true);
        fx.lifecycle
            .create_invoice(draft(fx.depot, "J", Some(date(2024, 1, 20)), 7_000_000))
            .unwrap();
        fx.lifecycle
            .create_invoice(draft(fx.depot, "M", Some(date(2024, 3, 5)), 5_000_000))
            .unwrap();

        fx.clock.set_date(date(2024, 4, 1));
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A1", None, 3_000_000))
            .unwrap();

        let q1 = Quarter::new(2024, 1).unwrap();
        let record = fx
            .settlements
            .find_by_depot_and_quarter(fx.depot, q1)
            .unwrap()
            .unwrap();
        assert_eq!(record.total_amount(), 12_000_000);
        assert_eq!(record.carryover_score(), 13);
        assert!(fx.invoices.find_by_invoice_no("J").unwrap().is_none());
        assert!(fx.invoices.find_by_invoice_no("A1").unwrap().is_some());

        // A second April invoice is not the first of the month. The January
        // invoice closed the (empty) fourth quarter of 2023.
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A2", None, 3_000_000))
            .unwrap();
        let history = fx.settlements.list_by_depot(fx.depot).unwrap();
        let quarters: Vec<Quarter> = history.iter().map(|r| r.quarter()).collect();
        assert_eq!(quarters, vec![Quarter::new(2023, 10).unwrap(), q1]);
        assert_eq!(history[0].total_amount(), 0);
    }

    #[test]
    fn refilling_a_settlement_month_does_not_fail_on_a_settled_quarter() {
        let fx = fixture(true);
        let april = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A1", Some(date(2024, 4, 3)), 1_000_000))
            .unwrap();
        fx.lifecycle.delete_invoice(april.id()).unwrap();

        // April is empty again, so this is once more its first invoice.
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A2", Some(date(2024, 4, 4)), 1_000_000))
            .unwrap();
        assert_eq!(fx.settlements.list_by_depot(fx.depot).unwrap().len(), 1);
    }

    #[test]
    fn backdated_invoice_into_a_settled_quarter_is_rejected() {
        let fx = fixture(true);
        fx.lifecycle
            .create_invoice(draft(fx.depot, "J", Some(date(2024, 1, 20)), 7_000_000))
            .unwrap();
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A1", Some(date(2024, 4, 2)), 1_000_000))
            .unwrap();
        let q1 = Quarter::new(2024, 1).unwrap();
        assert!(fx.lifecycle.settlement.settlement_for(fx.depot, q1).unwrap().is_some());

        let err = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "LATE", Some(date(2024, 2, 10)), 3_000_000))
            .unwrap_err();
        assert!(err.is_already_settled());
        assert!(fx.invoices.find_by_invoice_no("LATE").unwrap().is_none());
        assert!(
            fx.invoices
                .find_by_depot_and_date_range(fx.depot, q1.first_day(), q1.last_day())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn moving_an_invoice_into_a_settled_quarter_is_rejected() {
        let fx = fixture(true);
        let april = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A1", Some(date(2024, 4, 5)), 2_000_000))
            .unwrap();

        let err = fx
            .lifecycle
            .update_invoice(april.id(), update_of(&april, date(2024, 2, 10), 2_000_000))
            .unwrap_err();
        assert!(err.is_already_settled());

        let stored = fx.invoices.find_by_id(april.id()).unwrap().unwrap();
        assert_eq!(stored.date(), date(2024, 4, 5));
        assert_eq!(stored.score(), 2);

        // Moving within the open quarter still works.
        let moved = fx
            .lifecycle
            .update_invoice(april.id(), update_of(&april, date(2024, 5, 1), 2_000_000))
            .unwrap();
        assert_eq!(moved.month(), YearMonth::new(2024, 5).unwrap());
    }

    #[test]
    fn auto_settlement_can_be_disabled() {
        let fx = fixture(false);
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A1", Some(date(2024, 7, 1)), 1_000_000))
            .unwrap();
        assert!(fx.settlements.list_by_depot(fx.depot).unwrap().is_empty());
    }

    #[test]
    fn moving_an_invoice_rescores_both_months() {
        let fx = fixture(true);
        let big = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "BIG", Some(date(2024, 2, 3)), 8_000_000))
            .unwrap();
        let small = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "SMALL", Some(date(2024, 2, 4)), 2_000_000))
            .unwrap();
        assert_eq!(
            fx.invoices.find_by_id(small.id()).unwrap().unwrap().discount(),
            DiscountTier::Standard
        );

        let moved = fx
            .lifecycle
            .update_invoice(big.id(), update_of(&big, date(2024, 3, 3), 8_000_000))
            .unwrap();
        assert_eq!(moved.month(), YearMonth::new(2024, 3).unwrap());
        assert_eq!(moved.score(), 8);
        assert_eq!(moved.discount(), DiscountTier::None);

        let small = fx.invoices.find_by_id(small.id()).unwrap().unwrap();
        assert_eq!(small.discount(), DiscountTier::None);
        assert_eq!(small.total_after_discount(), 2_000_000);
    }

    #[test]
    fn update_rejects_a_number_held_by_another_invoice() {
        let fx = fixture(true);
        fx.lifecycle
            .create_invoice(draft(fx.depot, "A", None, 1_000_000))
            .unwrap();
        let b = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "B", None, 1_000_000))
            .unwrap();

        let mut update = update_of(&b, b.date(), 1_000_000);
        update.invoice_no = "A".to_string();
        let err = fx.lifecycle.update_invoice(b.id(), update).unwrap_err();
        assert!(err.is_duplicate_invoice_number());

        // Keeping its own number is fine.
        let same = fx
            .lifecycle
            .update_invoice(b.id(), update_of(&b, b.date(), 3_000_000))
            .unwrap();
        assert_eq!(same.amount(), 3_000_000);
    }

    #[test]
    fn update_and_delete_of_missing_invoices_fail() {
        let fx = fixture(true);
        let update = InvoiceUpdate {
            invoice_no: "X".to_string(),
            date: date(2024, 2, 1),
            phone: None,
            address: None,
            amount: 1,
        };
        assert!(fx.lifecycle.update_invoice(InvoiceId::new(), update).unwrap_err().is_not_found());
        assert!(fx.lifecycle.delete_invoice(InvoiceId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_rescores_the_remaining_invoices() {
        let fx = fixture(true);
        let a = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "A", Some(date(2024, 2, 1)), 15_000_000))
            .unwrap();
        let b = fx
            .lifecycle
            .create_invoice(draft(fx.depot, "B", Some(date(2024, 2, 2)), 5_000_000))
            .unwrap();
        assert_eq!(
            fx.invoices.find_by_id(b.id()).unwrap().unwrap().discount(),
            DiscountTier::Premium
        );

        let removed = fx.lifecycle.delete_invoice(a.id()).unwrap();
        assert_eq!(removed.invoice_no(), "A");

        let b = fx.invoices.find_by_id(b.id()).unwrap().unwrap();
        assert_eq!(b.score(), 5);
        assert_eq!(b.discount(), DiscountTier::None);
        assert!(fx.invoices.find_by_invoice_no("A").unwrap().is_none());
    }
}
