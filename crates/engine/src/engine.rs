//! `ScoringEngine`: one handle wiring every service over shared stores,
//! locks and clock.

use std::sync::Arc;

use chrono::NaiveDate;

use depotscore_core::{Clock, DepotId, InvoiceId};
use depotscore_infra::{
    DepotStore, EngineConfig, InMemoryDepotStore, InMemoryInvoiceStore, InMemorySettlementStore,
    InvoiceStore, SettlementStore,
};
use depotscore_scoring::{
    Depot, DepotDraft, Invoice, InvoiceDraft, InvoiceUpdate, Quarter, SettlementRecord, YearMonth,
};

use crate::aggregator::{MonthSummary, MonthlyAggregator};
use crate::depots::DepotDirectory;
use crate::error::EngineResult;
use crate::lifecycle::InvoiceLifecycle;
use crate::locks::EngineLocks;
use crate::reports::{DashboardStats, MonthlyStats, QuarterlyStats, ScoreReports};
use crate::settlement::QuarterSettlement;

/// Engine over in-memory stores, for tests and local runs.
pub type InMemoryScoringEngine = ScoringEngine<
    Arc<InMemoryInvoiceStore>,
    Arc<InMemorySettlementStore>,
    Arc<InMemoryDepotStore>,
>;

#[derive(Debug, Clone)]
pub struct ScoringEngine<I, S, D> {
    aggregator: MonthlyAggregator<I>,
    settlement: QuarterSettlement<I, S>,
    lifecycle: InvoiceLifecycle<I, S, D>,
    depots: DepotDirectory<D>,
    reports: ScoreReports<I, D>,
}

impl<I, S, D> ScoringEngine<I, S, D>
where
    I: InvoiceStore + Clone,
    S: SettlementStore + Clone,
    D: DepotStore + Clone,
{
    pub fn new(
        invoices: I,
        settlements: S,
        depots: D,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        let locks = Arc::new(EngineLocks::new());
        let aggregator = MonthlyAggregator::new(invoices.clone(), locks.clone());
        let settlement =
            QuarterSettlement::new(invoices.clone(), settlements, locks.clone(), clock.clone());
        let lifecycle = InvoiceLifecycle::new(
            invoices.clone(),
            depots.clone(),
            settlement.clone(),
            locks,
            clock.clone(),
            config.auto_settle,
        );

        tracing::debug!(auto_settle = config.auto_settle, "scoring engine assembled");

        Self {
            aggregator,
            settlement,
            lifecycle,
            depots: DepotDirectory::new(depots.clone(), clock),
            reports: ScoreReports::new(invoices, depots),
        }
    }

    pub fn aggregator(&self) -> &MonthlyAggregator<I> {
        &self.aggregator
    }

    pub fn settlement(&self) -> &QuarterSettlement<I, S> {
        &self.settlement
    }

    pub fn lifecycle(&self) -> &InvoiceLifecycle<I, S, D> {
        &self.lifecycle
    }

    pub fn depots(&self) -> &DepotDirectory<D> {
        &self.depots
    }

    pub fn reports(&self) -> &ScoreReports<I, D> {
        &self.reports
    }

    // Invoices.

    pub fn create_invoice(&self, draft: InvoiceDraft) -> EngineResult<Invoice> {
        self.lifecycle.create_invoice(draft)
    }

    pub fn update_invoice(&self, id: InvoiceId, update: InvoiceUpdate) -> EngineResult<Invoice> {
        self.lifecycle.update_invoice(id, update)
    }

    pub fn delete_invoice(&self, id: InvoiceId) -> EngineResult<Invoice> {
        self.lifecycle.delete_invoice(id)
    }

    pub fn recalculate_month(
        &self,
        depot_id: DepotId,
        month: YearMonth,
    ) -> EngineResult<Option<MonthSummary>> {
        self.aggregator.recalculate_month(depot_id, month)
    }

    // Settlement.

    pub fn settle_quarter(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<SettlementRecord> {
        self.settlement.settle_quarter(depot_id, quarter)
    }

    pub fn carryover_score(&self, depot_id: DepotId, quarter: Quarter) -> EngineResult<u64> {
        self.settlement.carryover_score(depot_id, quarter)
    }

    pub fn current_carryover(&self, depot_id: DepotId) -> EngineResult<u64> {
        self.settlement.current_carryover(depot_id)
    }

    pub fn settlement_history(&self, depot_id: DepotId) -> EngineResult<Vec<SettlementRecord>> {
        self.settlement.settlement_history(depot_id)
    }

    // Depots.

    pub fn create_depot(&self, draft: DepotDraft) -> EngineResult<Depot> {
        self.depots.create_depot(draft)
    }

    pub fn get_depot(&self, id: DepotId) -> EngineResult<Depot> {
        self.depots.get_depot(id)
    }

    pub fn list_depots(&self) -> EngineResult<Vec<Depot>> {
        self.depots.list_depots()
    }

    pub fn update_depot(&self, id: DepotId, draft: DepotDraft) -> EngineResult<Depot> {
        self.depots.update_depot(id, draft)
    }

    pub fn update_remaining_score(&self, id: DepotId, remaining_score: u64) -> EngineResult<Depot> {
        self.depots.update_remaining_score(id, remaining_score)
    }

    pub fn delete_depot(&self, id: DepotId) -> EngineResult<()> {
        self.depots.delete_depot(id)
    }

    pub fn depot_count(&self) -> EngineResult<u64> {
        self.depots.depot_count()
    }

    // Reports.

    pub fn get_invoice(&self, id: InvoiceId) -> EngineResult<Invoice> {
        self.reports.get_invoice(id)
    }

    pub fn invoices_for_depot(&self, depot_id: DepotId) -> EngineResult<Vec<Invoice>> {
        self.reports.invoices_for_depot(depot_id)
    }

    pub fn invoices_for_month(
        &self,
        depot_id: DepotId,
        month: YearMonth,
    ) -> EngineResult<Vec<Invoice>> {
        self.reports.invoices_for_month(depot_id, month)
    }

    pub fn invoices_in_range(
        &self,
        depot_id: DepotId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<Invoice>> {
        self.reports.invoices_in_range(depot_id, start, end)
    }

    pub fn quarter_invoices(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<Vec<Invoice>> {
        self.reports.quarter_invoices(depot_id, quarter)
    }

    pub fn depot_invoice_count(&self, depot_id: DepotId) -> EngineResult<u64> {
        self.reports.depot_invoice_count(depot_id)
    }

    pub fn monthly_total_amount(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        self.reports.monthly_total_amount(depot_id, month)
    }

    pub fn monthly_total_score(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        self.reports.monthly_total_score(depot_id, month)
    }

    pub fn month_invoice_count(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        self.reports.month_invoice_count(depot_id, month)
    }

    pub fn monthly_stats(&self, depot_id: DepotId, year: i32) -> EngineResult<Vec<MonthlyStats>> {
        self.reports.monthly_stats(depot_id, year)
    }

    pub fn quarterly_stats(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<QuarterlyStats> {
        self.reports.quarterly_stats(depot_id, quarter)
    }

    pub fn dashboard_stats(&self) -> EngineResult<DashboardStats> {
        self.reports.dashboard_stats()
    }
}

impl InMemoryScoringEngine {
    pub fn in_memory(clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self::new(
            InMemoryInvoiceStore::arc(),
            InMemorySettlementStore::arc(),
            InMemoryDepotStore::arc(),
            clock,
            config,
        )
    }
}
