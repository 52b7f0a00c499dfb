//! Read-side views over invoices and depots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use depotscore_core::{DepotId, DomainError, InvoiceId};
use depotscore_infra::{DepotStore, InvoiceStore};
use depotscore_scoring::{Invoice, Quarter, YearMonth, score_from_amount, sum_amounts};

use crate::error::EngineResult;

/// Totals of one calendar month of a depot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub month: YearMonth,
    pub total_amount: u64,
    pub invoice_count: u64,
    /// Scored from `total_amount`.
    pub total_score: u64,
}

/// Totals of one (possibly still open) quarter of a depot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyStats {
    pub quarter: Quarter,
    pub total_amount: u64,
    pub invoice_count: u64,
    pub total_score: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_depots: u64,
    pub total_invoices: u64,
    pub total_amount: u64,
}

#[derive(Debug, Clone)]
pub struct ScoreReports<I, D> {
    invoices: I,
    depots: D,
}

impl<I, D> ScoreReports<I, D>
where
    I: InvoiceStore,
    D: DepotStore,
{
    pub fn new(invoices: I, depots: D) -> Self {
        Self { invoices, depots }
    }

    /// Every open invoice of a depot, newest date first.
    pub fn invoices_for_depot(&self, depot_id: DepotId) -> EngineResult<Vec<Invoice>> {
        Ok(self.invoices.find_by_depot(depot_id)?)
    }

    pub fn get_invoice(&self, id: InvoiceId) -> EngineResult<Invoice> {
        self.invoices
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("invoice").into())
    }

    pub fn invoices_for_month(
        &self,
        depot_id: DepotId,
        month: YearMonth,
    ) -> EngineResult<Vec<Invoice>> {
        self.invoices_in_range(depot_id, month.first_day(), month.last_day())
    }

    /// Invoices dated within `start..=end`, date ascending.
    pub fn invoices_in_range(
        &self,
        depot_id: DepotId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<Invoice>> {
        if start > end {
            return Err(
                DomainError::validation(format!("range start {start} is after end {end}")).into(),
            );
        }
        Ok(self
            .invoices
            .find_by_depot_and_date_range(depot_id, start, end)?)
    }

    pub fn quarter_invoices(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<Vec<Invoice>> {
        self.invoices_in_range(depot_id, quarter.first_day(), quarter.last_day())
    }

    pub fn depot_invoice_count(&self, depot_id: DepotId) -> EngineResult<u64> {
        Ok(self.invoices.count_by_depot(depot_id)?)
    }

    pub fn monthly_total_amount(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        Ok(self.month_stats(depot_id, month)?.total_amount)
    }

    pub fn monthly_total_score(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        Ok(self.month_stats(depot_id, month)?.total_score)
    }

    pub fn month_invoice_count(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<u64> {
        Ok(self.month_stats(depot_id, month)?.invoice_count)
    }

    /// One entry per calendar month of `year`, January first.
    pub fn monthly_stats(&self, depot_id: DepotId, year: i32) -> EngineResult<Vec<MonthlyStats>> {
        (1..=12)
            .map(|month| -> EngineResult<MonthlyStats> {
                let month = YearMonth::new(year, month)?;
                self.month_stats(depot_id, month)
            })
            .collect()
    }

    pub fn quarterly_stats(
        &self,
        depot_id: DepotId,
        quarter: Quarter,
    ) -> EngineResult<QuarterlyStats> {
        let invoices = self.quarter_invoices(depot_id, quarter)?;
        let total_amount = sum_amounts(invoices.iter().map(Invoice::amount))?;
        Ok(QuarterlyStats {
            quarter,
            total_amount,
            invoice_count: invoices.len() as u64,
            total_score: score_from_amount(total_amount),
        })
    }

    pub fn dashboard_stats(&self) -> EngineResult<DashboardStats> {
        Ok(DashboardStats {
            total_depots: self.depots.count()?,
            total_invoices: self.invoices.count_all()?,
            total_amount: self.invoices.total_amount()?,
        })
    }

    fn month_stats(&self, depot_id: DepotId, month: YearMonth) -> EngineResult<MonthlyStats> {
        let invoices = self.invoices_for_month(depot_id, month)?;
        let total_amount = sum_amounts(invoices.iter().map(Invoice::amount))?;
        Ok(MonthlyStats {
            month,
            total_amount,
            invoice_count: invoices.len() as u64,
            total_score: score_from_amount(total_amount),
        })
    }
}
