use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use depotscore_core::{DepotId, DomainError, DomainResult, Entity, InvoiceId};

use crate::period::YearMonth;
use crate::score::{
    DiscountTier, discount_from_score, score_from_amount, total_after_discount,
};

/// Intake data for a new invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub invoice_no: String,
    pub depot_id: DepotId,
    /// Defaults to the current date when absent.
    pub date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Amount in smallest currency unit.
    pub amount: u64,
}

/// Replacement data for an existing invoice. The depot cannot change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub invoice_no: String,
    pub date: NaiveDate,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub amount: u64,
}

/// Invoice document.
///
/// `score`, `discount` and `total_after_discount` are derived. They start as a
/// provisional single-invoice value and are overwritten by the monthly
/// aggregation, which scores the whole depot-month together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    invoice_no: String,
    depot_id: DepotId,
    date: NaiveDate,
    phone: Option<String>,
    address: Option<String>,
    amount: u64,
    score: u64,
    discount: DiscountTier,
    total_after_discount: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Build a new invoice from a draft, with provisional scoring of its own amount.
    pub fn create(
        id: InvoiceId,
        draft: InvoiceDraft,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_invoice_no(&draft.invoice_no)?;
        validate_amount(draft.amount)?;
        let date = draft.date.unwrap_or(today);
        validate_date(date)?;

        let mut invoice = Self {
            id,
            invoice_no: draft.invoice_no.trim().to_string(),
            depot_id: draft.depot_id,
            date,
            phone: draft.phone,
            address: draft.address,
            amount: draft.amount,
            score: 0,
            discount: DiscountTier::None,
            total_after_discount: draft.amount,
            created_at: now,
            updated_at: now,
        };
        invoice.score_provisionally();
        Ok(invoice)
    }

    /// Apply an update, re-scoring the new amount provisionally.
    pub fn revise(&mut self, update: InvoiceUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        validate_invoice_no(&update.invoice_no)?;
        validate_amount(update.amount)?;
        validate_date(update.date)?;

        self.invoice_no = update.invoice_no.trim().to_string();
        self.date = update.date;
        self.phone = update.phone;
        self.address = update.address;
        self.amount = update.amount;
        self.updated_at = now;
        self.score_provisionally();
        Ok(())
    }

    /// Overwrite the derived fields with this invoice's share of its month.
    ///
    /// The discount is the month's tier, not one derived from the invoice alone.
    pub fn assign_month_share(&mut self, score: u64, discount: DiscountTier) {
        self.score = score;
        self.discount = discount;
        self.total_after_discount = total_after_discount(self.amount, discount);
    }

    fn score_provisionally(&mut self) {
        let score = score_from_amount(self.amount);
        self.assign_month_share(score, discount_from_score(score));
    }

    pub fn invoice_no(&self) -> &str {
        &self.invoice_no
    }

    pub fn depot_id(&self) -> DepotId {
        self.depot_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn discount(&self) -> DiscountTier {
        self.discount
    }

    pub fn total_after_discount(&self) -> u64 {
        self.total_after_discount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }
}

fn validate_invoice_no(invoice_no: &str) -> DomainResult<()> {
    if invoice_no.trim().is_empty() {
        return Err(DomainError::validation("invoice number must not be blank"));
    }
    Ok(())
}

/// The date's month must be representable as a [`YearMonth`], so the month
/// and quarter derived from it round-trip through their `"YYYY-MM"` form.
fn validate_date(date: NaiveDate) -> DomainResult<()> {
    YearMonth::new(date.year(), date.month()).map(|_| ())
}

// A zero amount could leave a month with a zero total, which the proportional
// redistribution cannot divide by.
fn validate_amount(amount: u64) -> DomainResult<()> {
    if amount == 0 {
        return Err(DomainError::validation("invoice amount must be positive"));
    }
    Ok(())
}
