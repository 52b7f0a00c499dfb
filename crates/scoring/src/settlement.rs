//! Quarterly settlement figures and the immutable record they produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotscore_core::{DepotId, Entity, SettlementId};

use crate::period::Quarter;
use crate::score::{DiscountTier, PeriodScore, score_from_amount};

/// The remainder score is the quarter's raw score modulo this value.
pub const REMAINDER_MODULUS: u64 = 10;

/// Figures computed when a quarter closes.
///
/// The score comes from the summed amount of the quarter, never from the sum of
/// per-invoice scores, so the monthly redistribution drift does not compound.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementFigures {
    pub total_amount: u64,
    pub total_score: u64,
    pub discount: DiscountTier,
    pub total_after_discount: u64,
    pub remainder_score: u64,
    /// Score re-earned by the discounted total.
    pub rescored: u64,
    pub carryover_score: u64,
}

impl SettlementFigures {
    pub fn from_total(total_amount: u64) -> Self {
        let period = PeriodScore::from_total(total_amount);
        let remainder_score = period.score % REMAINDER_MODULUS;
        let rescored = score_from_amount(period.total_after_discount);
        Self {
            total_amount,
            total_score: period.score,
            discount: period.discount,
            total_after_discount: period.total_after_discount,
            remainder_score,
            rescored,
            carryover_score: remainder_score + rescored,
        }
    }
}

/// Summary of a settled quarter. Immutable once created; at most one exists per
/// depot and quarter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    id: SettlementId,
    depot_id: DepotId,
    quarter: Quarter,
    total_amount: u64,
    total_score: u64,
    discount: DiscountTier,
    total_after_discount: u64,
    remainder_score: u64,
    carryover_score: u64,
    settled_at: DateTime<Utc>,
}

impl SettlementRecord {
    pub fn new(
        id: SettlementId,
        depot_id: DepotId,
        quarter: Quarter,
        figures: &SettlementFigures,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            depot_id,
            quarter,
            total_amount: figures.total_amount,
            total_score: figures.total_score,
            discount: figures.discount,
            total_after_discount: figures.total_after_discount,
            remainder_score: figures.remainder_score,
            carryover_score: figures.carryover_score,
            settled_at,
        }
    }

    pub fn depot_id(&self) -> DepotId {
        self.depot_id
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    pub fn discount(&self) -> DiscountTier {
        self.discount
    }

    pub fn total_after_discount(&self) -> u64 {
        self.total_after_discount
    }

    pub fn remainder_score(&self) -> u64 {
        self.remainder_score
    }

    pub fn carryover_score(&self) -> u64 {
        self.carryover_score
    }

    pub fn settled_at(&self) -> DateTime<Utc> {
        self.settled_at
    }
}

impl Entity for SettlementRecord {
    type Id = SettlementId;

    fn id(&self) -> SettlementId {
        self.id
    }
}
