//! Score engine: pure conversion rules between amounts, scores and discounts.
//!
//! Amounts are integers in the smallest currency unit. All rounding is
//! round-half-away-from-zero done in integer arithmetic; every input here is
//! non-negative, so that is the same as rounding halves up.

use serde::{Deserialize, Serialize};

use depotscore_core::{DomainError, DomainResult};

/// Minor currency units that earn one score point.
pub const MINOR_UNITS_PER_SCORE: u64 = 1_000_000;

/// Score needed for the 5% tier.
pub const STANDARD_TIER_SCORE: u64 = 10;

/// Score needed for the 10% tier.
pub const PREMIUM_TIER_SCORE: u64 = 20;

/// Discount tier selected by score thresholds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountTier {
    /// 0%.
    #[default]
    None,
    /// 5%.
    Standard,
    /// 10%.
    Premium,
}

impl DiscountTier {
    pub fn percent(self) -> u64 {
        match self {
            DiscountTier::None => 0,
            DiscountTier::Standard => 5,
            DiscountTier::Premium => 10,
        }
    }
}

impl core::fmt::Display for DiscountTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// One point per full [`MINOR_UNITS_PER_SCORE`]; anything below that scores 0.
pub fn score_from_amount(amount: u64) -> u64 {
    if amount < MINOR_UNITS_PER_SCORE {
        return 0;
    }
    amount / MINOR_UNITS_PER_SCORE
}

/// Step function over score; each tier includes its lower bound.
pub fn discount_from_score(score: u64) -> DiscountTier {
    if score >= PREMIUM_TIER_SCORE {
        DiscountTier::Premium
    } else if score >= STANDARD_TIER_SCORE {
        DiscountTier::Standard
    } else {
        DiscountTier::None
    }
}

/// `round(amount * (1 - percent / 100))`, halves rounded up.
pub fn total_after_discount(amount: u64, discount: DiscountTier) -> u64 {
    let kept = 100 - discount.percent();
    let scaled = amount as u128 * kept as u128;
    // Never exceeds `amount`, so it fits back into u64.
    ((scaled + 50) / 100) as u64
}

/// Share of `period_score` owed to an invoice of `amount` in a period totalling
/// `period_total`: `round(period_score * amount / period_total)`.
///
/// Invoices of at least one score unit never receive less than their own
/// direct score, even when the proportional share rounds lower. The sum of all
/// shares may therefore exceed `period_score`; that drift is not corrected.
pub fn redistribute_score(period_score: u64, amount: u64, period_total: u64) -> DomainResult<u64> {
    if period_total == 0 {
        return Err(DomainError::DivisionUndefined);
    }

    let numerator = 2 * period_score as u128 * amount as u128 + period_total as u128;
    let proportional = (numerator / (2 * period_total as u128)) as u64;

    if amount >= MINOR_UNITS_PER_SCORE {
        let direct = amount / MINOR_UNITS_PER_SCORE;
        return Ok(proportional.max(direct));
    }
    Ok(proportional)
}

/// Checked sum of invoice amounts.
pub fn sum_amounts<I>(amounts: I) -> DomainResult<u64>
where
    I: IntoIterator<Item = u64>,
{
    amounts.into_iter().try_fold(0u64, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| DomainError::validation("amount total overflow"))
    })
}

/// Score, discount and discounted total derived from one period total.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub total_amount: u64,
    pub score: u64,
    pub discount: DiscountTier,
    pub total_after_discount: u64,
}

impl PeriodScore {
    pub fn from_total(total_amount: u64) -> Self {
        let score = score_from_amount(total_amount);
        let discount = discount_from_score(score);
        Self {
            total_amount,
            score,
            discount,
            total_after_discount: total_after_discount(total_amount, discount),
        }
    }
}
