//! Scoring domain module.
//!
//! This crate contains the loyalty scoring rules for depot invoices and the
//! quarterly settlement figures, implemented purely as deterministic domain
//! logic (no IO, no storage, no clock reads).

pub mod depot;
pub mod invoice;
pub mod period;
pub mod score;
pub mod settlement;

pub use depot::{Depot, DepotDraft};
pub use invoice::{Invoice, InvoiceDraft, InvoiceUpdate};
pub use period::{Quarter, YearMonth};
pub use score::{
    DiscountTier, MINOR_UNITS_PER_SCORE, PeriodScore, discount_from_score, redistribute_score,
    score_from_amount, sum_amounts, total_after_discount,
};
pub use settlement::{SettlementFigures, SettlementRecord};
