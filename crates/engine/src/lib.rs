//! Application services for depot invoice scoring.
//!
//! ```text
//! InvoiceLifecycle ──► MonthlyAggregator ──► score rules
//!        │
//!        └──────────► QuarterSettlement ──► score rules
//! ```
//!
//! Every service composes the storage traits from `depotscore-infra`; none of
//! them performs IO of its own. Mutations of a depot-month and settlements of
//! a depot are serialized through [`EngineLocks`].

pub mod aggregator;
pub mod depots;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod reports;
pub mod settlement;

pub use aggregator::{MonthSummary, MonthlyAggregator};
pub use depots::DepotDirectory;
pub use engine::{InMemoryScoringEngine, ScoringEngine};
pub use error::{EngineError, EngineResult};
pub use lifecycle::InvoiceLifecycle;
pub use locks::EngineLocks;
pub use reports::{DashboardStats, MonthlyStats, QuarterlyStats, ScoreReports};
pub use settlement::QuarterSettlement;

/// Read-only previews of the score rules.
pub use depotscore_scoring::{
    DiscountTier, discount_from_score, score_from_amount, total_after_discount,
};
