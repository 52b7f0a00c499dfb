//! Storage collaborator abstractions and in-memory implementations.
//!
//! The engine only sees these traits. A document-store adapter provides the
//! same capabilities (indexed CRUD and inclusive date-range queries); the
//! in-memory versions back tests and local runs.

pub mod depots;
pub mod invoices;
pub mod settlements;

pub use depots::{DepotStore, InMemoryDepotStore};
pub use invoices::{InMemoryInvoiceStore, InvoiceStore};
pub use settlements::{InMemorySettlementStore, SettlementStore};

/// Storage operation error.
///
/// These are **infrastructure errors** (uniqueness, availability) as opposed to
/// domain errors (validation, missing targets).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The unique invoice-number index already holds this number.
    #[error("invoice number already indexed: {0}")]
    DuplicateInvoiceNo(String),

    /// A settlement record already exists for this depot and quarter.
    #[error("settlement already recorded for quarter {0}")]
    DuplicateSettlement(String),

    /// The backing storage could not serve the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn poisoned(collection: &str) -> Self {
        Self::Unavailable(format!("{collection} lock poisoned"))
    }
}
