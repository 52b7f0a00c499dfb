//! Infrastructure layer: storage collaborators, locking, configuration.

pub mod config;
pub mod lock;
pub mod store;

pub use config::{EngineConfig, LogFormat};
pub use lock::KeyedLocks;
pub use store::{
    DepotStore, InMemoryDepotStore, InMemoryInvoiceStore, InMemorySettlementStore, InvoiceStore,
    SettlementStore, StoreError,
};
