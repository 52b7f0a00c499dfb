use depotscore_core::DepotId;
use depotscore_infra::KeyedLocks;
use depotscore_scoring::{Quarter, YearMonth};

/// Serialization scopes shared by all engine services.
///
/// Lock order is fixed: a depot's settlement lock before any of its month
/// locks, and month locks in ascending order.
#[derive(Debug, Default)]
pub struct EngineLocks {
    months: KeyedLocks<(DepotId, YearMonth)>,
    depots: KeyedLocks<DepotId>,
}

impl EngineLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` holding the locks of the given months of one depot.
    pub fn month_scope<M, F, R>(&self, depot_id: DepotId, months: M, f: F) -> R
    where
        M: IntoIterator<Item = YearMonth>,
        F: FnOnce() -> R,
    {
        self.months
            .with_locked(months.into_iter().map(|month| (depot_id, month)), f)
    }

    /// Run `f` holding the depot's settlement lock and all three month locks
    /// of `quarter`.
    pub fn settlement_scope<F, R>(&self, depot_id: DepotId, quarter: Quarter, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.depots
            .with_locked([depot_id], || self.month_scope(depot_id, quarter.months(), f))
    }
}
