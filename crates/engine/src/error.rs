//! Engine error taxonomy.

use depotscore_core::DomainError;
use depotscore_infra::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Error surfaced by every engine operation.
///
/// Uniqueness violations reported by the stores are lifted into their domain
/// meaning, so callers see `DuplicateInvoiceNumber` or `AlreadySettled`
/// whichever layer caught them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateInvoiceNo(no) => {
                EngineError::Domain(DomainError::DuplicateInvoiceNumber(no))
            }
            StoreError::DuplicateSettlement(quarter) => {
                EngineError::Domain(DomainError::AlreadySettled(quarter))
            }
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Domain(DomainError::NotFound(_)))
    }

    pub fn is_duplicate_invoice_number(&self) -> bool {
        matches!(self, EngineError::Domain(DomainError::DuplicateInvoiceNumber(_)))
    }

    pub fn is_already_settled(&self) -> bool {
        matches!(self, EngineError::Domain(DomainError::AlreadySettled(_)))
    }
}
