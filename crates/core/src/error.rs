//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// uniqueness, missing targets). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank invoice number, zero amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The named target (invoice, depot, settlement) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Another invoice already uses this invoice number.
    #[error("invoice number already exists: {0}")]
    DuplicateInvoiceNumber(String),

    /// Proportional redistribution was asked to divide by a zero monthly total.
    #[error("division undefined: monthly total is zero")]
    DivisionUndefined,

    /// A settlement record already exists for the depot and quarter.
    #[error("quarter {0} is already settled")]
    AlreadySettled(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }

    pub fn duplicate_invoice_number(invoice_no: impl Into<String>) -> Self {
        Self::DuplicateInvoiceNumber(invoice_no.into())
    }

    pub fn already_settled(quarter: impl core::fmt::Display) -> Self {
        Self::AlreadySettled(quarter.to_string())
    }
}
