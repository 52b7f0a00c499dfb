use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depotscore_core::{DepotId, DomainError, DomainResult, Entity};

/// Contact data for creating or replacing a depot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DepotDraft {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub additional_info: Option<String>,
    /// Defaults to 0 when absent.
    pub remaining_score: Option<u64>,
}

/// A depot: the grouping key for invoices and settlements.
///
/// `remaining_score` is a manually kept counter. Invoice scoring and quarterly
/// settlement never read or write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depot {
    id: DepotId,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    additional_info: Option<String>,
    remaining_score: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Depot {
    pub fn create(id: DepotId, draft: DepotDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_name(&draft.name)?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            phone: draft.phone,
            address: draft.address,
            additional_info: draft.additional_info,
            remaining_score: draft.remaining_score.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace all editable attributes, including the remaining score.
    pub fn revise(&mut self, draft: DepotDraft, now: DateTime<Utc>) -> DomainResult<()> {
        validate_name(&draft.name)?;
        self.name = draft.name.trim().to_string();
        self.phone = draft.phone;
        self.address = draft.address;
        self.additional_info = draft.additional_info;
        self.remaining_score = draft.remaining_score.unwrap_or(0);
        self.updated_at = now;
        Ok(())
    }

    pub fn set_remaining_score(&mut self, remaining_score: u64, now: DateTime<Utc>) {
        self.remaining_score = remaining_score;
        self.updated_at = now;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn additional_info(&self) -> Option<&str> {
        self.additional_info.as_deref()
    }

    pub fn remaining_score(&self) -> u64 {
        self.remaining_score
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Depot {
    type Id = DepotId;

    fn id(&self) -> DepotId {
        self.id
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("depot name must not be blank"));
    }
    Ok(())
}
