//! Site domain model.
//!
//! Sites are the tenancy boundary: every interaction belongs to
//! exactly one site, and all data access is filtered by site
//! membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    /// Unique human-readable name.
    pub name: String,
    pub description: String,
    /// Inactive sites are excluded from default listings and from new
    /// session issuance; their data is retained.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSite {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSite {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
