//! Membership domain model — the authorization edge between a user
//! and a site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a user holds within a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteRole {
    Admin,
    User,
}

impl SiteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteRole::Admin => "Admin",
            SiteRole::User => "User",
        }
    }

    /// Case-insensitive parse of a client-supplied role name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(SiteRole::Admin),
            "user" => Some(SiteRole::User),
            _ => None,
        }
    }
}

/// A user's membership in a site. The (user_id, site_id) pair is
/// unique — at most one role per user per site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub site_id: Uuid,
    pub role: SiteRole,
    pub assigned_at: DateTime<Utc>,
}

/// A membership joined with its site, as returned to a user at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAccess {
    pub site_id: Uuid,
    pub name: String,
    pub description: String,
    pub role: SiteRole,
}
