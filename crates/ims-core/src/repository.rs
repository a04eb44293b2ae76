//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Interaction repositories take
//! an explicit `allowed_site_ids` parameter — the site-scoping filter
//! is part of every method signature so it can never be silently
//! omitted by a query change.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ImsResult;
use crate::models::{
    interaction::{CreateInteraction, Interaction, UpdateInteraction},
    membership::{Membership, SiteAccess, SiteRole},
    site::{CreateSite, Site, UpdateSite},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Pagination & sorting
// ---------------------------------------------------------------------------

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MIN_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A validated page request. Out-of-range values are clamped at
/// construction, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Zero-based row offset for the store.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A page of results with navigation metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let page_size = request.page_size();
        let total_pages = if total == 0 {
            1
        } else {
            total.div_ceil(page_size)
        };
        let page = request.page();
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Columns interactions may be sorted by. An allow-list — sort input
/// never reaches the query builder as a raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Kind,
    Lead,
    StartDatetime,
    EndDatetime,
    Location,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(SortField::Title),
            "type" => Some(SortField::Kind),
            "lead" => Some(SortField::Lead),
            "start_datetime" => Some(SortField::StartDatetime),
            "end_datetime" => Some(SortField::EndDatetime),
            "location" => Some(SortField::Location),
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    /// Column name in the store.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Kind => "kind",
            SortField::Lead => "lead",
            SortField::StartDatetime => "start_datetime",
            SortField::EndDatetime => "end_datetime",
            SortField::Location => "location",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

// ---------------------------------------------------------------------------
// Interaction search filters
// ---------------------------------------------------------------------------

/// Search criteria for interactions, combined with AND semantics.
/// Text filters are case-insensitive substring matches; `search`
/// expands to an OR across title/lead/type/location/description/notes.
#[derive(Debug, Clone, Default)]
pub struct InteractionFilter {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub lead: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub timezone: Option<String>,
    pub start_from: Option<DateTime<Utc>>,
    pub start_until: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Users & sites (global scope)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ImsResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ImsResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = ImsResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = ImsResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser) -> impl Future<Output = ImsResult<User>> + Send;
    /// Re-hash and store a new password.
    fn set_password(
        &self,
        id: Uuid,
        new_password: &str,
    ) -> impl Future<Output = ImsResult<()>> + Send;
    /// Stamp `last_login` with the current time.
    fn record_login(&self, id: Uuid) -> impl Future<Output = ImsResult<()>> + Send;
    /// Soft-delete: sets `is_active` to false.
    fn delete(&self, id: Uuid) -> impl Future<Output = ImsResult<()>> + Send;
    fn list(&self, page: PageRequest) -> impl Future<Output = ImsResult<Page<User>>> + Send;
}

pub trait SiteRepository: Send + Sync {
    /// Create a site and grant the creator an Admin membership in the
    /// same transaction — a site never exists with zero members.
    fn create_with_admin(
        &self,
        input: CreateSite,
        admin_user_id: Uuid,
    ) -> impl Future<Output = ImsResult<Site>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ImsResult<Site>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = ImsResult<Site>> + Send;
    fn update(&self, id: Uuid, input: UpdateSite) -> impl Future<Output = ImsResult<Site>> + Send;
    /// Soft-delete: sets `is_active` to false.
    fn deactivate(&self, id: Uuid) -> impl Future<Output = ImsResult<()>> + Send;
    /// Hard delete. Referential-integrity checks happen at the service
    /// layer before this is called.
    fn delete(&self, id: Uuid) -> impl Future<Output = ImsResult<()>> + Send;
    fn list(
        &self,
        page: PageRequest,
        active_only: bool,
    ) -> impl Future<Output = ImsResult<Page<Site>>> + Send;
}

// ---------------------------------------------------------------------------
// Memberships (the authorization edge)
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    /// Idempotent: an existing (user, site) pair has its role updated
    /// instead of erroring. Runs as a single transaction.
    fn upsert(
        &self,
        user_id: Uuid,
        site_id: Uuid,
        role: SiteRole,
    ) -> impl Future<Output = ImsResult<Membership>> + Send;

    /// Remove a membership. The last-admin guard is evaluated inside
    /// the same transaction as the delete; a rejected removal leaves
    /// the membership set unchanged and returns a conflict.
    fn remove(&self, user_id: Uuid, site_id: Uuid) -> impl Future<Output = ImsResult<()>> + Send;

    /// Change a membership's role, with the same transactional
    /// last-admin guard on demotion.
    fn change_role(
        &self,
        user_id: Uuid,
        site_id: Uuid,
        new_role: SiteRole,
    ) -> impl Future<Output = ImsResult<Membership>> + Send;

    fn get(
        &self,
        user_id: Uuid,
        site_id: Uuid,
    ) -> impl Future<Output = ImsResult<Membership>> + Send;

    /// Site ids of all *active* sites the user belongs to — the
    /// snapshot embedded in session tokens at issuance.
    fn site_ids_for_user(&self, user_id: Uuid) -> impl Future<Output = ImsResult<Vec<Uuid>>> + Send;

    /// Memberships joined with their (active) sites, for login output.
    fn site_access_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = ImsResult<Vec<SiteAccess>>> + Send;

    fn list_site_members(
        &self,
        site_id: Uuid,
        page: PageRequest,
    ) -> impl Future<Output = ImsResult<Page<Membership>>> + Send;

    fn admin_count(&self, site_id: Uuid) -> impl Future<Output = ImsResult<u64>> + Send;

    fn count_by_site(&self, site_id: Uuid) -> impl Future<Output = ImsResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Interactions (site-scoped)
// ---------------------------------------------------------------------------

pub trait InteractionRepository: Send + Sync {
    /// `site_id` comes from the active site context, never from the
    /// client payload.
    fn create(
        &self,
        site_id: Uuid,
        user_id: Uuid,
        input: CreateInteraction,
    ) -> impl Future<Output = ImsResult<Interaction>> + Send;

    /// The site filter is baked into the lookup predicate: a record
    /// outside `allowed_site_ids` is indistinguishable from a missing
    /// one.
    fn get_by_id(
        &self,
        allowed_site_ids: &[Uuid],
        id: Uuid,
    ) -> impl Future<Output = ImsResult<Interaction>> + Send;

    fn update(
        &self,
        allowed_site_ids: &[Uuid],
        id: Uuid,
        user_id: Uuid,
        input: UpdateInteraction,
    ) -> impl Future<Output = ImsResult<Interaction>> + Send;

    /// Hard delete, within site scope only.
    fn delete(
        &self,
        allowed_site_ids: &[Uuid],
        id: Uuid,
    ) -> impl Future<Output = ImsResult<()>> + Send;

    /// Search with the site filter applied before any client filter.
    /// Listing is a search with an empty filter.
    fn search(
        &self,
        allowed_site_ids: &[Uuid],
        filter: InteractionFilter,
        page: PageRequest,
        sort: Sort,
    ) -> impl Future<Output = ImsResult<Page<Interaction>>> + Send;

    fn count_by_site(&self, site_id: Uuid) -> impl Future<Output = ImsResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Shared security stores (revocation, lockout, password reset)
// ---------------------------------------------------------------------------
//
// These must live in a store reachable by every server process — a
// process-local set breaks correctness the moment a second process
// exists.

pub trait RevocationStore: Send + Sync {
    /// Insert a token id with expiry equal to the token's own
    /// remaining lifetime, so the set self-prunes.
    fn revoke(
        &self,
        jti: Uuid,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = ImsResult<()>> + Send;

    fn is_revoked(&self, jti: Uuid) -> impl Future<Output = ImsResult<bool>> + Send;

    /// Remove entries past their expiry. Returns the number removed.
    fn cleanup_expired(&self) -> impl Future<Output = ImsResult<u64>> + Send;
}

pub trait LockoutStore: Send + Sync {
    /// Increment the failure counter for a username and return the new
    /// count. The counter expires `window_secs` after the last failure.
    fn record_failure(
        &self,
        username: &str,
        window_secs: u64,
    ) -> impl Future<Output = ImsResult<u64>> + Send;

    fn lock(&self, username: &str, duration_secs: u64)
    -> impl Future<Output = ImsResult<()>> + Send;

    fn is_locked(&self, username: &str) -> impl Future<Output = ImsResult<bool>> + Send;

    /// Clear the counter and any lock (on successful login).
    fn clear(&self, username: &str) -> impl Future<Output = ImsResult<()>> + Send;
}

pub trait ResetTokenStore: Send + Sync {
    fn insert(
        &self,
        token: &str,
        user_id: Uuid,
        ttl_secs: u64,
    ) -> impl Future<Output = ImsResult<()>> + Send;

    /// Look up and delete in one step — reset tokens are single-use.
    fn consume(&self, token: &str) -> impl Future<Output = ImsResult<Option<Uuid>>> + Send;
}
