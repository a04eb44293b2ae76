//! SurrealDB implementation of [`MembershipRepository`].
//!
//! The last-admin invariant is enforced *inside* the mutation
//! transaction: the admin count check and the delete/demote run in the
//! same `BEGIN`/`COMMIT` block, with `THROW` aborting the whole
//! transaction, so two concurrent removals cannot both pass the check.

use chrono::{DateTime, Utc};
use ims_core::error::ImsResult;
use ims_core::models::membership::{Membership, SiteAccess, SiteRole};
use ims_core::repository::{MembershipRepository, Page, PageRequest};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Sentinel raised by the guard transaction when a mutation would
/// leave a site with zero admins.
const LAST_ADMIN_THROW: &str = "last_admin";
/// Sentinel raised when the targeted membership does not exist.
const MISSING_THROW: &str = "membership_missing";

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    user_id: String,
    site_id: String,
    role: String,
    assigned_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<SiteRole, DbError> {
    SiteRole::parse(s).ok_or_else(|| DbError::Query(format!("unknown membership role: {s}")))
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
        let site_id = Uuid::parse_str(&self.site_id)
            .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")))?;
        Ok(Membership {
            user_id,
            site_id,
            role: parse_role(&self.role)?,
            assigned_at: self.assigned_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SiteIdRow {
    site_id: String,
}

#[derive(Debug, SurrealValue)]
struct SiteInfoRow {
    record_id: String,
    name: String,
    description: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Map a guard-transaction error onto the domain error it encodes.
fn map_guard_error(err: surrealdb::Error, user_id: Uuid, site_id: Uuid) -> DbError {
    let msg = err.to_string();
    if msg.contains(LAST_ADMIN_THROW) {
        DbError::Conflict {
            message: format!("site {site_id} must retain at least one admin"),
        }
    } else if msg.contains(MISSING_THROW) {
        DbError::NotFound {
            entity: "membership".into(),
            id: format!("user={user_id},site={site_id}"),
        }
    } else {
        DbError::Query(msg)
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn upsert(&self, user_id: Uuid, site_id: Uuid, role: SiteRole) -> ImsResult<Membership> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $existing = (SELECT role FROM membership \
                 WHERE user_id = $user_id AND site_id = $site_id); \
                 IF array::len($existing) > 0 { \
                     UPDATE membership SET role = $role \
                     WHERE user_id = $user_id AND site_id = $site_id; \
                 } ELSE { \
                     CREATE membership SET \
                     user_id = $user_id, site_id = $site_id, \
                     role = $role; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("site_id", site_id.to_string()))
            .bind(("role", role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get(user_id, site_id).await
    }

    async fn remove(&self, user_id: Uuid, site_id: Uuid) -> ImsResult<()> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $current = (SELECT role FROM membership \
                 WHERE user_id = $user_id AND site_id = $site_id); \
                 IF array::len($current) = 0 { \
                     THROW 'membership_missing'; \
                 }; \
                 IF $current[0].role = 'Admin' { \
                     LET $admins = (SELECT count() AS total FROM membership \
                     WHERE site_id = $site_id AND role = 'Admin' GROUP ALL); \
                     IF $admins[0].total <= 1 { \
                         THROW 'last_admin'; \
                     }; \
                 }; \
                 DELETE membership \
                 WHERE user_id = $user_id AND site_id = $site_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("site_id", site_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| map_guard_error(e, user_id, site_id))?;

        Ok(())
    }

    async fn change_role(
        &self,
        user_id: Uuid,
        site_id: Uuid,
        new_role: SiteRole,
    ) -> ImsResult<Membership> {
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $current = (SELECT role FROM membership \
                 WHERE user_id = $user_id AND site_id = $site_id); \
                 IF array::len($current) = 0 { \
                     THROW 'membership_missing'; \
                 }; \
                 IF $current[0].role = 'Admin' AND $new_role != 'Admin' { \
                     LET $admins = (SELECT count() AS total FROM membership \
                     WHERE site_id = $site_id AND role = 'Admin' GROUP ALL); \
                     IF $admins[0].total <= 1 { \
                         THROW 'last_admin'; \
                     }; \
                 }; \
                 UPDATE membership SET role = $new_role \
                 WHERE user_id = $user_id AND site_id = $site_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("site_id", site_id.to_string()))
            .bind(("new_role", new_role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| map_guard_error(e, user_id, site_id))?;

        self.get(user_id, site_id).await
    }

    async fn get(&self, user_id: Uuid, site_id: Uuid) -> ImsResult<Membership> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership \
                 WHERE user_id = $user_id AND site_id = $site_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("site_id", site_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: format!("user={user_id},site={site_id}"),
        })?;

        Ok(row.try_into_membership()?)
    }

    async fn site_ids_for_user(&self, user_id: Uuid) -> ImsResult<Vec<Uuid>> {
        // Inactive sites are excluded from new session issuance, so
        // they never enter a token snapshot.
        let mut result = self
            .db
            .query(
                "SELECT site_id FROM membership \
                 WHERE user_id = $user_id \
                 AND site_id IN \
                 (SELECT VALUE meta::id(id) FROM site WHERE is_active = true) \
                 ORDER BY assigned_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteIdRow> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| {
                Uuid::parse_str(&row.site_id)
                    .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")).into())
            })
            .collect()
    }

    async fn site_access_for_user(&self, user_id: Uuid) -> ImsResult<Vec<SiteAccess>> {
        // Two explicit queries instead of an implicit join: first the
        // memberships, then the matching active sites, merged here.
        let mut result = self
            .db
            .query(
                "SELECT * FROM membership \
                 WHERE user_id = $user_id \
                 ORDER BY assigned_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let membership_rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        if membership_rows.is_empty() {
            return Ok(Vec::new());
        }

        let site_ids: Vec<String> = membership_rows.iter().map(|m| m.site_id.clone()).collect();

        let mut site_result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, name, description \
                 FROM site \
                 WHERE meta::id(id) IN $site_ids AND is_active = true",
            )
            .bind(("site_ids", site_ids))
            .await
            .map_err(DbError::from)?;

        let site_rows: Vec<SiteInfoRow> = site_result.take(0).map_err(DbError::from)?;

        let mut access = Vec::with_capacity(membership_rows.len());
        for row in membership_rows {
            let Some(site) = site_rows.iter().find(|s| s.record_id == row.site_id) else {
                // Membership in an inactive site — not part of the
                // user's current access.
                continue;
            };
            let membership = row.try_into_membership()?;
            access.push(SiteAccess {
                site_id: membership.site_id,
                name: site.name.clone(),
                description: site.description.clone(),
                role: membership.role,
            });
        }

        Ok(access)
    }

    async fn list_site_members(
        &self,
        site_id: Uuid,
        page: PageRequest,
    ) -> ImsResult<Page<Membership>> {
        let site_id_str = site_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM membership \
                 WHERE site_id = $site_id GROUP ALL",
            )
            .bind(("site_id", site_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT * FROM membership \
                 WHERE site_id = $site_id \
                 ORDER BY assigned_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("site_id", site_id_str))
            .bind(("limit", page.page_size()))
            .bind(("offset", page.offset()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_membership())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(items, total, page))
    }

    async fn admin_count(&self, site_id: Uuid) -> ImsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM membership \
                 WHERE site_id = $site_id AND role = 'Admin' GROUP ALL",
            )
            .bind(("site_id", site_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn count_by_site(&self, site_id: Uuid) -> ImsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM membership \
                 WHERE site_id = $site_id GROUP ALL",
            )
            .bind(("site_id", site_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
