//! SurrealDB implementation of [`SiteRepository`].

use chrono::{DateTime, Utc};
use ims_core::error::ImsResult;
use ims_core::models::site::{CreateSite, Site, UpdateSite};
use ims_core::repository::{Page, PageRequest, SiteRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, is_unique_violation};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct SiteRow {
    name: String,
    description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SiteRow {
    fn into_site(self, id: Uuid) -> Site {
        Site {
            id,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct SiteRowWithId {
    record_id: String,
    name: String,
    description: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SiteRowWithId {
    fn try_into_site(self) -> Result<Site, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        Ok(Site {
            id,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Site repository.
#[derive(Clone)]
pub struct SurrealSiteRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSiteRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SiteRepository for SurrealSiteRepository<C> {
    async fn create_with_admin(&self, input: CreateSite, admin_user_id: Uuid) -> ImsResult<Site> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // Site and the creator's Admin membership are created in one
        // transaction — a site must never exist with zero members.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('site', $id) SET \
                 name = $name, description = $description, \
                 is_active = true; \
                 CREATE membership SET \
                 user_id = $admin_user_id, site_id = $id, \
                 role = 'Admin'; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description))
            .bind(("admin_user_id", admin_user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    message: format!("site with name '{}' already exists", input.name),
                }
            } else {
                DbError::Query(e.to_string())
            }
        })?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ImsResult<Site> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('site', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: id_str,
        })?;

        Ok(row.into_site(id))
    }

    async fn get_by_name(&self, name: &str) -> ImsResult<Site> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM site \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_site()?)
    }

    async fn update(&self, id: Uuid, input: UpdateSite) -> ImsResult<Site> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('site', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| {
            if is_unique_violation(&e) {
                DbError::Conflict {
                    message: "site name already exists".into(),
                }
            } else {
                DbError::Query(e.to_string())
            }
        })?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "site".into(),
            id: id_str,
        })?;

        Ok(row.into_site(id))
    }

    async fn deactivate(&self, id: Uuid) -> ImsResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('site', $id) SET \
                 is_active = false, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "site".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> ImsResult<()> {
        self.db
            .query("DELETE type::record('site', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, page: PageRequest, active_only: bool) -> ImsResult<Page<Site>> {
        let filter = if active_only {
            "WHERE is_active = true "
        } else {
            ""
        };

        let count_query = format!("SELECT count() AS total FROM site {filter}GROUP ALL");
        let mut count_result = self.db.query(&count_query).await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM site {filter}\
             ORDER BY name ASC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("limit", page.page_size()))
            .bind(("offset", page.offset()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SiteRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_site())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(items, total, page))
    }
}
