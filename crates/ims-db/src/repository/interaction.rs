//! SurrealDB implementation of [`InteractionRepository`].
//!
//! Every read and mutation is intersected with
//! `site_id IN $allowed_site_ids` before any client-supplied filter.
//! A record outside the allowed set produces the same `NotFound`
//! outcome as a record that does not exist.

use chrono::{DateTime, Utc};
use ims_core::error::ImsResult;
use ims_core::models::interaction::{
    CreateInteraction, Interaction, InteractionKind, UpdateInteraction,
};
use ims_core::repository::{InteractionFilter, InteractionRepository, Page, PageRequest, Sort};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct InteractionRow {
    site_id: String,
    title: String,
    kind: String,
    lead: String,
    start_datetime: DateTime<Utc>,
    end_datetime: Option<DateTime<Utc>>,
    timezone: String,
    location: Option<String>,
    description: Option<String>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

fn parse_kind(s: &str) -> Result<InteractionKind, DbError> {
    InteractionKind::parse(s).ok_or_else(|| DbError::Query(format!("unknown interaction kind: {s}")))
}

impl InteractionRow {
    fn try_into_interaction(self, id: Uuid) -> Result<Interaction, DbError> {
        let site_id = Uuid::parse_str(&self.site_id)
            .map_err(|e| DbError::Query(format!("invalid site UUID: {e}")))?;
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
        let updated_by = self
            .updated_by
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| DbError::Query(format!("invalid user UUID: {e}")))?;
        Ok(Interaction {
            id,
            site_id,
            title: self.title,
            kind: parse_kind(&self.kind)?,
            lead: self.lead,
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
            timezone: self.timezone,
            location: self.location,
            description: self.description,
            notes: self.notes,
            created_by,
            created_at: self.created_at,
            updated_by,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct InteractionRowWithId {
    record_id: String,
    site_id: String,
    title: String,
    kind: String,
    lead: String,
    start_datetime: DateTime<Utc>,
    end_datetime: Option<DateTime<Utc>>,
    timezone: String,
    location: Option<String>,
    description: Option<String>,
    notes: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl InteractionRowWithId {
    fn try_into_interaction(self) -> Result<Interaction, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let row = InteractionRow {
            site_id: self.site_id,
            title: self.title,
            kind: self.kind,
            lead: self.lead,
            start_datetime: self.start_datetime,
            end_datetime: self.end_datetime,
            timezone: self.timezone,
            location: self.location,
            description: self.description,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_by: self.updated_by,
            updated_at: self.updated_at,
        };
        row.try_into_interaction(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// WHERE clauses for a search. The site-scoping clause is always the
/// first entry; client filters only ever narrow the result further.
fn filter_clauses(filter: &InteractionFilter) -> Vec<&'static str> {
    let mut clauses = vec!["site_id IN $allowed_site_ids"];
    if filter.title.is_some() {
        clauses.push("string::lowercase(title) CONTAINS $title");
    }
    if filter.kind.is_some() {
        clauses.push("kind = $kind");
    }
    if filter.lead.is_some() {
        clauses.push("string::lowercase(lead) CONTAINS $lead");
    }
    if filter.location.is_some() {
        clauses.push("string::lowercase(location ?? '') CONTAINS $location");
    }
    if filter.description.is_some() {
        clauses.push("string::lowercase(description ?? '') CONTAINS $description");
    }
    if filter.notes.is_some() {
        clauses.push("string::lowercase(notes ?? '') CONTAINS $notes");
    }
    if filter.timezone.is_some() {
        clauses.push("timezone = $timezone");
    }
    if filter.start_from.is_some() {
        clauses.push("start_datetime >= $start_from");
    }
    if filter.start_until.is_some() {
        clauses.push("start_datetime <= $start_until");
    }
    if filter.search.is_some() {
        clauses.push(
            "(string::lowercase(title) CONTAINS $search \
             OR string::lowercase(lead) CONTAINS $search \
             OR string::lowercase(kind) CONTAINS $search \
             OR string::lowercase(location ?? '') CONTAINS $search \
             OR string::lowercase(description ?? '') CONTAINS $search \
             OR string::lowercase(notes ?? '') CONTAINS $search)",
        );
    }
    clauses
}

/// Bind the allowed-site list and any present filter values.
/// Substring filters are lowercased to match the query side.
fn bind_filters<'a, C: Connection>(
    mut builder: surrealdb::method::Query<'a, C>,
    allowed_site_ids: &[Uuid],
    filter: &InteractionFilter,
) -> surrealdb::method::Query<'a, C> {
    let allowed: Vec<String> = allowed_site_ids.iter().map(|id| id.to_string()).collect();
    builder = builder.bind(("allowed_site_ids", allowed));

    if let Some(title) = &filter.title {
        builder = builder.bind(("title", title.to_lowercase()));
    }
    if let Some(kind) = &filter.kind {
        builder = builder.bind(("kind", kind.clone()));
    }
    if let Some(lead) = &filter.lead {
        builder = builder.bind(("lead", lead.to_lowercase()));
    }
    if let Some(location) = &filter.location {
        builder = builder.bind(("location", location.to_lowercase()));
    }
    if let Some(description) = &filter.description {
        builder = builder.bind(("description", description.to_lowercase()));
    }
    if let Some(notes) = &filter.notes {
        builder = builder.bind(("notes", notes.to_lowercase()));
    }
    if let Some(timezone) = &filter.timezone {
        builder = builder.bind(("timezone", timezone.clone()));
    }
    if let Some(start_from) = filter.start_from {
        builder = builder.bind(("start_from", start_from));
    }
    if let Some(start_until) = filter.start_until {
        builder = builder.bind(("start_until", start_until));
    }
    if let Some(search) = &filter.search {
        builder = builder.bind(("search", search.to_lowercase()));
    }

    builder
}

/// SurrealDB implementation of the Interaction repository.
#[derive(Clone)]
pub struct SurrealInteractionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInteractionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> InteractionRepository for SurrealInteractionRepository<C> {
    async fn create(
        &self,
        site_id: Uuid,
        user_id: Uuid,
        input: CreateInteraction,
    ) -> ImsResult<Interaction> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('interaction', $id) SET \
                 site_id = $site_id, \
                 title = $title, kind = $kind, lead = $lead, \
                 start_datetime = $start_datetime, \
                 end_datetime = $end_datetime, \
                 timezone = $timezone, \
                 location = $location, \
                 description = $description, \
                 notes = $notes, \
                 created_by = $created_by, \
                 updated_by = NONE, \
                 updated_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("site_id", site_id.to_string()))
            .bind(("title", input.title))
            .bind(("kind", input.kind))
            .bind(("lead", input.lead))
            .bind(("start_datetime", input.start_datetime))
            .bind(("end_datetime", input.end_datetime))
            .bind(("timezone", input.timezone))
            .bind(("location", input.location))
            .bind(("description", input.description))
            .bind(("notes", input.notes))
            .bind(("created_by", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InteractionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interaction".into(),
            id: id_str,
        })?;

        Ok(row.try_into_interaction(id)?)
    }

    async fn get_by_id(&self, allowed_site_ids: &[Uuid], id: Uuid) -> ImsResult<Interaction> {
        let id_str = id.to_string();
        let allowed: Vec<String> = allowed_site_ids.iter().map(|s| s.to_string()).collect();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('interaction', $id) \
                 WHERE site_id IN $allowed_site_ids",
            )
            .bind(("id", id_str.clone()))
            .bind(("allowed_site_ids", allowed))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InteractionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interaction".into(),
            id: id_str,
        })?;

        Ok(row.try_into_interaction(id)?)
    }

    async fn update(
        &self,
        allowed_site_ids: &[Uuid],
        id: Uuid,
        user_id: Uuid,
        input: UpdateInteraction,
    ) -> ImsResult<Interaction> {
        let id_str = id.to_string();
        let allowed: Vec<String> = allowed_site_ids.iter().map(|s| s.to_string()).collect();

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.kind.is_some() {
            sets.push("kind = $kind");
        }
        if input.lead.is_some() {
            sets.push("lead = $lead");
        }
        if input.start_datetime.is_some() {
            sets.push("start_datetime = $start_datetime");
        }
        if input.end_datetime.is_some() {
            sets.push("end_datetime = $end_datetime");
        }
        if input.timezone.is_some() {
            sets.push("timezone = $timezone");
        }
        if input.location.is_some() {
            sets.push("location = $location");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        // Audit fields are stamped unconditionally, never taken from
        // the client payload.
        sets.push("updated_by = $updated_by");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('interaction', $id) SET {} \
             WHERE site_id IN $allowed_site_ids",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("allowed_site_ids", allowed))
            .bind(("updated_by", user_id.to_string()));

        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(kind) = input.kind {
            builder = builder.bind(("kind", kind));
        }
        if let Some(lead) = input.lead {
            builder = builder.bind(("lead", lead));
        }
        if let Some(start_datetime) = input.start_datetime {
            builder = builder.bind(("start_datetime", start_datetime));
        }
        if let Some(end_datetime) = input.end_datetime {
            // Option<Option<_>>: Some(None) clears the field.
            builder = builder.bind(("end_datetime", end_datetime));
        }
        if let Some(timezone) = input.timezone {
            builder = builder.bind(("timezone", timezone));
        }
        if let Some(location) = input.location {
            builder = builder.bind(("location", location));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<InteractionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "interaction".into(),
            id: id_str,
        })?;

        Ok(row.try_into_interaction(id)?)
    }

    async fn delete(&self, allowed_site_ids: &[Uuid], id: Uuid) -> ImsResult<()> {
        let id_str = id.to_string();
        let allowed: Vec<String> = allowed_site_ids.iter().map(|s| s.to_string()).collect();

        let mut result = self
            .db
            .query(
                "DELETE type::record('interaction', $id) \
                 WHERE site_id IN $allowed_site_ids \
                 RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("allowed_site_ids", allowed))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InteractionRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "interaction".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }

    async fn search(
        &self,
        allowed_site_ids: &[Uuid],
        filter: InteractionFilter,
        page: PageRequest,
        sort: Sort,
    ) -> ImsResult<Page<Interaction>> {
        let clauses = filter_clauses(&filter);
        let where_clause = clauses.join(" AND ");

        let count_query =
            format!("SELECT count() AS total FROM interaction WHERE {where_clause} GROUP ALL");
        let builder = self.db.query(&count_query);
        let mut count_result = bind_filters(builder, allowed_site_ids, &filter)
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        // Sort column and direction come from allow-list enums, never
        // from raw client input.
        let select_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM interaction \
             WHERE {where_clause} \
             ORDER BY {} {} \
             LIMIT $limit START $offset",
            sort.field.column(),
            sort.direction.keyword(),
        );
        let builder = self
            .db
            .query(&select_query)
            .bind(("limit", page.page_size()))
            .bind(("offset", page.offset()));
        let mut result = bind_filters(builder, allowed_site_ids, &filter)
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InteractionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_interaction())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Page::new(items, total, page))
    }

    async fn count_by_site(&self, site_id: Uuid) -> ImsResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM interaction \
                 WHERE site_id = $site_id GROUP ALL",
            )
            .bind(("site_id", site_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
