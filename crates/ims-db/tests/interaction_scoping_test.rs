//! Integration tests for the Interaction repository, centered on
//! site-scoping: a record outside the caller's allowed sites must be
//! indistinguishable from one that does not exist.

use chrono::{TimeZone, Utc};
use ims_core::error::ImsError;
use ims_core::models::interaction::{CreateInteraction, UpdateInteraction};
use ims_core::repository::{
    InteractionFilter, InteractionRepository, PageRequest, Sort, SortDirection, SortField,
};
use ims_db::repository::SurrealInteractionRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ims_db::run_migrations(&db).await.unwrap();
    db
}

fn meeting(title: &str) -> CreateInteraction {
    CreateInteraction {
        title: title.into(),
        kind: "Meeting".into(),
        lead: "Dana Smith".into(),
        start_datetime: Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap(),
        end_datetime: Some(Utc.with_ymd_and_hms(2023, 1, 1, 11, 0, 0).unwrap()),
        timezone: "America/New_York".into(),
        location: Some("Room 4".into()),
        description: Some("Quarterly planning".into()),
        notes: None,
    }
}

#[tokio::test]
async fn create_populates_server_side_fields() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let created = repo.create(site_id, user_id, meeting("Kickoff")).await.unwrap();
    assert_eq!(created.site_id, site_id);
    assert_eq!(created.created_by, user_id);
    assert!(created.updated_by.is_none());
    assert!(created.updated_at.is_none());

    // Round-trip within the same site context returns equal fields.
    let fetched = repo.get_by_id(&[site_id], created.id).await.unwrap();
    assert_eq!(fetched.title, "Kickoff");
    assert_eq!(fetched.kind.as_str(), "Meeting");
    assert_eq!(fetched.lead, "Dana Smith");
    assert_eq!(fetched.start_datetime, created.start_datetime);
    assert_eq!(fetched.end_datetime, created.end_datetime);
    assert_eq!(fetched.timezone, "America/New_York");
    assert_eq!(fetched.location.as_deref(), Some("Room 4"));
    assert_eq!(fetched.site_id, site_id);
    assert_eq!(fetched.created_by, user_id);
}

#[tokio::test]
async fn record_outside_scope_reads_as_missing() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_a = Uuid::new_v4();
    let site_b = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let record = repo.create(site_a, user_id, meeting("Private")).await.unwrap();

    // Get, update, delete with a scope that excludes the record's
    // site: all identical to "does not exist".
    let get = repo.get_by_id(&[site_b], record.id).await;
    assert!(matches!(get, Err(ImsError::NotFound { .. })));

    let update = repo
        .update(
            &[site_b],
            record.id,
            user_id,
            UpdateInteraction {
                title: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(ImsError::NotFound { .. })));

    let delete = repo.delete(&[site_b], record.id).await;
    assert!(matches!(delete, Err(ImsError::NotFound { .. })));

    // The record is untouched and still visible in its own site.
    let intact = repo.get_by_id(&[site_a], record.id).await.unwrap();
    assert_eq!(intact.title, "Private");

    // An empty scope sees nothing at all.
    let nothing = repo.get_by_id(&[], record.id).await;
    assert!(matches!(nothing, Err(ImsError::NotFound { .. })));
}

#[tokio::test]
async fn search_is_intersected_with_the_site_filter() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_a = Uuid::new_v4();
    let site_b = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    repo.create(site_a, user_id, meeting("Alpha sync")).await.unwrap();
    repo.create(site_a, user_id, meeting("Beta sync")).await.unwrap();
    repo.create(site_b, user_id, meeting("Alpha sync")).await.unwrap();

    // A title filter matching records in both sites only surfaces the
    // in-scope one.
    let page = repo
        .search(
            &[site_a],
            InteractionFilter {
                title: Some("alpha".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].site_id, site_a);

    // Multi-site scope is the general case.
    let both = repo
        .search(
            &[site_a, site_b],
            InteractionFilter {
                title: Some("alpha".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(both.total, 2);
}

#[tokio::test]
async fn filters_compose_with_and_semantics() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    repo.create(site_id, user_id, meeting("Planning session")).await.unwrap();
    repo.create(
        site_id,
        user_id,
        CreateInteraction {
            kind: "Call".into(),
            lead: "Robin Jones".into(),
            ..meeting("Planning call")
        },
    )
    .await
    .unwrap();

    // title AND type must both match.
    let page = repo
        .search(
            &[site_id],
            InteractionFilter {
                title: Some("planning".into()),
                kind: Some("Call".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].lead, "Robin Jones");

    // Substring match is case-insensitive.
    let ci = repo
        .search(
            &[site_id],
            InteractionFilter {
                lead: Some("ROBIN".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(ci.total, 1);

    // Date range narrows on start_datetime.
    let out_of_range = repo
        .search(
            &[site_id],
            InteractionFilter {
                start_from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(out_of_range.total, 0);
}

#[tokio::test]
async fn generic_search_spans_text_fields() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    repo.create(site_id, user_id, meeting("Budget review")).await.unwrap();
    repo.create(
        site_id,
        user_id,
        CreateInteraction {
            description: Some("Discuss budget overruns".into()),
            ..meeting("Town hall")
        },
    )
    .await
    .unwrap();
    repo.create(site_id, user_id, meeting("Social hour")).await.unwrap();

    let page = repo
        .search(
            &[site_id],
            InteractionFilter {
                search: Some("budget".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    // Matches the title of one and the description of another.
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn pagination_beyond_last_page_is_empty_not_an_error() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    for i in 0..3 {
        repo.create(site_id, user_id, meeting(&format!("Session {i}")))
            .await
            .unwrap();
    }

    let page = repo
        .search(
            &[site_id],
            InteractionFilter::default(),
            PageRequest::new(9, 10),
            Sort::default(),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next);
}

#[tokio::test]
async fn sorting_respects_field_and_direction() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    for title in ["Charlie", "Alpha", "Bravo"] {
        repo.create(site_id, user_id, meeting(title)).await.unwrap();
    }

    let asc = repo
        .search(
            &[site_id],
            InteractionFilter::default(),
            PageRequest::default(),
            Sort {
                field: SortField::Title,
                direction: SortDirection::Asc,
            },
        )
        .await
        .unwrap();
    let titles: Vec<_> = asc.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Bravo", "Charlie"]);

    let desc = repo
        .search(
            &[site_id],
            InteractionFilter::default(),
            PageRequest::default(),
            Sort {
                field: SortField::Title,
                direction: SortDirection::Desc,
            },
        )
        .await
        .unwrap();
    let titles: Vec<_> = desc.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Charlie", "Bravo", "Alpha"]);
}

#[tokio::test]
async fn update_stamps_audit_fields_and_keeps_the_rest() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let author = Uuid::new_v4();
    let editor = Uuid::new_v4();

    let created = repo.create(site_id, author, meeting("Original")).await.unwrap();

    let updated = repo
        .update(
            &[site_id],
            created.id,
            editor,
            UpdateInteraction {
                title: Some("Renamed".into()),
                end_datetime: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert!(updated.end_datetime.is_none()); // explicitly cleared
    assert_eq!(updated.lead, created.lead); // untouched
    assert_eq!(updated.site_id, site_id); // immutable
    assert_eq!(updated.created_by, author);
    assert_eq!(updated.updated_by, Some(editor));
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn delete_removes_within_scope() {
    let db = setup().await;
    let repo = SurrealInteractionRepository::new(db);
    let site_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let record = repo.create(site_id, user_id, meeting("Ephemeral")).await.unwrap();
    assert_eq!(repo.count_by_site(site_id).await.unwrap(), 1);

    repo.delete(&[site_id], record.id).await.unwrap();
    assert_eq!(repo.count_by_site(site_id).await.unwrap(), 0);

    let gone = repo.get_by_id(&[site_id], record.id).await;
    assert!(matches!(gone, Err(ImsError::NotFound { .. })));
}
