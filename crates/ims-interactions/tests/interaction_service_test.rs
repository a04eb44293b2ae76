//! Integration tests for the interaction service: validation wiring,
//! audit stamping, and site-scoped access through a request context.

use chrono::{TimeZone, Utc};
use ims_core::context::{RequestContext, SiteContext};
use ims_core::error::ImsError;
use ims_core::models::interaction::{CreateInteraction, UpdateInteraction};
use ims_core::models::user::{CreateUser, User};
use ims_core::repository::{InteractionFilter, PageRequest, Sort, UserRepository};
use ims_db::repository::{SurrealInteractionRepository, SurrealUserRepository};
use ims_interactions::InteractionService;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Fixture {
    service: InteractionService<SurrealInteractionRepository<Db>>,
    alice: User,
    site_id: Uuid,
}

impl Fixture {
    /// Alice's context, scoped to her one site.
    fn ctx(&self) -> RequestContext {
        RequestContext {
            user: self.alice.clone(),
            site: SiteContext::single(self.site_id),
        }
    }

    /// A context for the same user pinned to a different site.
    fn foreign_ctx(&self) -> RequestContext {
        RequestContext {
            user: self.alice.clone(),
            site: SiteContext::single(Uuid::new_v4()),
        }
    }
}

/// Spin up in-memory DB, run migrations, create a user and a site id.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ims_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let alice = users
        .create(CreateUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "Str0ng!Passw0rd".into(),
        })
        .await
        .unwrap();

    Fixture {
        service: InteractionService::new(SurrealInteractionRepository::new(db)),
        alice,
        site_id: Uuid::new_v4(),
    }
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
        description: None,
        notes: None,
    }
}

#[tokio::test]
async fn create_then_fetch_round_trips() {
    let f = setup().await;
    let ctx = f.ctx();

    let created = f.service.create(&ctx, meeting("Kickoff")).await.unwrap();
    // Server-side fields come from the context, not the payload.
    assert_eq!(created.site_id, f.site_id);
    assert_eq!(created.created_by, f.alice.id);

    let fetched = f.service.get(&ctx, created.id).await.unwrap();
    assert_eq!(fetched.title, "Kickoff");
    assert_eq!(fetched.lead, "Dana Smith");
    assert_eq!(fetched.start_datetime, created.start_datetime);
    assert_eq!(fetched.timezone, "America/New_York");
    assert_eq!(fetched.site_id, f.site_id);
}

#[tokio::test]
async fn invalid_payload_is_rejected_with_every_error() {
    let f = setup().await;
    let ctx = f.ctx();

    let input = CreateInteraction {
        title: String::new(),
        end_datetime: Some(Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap()),
        ..meeting("ignored")
    };

    let Err(ImsError::Validation { errors }) = f.service.create(&ctx, input).await else {
        panic!("expected validation failure");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, ["title", "end_datetime"]);
}

#[tokio::test]
async fn end_before_start_cites_end_datetime() {
    let f = setup().await;
    let ctx = f.ctx();

    let input = CreateInteraction {
        start_datetime: Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap(),
        end_datetime: Some(Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap()),
        ..meeting("Backwards")
    };

    let Err(ImsError::Validation { errors }) = f.service.create(&ctx, input).await else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "end_datetime");
}

#[tokio::test]
async fn records_in_other_sites_read_as_missing() {
    let f = setup().await;
    let ctx = f.ctx();

    let record = f.service.create(&ctx, meeting("Private")).await.unwrap();

    let foreign = f.foreign_ctx();
    let get = f.service.get(&foreign, record.id).await;
    assert!(matches!(get, Err(ImsError::NotFound { .. })));

    let update = f
        .service
        .update(
            &foreign,
            record.id,
            UpdateInteraction {
                title: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(update, Err(ImsError::NotFound { .. })));

    let delete = f.service.delete(&foreign, record.id).await;
    assert!(matches!(delete, Err(ImsError::NotFound { .. })));

    // Nothing leaked into the foreign listing either.
    let listing = f
        .service
        .list(&foreign, PageRequest::default(), Sort::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn update_is_partial_and_stamps_audit_fields() {
    let f = setup().await;
    let ctx = f.ctx();

    let created = f.service.create(&ctx, meeting("Original")).await.unwrap();
    let updated = f
        .service
        .update(
            &ctx,
            created.id,
            UpdateInteraction {
                notes: Some(Some("Follow up with vendor".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.notes.as_deref(), Some("Follow up with vendor"));
    assert_eq!(updated.title, "Original"); // untouched
    assert_eq!(updated.updated_by, Some(f.alice.id));
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn partial_update_cannot_invert_the_date_range() {
    let f = setup().await;
    let ctx = f.ctx();

    let created = f.service.create(&ctx, meeting("Scheduled")).await.unwrap();
    let result = f
        .service
        .update(
            &ctx,
            created.id,
            UpdateInteraction {
                start_datetime: Some(Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .await;

    let Err(ImsError::Validation { errors }) = result else {
        panic!("expected validation failure");
    };
    assert_eq!(errors[0].field, "end_datetime");
}

#[tokio::test]
async fn search_goes_through_the_context_scope() {
    let f = setup().await;
    let ctx = f.ctx();

    f.service.create(&ctx, meeting("Budget review")).await.unwrap();
    f.service.create(&ctx, meeting("Social hour")).await.unwrap();

    let hits = f
        .service
        .search(
            &ctx,
            InteractionFilter {
                search: Some("budget".into()),
                ..Default::default()
            },
            PageRequest::default(),
            Sort::default(),
        )
        .await
        .unwrap();
    assert_eq!(hits.total, 1);
    assert_eq!(hits.items[0].title, "Budget review");

    let all = f
        .service
        .list(&ctx, PageRequest::default(), Sort::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
}
