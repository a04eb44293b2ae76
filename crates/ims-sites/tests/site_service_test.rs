//! Integration tests for the site administration service.

use ims_core::error::ImsError;
use ims_core::models::membership::SiteRole;
use ims_core::models::site::{CreateSite, UpdateSite};
use ims_core::repository::{InteractionRepository, PageRequest};
use ims_db::repository::{
    SurrealInteractionRepository, SurrealMembershipRepository, SurrealSiteRepository,
};
use ims_sites::SiteService;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type TestSiteService = SiteService<
    SurrealSiteRepository<Db>,
    SurrealMembershipRepository<Db>,
    SurrealInteractionRepository<Db>,
>;

/// Spin up in-memory DB and build the service.
async fn setup() -> (TestSiteService, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    ims_db::run_migrations(&db).await.unwrap();

    let service = SiteService::new(
        SurrealSiteRepository::new(db.clone()),
        SurrealMembershipRepository::new(db.clone()),
        SurrealInteractionRepository::new(db.clone()),
    );
    (service, db)
}

fn headquarters() -> CreateSite {
    CreateSite {
        name: "Headquarters".into(),
        description: "Main office".into(),
    }
}

#[tokio::test]
async fn create_site_rejects_duplicates_and_blank_names() {
    let (service, _db) = setup().await;
    let actor = Uuid::new_v4();

    service.create_site(actor, headquarters()).await.unwrap();

    let duplicate = service.create_site(actor, headquarters()).await;
    assert!(matches!(duplicate, Err(ImsError::Conflict { .. })));

    let blank = service
        .create_site(
            actor,
            CreateSite {
                name: "   ".into(),
                description: String::new(),
            },
        )
        .await;
    assert!(matches!(blank, Err(ImsError::Validation { .. })));
}

#[tokio::test]
async fn creator_is_the_first_admin() {
    let (service, _db) = setup().await;
    let actor = Uuid::new_v4();

    let site = service.create_site(actor, headquarters()).await.unwrap();
    assert!(service.is_site_admin(actor, site.id).await.unwrap());
    service.ensure_site_admin(actor, site.id).await.unwrap();

    let outsider = Uuid::new_v4();
    assert!(!service.is_site_admin(outsider, site.id).await.unwrap());
    let denied = service.ensure_site_admin(outsider, site.id).await;
    assert!(matches!(denied, Err(ImsError::AuthorizationDenied { .. })));
}

#[tokio::test]
async fn rename_conflicts_are_detected() {
    let (service, _db) = setup().await;
    let actor = Uuid::new_v4();

    let site = service.create_site(actor, headquarters()).await.unwrap();
    service
        .create_site(
            actor,
            CreateSite {
                name: "Annex".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let clash = service
        .update_site(
            site.id,
            UpdateSite {
                name: Some("Annex".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(clash, Err(ImsError::Conflict { .. })));

    // Renaming to its own current name is fine.
    let same = service
        .update_site(
            site.id,
            UpdateSite {
                name: Some("Headquarters".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(same.is_ok());
}

#[tokio::test]
async fn soft_delete_keeps_data_and_hides_the_site() {
    let (service, _db) = setup().await;
    let actor = Uuid::new_v4();

    let site = service.create_site(actor, headquarters()).await.unwrap();
    service.delete_site(site.id, false).await.unwrap();

    let fetched = service.get_site(site.id).await.unwrap();
    assert!(!fetched.is_active);

    let listed = service
        .list_sites(PageRequest::default(), true)
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn hard_delete_requires_no_remaining_references() {
    let (service, db) = setup().await;
    let actor = Uuid::new_v4();

    let site = service.create_site(actor, headquarters()).await.unwrap();

    // Memberships still reference the site (the creator's own).
    let with_members = service.delete_site(site.id, true).await;
    assert!(matches!(with_members, Err(ImsError::Conflict { .. })));

    let interactions = SurrealInteractionRepository::new(db.clone());
    let record = interactions
        .create(
            site.id,
            actor,
            ims_core::models::interaction::CreateInteraction {
                title: "Kickoff".into(),
                kind: "Meeting".into(),
                lead: "Dana".into(),
                start_datetime: chrono::Utc::now(),
                end_datetime: None,
                timezone: "UTC".into(),
                location: None,
                description: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    // The last-admin guard keeps at least one membership alive, so to
    // exercise the interaction check the memberships are cleared out
    // of band, the way an operator script would.
    db.query("DELETE membership WHERE site_id = $site_id")
        .bind(("site_id", site.id.to_string()))
        .await
        .unwrap();

    let with_interactions = service.delete_site(site.id, true).await;
    assert!(matches!(with_interactions, Err(ImsError::Conflict { .. })));

    // With every reference gone the hard delete goes through.
    interactions.delete(&[site.id], record.id).await.unwrap();
    service.delete_site(site.id, true).await.unwrap();

    let gone = service.get_site(site.id).await;
    assert!(matches!(gone, Err(ImsError::NotFound { .. })));
}

#[tokio::test]
async fn membership_lifecycle_via_the_service() {
    let (service, _db) = setup().await;
    let actor = Uuid::new_v4();
    let member = Uuid::new_v4();

    let site = service.create_site(actor, headquarters()).await.unwrap();

    // Idempotent add: same pair twice, role updated the second time.
    service
        .add_member(site.id, member, SiteRole::User)
        .await
        .unwrap();
    let upserted = service
        .add_member(site.id, member, SiteRole::Admin)
        .await
        .unwrap();
    assert_eq!(upserted.role, SiteRole::Admin);

    let members = service
        .site_members(site.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(members.total, 2);

    // Adding to a nonexistent site fails up front.
    let ghost_site = service
        .add_member(Uuid::new_v4(), member, SiteRole::User)
        .await;
    assert!(matches!(ghost_site, Err(ImsError::NotFound { .. })));

    // Demote the extra admin, then remove them.
    service
        .change_role(site.id, member, SiteRole::User)
        .await
        .unwrap();
    service.remove_member(site.id, member).await.unwrap();

    // The creator is now the last admin again.
    let last = service.remove_member(site.id, actor).await;
    assert!(matches!(last, Err(ImsError::Conflict { .. })));

    let access = service.user_sites(actor).await.unwrap();
    assert_eq!(access.len(), 1);
    assert_eq!(access[0].role, SiteRole::Admin);
}
