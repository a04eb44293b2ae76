//! IMS Server — application entry point.

mod config;

use ims_auth::AuthService;
use ims_db::DbManager;
use ims_db::repository::{
    SurrealInteractionRepository, SurrealMembershipRepository, SurrealSecurityStore,
    SurrealSiteRepository, SurrealUserRepository,
};
use ims_interactions::InteractionService;
use ims_sites::SiteService;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() {
    // Load a local .env if present; real deployments set the
    // environment directly.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ims=info".parse().unwrap()))
        .json()
        .init();

    tracing::info!("Starting IMS server...");

    let config = ServerConfig::from_env();

    let manager = match DbManager::connect(&config.db).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    let db = manager.client().clone();
    if let Err(e) = ims_db::run_migrations(&db).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let user_repo = match &config.auth.pepper {
        Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper.clone()),
        None => SurrealUserRepository::new(db.clone()),
    };
    let site_repo = SurrealSiteRepository::new(db.clone());
    let membership_repo = SurrealMembershipRepository::new(db.clone());
    let interaction_repo = SurrealInteractionRepository::new(db.clone());
    let security_store = SurrealSecurityStore::new(db.clone());

    let _auth_service = AuthService::new(
        user_repo,
        membership_repo.clone(),
        security_store,
        config.auth.clone(),
    );
    let _site_service = SiteService::new(
        site_repo,
        membership_repo,
        SurrealInteractionRepository::new(db.clone()),
    );
    let _interaction_service = InteractionService::new(interaction_repo);

    tracing::info!("IMS server initialized");

    // TODO: wire the HTTP serving layer to the services above

    tracing::info!("IMS server stopped.");
}
