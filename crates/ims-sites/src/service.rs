//! Site administration service.
//!
//! Business rules live here; the hard invariants (unique site name,
//! unique membership pair, last-admin guard) are additionally enforced
//! transactionally in the repositories, so a concurrent writer cannot
//! slip between a check and its mutation.

use ims_core::error::{ImsError, ImsResult};
use ims_core::models::membership::{Membership, SiteAccess, SiteRole};
use ims_core::models::site::{CreateSite, Site, UpdateSite};
use ims_core::repository::{
    InteractionRepository, MembershipRepository, Page, PageRequest, SiteRepository,
};
use uuid::Uuid;

/// Service implementing site management and membership
/// administration.
pub struct SiteService<S, M, I>
where
    S: SiteRepository,
    M: MembershipRepository,
    I: InteractionRepository,
{
    site_repo: S,
    membership_repo: M,
    interaction_repo: I,
}

impl<S, M, I> SiteService<S, M, I>
where
    S: SiteRepository,
    M: MembershipRepository,
    I: InteractionRepository,
{
    pub fn new(site_repo: S, membership_repo: M, interaction_repo: I) -> Self {
        Self {
            site_repo,
            membership_repo,
            interaction_repo,
        }
    }

    /// Create a site. The creating user becomes its first Admin in
    /// the same transaction — a site never exists with zero members.
    pub async fn create_site(&self, actor_id: Uuid, input: CreateSite) -> ImsResult<Site> {
        if input.name.trim().is_empty() {
            return Err(ImsError::Validation {
                errors: vec![ims_core::error::FieldError::new("name", "is required")],
            });
        }

        // Fast-path duplicate check; the unique index still backstops
        // a concurrent create.
        if self.site_repo.get_by_name(&input.name).await.is_ok() {
            return Err(ImsError::Conflict {
                message: format!("site with name '{}' already exists", input.name),
            });
        }

        let site = self.site_repo.create_with_admin(input, actor_id).await?;

        tracing::info!(
            site_id = %site.id,
            name = %site.name,
            created_by = %actor_id,
            "Site created"
        );

        Ok(site)
    }

    pub async fn get_site(&self, site_id: Uuid) -> ImsResult<Site> {
        self.site_repo.get_by_id(site_id).await
    }

    pub async fn get_site_by_name(&self, name: &str) -> ImsResult<Site> {
        self.site_repo.get_by_name(name).await
    }

    pub async fn update_site(&self, site_id: Uuid, input: UpdateSite) -> ImsResult<Site> {
        if let Some(new_name) = &input.name {
            match self.site_repo.get_by_name(new_name).await {
                Ok(existing) if existing.id != site_id => {
                    return Err(ImsError::Conflict {
                        message: format!("site with name '{new_name}' already exists"),
                    });
                }
                Ok(_) | Err(ImsError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let site = self.site_repo.update(site_id, input).await?;
        tracing::info!(site_id = %site.id, "Site updated");
        Ok(site)
    }

    /// List sites; inactive sites are excluded unless asked for.
    pub async fn list_sites(&self, page: PageRequest, active_only: bool) -> ImsResult<Page<Site>> {
        self.site_repo.list(page, active_only).await
    }

    /// Soft delete marks the site inactive and keeps its data. Hard
    /// delete is refused while memberships or interactions still
    /// reference the site.
    pub async fn delete_site(&self, site_id: Uuid, hard: bool) -> ImsResult<()> {
        let site = self.site_repo.get_by_id(site_id).await?;

        if !hard {
            self.site_repo.deactivate(site_id).await?;
            tracing::info!(site_id = %site.id, "Site marked inactive");
            return Ok(());
        }

        let members = self.membership_repo.count_by_site(site_id).await?;
        if members > 0 {
            return Err(ImsError::Conflict {
                message: format!("site has {members} member(s); remove them first"),
            });
        }

        let interactions = self.interaction_repo.count_by_site(site_id).await?;
        if interactions > 0 {
            return Err(ImsError::Conflict {
                message: format!("site has {interactions} interaction(s); delete them first"),
            });
        }

        self.site_repo.delete(site_id).await?;
        tracing::info!(site_id = %site.id, name = %site.name, "Site hard deleted");
        Ok(())
    }

    /// Add a user to a site, or update their role if the pair already
    /// exists (idempotent).
    pub async fn add_member(
        &self,
        site_id: Uuid,
        user_id: Uuid,
        role: SiteRole,
    ) -> ImsResult<Membership> {
        // Memberships must reference an existing site.
        self.site_repo.get_by_id(site_id).await?;

        let membership = self.membership_repo.upsert(user_id, site_id, role).await?;

        tracing::info!(
            target: "ims::security",
            event = "member_added",
            site_id = %site_id,
            user_id = %user_id,
            role = membership.role.as_str(),
            "Membership upserted"
        );

        Ok(membership)
    }

    /// Remove a user from a site. Removing the site's last admin is
    /// rejected with a conflict and changes nothing.
    pub async fn remove_member(&self, site_id: Uuid, user_id: Uuid) -> ImsResult<()> {
        self.membership_repo.remove(user_id, site_id).await?;

        tracing::info!(
            target: "ims::security",
            event = "member_removed",
            site_id = %site_id,
            user_id = %user_id,
            "Membership removed"
        );

        Ok(())
    }

    /// Change a member's role. Demoting the last admin is rejected
    /// with a conflict and changes nothing.
    pub async fn change_role(
        &self,
        site_id: Uuid,
        user_id: Uuid,
        new_role: SiteRole,
    ) -> ImsResult<Membership> {
        let membership = self
            .membership_repo
            .change_role(user_id, site_id, new_role)
            .await?;

        tracing::info!(
            target: "ims::security",
            event = "member_role_changed",
            site_id = %site_id,
            user_id = %user_id,
            role = membership.role.as_str(),
            "Membership role changed"
        );

        Ok(membership)
    }

    /// All active sites the user belongs to, with their roles.
    pub async fn user_sites(&self, user_id: Uuid) -> ImsResult<Vec<SiteAccess>> {
        self.membership_repo.site_access_for_user(user_id).await
    }

    pub async fn site_members(
        &self,
        site_id: Uuid,
        page: PageRequest,
    ) -> ImsResult<Page<Membership>> {
        self.site_repo.get_by_id(site_id).await?;
        self.membership_repo.list_site_members(site_id, page).await
    }

    pub async fn is_site_admin(&self, user_id: Uuid, site_id: Uuid) -> ImsResult<bool> {
        match self.membership_repo.get(user_id, site_id).await {
            Ok(m) => Ok(m.role == SiteRole::Admin),
            Err(ImsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Guard for administrative operations on a site.
    pub async fn ensure_site_admin(&self, user_id: Uuid, site_id: Uuid) -> ImsResult<()> {
        if self.is_site_admin(user_id, site_id).await? {
            Ok(())
        } else {
            tracing::warn!(
                target: "ims::security",
                event = "admin_required",
                site_id = %site_id,
                user_id = %user_id,
                "Administrative action denied"
            );
            Err(ImsError::AuthorizationDenied {
                reason: "site admin role required".into(),
            })
        }
    }
}
