//! Site-scoped interaction service.
//!
//! Every operation takes the caller's [`RequestContext`] and passes
//! its allowed-site list to the repository explicitly. New records are
//! created in the context's active site — the site id is never taken
//! from the client payload.

use ims_core::context::RequestContext;
use ims_core::error::ImsResult;
use ims_core::models::interaction::{CreateInteraction, Interaction, UpdateInteraction};
use ims_core::repository::{InteractionFilter, InteractionRepository, Page, PageRequest, Sort};
use uuid::Uuid;

use crate::validate;

/// Service implementing interaction CRUD and search within the
/// caller's site scope.
pub struct InteractionService<R: InteractionRepository> {
    repo: R,
}

impl<R: InteractionRepository> InteractionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create an interaction in the context's active site.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateInteraction,
    ) -> ImsResult<Interaction> {
        validate::validate_create(&input)?;

        let interaction = self
            .repo
            .create(ctx.site.active_site_id, ctx.user.id, input)
            .await?;

        tracing::info!(
            interaction_id = %interaction.id,
            site_id = %interaction.site_id,
            user_id = %ctx.user.id,
            "Interaction created"
        );

        Ok(interaction)
    }

    /// Fetch a single interaction within the caller's scope. A record
    /// in another site is reported as not found.
    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> ImsResult<Interaction> {
        self.repo.get_by_id(&ctx.site.allowed_site_ids, id).await
    }

    /// Apply a partial update. Unspecified fields are untouched; audit
    /// fields are stamped server-side.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: UpdateInteraction,
    ) -> ImsResult<Interaction> {
        // Scoped fetch first: both the existence check and the
        // cross-field validation need the current record.
        let current = self.repo.get_by_id(&ctx.site.allowed_site_ids, id).await?;
        validate::validate_update(&input, &current)?;

        let interaction = self
            .repo
            .update(&ctx.site.allowed_site_ids, id, ctx.user.id, input)
            .await?;

        tracing::info!(
            interaction_id = %interaction.id,
            site_id = %interaction.site_id,
            user_id = %ctx.user.id,
            "Interaction updated"
        );

        Ok(interaction)
    }

    /// Hard-delete an interaction within the caller's scope.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> ImsResult<()> {
        self.repo.delete(&ctx.site.allowed_site_ids, id).await?;

        tracing::info!(
            interaction_id = %id,
            user_id = %ctx.user.id,
            "Interaction deleted"
        );

        Ok(())
    }

    /// List interactions in scope — a search with no filters.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
        sort: Sort,
    ) -> ImsResult<Page<Interaction>> {
        self.repo
            .search(
                &ctx.site.allowed_site_ids,
                InteractionFilter::default(),
                page,
                sort,
            )
            .await
    }

    /// Search interactions in scope with AND-composed filters.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        filter: InteractionFilter,
        page: PageRequest,
        sort: Sort,
    ) -> ImsResult<Page<Interaction>> {
        self.repo
            .search(&ctx.site.allowed_site_ids, filter, page, sort)
            .await
    }
}
