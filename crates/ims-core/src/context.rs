//! Per-request authorization context.
//!
//! The context is built once per request by the authentication gate
//! and passed explicitly as a parameter through the whole call chain.
//! There is deliberately no ambient per-request global.

use uuid::Uuid;

use crate::models::user::User;

/// The site scope a request operates under.
///
/// `allowed_site_ids` is the general mechanism: every data operation
/// is filtered by it. A request pinned to a single site is simply a
/// list of length 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    /// The site new records are created in.
    pub active_site_id: Uuid,
    /// The sites reads and mutations are restricted to.
    pub allowed_site_ids: Vec<Uuid>,
}

impl SiteContext {
    /// Context pinned to exactly one site.
    pub fn single(site_id: Uuid) -> Self {
        Self {
            active_site_id: site_id,
            allowed_site_ids: vec![site_id],
        }
    }

    /// Context spanning a set of sites, with the first as active.
    ///
    /// Returns `None` on an empty set — a request must always be
    /// scoped to at least one site.
    pub fn spanning(site_ids: Vec<Uuid>) -> Option<Self> {
        let active_site_id = *site_ids.first()?;
        Some(Self {
            active_site_id,
            allowed_site_ids: site_ids,
        })
    }

    pub fn allows(&self, site_id: Uuid) -> bool {
        self.allowed_site_ids.contains(&site_id)
    }
}

/// Verified user plus resolved site scope for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    pub site: SiteContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_site_context_is_a_list_of_one() {
        let id = Uuid::new_v4();
        let ctx = SiteContext::single(id);
        assert_eq!(ctx.active_site_id, id);
        assert_eq!(ctx.allowed_site_ids, vec![id]);
        assert!(ctx.allows(id));
        assert!(!ctx.allows(Uuid::new_v4()));
    }

    #[test]
    fn spanning_defaults_to_first_site() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ctx = SiteContext::spanning(vec![a, b]).unwrap();
        assert_eq!(ctx.active_site_id, a);
        assert!(ctx.allows(b));
    }

    #[test]
    fn spanning_rejects_empty_set() {
        assert!(SiteContext::spanning(vec![]).is_none());
    }
}
