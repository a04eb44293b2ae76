//! IMS Sites — site administration: the site catalog and the
//! membership lifecycle, including the last-admin invariant.

pub mod service;

pub use service::SiteService;
