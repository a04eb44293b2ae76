//! IMS Interactions — validation and the site-scoped service for the
//! tenant records themselves.

pub mod service;
pub mod validate;

pub use service::InteractionService;
