//! IMS Core — domain models, error taxonomy, site-context types, and
//! repository trait definitions shared across all crates.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;

pub use context::{RequestContext, SiteContext};
pub use error::{ErrorEnvelope, ErrorKind, FieldError, ImsError, ImsResult};
