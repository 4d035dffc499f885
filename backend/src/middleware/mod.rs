//! Request middleware and extractors

pub mod auth;
pub mod context;

pub use auth::{auth_middleware, AuthUser, Claims, CurrentUser};
pub use context::{ClientMeta, RequestContext};
