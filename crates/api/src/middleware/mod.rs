//! Request middleware.

pub mod auth;

pub use auth::{MaybeAuthUser, optional_auth_middleware};
