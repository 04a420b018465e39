pub mod middleware;
pub mod token;
pub mod validate;

pub use middleware::{AuthUser, require_auth};
pub use token::TokenVerifier;
