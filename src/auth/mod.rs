//! Authentication and authorization module

pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

pub use gate::authorize_active;
pub use middleware::{extract_token, jwt_auth_middleware, CurrentUser};
pub use password::PasswordHasher;
pub use token::{ClaimSet, TokenService, ValidationError};
