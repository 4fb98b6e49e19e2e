pub mod claims;
pub mod error;
pub mod factory;
pub mod jwks;
pub mod permissions;
pub mod verifier;

pub use claims::Claims;
pub use error::AuthError;
pub use factory::build_auth_service;
pub use verifier::AuthService;
