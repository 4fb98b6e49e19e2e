/*
 * Responsibility
 * - Extractors that turn request parts into typed handler arguments
 * - Every rejection is an AppError, so it renders in the common error envelope
 */
mod auth_claims;
mod drink_id;
mod json;

pub use auth_claims::AuthClaims;
pub use drink_id::DrinkId;
pub use json::ApiJson;
