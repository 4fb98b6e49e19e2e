/*
 * Responsibility
 * - Permission strings declared by protected routes
 * - Exact-membership check of a required permission against verified claims
 */
use crate::services::auth::{claims::Claims, error::AuthError};

pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
pub const POST_DRINKS: &str = "post:drinks";
pub const PATCH_DRINKS: &str = "patch:drinks";
pub const DELETE_DRINKS: &str = "delete:drinks";

/// Allow iff `required` is one of the granted permissions.
///
/// No prefix or wildcard matching. A token without any permission set is a
/// different failure from a token whose set lacks `required`.
pub fn require(claims: &Claims, required: &str) -> Result<(), AuthError> {
    let granted = claims
        .permissions()
        .ok_or(AuthError::PermissionsClaimMissing)?;

    if granted.contains(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermission)
    }
}
