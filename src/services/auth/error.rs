/*
 * Responsibility
 * - Failure reasons of bearer verification and permission checks
 * - Each kind keeps a human-readable description (rendered to the client)
 *   and a short code (for logs)
 */
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected in the form 'Bearer <token>'.")]
    MissingOrMalformedHeader,

    #[error("Unable to parse authentication token.")]
    MalformedToken,

    #[error("Token signing algorithm is not accepted.")]
    UnsupportedAlgorithm,

    #[error("Token signature is invalid.")]
    InvalidSignature,

    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    #[error("Unable to fetch the signing keys.")]
    KeySourceUnavailable,

    #[error("Token expired.")]
    TokenExpired,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    #[error("Permissions not included in JWT.")]
    PermissionsClaimMissing,

    #[error("Permission not found.")]
    InsufficientPermission,
}

impl AuthError {
    /// HTTP status this failure is rendered with.
    ///
    /// Every kind maps to 401, including `InsufficientPermission`: an
    /// authenticated caller without the permission is not told apart from an
    /// unauthenticated one (no 403).
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingOrMalformedHeader => "authorization_header_missing",
            Self::MalformedToken => "invalid_header",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::InvalidSignature => "invalid_signature",
            Self::KeyNotFound => "key_not_found",
            Self::KeySourceUnavailable => "key_source_unavailable",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::PermissionsClaimMissing => "permissions_missing",
            Self::InsufficientPermission => "unauthorized",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_)
            // The signature already verified when claims are deserialized.
            | ErrorKind::Json(_) => Self::InvalidClaims,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnsupportedAlgorithm
            }
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                Self::MalformedToken
            }
            _ => Self::InvalidSignature,
        }
    }
}
