use std::str::FromStr;

use axum::http::HeaderValue;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation,
    jwk::{Jwk, KeyAlgorithm},
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::services::auth::{
    claims::{Claims, RawClaims},
    error::AuthError,
    jwks::{JwksCache, JwksError},
};

/// Algorithms a key set may be trusted for. Symmetric (HS*) algorithms are
/// never accepted: the verifying key would double as a signing key.
pub const ASYMMETRIC_ALGORITHMS: [Algorithm; 9] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

/// JOSE header fields we look at before touching any key material.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Extract `<token>` from an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = header
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingOrMalformedHeader)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MissingOrMalformedHeader),
    }
}

/// Structural check: three non-empty base64url segments, the first one a JSON
/// object with an `alg`.
fn parse_header(token: &str) -> Result<RawHeader, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(AuthError::MalformedToken);
    }

    let mut decoded = Vec::with_capacity(2);
    for segment in &segments[..2] {
        decoded.push(
            URL_SAFE_NO_PAD
                .decode(segment)
                .map_err(|_| AuthError::MalformedToken)?,
        );
    }
    URL_SAFE_NO_PAD
        .decode(segments[2])
        .map_err(|_| AuthError::MalformedToken)?;

    serde_json::from_slice(&decoded[0]).map_err(|_| AuthError::MalformedToken)
}

/// Access-token verifier for tokens minted by the external identity provider.
pub struct AuthService {
    keys: JwksCache,
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
    leeway_seconds: u64,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

impl AuthService {
    pub fn new(
        keys: JwksCache,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        algorithms: Vec<Algorithm>,
        leeway_seconds: u64,
    ) -> Self {
        let algorithms = algorithms
            .into_iter()
            .filter(|alg| ASYMMETRIC_ALGORITHMS.contains(alg))
            .collect();

        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms,
            leeway_seconds,
        }
    }

    /// Header → token → verified claims.
    pub async fn authenticate(&self, header: Option<&HeaderValue>) -> Result<Claims, AuthError> {
        let token = bearer_token(header)?;
        self.verify(token).await
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = parse_header(token)?;

        if header.alg.eq_ignore_ascii_case("none") {
            return Err(AuthError::UnsupportedAlgorithm);
        }
        let algorithm =
            Algorithm::from_str(&header.alg).map_err(|_| AuthError::UnsupportedAlgorithm)?;
        if !self.algorithms.contains(&algorithm) {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let kid = header.kid.ok_or(AuthError::KeyNotFound)?;
        let jwk = self.keys.key(&kid).await.map_err(|e| match e {
            JwksError::KeyNotFound(_) => AuthError::KeyNotFound,
            other => {
                error!(error = %other, "signing keys unavailable");
                AuthError::KeySourceUnavailable
            }
        })?;

        if let Some(key_alg) = &jwk.common.key_algorithm
            && signing_algorithm(key_alg) != Some(algorithm)
        {
            debug!(?key_alg, ?algorithm, "token alg does not match key alg");
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let decoding_key = decoding_key(&jwk)?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway_seconds;

        let data = jsonwebtoken::decode::<RawClaims>(token, &decoding_key, &validation)?;
        let claims = Claims::from_raw(data.claims)?;

        // jsonwebtoken accepts `exp == now`; a token is only valid while `exp > now`.
        if is_expired(claims.expires_at(), self.leeway_seconds, Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

fn is_expired(expires_at: DateTime<Utc>, leeway_seconds: u64, now: DateTime<Utc>) -> bool {
    let leeway = TimeDelta::try_seconds(i64::try_from(leeway_seconds).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX);
    match expires_at.checked_add_signed(leeway) {
        Some(deadline) => deadline <= now,
        None => false,
    }
}

/// Signing algorithm a JWK declares; `None` for encryption-only algorithms.
fn signing_algorithm(key_alg: &KeyAlgorithm) -> Option<Algorithm> {
    match key_alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        error!(error = %e, kid = ?jwk.common.key_id, "unusable key in JWKS");
        AuthError::KeySourceUnavailable
    })
}
