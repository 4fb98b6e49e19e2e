use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::services::auth::error::AuthError;

/// Audience claim can be a single string or an array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub(crate) enum Audience {
    Single(String),
    Multiple(Vec<String>),
    #[default]
    None,
}

impl Audience {
    fn into_vec(self) -> Vec<String> {
        match self {
            Audience::Single(s) => vec![s],
            Audience::Multiple(v) => v,
            Audience::None => Vec::new(),
        }
    }
}

/// Payload of an access token as it arrives on the wire.
///
/// Presence of `iss`/`aud`/`exp`/`sub` is enforced by `jsonwebtoken::Validation`
/// before this type is ever handed out, so everything stays optional here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Audience,
    #[serde(default)]
    pub exp: Option<i64>,

    // RBAC-enabled identity providers put permissions here
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    // OAuth2 space-separated scopes, used when `permissions` is absent
    #[serde(default)]
    pub scope: Option<String>,
}

/// Verified claims of a bearer credential.
///
/// Only `AuthService` builds this; handlers receive it through the
/// `AuthClaims` extractor.
#[derive(Debug, Clone)]
pub struct Claims {
    subject: String,
    issuer: String,
    audience: Vec<String>,
    expires_at: DateTime<Utc>,
    permissions: Option<BTreeSet<String>>,
}

impl Claims {
    pub(crate) fn from_raw(raw: RawClaims) -> Result<Self, AuthError> {
        let subject = raw
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::InvalidClaims)?;
        let issuer = raw.iss.ok_or(AuthError::InvalidClaims)?;
        let expires_at = raw
            .exp
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
            .ok_or(AuthError::InvalidClaims)?;

        let permissions = match (raw.permissions, raw.scope) {
            (Some(list), _) => Some(list.into_iter().collect()),
            (None, Some(scope)) => Some(scope.split_whitespace().map(str::to_string).collect()),
            (None, None) => None,
        };

        Ok(Self {
            subject,
            issuer,
            audience: raw.aud.into_vec(),
            expires_at,
            permissions,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `None` when the token carried neither `permissions` nor `scope`.
    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.permissions.as_ref()
    }
}
