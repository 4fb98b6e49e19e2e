/// Factory: build `AuthService` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::AuthService;
use crate::services::auth::jwks::{HttpKeySetSource, JwksCache, JwksError};

pub fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, JwksError> {
    let source = HttpKeySetSource::new(&config.auth_jwks_url, config.auth_jwks_timeout)?;
    let keys = JwksCache::new(source, config.auth_jwks_cache_ttl)
        .with_refresh_interval(config.auth_jwks_refresh_interval);

    let auth = AuthService::new(
        keys,
        &config.auth_issuer,
        &config.auth_audience,
        config.auth_algorithms.clone(),
        config.auth_leeway_seconds,
    );

    Ok(Arc::new(auth))
}
