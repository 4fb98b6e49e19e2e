//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! - `KeySetSource` is where keys come from (HTTP in production).
//! - `JwksCache` keeps the last fetched set for a TTL and refetches when a
//!   token names a `kid` the cached set does not know (key rotation).
//!
//! The `RwLock` around the cached set is never held across an `.await`; the
//! refresh `Mutex` is, so only one fetch runs at a time.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Maximum accepted JWKS response size (1 MiB)
const MAX_JWKS_RESPONSE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("failed to parse JWKS: {0}")]
    Parse(String),

    #[error("JWKS response too large: {0} bytes (max: {1})")]
    ResponseTooLarge(u64, u64),

    #[error("key not found for kid: {0}")]
    KeyNotFound(String),

    #[error("invalid JWKS url: {0}")]
    InvalidUrl(String),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Where the trusted key set comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync + 'static {
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<JwkSet, JwksError>;
}

/// Only `https` is accepted, except for loopback hosts (local IdP, tests).
pub fn validate_url(url_str: &str) -> Result<Url, JwksError> {
    let url = Url::parse(url_str).map_err(|e| JwksError::InvalidUrl(e.to_string()))?;

    let is_loopback = match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => return Err(JwksError::InvalidUrl(format!("{url_str}: missing host"))),
    };

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback => Ok(url),
        scheme => Err(JwksError::InvalidUrl(format!(
            "{url_str}: scheme '{scheme}' not allowed, use https"
        ))),
    }
}

/// Fetches the key set from a JWKS endpoint, e.g.
/// `https://<tenant>/.well-known/jwks.json`.
pub struct HttpKeySetSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpKeySetSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, JwksError> {
        let url = validate_url(url)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| JwksError::HttpClient(e.to_string()))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        debug!(url = %self.url, "fetching JWKS");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!("HTTP {}", response.status())));
        }

        if let Some(len) = response.content_length()
            && len > MAX_JWKS_RESPONSE_SIZE
        {
            return Err(JwksError::ResponseTooLarge(len, MAX_JWKS_RESPONSE_SIZE));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if bytes.len() as u64 > MAX_JWKS_RESPONSE_SIZE {
            return Err(JwksError::ResponseTooLarge(
                bytes.len() as u64,
                MAX_JWKS_RESPONSE_SIZE,
            ));
        }

        let jwks: JwkSet =
            serde_json::from_slice(&bytes).map_err(|e| JwksError::Parse(e.to_string()))?;

        debug!(keys = jwks.keys.len(), "fetched JWKS");
        Ok(jwks)
    }
}

/// Minimum gap between two refreshes triggered by unknown `kid`s.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// TTL cache in front of a `KeySetSource`.
///
/// Refreshes are serialized: concurrent misses wait for the one in flight and
/// reuse its result. A `kid` miss refetches at most once per
/// `refresh_interval`; inside that window unknown `kid`s are answered from
/// the cached set.
pub struct JwksCache {
    source: Box<dyn KeySetSource>,
    cache: RwLock<Option<CachedJwks>>,
    refresh_lock: Mutex<()>,
    ttl: Duration,
    refresh_interval: Duration,
}

impl JwksCache {
    pub fn new(source: impl KeySetSource, ttl: Duration) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            ttl,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Cached set and its age, fresh or not.
    fn snapshot(&self) -> Option<(JwkSet, Duration)> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .map(|c| (c.jwks.clone(), c.fetched_at.elapsed()))
    }

    fn cached(&self) -> Option<JwkSet> {
        self.snapshot()
            .filter(|(_, age)| *age <= self.ttl)
            .map(|(jwks, _)| jwks)
    }

    async fn refresh(&self) -> Result<JwkSet, JwksError> {
        let jwks = self.source.fetch().await?;

        *self.cache.write() = Some(CachedJwks {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });

        Ok(jwks)
    }

    /// Refresh unless the set cached meanwhile (or recently) is good enough.
    async fn refresh_for(&self, kid: &str) -> Result<JwkSet, JwksError> {
        let _guard = self.refresh_lock.lock().await;

        match self.snapshot() {
            Some((jwks, age)) if age <= self.ttl => {
                if jwks.find(kid).is_some() {
                    return Ok(jwks);
                }
                if age < self.refresh_interval {
                    debug!(kid, "kid not in JWKS, refreshed too recently to retry");
                    return Ok(jwks);
                }
                warn!(kid, source = %self.source.describe(), "kid not in cached JWKS, refreshing");
            }
            _ => debug!(source = %self.source.describe(), "JWKS missing or stale"),
        }

        self.refresh().await
    }

    /// Look up a key by `kid`, refreshing on a miss (rate limited).
    pub async fn key(&self, kid: &str) -> Result<Jwk, JwksError> {
        if let Some(jwks) = self.cached()
            && let Some(key) = jwks.find(kid)
        {
            return Ok(key.clone());
        }

        let jwks = self.refresh_for(kid).await?;

        jwks.find(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;

    /// Serves the key sets in order, one per fetch (the last one repeats).
    struct RotatingSource {
        sets: Vec<JwkSet>,
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KeySetSource for RotatingSource {
        fn describe(&self) -> String {
            "rotating".to_string()
        }

        async fn fetch(&self) -> Result<JwkSet, JwksError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.sets[n.min(self.sets.len() - 1)].clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl KeySetSource for DownSource {
        fn describe(&self) -> String {
            "down".to_string()
        }

        async fn fetch(&self) -> Result<JwkSet, JwksError> {
            Err(JwksError::Fetch("connection refused".to_string()))
        }
    }

    fn key_set(kids: &[&str]) -> JwkSet {
        let keys: Vec<_> = kids
            .iter()
            .map(|kid| {
                json!({
                    "kty": "RSA",
                    "kid": kid,
                    "use": "sig",
                    "alg": "RS256",
                    "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                    "e": "AQAB"
                })
            })
            .collect();
        serde_json::from_value(json!({ "keys": keys })).unwrap()
    }

    #[tokio::test]
    async fn cached_set_is_reused_within_ttl() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["k1"])],
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        );

        cache.key("k1").await.unwrap();
        cache.key("k1").await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kid_triggers_one_refresh() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["old"]), key_set(&["old", "new"])],
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        )
        .with_refresh_interval(Duration::ZERO);

        cache.key("old").await.unwrap();
        let rotated = cache.key("new").await.unwrap();

        assert_eq!(rotated.common.key_id.as_deref(), Some("new"));
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn kid_missing_after_refresh_is_key_not_found() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["k1"])],
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        );

        let err = cache.key("ghost").await.unwrap_err();

        assert!(matches!(err, JwksError::KeyNotFound(kid) if kid == "ghost"));
        // The set was fetched for this very lookup: no second fetch.
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kids_within_interval_share_one_fetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["k1"])],
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        );

        for i in 0..20 {
            let err = cache.key(&format!("random-{i}")).await.unwrap_err();
            assert!(matches!(err, JwksError::KeyNotFound(_)));
        }
        cache.key("k1").await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kid_refreshes_again_after_the_interval() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["old"]), key_set(&["old", "new"])],
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        )
        .with_refresh_interval(Duration::from_millis(20));

        cache.key("old").await.unwrap();
        assert!(cache.key("new").await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.key("new").await.is_ok());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    /// Counts fetches and takes a while to answer.
    struct SlowSource {
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KeySetSource for SlowSource {
        fn describe(&self) -> String {
            "slow".to_string()
        }

        async fn fetch(&self) -> Result<JwkSet, JwksError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(key_set(&["k1"]))
        }
    }

    #[tokio::test]
    async fn concurrent_misses_wait_for_one_fetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(JwksCache::new(
            SlowSource {
                fetches: fetches.clone(),
            },
            Duration::from_secs(600),
        ));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.key("k1").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let cache = JwksCache::new(
            RotatingSource {
                sets: vec![key_set(&["k1"])],
                fetches: fetches.clone(),
            },
            Duration::ZERO,
        );

        cache.key("k1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.key("k1").await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn source_failure_surfaces_as_fetch_error() {
        let cache = JwksCache::new(DownSource, Duration::from_secs(600));
        let err = cache.key("k1").await.unwrap_err();
        assert!(matches!(err, JwksError::Fetch(_)));
    }

    #[test]
    fn validate_url_requires_https_off_loopback() {
        assert!(validate_url("https://tenant.example.com/.well-known/jwks.json").is_ok());
        assert!(validate_url("http://localhost:8080/jwks").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/jwks").is_ok());
        assert!(validate_url("http://[::1]:8080/jwks").is_ok());

        assert!(validate_url("http://tenant.example.com/jwks").is_err());
        assert!(validate_url("ftp://tenant.example.com/jwks").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
