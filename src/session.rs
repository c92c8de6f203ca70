//! Session store: the bearer credential handed over by the login redirect and
//! the identity profile derived from it.
//!
//! The credential lives in memory only. It is read from the entry address once,
//! then the parameter is erased from the visible address so a reload or a copy
//! of the address never carries it.

use crate::gateway::Backend;
use crate::model::{Credential, IdentityProfile};
use crate::observable::Observable;
use anyhow::{Context, Result};
use reqwest::Url;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Query parameter the backend appends after a successful login.
pub const CREDENTIAL_PARAM: &str = "token";

/// The client's address bar.
#[derive(Debug, Clone)]
pub struct Location {
    current: Url,
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let current = Url::parse(raw).with_context(|| format!("invalid entry URL: {raw}"))?;
        Ok(Self { current })
    }

    /// Path plus query, the part a browser shows after the origin.
    pub fn address(&self) -> String {
        match self.current.query() {
            Some(q) => format!("{}?{}", self.current.path(), q),
            None => self.current.path().to_string(),
        }
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.current
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Swap the current entry for `path` on the same origin without adding a
    /// history entry and without reloading.
    pub fn replace_state(&mut self, path: &str) {
        self.current.set_path(path);
        self.current.set_query(None);
        self.current.set_fragment(None);
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    ingested: AtomicBool,
    credential: Observable<Option<Credential>>,
    profile: Observable<Option<IdentityProfile>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the credential from the entry address, once per session.
    ///
    /// When the parameter is present it is stored and the address is replaced
    /// with `/`. Later calls are no-ops whatever the address holds.
    pub fn ingest_from_location(&self, location: &mut Location) -> Option<Credential> {
        if self.ingested.swap(true, Ordering::SeqCst) {
            debug!("credential ingestion already ran");
            return None;
        }
        let raw = location.query_param(CREDENTIAL_PARAM);
        let cred = self.store(raw.as_deref())?;
        location.replace_state("/");
        Some(cred)
    }

    /// Same one-shot rule as [`SessionStore::ingest_from_location`], for a raw
    /// parameter value already extracted by the caller.
    #[cfg(test)]
    pub fn ingest_credential(&self, raw: Option<&str>) -> Option<Credential> {
        if self.ingested.swap(true, Ordering::SeqCst) {
            debug!("credential ingestion already ran");
            return None;
        }
        self.store(raw)
    }

    fn store(&self, raw: Option<&str>) -> Option<Credential> {
        let raw = raw.filter(|r| !r.is_empty())?;
        let cred = Credential::new(raw);
        self.credential.set(Some(cred.clone()));
        info!("session credential received");
        Some(cred)
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.with(Option::is_some)
    }

    pub fn subscribe_credential(&self) -> watch::Receiver<Option<Credential>> {
        self.credential.subscribe()
    }

    pub fn profile(&self) -> Option<IdentityProfile> {
        self.profile.get()
    }

    pub fn subscribe_profile(&self) -> watch::Receiver<Option<IdentityProfile>> {
        self.profile.subscribe()
    }

    /// Look up the profile for the stored credential.
    ///
    /// Without a credential nothing is requested. A failed lookup leaves the
    /// profile empty and is not surfaced beyond the log.
    pub async fn refresh_profile(&self, backend: &dyn Backend) -> Option<IdentityProfile> {
        let cred = self.credential()?;
        match backend.fetch_profile(&cred).await {
            Ok(profile) => {
                info!(name = %profile.name, "profile loaded");
                self.profile.set(Some(profile.clone()));
                Some(profile)
            }
            Err(e) => {
                warn!(error = %e, "profile lookup failed; continuing anonymously");
                self.profile.set(None);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::fake::FakeBackend;

    #[test]
    fn ingests_token_and_strips_it_from_address() {
        let store = SessionStore::new();
        let mut loc = Location::parse("http://localhost:3000/?token=abc123").unwrap();

        let cred = store.ingest_from_location(&mut loc);

        assert_eq!(cred.as_ref().map(Credential::as_str), Some("abc123"));
        assert_eq!(store.credential().unwrap().as_str(), "abc123");
        assert_eq!(loc.address(), "/");
        assert!(loc.query_param(CREDENTIAL_PARAM).is_none());
    }

    #[test]
    fn stripped_address_keeps_origin_and_drops_fragment() {
        let store = SessionStore::new();
        let mut loc = Location::parse("https://app.example:8443/callback?token=abc#posts").unwrap();

        store.ingest_from_location(&mut loc);

        assert_eq!(loc.current.as_str(), "https://app.example:8443/");
        assert!(loc.current.fragment().is_none());
    }

    #[test]
    fn token_is_preserved_verbatim() {
        let store = SessionStore::new();
        let mut loc =
            Location::parse("http://localhost/callback?state=x&token=a%2Bb%3D%3D").unwrap();
        store.ingest_from_location(&mut loc);
        assert_eq!(store.credential().unwrap().as_str(), "a+b==");
        assert_eq!(loc.address(), "/");
    }

    #[test]
    fn ingestion_runs_once() {
        let store = SessionStore::new();
        let mut loc = Location::parse("http://localhost/?token=first").unwrap();
        store.ingest_from_location(&mut loc);

        let mut again = Location::parse("http://localhost/?token=second").unwrap();
        assert!(store.ingest_from_location(&mut again).is_none());
        assert!(store.ingest_credential(Some("third")).is_none());

        assert_eq!(store.credential().unwrap().as_str(), "first");
        // The second address was never touched.
        assert_eq!(again.address(), "/?token=second");
    }

    #[test]
    fn missing_or_empty_token_leaves_store_empty() {
        let store = SessionStore::new();
        let mut loc = Location::parse("http://localhost/?tab=history").unwrap();
        assert!(store.ingest_from_location(&mut loc).is_none());
        assert!(!store.is_authenticated());
        assert_eq!(loc.address(), "/?tab=history");

        let empty = SessionStore::new();
        assert!(empty.ingest_credential(Some("")).is_none());
        assert!(empty.credential().is_none());
    }

    #[tokio::test]
    async fn profile_lookup_is_skipped_without_credential() {
        let store = SessionStore::new();
        let backend = FakeBackend::default();
        assert!(store.refresh_profile(&backend).await.is_none());
        assert_eq!(FakeBackend::count(&backend.profile_calls), 0);
    }

    #[tokio::test]
    async fn failed_profile_lookup_leaves_profile_empty() {
        let store = SessionStore::new();
        store.ingest_credential(Some("abc123"));
        let backend = FakeBackend::default();
        *backend.profile.lock().unwrap() = Err(GatewayError::Auth { status: Some(401) });

        assert!(store.refresh_profile(&backend).await.is_none());
        assert!(store.profile().is_none());
        assert!(store.is_authenticated());
        assert_eq!(*backend.seen_credentials.lock().unwrap(), vec!["abc123"]);
    }

    #[tokio::test]
    async fn profile_lookup_stores_profile() {
        let store = SessionStore::new();
        store.ingest_credential(Some("abc123"));
        let backend = FakeBackend::default();
        let mut rx = store.subscribe_profile();

        store.refresh_profile(&backend).await;

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().name, "Ada Lovelace");
    }
}
