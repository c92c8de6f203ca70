//! Root controller composing the session, history and the two workflows.

use crate::gateway::Backend;
use crate::generation::{GenerationState, GenerationWorkflow, LoadingGuard, SubmitOutcome};
use crate::history::HistoryCache;
use crate::model::{
    ClientConfig, Credential, GeneratedItem, IdentityProfile, ItemId, LOGIN_REQUIRED_MESSAGE,
};
use crate::observable::Observable;
use crate::publish::{PublishState, PublishWorkflow, ShareOutcome};
use crate::session::{Location, SessionStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub logged_in: bool,
    pub profile: Option<IdentityProfile>,
    pub history: Vec<GeneratedItem>,
    pub generation: GenerationState,
    pub publish: PublishState,
    pub alert: Option<String>,
}

pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    history: HistoryCache,
    generation: GenerationWorkflow,
    publish: PublishWorkflow,
    alert: Observable<Option<String>>,
}

impl Orchestrator {
    pub fn new(cfg: &ClientConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            session: SessionStore::new(),
            history: HistoryCache::new(),
            generation: GenerationWorkflow::new(),
            publish: PublishWorkflow::new(cfg.share_reset_delay),
            alert: Observable::default(),
        }
    }

    /// Synchronous startup step: take the credential from the entry address.
    ///
    /// Completes before any dependent fetch is started.
    pub fn bootstrap(&self, location: &mut Location) -> Option<Credential> {
        let cred = self.session.ingest_from_location(location);
        info!(
            authenticated = cred.is_some(),
            address = %location.address(),
            "session bootstrapped"
        );
        cred
    }

    /// Profile lookup and history fetch, side by side. The profile is only
    /// requested when a credential is present.
    pub async fn load_session(&self) {
        let backend = self.backend.as_ref();
        let (profile, _) = tokio::join!(
            self.session.refresh_profile(backend),
            self.history.refresh(backend)
        );
        info!(
            profile = profile.is_some(),
            history = self.history.len(),
            "session loaded"
        );
    }

    /// Bootstrap then load, for one-shot callers.
    pub async fn start(&self, location: &mut Location) {
        self.bootstrap(location);
        self.load_session().await;
    }

    pub async fn refresh_history(&self) {
        let _ = self.history.refresh(self.backend.as_ref()).await;
    }

    pub async fn generate(&self, role: &str, topic: &str) -> SubmitOutcome {
        self.generation.set_role(role);
        self.generation.set_topic(topic);
        self.generation
            .submit(self.backend.as_ref(), &self.history)
            .await
    }

    /// Synchronous half of an interactive generation: marks loading before
    /// returning, so a second command right behind this one is refused.
    pub fn begin_generate(&self, role: &str, topic: &str) -> Option<LoadingGuard> {
        self.generation.try_begin(role, topic)
    }

    pub async fn finish_generate(&self, loading: LoadingGuard) -> SubmitOutcome {
        self.generation
            .complete(loading, self.backend.as_ref(), &self.history)
            .await
    }

    /// Share a cached history item. `None` when the id is not in the history.
    pub async fn share(&self, item_id: ItemId) -> Option<ShareOutcome> {
        let Some(item) = self.history.find(item_id) else {
            debug!(item_id, "share requested for unknown item");
            return None;
        };
        Some(self.share_text(item.id, &item.post_text).await)
    }

    pub async fn share_text(&self, item_id: ItemId, text: &str) -> ShareOutcome {
        let outcome = self
            .publish
            .share(&self.session, self.backend.as_ref(), item_id, text)
            .await;
        if outcome == ShareOutcome::LoginRequired {
            self.alert.set(Some(LOGIN_REQUIRED_MESSAGE.to_string()));
        }
        outcome
    }

    /// Submit control state: disabled while a generation is running.
    pub fn can_submit(&self) -> bool {
        !self.generation.is_loading()
    }

    /// Share control state, the same for every item: disabled while any share
    /// holds the guard or when nobody is logged in.
    pub fn can_share(&self) -> bool {
        self.session.is_authenticated() && !self.publish.is_busy()
    }

    pub fn take_alert(&self) -> Option<String> {
        let mut taken = None;
        self.alert.update_if(|a| {
            taken = a.take();
            taken.is_some()
        });
        taken
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn generation(&self) -> &GenerationWorkflow {
        &self.generation
    }

    pub fn publish(&self) -> &PublishWorkflow {
        &self.publish
    }

    pub fn subscribe_alert(&self) -> watch::Receiver<Option<String>> {
        self.alert.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            logged_in: self.session.is_authenticated(),
            profile: self.session.profile(),
            history: self.history.items(),
            generation: self.generation.state(),
            publish: self.publish.state(),
            alert: self.alert.get(),
        }
    }

    /// Cancel scheduled work tied to this instance.
    pub fn dispose(&self) {
        if self.publish.has_pending_reset() {
            debug!("cancelling pending share reset");
        }
        self.publish.dispose();
    }
}
