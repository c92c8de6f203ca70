//! Role + topic -> generated post.

use crate::error::GatewayError;
use crate::gateway::Backend;
use crate::history::HistoryCache;
use crate::model::{GenerationRequest, GENERATION_FAILED_MESSAGE};
use crate::observable::Observable;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub role: String,
    pub topic: String,
    /// Last generated text, or the failure message.
    pub result_text: String,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Generated(String),
    Failed(GatewayError),
    /// Role or topic was empty; nothing was sent.
    Rejected,
}

#[derive(Debug, Default)]
pub struct GenerationWorkflow {
    state: Arc<Observable<GenerationState>>,
}

/// Holds `is_loading` for one generation and clears it on drop, including
/// when the future carrying it is dropped before it ever runs.
#[derive(Debug)]
pub struct LoadingGuard(Arc<Observable<GenerationState>>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.update(|s| s.is_loading = false);
    }
}

impl GenerationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GenerationState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    pub fn set_role(&self, role: impl Into<String>) {
        let role = role.into();
        self.state.update(|s| s.role = role);
    }

    pub fn set_topic(&self, topic: impl Into<String>) {
        let topic = topic.into();
        self.state.update(|s| s.topic = topic);
    }

    pub fn is_loading(&self) -> bool {
        self.state.with(|s| s.is_loading)
    }

    /// Start a generation for `role`/`topic` unless one is already running or
    /// an input is blank. Loading is set before this returns; the request is
    /// sent by [`GenerationWorkflow::complete`].
    pub fn try_begin(&self, role: &str, topic: &str) -> Option<LoadingGuard> {
        if role.trim().is_empty() || topic.trim().is_empty() {
            return None;
        }
        let acquired = self.state.update_if(|s| {
            if s.is_loading {
                return false;
            }
            s.role = role.to_string();
            s.topic = topic.to_string();
            s.is_loading = true;
            s.result_text.clear();
            true
        });
        acquired.then(|| LoadingGuard(self.state.clone()))
    }

    /// Generate a post from the current role and topic.
    ///
    /// Does not guard against concurrent calls; callers keep the submit
    /// control disabled while [`GenerationWorkflow::is_loading`] is true.
    pub async fn submit(&self, backend: &dyn Backend, history: &HistoryCache) -> SubmitOutcome {
        let blank = self
            .state
            .with(|s| s.role.trim().is_empty() || s.topic.trim().is_empty());
        if blank {
            return SubmitOutcome::Rejected;
        }

        self.state.update(|s| {
            s.is_loading = true;
            s.result_text.clear();
        });
        self.complete(LoadingGuard(self.state.clone()), backend, history)
            .await
    }

    /// Send the request for a generation whose loading state is already set.
    pub async fn complete(
        &self,
        loading: LoadingGuard,
        backend: &dyn Backend,
        history: &HistoryCache,
    ) -> SubmitOutcome {
        let req = self
            .state
            .with(|s| GenerationRequest::new(s.role.clone(), s.topic.clone()));
        match backend.generate(&req).await {
            Ok(post) => {
                info!(chars = post.post_text.len(), "post generated");
                self.state.update(|s| s.result_text = post.post_text.clone());
                drop(loading);
                // History already logs its own failure; the result stays shown either way.
                let _ = history.refresh(backend).await;
                SubmitOutcome::Generated(post.post_text)
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                self.state
                    .update(|s| s.result_text = GENERATION_FAILED_MESSAGE.to_string());
                SubmitOutcome::Failed(e)
            }
        }
    }
}
