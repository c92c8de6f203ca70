//! Publishing a generated post to the third-party platform.
//!
//! One share at a time. The guard is taken before the request goes out and is
//! released only by the deferred reset that runs `reset_delay` after the
//! request settles, successful or not.

use crate::error::GatewayError;
use crate::gateway::Backend;
use crate::model::{ItemId, ShareRequest};
use crate::observable::Observable;
use crate::session::SessionStore;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const SHARING_MESSAGE: &str = "Sharing...";
pub const POSTED_MESSAGE: &str = "Posted successfully!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishStatus {
    #[default]
    Idle,
    InFlight(ItemId),
    Succeeded(ItemId),
    Failed(ItemId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishState {
    pub status: PublishStatus,
    pub status_message: String,
}

impl PublishState {
    /// Item holding the guard. Stays set through the damping window.
    pub fn in_flight_item(&self) -> Option<ItemId> {
        match self.status {
            PublishStatus::Idle => None,
            PublishStatus::InFlight(id) | PublishStatus::Succeeded(id) | PublishStatus::Failed(id) => {
                Some(id)
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.status != PublishStatus::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Posted,
    Failed(GatewayError),
    /// No credential; nothing was sent.
    LoginRequired,
    /// Another share holds the guard; nothing was sent.
    Busy,
}

/// Pending reset; aborted when replaced or dropped.
#[derive(Debug)]
struct ResetTask(JoinHandle<()>);

impl Drop for ResetTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug)]
pub struct PublishWorkflow {
    state: Arc<Observable<PublishState>>,
    reset_delay: Duration,
    reset_task: Mutex<Option<ResetTask>>,
}

/// Finishes the state machine on every exit path of `share`: a request that
/// never settled (dropped future) is recorded as failed, then the reset is
/// scheduled.
struct SettleOnExit<'a> {
    workflow: &'a PublishWorkflow,
    item_id: ItemId,
}

impl Drop for SettleOnExit<'_> {
    fn drop(&mut self) {
        let item_id = self.item_id;
        self.workflow.state.update_if(|s| {
            if s.status != PublishStatus::InFlight(item_id) {
                return false;
            }
            s.status = PublishStatus::Failed(item_id);
            s.status_message = GatewayError::Share { detail: None }.user_message();
            true
        });
        self.workflow.schedule_reset();
    }
}

impl PublishWorkflow {
    pub fn new(reset_delay: Duration) -> Self {
        Self {
            state: Arc::new(Observable::default()),
            reset_delay,
            reset_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PublishState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<PublishState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.with(PublishState::is_busy)
    }

    /// Share `text` (the body of item `item_id`) on the user's behalf.
    pub async fn share(
        &self,
        session: &SessionStore,
        backend: &dyn Backend,
        item_id: ItemId,
        text: &str,
    ) -> ShareOutcome {
        let Some(cred) = session.credential() else {
            warn!(item_id, "share requested without a session");
            return ShareOutcome::LoginRequired;
        };

        let acquired = self.state.update_if(|s| {
            if s.is_busy() {
                return false;
            }
            s.status = PublishStatus::InFlight(item_id);
            s.status_message = SHARING_MESSAGE.to_string();
            true
        });
        if !acquired {
            debug!(item_id, "share ignored; another share holds the guard");
            return ShareOutcome::Busy;
        }
        let _settle = SettleOnExit {
            workflow: self,
            item_id,
        };

        let req = ShareRequest {
            post_text: text.to_string(),
        };
        match backend.share(&cred, &req).await {
            Ok(()) => {
                info!(item_id, "post shared");
                self.state.update(|s| {
                    s.status = PublishStatus::Succeeded(item_id);
                    s.status_message = POSTED_MESSAGE.to_string();
                });
                ShareOutcome::Posted
            }
            Err(e) => {
                warn!(item_id, error = %e, "share failed");
                let message = e.user_message();
                self.state.update(|s| {
                    s.status = PublishStatus::Failed(item_id);
                    s.status_message = message;
                });
                ShareOutcome::Failed(e)
            }
        }
    }

    fn schedule_reset(&self) {
        let state: Weak<Observable<PublishState>> = Arc::downgrade(&self.state);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // Outside a runtime there is nothing to defer on.
            self.state.set(PublishState::default());
            return;
        };
        // Measured from settlement, not from when the task first gets polled.
        let deadline = tokio::time::Instant::now() + self.reset_delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(state) = state.upgrade() {
                state.set(PublishState::default());
                debug!("share status cleared");
            }
        });
        *self
            .reset_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ResetTask(handle));
    }

    pub fn has_pending_reset(&self) -> bool {
        self.reset_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.0.is_finished())
    }

    /// Cancel the pending reset. Used on teardown; the guard is not released.
    pub fn dispose(&self) {
        self.reset_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeBackend;
    use std::sync::atomic::Ordering;

    const DELAY: Duration = Duration::from_secs(3);

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn logged_in() -> SessionStore {
        let session = SessionStore::new();
        session.ingest_credential(Some("abc123"));
        session
    }

    #[tokio::test(start_paused = true)]
    async fn success_holds_guard_until_delay_elapses() {
        let session = logged_in();
        let backend = FakeBackend::default();
        let wf = PublishWorkflow::new(DELAY);

        let outcome = wf.share(&session, &backend, 7, "Hello").await;

        assert_eq!(outcome, ShareOutcome::Posted);
        let state = wf.state();
        assert_eq!(state.status, PublishStatus::Succeeded(7));
        assert_eq!(state.status_message, POSTED_MESSAGE);
        assert_eq!(state.in_flight_item(), Some(7));
        assert_eq!(*backend.shared_texts.lock().unwrap(), vec!["Hello"]);

        tokio::time::advance(DELAY - Duration::from_millis(1)).await;
        settle().await;
        assert!(wf.is_busy());
        assert!(wf.has_pending_reset());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(wf.state(), PublishState::default());
        assert!(!wf.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_window_starts_when_share_settles() {
        let session = logged_in();
        let backend = FakeBackend::default();
        let wf = PublishWorkflow::new(DELAY);
        wf.share(&session, &backend, 4, "Hello").await;

        // The clock moves before the reset task has had a chance to run.
        tokio::time::advance(DELAY).await;
        settle().await;

        assert_eq!(wf.state(), PublishState::default());
        assert!(!wf.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn second_share_while_in_flight_is_a_no_op() {
        let session = Arc::new(logged_in());
        let backend = Arc::new(FakeBackend::default());
        backend.hold_share.store(true, Ordering::SeqCst);
        let wf = Arc::new(PublishWorkflow::new(DELAY));

        let first = {
            let (session, backend, wf) = (session.clone(), backend.clone(), wf.clone());
            tokio::spawn(async move { wf.share(&session, backend.as_ref(), 1, "one").await })
        };
        settle().await;
        assert_eq!(wf.state().status, PublishStatus::InFlight(1));
        assert_eq!(wf.state().status_message, SHARING_MESSAGE);

        let second = wf.share(&session, backend.as_ref(), 2, "two").await;
        assert_eq!(second, ShareOutcome::Busy);
        assert_eq!(FakeBackend::count(&backend.share_calls), 1);

        backend.release_share();
        assert_eq!(first.await.unwrap(), ShareOutcome::Posted);

        // Still damped after completion.
        let third = wf.share(&session, backend.as_ref(), 2, "two").await;
        assert_eq!(third, ShareOutcome::Busy);
        assert_eq!(FakeBackend::count(&backend.share_calls), 1);

        tokio::time::advance(DELAY).await;
        settle().await;
        backend.hold_share.store(false, Ordering::SeqCst);
        let fourth = wf.share(&session, backend.as_ref(), 2, "two").await;
        assert_eq!(fourth, ShareOutcome::Posted);
        assert_eq!(FakeBackend::count(&backend.share_calls), 2);
    }

    #[tokio::test]
    async fn share_without_credential_never_calls_backend() {
        let session = SessionStore::new();
        let backend = FakeBackend::default();
        let wf = PublishWorkflow::new(DELAY);

        let outcome = wf.share(&session, &backend, 1, "Hello").await;

        assert_eq!(outcome, ShareOutcome::LoginRequired);
        assert_eq!(FakeBackend::count(&backend.share_calls), 0);
        assert_eq!(wf.state(), PublishState::default());
        assert!(!wf.has_pending_reset());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_message_carries_server_detail_and_resets() {
        let session = logged_in();
        let backend = FakeBackend::default();
        *backend.share_result.lock().unwrap() = Err(GatewayError::Share {
            detail: Some("rate limited".into()),
        });
        let wf = PublishWorkflow::new(DELAY);

        let outcome = wf.share(&session, &backend, 3, "Hello").await;

        assert!(matches!(outcome, ShareOutcome::Failed(_)));
        let state = wf.state();
        assert_eq!(state.status, PublishStatus::Failed(3));
        assert!(state.status_message.contains("rate limited"));
        assert_eq!(*backend.seen_credentials.lock().unwrap(), vec!["abc123"]);

        tokio::time::advance(DELAY).await;
        settle().await;
        assert_eq!(wf.state(), PublishState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_share_still_passes_through_failed_and_resets() {
        let session = Arc::new(logged_in());
        let backend = Arc::new(FakeBackend::default());
        backend.hold_share.store(true, Ordering::SeqCst);
        let wf = Arc::new(PublishWorkflow::new(DELAY));
        let mut rx = wf.subscribe();

        let task = {
            let (session, backend, wf) = (session.clone(), backend.clone(), wf.clone());
            tokio::spawn(async move { wf.share(&session, backend.as_ref(), 5, "x").await })
        };
        settle().await;
        task.abort();
        let _ = task.await;

        let mut seen = vec![rx.borrow_and_update().status];
        assert_eq!(seen[0], PublishStatus::Failed(5));

        tokio::time::advance(DELAY).await;
        settle().await;
        rx.changed().await.unwrap();
        seen.push(rx.borrow_and_update().status);
        assert_eq!(seen, vec![PublishStatus::Failed(5), PublishStatus::Idle]);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_reset() {
        let session = logged_in();
        let backend = FakeBackend::default();
        let wf = PublishWorkflow::new(DELAY);
        wf.share(&session, &backend, 9, "Hello").await;
        assert!(wf.has_pending_reset());

        wf.dispose();
        tokio::time::advance(DELAY * 2).await;
        settle().await;

        assert!(!wf.has_pending_reset());
        assert_eq!(wf.state().status, PublishStatus::Succeeded(9));
    }
}
