//! In-memory backend for workflow tests.

use super::Backend;
use crate::error::GatewayError;
use crate::model::{
    Credential, GeneratedItem, GeneratedPost, GenerationRequest, IdentityProfile, ShareRequest,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub(crate) fn item(id: i64, text: &str, created_at: &str) -> GeneratedItem {
    GeneratedItem {
        id,
        post_text: text.to_string(),
        created_at: created_at.to_string(),
    }
}

pub(crate) struct FakeBackend {
    pub profile: Mutex<Result<IdentityProfile, GatewayError>>,
    pub posts: Mutex<Result<Vec<GeneratedItem>, GatewayError>>,
    pub generated: Mutex<Result<GeneratedPost, GatewayError>>,
    pub share_result: Mutex<Result<(), GatewayError>>,

    pub profile_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub share_calls: AtomicUsize,
    pub shared_texts: Mutex<Vec<String>>,
    pub seen_credentials: Mutex<Vec<String>>,

    /// While set, `share` parks until [`FakeBackend::release_share`].
    pub hold_share: AtomicBool,
    share_release: Notify,
    /// While set, `generate` never completes.
    pub hang_generate: AtomicBool,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            profile: Mutex::new(Ok(IdentityProfile {
                name: "Ada Lovelace".into(),
                picture: "https://img.example/ada.png".into(),
            })),
            posts: Mutex::new(Ok(Vec::new())),
            generated: Mutex::new(Ok(GeneratedPost {
                post_text: "Hello".into(),
            })),
            share_result: Mutex::new(Ok(())),
            profile_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            share_calls: AtomicUsize::new(0),
            shared_texts: Mutex::new(Vec::new()),
            seen_credentials: Mutex::new(Vec::new()),
            hold_share: AtomicBool::new(false),
            share_release: Notify::new(),
            hang_generate: AtomicBool::new(false),
        }
    }
}

impl FakeBackend {
    pub fn with_posts(posts: Vec<GeneratedItem>) -> Self {
        let fake = Self::default();
        *fake.posts.lock().unwrap() = Ok(posts);
        fake
    }

    pub fn release_share(&self) {
        self.share_release.notify_one();
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_profile(&self, cred: &Credential) -> Result<IdentityProfile, GatewayError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_credentials
            .lock()
            .unwrap()
            .push(cred.as_str().to_string());
        self.profile.lock().unwrap().clone()
    }

    async fn list_posts(&self) -> Result<Vec<GeneratedItem>, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.posts.lock().unwrap().clone()
    }

    async fn generate(&self, _req: &GenerationRequest) -> Result<GeneratedPost, GatewayError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_generate.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        self.generated.lock().unwrap().clone()
    }

    async fn share(&self, cred: &Credential, req: &ShareRequest) -> Result<(), GatewayError> {
        self.share_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_credentials
            .lock()
            .unwrap()
            .push(cred.as_str().to_string());
        self.shared_texts.lock().unwrap().push(req.post_text.clone());
        if self.hold_share.load(Ordering::SeqCst) {
            self.share_release.notified().await;
        }
        self.share_result.lock().unwrap().clone()
    }
}
