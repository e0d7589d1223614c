#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockito::{Mock, Server};
use sessiontron::config::IdentityProviderConfig;
use sessiontron::gateway::IdentityProviderGateway;
use sessiontron::prompt::{AuthorizationPrompt, AuthorizationRequest, PromptOutcome};
use sessiontron::store::{MemoryStore, Store, PROFILE_KEY, TOKEN_KEY};
use sessiontron::AuthSession;
use tokio::sync::{mpsc, oneshot};

pub fn provider_config(base: &str) -> IdentityProviderConfig {
    IdentityProviderConfig {
        name: "test-idp".to_string(),
        client_id: "client-123".to_string(),
        scopes: vec!["openid".into(), "profile".into(), "email".into()],
        audience: None,
        authorization_endpoint: format!("{}/authorize", base),
        token_endpoint: format!("{}/oauth/token", base),
        userinfo_endpoint: format!("{}/userinfo", base),
        revocation_endpoint: Some(format!("{}/oauth/revoke", base)),
        redirect_uri: "testproject1://auth/callback".to_string(),
        timeout_in_ms: 2_000,
        revoke_on_logout: false,
    }
}

pub fn build_session(
    config: &IdentityProviderConfig,
    prompt: Arc<dyn AuthorizationPrompt>,
    store: Arc<dyn Store>,
) -> AuthSession {
    let gateway = IdentityProviderGateway::new(config).expect("gateway should build");
    AuthSession::new(gateway, prompt, store)
}

/// What the fake authorization screen does with the next request.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Redirect back with this code and the request's own state.
    Code(&'static str),
    /// Redirect back with a code but someone else's state.
    CodeWithState(&'static str, &'static str),
    /// Redirect back "successfully" without a code.
    NoCode,
    /// Anything else, verbatim.
    Outcome(PromptOutcome),
}

pub fn success_for(request: &AuthorizationRequest, code: &str) -> PromptOutcome {
    PromptOutcome::Success {
        code: Some(code.to_string()),
        state: Some(request.state.clone()),
    }
}

/// Answers authorization requests from a fixed script, recording each request.
#[derive(Default)]
pub struct ScriptedPrompt {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<AuthorizationRequest>>,
}

impl ScriptedPrompt {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(ScriptedPrompt {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthorizationPrompt for ScriptedPrompt {
    async fn authorize(&self, request: AuthorizationRequest) -> PromptOutcome {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Outcome(PromptOutcome::Dismiss));
        match reply {
            Reply::Code(code) => success_for(&request, code),
            Reply::CodeWithState(code, state) => PromptOutcome::Success {
                code: Some(code.to_string()),
                state: Some(state.to_string()),
            },
            Reply::NoCode => PromptOutcome::Success {
                code: None,
                state: Some(request.state.clone()),
            },
            Reply::Outcome(outcome) => outcome,
        }
    }
}

pub type PendingAuthorization = (AuthorizationRequest, oneshot::Sender<PromptOutcome>);

/// Hands every request to the test, which decides when and how the user finishes.
pub struct ChannelPrompt {
    tx: mpsc::UnboundedSender<PendingAuthorization>,
}

impl ChannelPrompt {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingAuthorization>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelPrompt { tx }), rx)
    }
}

#[async_trait]
impl AuthorizationPrompt for ChannelPrompt {
    async fn authorize(&self, request: AuthorizationRequest) -> PromptOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((request, reply_tx)).is_err() {
            return PromptOutcome::Cancel;
        }
        reply_rx.await.unwrap_or(PromptOutcome::Cancel)
    }
}

/// A memory store whose operations can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_gets(&self, on: bool) {
        self.fail_get.store(on, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, on: bool) {
        self.fail_set.store(on, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, on: bool) {
        self.fail_remove.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err("read failed".to_string());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err("write failed".to_string());
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err("erase failed".to_string());
        }
        self.inner.remove(key).await
    }
}

/// Raw `(token, profile)` slots as currently persisted.
pub async fn persisted(store: &dyn Store) -> (Option<String>, Option<String>) {
    (
        store.get(TOKEN_KEY).await.unwrap(),
        store.get(PROFILE_KEY).await.unwrap(),
    )
}

pub async fn mock_exchange(server: &mut Server, code: &str, body: &str) -> Mock {
    server
        .mock("POST", "/oauth/token")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            mockito::Matcher::UrlEncoded("code".into(), code.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

pub async fn mock_userinfo(server: &mut Server, token: &str, body: &str) -> Mock {
    server
        .mock("GET", "/userinfo")
        .match_header("authorization", format!("Bearer {}", token).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}
