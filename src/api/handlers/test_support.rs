//! In-memory stores and request helpers for router-level tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

use super::{
    articles::{
        ArticleFilter, ArticlePatch, ArticleRecord, ArticleStore, AuthorRecord, NewArticle,
    },
    auth::{AuthConfig, AuthState, Credentials, SessionRecord, SessionRepository, Sessions},
    patch::{self, KeyPredicate, PatchError},
    users::{InsertOutcome, NewUser, UserPatch, UserRecord, UserStore},
};
use crate::api::app;

struct StoredUser {
    record: UserRecord,
    password_digest: String,
}

struct StoredArticle {
    user_id: i64,
    title: String,
    slug: String,
    description: Option<String>,
    body: Option<String>,
    tag_list: Vec<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Default)]
struct State {
    tick: u32,
    next_user_id: i64,
    next_article_id: i64,
    users: BTreeMap<i64, StoredUser>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
    articles: BTreeMap<i64, StoredArticle>,
}

impl State {
    fn timestamp(&mut self) -> String {
        self.tick += 1;
        format!(
            "2026-01-01T{:02}:{:02}:{:02}Z",
            self.tick / 3600 % 24,
            self.tick / 60 % 60,
            self.tick % 60
        )
    }

    fn article_record(&self, id: i64, article: &StoredArticle) -> Option<ArticleRecord> {
        let author = &self.users.get(&article.user_id)?.record;
        Some(ArticleRecord {
            id,
            author: AuthorRecord {
                id: author.id,
                username: author.username.clone(),
                image: author.image.clone(),
            },
            title: article.title.clone(),
            slug: article.slug.clone(),
            description: article.description.clone(),
            body: article.body.clone(),
            tag_list: article.tag_list.clone(),
            created_at: article.created_at.clone(),
            updated_at: article.updated_at.clone(),
        })
    }

    fn taken_by_other(&self, id: i64, email: Option<&str>, username: Option<&str>) -> bool {
        self.users.values().any(|user| {
            user.record.id != id
                && (email == Some(user.record.email.as_str())
                    || username == Some(user.record.username.as_str()))
        })
    }
}

/// One store behind every capability trait, so a test router shares a single
/// view of users, sessions and articles.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every storage call fail until switched back.
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Move every session of `user_id` back in time.
    pub(crate) fn backdate_sessions(&self, user_id: i64, seconds: i64) {
        for record in self.state().sessions.values_mut() {
            if record.user_id == user_id {
                record.created_at_unix -= seconds;
            }
        }
    }

    pub(crate) fn session_count(&self, user_id: i64) -> usize {
        self.state()
            .sessions
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }

    pub(crate) fn password_digest_of(&self, user_id: i64) -> Option<String> {
        self.state()
            .users
            .get(&user_id)
            .map(|user| user.password_digest.clone())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Storage calls served so far, failed ones included.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn online(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            Err(anyhow!("store offline"))
        } else {
            Ok(())
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert(&self, token_hash: &[u8], user_id: i64) -> Result<bool> {
        self.online()?;
        let mut state = self.state();
        if state.sessions.contains_key(token_hash) {
            return Ok(false);
        }
        state.sessions.insert(
            token_hash.to_vec(),
            SessionRecord {
                user_id,
                created_at_unix: now_unix(),
            },
        );
        Ok(true)
    }

    async fn find(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        self.online()?;
        Ok(self.state().sessions.get(token_hash).copied())
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        self.online()?;
        self.state().sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_all(&self, user_id: i64) -> Result<u64> {
        self.online()?;
        let mut state = self.state();
        let before = state.sessions.len();
        state.sessions.retain(|_, record| record.user_id != user_id);
        Ok(u64::try_from(before - state.sessions.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &NewUser) -> Result<InsertOutcome> {
        self.online()?;
        let mut state = self.state();
        if state.taken_by_other(0, Some(&user.email), Some(&user.username)) {
            return Ok(InsertOutcome::Conflict);
        }
        state.next_user_id += 1;
        let id = state.next_user_id;
        let now = state.timestamp();
        let record = UserRecord {
            id,
            email: user.email.clone(),
            username: user.username.clone(),
            bio: None,
            image: None,
            created_at: now.clone(),
            updated_at: now,
        };
        state.users.insert(
            id,
            StoredUser {
                record: record.clone(),
                password_digest: user.password_digest.clone(),
            },
        );
        Ok(InsertOutcome::Created(record))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(UserRecord, String)>> {
        self.online()?;
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.record.email == email)
            .map(|user| (user.record.clone(), user.password_digest.clone())))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        self.online()?;
        Ok(self.state().users.get(&id).map(|user| user.record.clone()))
    }

    async fn password_digest(&self, id: i64) -> Result<Option<String>> {
        self.online()?;
        Ok(self.password_digest_of(id))
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        self.online()?;
        Ok(self.state().taken_by_other(0, Some(email), None))
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        self.online()?;
        Ok(self.state().taken_by_other(0, None, Some(username)))
    }

    async fn partial_update(&self, patch: &UserPatch, id: i64) -> Result<u64, PatchError> {
        patch::build(patch, &KeyPredicate::new("id", id))?;
        self.online()?;

        let mut state = self.state();
        if !state.users.contains_key(&id) {
            return Ok(0);
        }
        if state.taken_by_other(id, patch.email.as_deref(), patch.username.as_deref()) {
            return Err(PatchError::Conflict);
        }
        let now = state.timestamp();
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(0);
        };
        if let Some(email) = &patch.email {
            user.record.email.clone_from(email);
        }
        if let Some(digest) = &patch.password_digest {
            user.password_digest.clone_from(digest);
        }
        if let Some(username) = &patch.username {
            user.record.username.clone_from(username);
        }
        if let Some(bio) = &patch.bio {
            user.record.bio = Some(bio.clone());
        }
        if let Some(image) = &patch.image {
            user.record.image = Some(image.clone());
        }
        user.record.updated_at = now;
        Ok(1)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.online()?;
        let mut state = self.state();
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.sessions.retain(|_, record| record.user_id != id);
        state.articles.retain(|_, article| article.user_id != id);
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        self.online()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create(&self, article: &NewArticle) -> Result<i64> {
        self.online()?;
        let mut state = self.state();
        state.next_article_id += 1;
        let id = state.next_article_id;
        let now = state.timestamp();
        state.articles.insert(
            id,
            StoredArticle {
                user_id: article.user_id,
                title: article.title.clone(),
                slug: article.slug.clone(),
                description: article.description.clone(),
                body: article.body.clone(),
                tag_list: article.tag_list.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleRecord>> {
        self.online()?;
        let state = self.state();
        Ok(state
            .articles
            .iter()
            .rev()
            .filter_map(|(id, article)| state.article_record(*id, article))
            .filter(|record| match filter {
                ArticleFilter::All => true,
                ArticleFilter::Author(username) => &record.author.username == username,
                ArticleFilter::Tag(tag) => record.tag_list.contains(tag),
            })
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>> {
        self.online()?;
        let state = self.state();
        Ok(state
            .articles
            .get(&id)
            .and_then(|article| state.article_record(id, article)))
    }

    async fn partial_update(
        &self,
        patch: &ArticlePatch,
        id: i64,
        owner: i64,
    ) -> Result<u64, PatchError> {
        patch::build(patch, &KeyPredicate::new("id", id).and("user_id", owner))?;
        self.online()?;

        let mut state = self.state();
        let now = state.timestamp();
        let Some(article) = state
            .articles
            .get_mut(&id)
            .filter(|article| article.user_id == owner)
        else {
            return Ok(0);
        };
        if let Some(body) = &patch.body {
            article.body = Some(body.clone());
        }
        if let Some(description) = &patch.description {
            article.description = Some(description.clone());
        }
        if let Some(title) = &patch.title {
            article.title.clone_from(title);
        }
        if let Some(slug) = &patch.slug {
            article.slug.clone_from(slug);
        }
        if let Some(tag_list) = &patch.tag_list {
            article.tag_list.clone_from(tag_list);
        }
        article.updated_at = now;
        Ok(1)
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool> {
        self.online()?;
        let mut state = self.state();
        let owned = state
            .articles
            .get(&id)
            .is_some_and(|article| article.user_id == owner);
        if owned {
            state.articles.remove(&id);
        }
        Ok(owned)
    }
}

/// Cheap argon2 parameters; production cost would dominate the test run.
fn test_credentials() -> Credentials {
    Credentials::with_params(1024, 1, 1).expect("argon2 test params are valid")
}

pub(crate) fn sessions(store: &Arc<MemoryStore>, ttl_seconds: i64) -> Sessions {
    Sessions::new(store.clone(), ttl_seconds)
}

pub(crate) fn test_router_with(store: &Arc<MemoryStore>, config: AuthConfig) -> Router {
    let auth_state = Arc::new(AuthState::new(config, store.clone(), test_credentials()));
    app(auth_state, store.clone(), store.clone())
}

pub(crate) fn test_router(store: &Arc<MemoryStore>) -> Router {
    test_router_with(store, AuthConfig::new())
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub(crate) fn error_message(&self) -> Option<&str> {
        self.body["error"]["message"].as_str()
    }
}

pub(crate) struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

pub(crate) fn request(method: Method, uri: &str) -> TestRequest {
    TestRequest {
        method,
        uri: uri.to_string(),
        headers: Vec::new(),
        body: None,
    }
}

impl TestRequest {
    pub(crate) fn token(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), &format!("Token {token}"))
    }

    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub(crate) fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) async fn send(self, router: &Router) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match self.body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("valid test request");

        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Register a user and return its id.
pub(crate) async fn register(router: &Router, email: &str, username: &str, password: &str) -> i64 {
    let response = request(Method::POST, "/api/users")
        .json(json!({"user": {"email": email, "username": username, "password": password}}))
        .send(router)
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["user"]["id"]
        .as_i64()
        .expect("registered user has an id")
}

/// Log in and return the session token from the `Authorization` header.
pub(crate) async fn login(router: &Router, email: &str, password: &str) -> String {
    let response = request(Method::POST, "/api/users/login")
        .json(json!({"user": {"email": email, "password": password}}))
        .send(router)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .expect("login returns a token")
        .to_string()
}
