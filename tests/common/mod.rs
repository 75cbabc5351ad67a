#![allow(dead_code)]

use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::request::Parts,
    response::Response,
};
use chrono::Utc;
use serde_json::Value;
use sqlx::error::{DatabaseError, ErrorKind};
use tokio::sync::Barrier;
use travel_order_portal::{
    AccessPolicy, AppState,
    access::Identity,
    auth::{self, AuthUser},
    config::AppConfig,
    models::{
        NewTravelOrder, NewUser, Role, SignatureState, Station, TravelOrder, User, UserUpdate,
    },
    repository::{Repository, RepositoryState},
    session::{JwtSessionResolver, SessionError, SessionResolver, SessionState},
    storage::{MockStorageService, StorageState},
};
use uuid::Uuid;

pub const PASSWORD: &str = "secret123";

// --- In-Memory Repository ---

/// Mutex-backed `Repository` used by every router and handler test.
#[derive(Default)]
pub struct InMemoryRepo {
    pub users: Mutex<Vec<User>>,
    pub stations: Mutex<Vec<Station>>,
    pub orders: Mutex<Vec<TravelOrder>>,
    /// When true, every call fails like an unreachable database.
    pub fail: bool,
    /// `get_user_by_email` misses every row, like a lookup that ran just before a
    /// concurrent insert committed. Writes still enforce unique e-mails.
    pub stale_email_lookups: bool,
    /// Holds every `get_travel_order` caller until all parties have read.
    pub read_barrier: Option<Arc<Barrier>>,
}

impl InMemoryRepo {
    pub fn failing() -> Self {
        InMemoryRepo {
            fail: true,
            ..Default::default()
        }
    }

    /// Forces `parties` concurrent reviews to read the same snapshot before any writes.
    pub fn with_read_barrier(parties: usize) -> Self {
        InMemoryRepo {
            read_barrier: Some(Arc::new(Barrier::new(parties))),
            ..Default::default()
        }
    }

    pub fn insert_user(&self, user: User) -> User {
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn insert_order(&self, order: TravelOrder) -> TravelOrder {
        self.orders.lock().unwrap().push(order.clone());
        order
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<TravelOrder> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }

    fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> Result<(), sqlx::Error> {
        let email = email.to_lowercase();
        let taken = self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.email == email && Some(u.id) != owner);
        if taken {
            Err(sqlx::Error::Database(Box::new(UniqueViolation)))
        } else {
            Ok(())
        }
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.fail {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.user(id))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        if self.stale_email_lookups {
            return Ok(None);
        }
        let email = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        self.check()?;
        self.ensure_email_free(&user.email, None)?;
        Ok(self.insert_user(User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email.to_lowercase(),
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            station_id: user.station_id,
            position_designation: user.position_designation,
            signature: user.signature,
            image: None,
            created_at: Utc::now(),
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        self.check()?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        if let Some(email) = &update.email {
            self.ensure_email_free(email, Some(id))?;
        }
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email.to_lowercase();
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }

    async fn list_stations(&self) -> Result<Vec<Station>, sqlx::Error> {
        self.check()?;
        Ok(self.stations.lock().unwrap().clone())
    }

    async fn create_travel_order(&self, order: NewTravelOrder) -> Result<TravelOrder, sqlx::Error> {
        self.check()?;
        let req = order.request;
        let now = Utc::now();
        Ok(self.insert_order(TravelOrder {
            id: Uuid::new_v4(),
            code: order.code,
            user_id: order.user_id,
            purpose: req.purpose,
            host: req.host,
            inclusive_dates: req.inclusive_dates,
            destination: req.destination,
            fund_source: req.fund_source,
            attached_file: req.attached_file,
            additional_participants: req.additional_participants.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }))
    }

    async fn get_travel_order(&self, id: Uuid) -> Result<Option<TravelOrder>, sqlx::Error> {
        self.check()?;
        let order = self.order(id);
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(order)
    }

    async fn get_travel_orders_by_user(&self, user_id: Uuid) -> Result<Vec<TravelOrder>, sqlx::Error> {
        self.check()?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_open_travel_orders(&self) -> Result<Vec<TravelOrder>, sqlx::Error> {
        self.check()?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| !o.is_disapproved && !o.is_final_approval_signed)
            .cloned()
            .collect())
    }

    async fn set_travel_order_signatures(
        &self,
        id: Uuid,
        expected: SignatureState,
        next: SignatureState,
    ) -> Result<Option<TravelOrder>, sqlx::Error> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders
            .iter_mut()
            .find(|o| o.id == id && o.signatures() == expected)
        else {
            return Ok(None);
        };
        order.is_recommending_approval_signed = next.recommending;
        order.is_final_approval_signed = next.final_approval;
        order.is_disapproved = next.disapproved;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

/// What Postgres reports for a write hitting `users_email_key`.
#[derive(Debug)]
pub struct UniqueViolation;

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("duplicate key value violates unique constraint \"users_email_key\"")
    }
}

impl std::error::Error for UniqueViolation {}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint \"users_email_key\""
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some("users_email_key")
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

// --- Fabricated Session Resolvers ---

/// Always resolves to the same identity.
pub struct FixedSession(pub Identity);

#[async_trait]
impl SessionResolver for FixedSession {
    async fn resolve(&self, _parts: &Parts) -> Result<Identity, SessionError> {
        Ok(self.0)
    }
}

/// Always fails, like a session store that is down.
pub struct FailingSession;

#[async_trait]
impl SessionResolver for FailingSession {
    async fn resolve(&self, _parts: &Parts) -> Result<Identity, SessionError> {
        Err(SessionError::Other("session store offline".to_string()))
    }
}

/// Would resolve to `identity`, but only after `delay`.
pub struct SlowSession {
    pub delay: Duration,
    pub identity: Identity,
}

#[async_trait]
impl SessionResolver for SlowSession {
    async fn resolve(&self, _parts: &Parts) -> Result<Identity, SessionError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.identity)
    }
}

// --- Fixtures ---

pub fn make_user(role: &str, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: format!("{role} user"),
        email: email.to_string(),
        password_hash: auth::hash_password(PASSWORD).unwrap(),
        role: role.to_string(),
        created_at: Utc::now(),
        ..Default::default()
    }
}

pub fn make_order(owner: Uuid) -> TravelOrder {
    TravelOrder {
        id: Uuid::new_v4(),
        code: "TO-01-02-25-AB".to_string(),
        user_id: owner,
        purpose: "Regional planning workshop".to_string(),
        host: "Regional Office".to_string(),
        inclusive_dates: "March 3-5, 2025".to_string(),
        destination: "Cebu City".to_string(),
        fund_source: "MOOE".to_string(),
        attached_file: format!("attachments/{owner}/memo.pdf"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..Default::default()
    }
}

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: Role::parse(&user.role).expect("fixture user has a known role"),
    }
}

pub fn identity_of(user: &User) -> Identity {
    Identity::Authenticated {
        user_id: user.id,
        role: Role::parse(&user.role).expect("fixture user has a known role"),
    }
}

// --- State Builders ---

pub fn build_state(repo: Arc<InMemoryRepo>, sessions: SessionState, config: AppConfig) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        sessions,
        policy: Arc::new(AccessPolicy::default()),
        config,
    }
}

/// State whose session resolver always yields `identity`.
pub fn state_as(repo: Arc<InMemoryRepo>, identity: Identity) -> AppState {
    build_state(repo, Arc::new(FixedSession(identity)), AppConfig::default())
}

/// State wired with the real JWT session resolver.
pub fn jwt_state(repo: Arc<InMemoryRepo>, config: AppConfig) -> AppState {
    let sessions = Arc::new(JwtSessionResolver::new(
        repo.clone() as RepositoryState,
        config.clone(),
    )) as SessionState;
    build_state(repo, sessions, config)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub fn empty() -> Body {
    Body::empty()
}
