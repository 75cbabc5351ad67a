use crate::models::{NewTravelOrder, NewUser, SignatureState, Station, TravelOrder, User, UserUpdate};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Abstract contract for all persistence operations. Handlers and the session
/// resolver only see `Arc<dyn Repository>`, so tests can swap in an in-memory store.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error>;
    // Partial update; `None` fields keep their current value.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, sqlx::Error>;

    // --- Stations ---
    async fn list_stations(&self) -> Result<Vec<Station>, sqlx::Error>;

    // --- Travel Orders ---
    async fn create_travel_order(&self, order: NewTravelOrder) -> Result<TravelOrder, sqlx::Error>;
    async fn get_travel_order(&self, id: Uuid) -> Result<Option<TravelOrder>, sqlx::Error>;
    async fn get_travel_orders_by_user(&self, user_id: Uuid) -> Result<Vec<TravelOrder>, sqlx::Error>;
    // Orders still waiting for a signature: not disapproved, not finally approved.
    async fn get_open_travel_orders(&self) -> Result<Vec<TravelOrder>, sqlx::Error>;
    // Compare-and-set: writes `next` only while the stored flags still equal
    // `expected`. `None` when the order is missing or was reviewed in between.
    async fn set_travel_order_signatures(
        &self,
        id: Uuid,
        expected: SignatureState,
        next: SignatureState,
    ) -> Result<Option<TravelOrder>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, station_id, \
                            position_designation, signature, image, created_at";

const TRAVEL_ORDER_COLUMNS: &str = "id, code, user_id, purpose, host, inclusive_dates, \
                                    destination, fund_source, attached_file, additional_participants, \
                                    is_recommending_approval_signed, is_final_approval_signed, \
                                    is_disapproved, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// E-mail lookups are case-insensitive; addresses are stored lowercased.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, station_id,
                               position_designation, signature, created_at)
            VALUES ($1, $2, lower($3), $4, $5, $6, $7, $8, NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.station_id)
        .bind(user.position_designation)
        .bind(user.signature)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE(lower($3), email),
                password_hash = COALESCE($4, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.password_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_stations(&self) -> Result<Vec<Station>, sqlx::Error> {
        sqlx::query_as::<_, Station>("SELECT id, unit FROM stations ORDER BY unit ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_travel_order(&self, order: NewTravelOrder) -> Result<TravelOrder, sqlx::Error> {
        let req = order.request;
        sqlx::query_as::<_, TravelOrder>(&format!(
            r#"
            INSERT INTO travel_orders (id, code, user_id, purpose, host, inclusive_dates,
                                       destination, fund_source, attached_file,
                                       additional_participants, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {TRAVEL_ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order.code)
        .bind(order.user_id)
        .bind(req.purpose)
        .bind(req.host)
        .bind(req.inclusive_dates)
        .bind(req.destination)
        .bind(req.fund_source)
        .bind(req.attached_file)
        .bind(req.additional_participants.unwrap_or_default())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_travel_order(&self, id: Uuid) -> Result<Option<TravelOrder>, sqlx::Error> {
        sqlx::query_as::<_, TravelOrder>(&format!(
            "SELECT {TRAVEL_ORDER_COLUMNS} FROM travel_orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_travel_orders_by_user(&self, user_id: Uuid) -> Result<Vec<TravelOrder>, sqlx::Error> {
        sqlx::query_as::<_, TravelOrder>(&format!(
            "SELECT {TRAVEL_ORDER_COLUMNS} FROM travel_orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_open_travel_orders(&self) -> Result<Vec<TravelOrder>, sqlx::Error> {
        sqlx::query_as::<_, TravelOrder>(&format!(
            r#"
            SELECT {TRAVEL_ORDER_COLUMNS} FROM travel_orders
            WHERE is_disapproved = false AND is_final_approval_signed = false
            ORDER BY created_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn set_travel_order_signatures(
        &self,
        id: Uuid,
        expected: SignatureState,
        next: SignatureState,
    ) -> Result<Option<TravelOrder>, sqlx::Error> {
        sqlx::query_as::<_, TravelOrder>(&format!(
            r#"
            UPDATE travel_orders
            SET is_recommending_approval_signed = $2,
                is_final_approval_signed = $3,
                is_disapproved = $4,
                updated_at = NOW()
            WHERE id = $1
              AND is_recommending_approval_signed = $5
              AND is_final_approval_signed = $6
              AND is_disapproved = $7
            RETURNING {TRAVEL_ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(next.recommending)
        .bind(next.final_approval)
        .bind(next.disapproved)
        .bind(expected.recommending)
        .bind(expected.final_approval)
        .bind(expected.disapproved)
        .fetch_optional(&self.pool)
        .await
    }
}
