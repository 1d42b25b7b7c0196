//! User and bank-account-link storage.
//!
//! The repository exposes a narrow set of typed operations. Linking an
//! account and flipping the owner's `verified` flag happen in one unit: both
//! take effect or neither does.

use crate::models::{User, UserBankAccount};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("bank account already linked to this user")]
    DuplicateLink,

    #[error("user does not exist")]
    UserMissing,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository state poisoned")]
    Poisoned,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Cheap liveness probe of the backing store.
    async fn health_check(&self) -> Result<(), RepositoryError>;

    async fn create_user(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// The link this user already holds for the pair, if any.
    async fn find_linked_account_for_user(
        &self,
        user_id: Uuid,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError>;

    /// Earliest link for the pair across all users.
    async fn find_linked_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError>;

    /// Persist the link and mark its owner verified, atomically.
    ///
    /// Fails with [`RepositoryError::DuplicateLink`] when the owner already
    /// holds a link for the same (bank code, account number), including one
    /// committed concurrently, and with [`RepositoryError::UserMissing`] when
    /// the owner does not exist. Nothing is written in either case.
    async fn create_linked_account(&self, link: &UserBankAccount) -> Result<(), RepositoryError>;
}

// -----------------------------------------------------------------------------
// PostgreSQL
// -----------------------------------------------------------------------------

const USER_COLUMNS: &str =
    "user_id, email, name, password_hash, password_salt, verified, created_utc, updated_utc";

const LINK_COLUMNS: &str =
    "link_id, user_id, bank_code, account_number, account_name, created_utc, updated_utc";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, name, password_hash, password_salt, verified, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password.hash)
        .bind(&user.password.salt)
        .bind(user.verified)
        .bind(user.created_utc)
        .bind(user.updated_utc)
        .execute(&self.pool)
        .await?;

        timer.observe_duration();
        info!("User created");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_id"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_linked_account_for_user(
        &self,
        user_id: Uuid,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_linked_account_for_user"])
            .start_timer();

        let link = sqlx::query_as::<_, UserBankAccount>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM user_bank_accounts
            WHERE user_id = $1 AND bank_code = $2 AND account_number = $3
            "#
        ))
        .bind(user_id)
        .bind(bank_code)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(link)
    }

    #[instrument(skip(self))]
    async fn find_linked_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_linked_account"])
            .start_timer();

        let link = sqlx::query_as::<_, UserBankAccount>(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM user_bank_accounts
            WHERE bank_code = $1 AND account_number = $2
            ORDER BY created_utc ASC
            LIMIT 1
            "#
        ))
        .bind(bank_code)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(link)
    }

    #[instrument(
        skip(self, link),
        fields(
            user_id = %link.user_id,
            link_id = %link.link_id,
            bank_code = %link.bank_account.bank_code,
            account_number = %link.bank_account.account_number
        )
    )]
    async fn create_linked_account(&self, link: &UserBankAccount) -> Result<(), RepositoryError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_linked_account"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        // Row lock on the owner serializes concurrent links for the same user.
        let updated = sqlx::query(
            "UPDATE users SET verified = TRUE, updated_utc = NOW() WHERE user_id = $1",
        )
        .bind(link.user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(RepositoryError::UserMissing);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_bank_accounts (link_id, user_id, bank_code, account_number, account_name, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(link.link_id)
        .bind(link.user_id)
        .bind(&link.bank_account.bank_code)
        .bind(&link.bank_account.account_number)
        .bind(&link.bank_account.account_name)
        .bind(link.created_utc)
        .bind(link.updated_utc)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await.ok();
                return Err(RepositoryError::DuplicateLink);
            }
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_foreign_key_violation() => {
                tx.rollback().await.ok();
                return Err(RepositoryError::UserMissing);
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        timer.observe_duration();

        info!("Bank account linked and user verified");
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// In-memory
// -----------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    links: Vec<UserBankAccount>,
}

/// Process-local repository. One mutex guards users and links together.
#[derive(Default)]
pub struct InMemoryUserRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self.state.lock().map_err(|_| RepositoryError::Poisoned)?;
        f(&mut state)
    }

    /// Number of stored links, across all users.
    pub fn link_count(&self) -> Result<usize, RepositoryError> {
        self.with_state(|s| Ok(s.links.len()))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.with_state(|_| Ok(()))
    }

    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.with_state(|s| {
            s.users.insert(user.user_id, user.clone());
            Ok(())
        })
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.with_state(|s| Ok(s.users.get(&user_id).cloned()))
    }

    async fn find_linked_account_for_user(
        &self,
        user_id: Uuid,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError> {
        self.with_state(|s| {
            Ok(s.links
                .iter()
                .find(|l| l.user_id == user_id && l.is_for(bank_code, account_number))
                .cloned())
        })
    }

    async fn find_linked_account(
        &self,
        bank_code: &str,
        account_number: &str,
    ) -> Result<Option<UserBankAccount>, RepositoryError> {
        self.with_state(|s| {
            Ok(s.links
                .iter()
                .filter(|l| l.is_for(bank_code, account_number))
                .min_by_key(|l| l.created_utc)
                .cloned())
        })
    }

    async fn create_linked_account(&self, link: &UserBankAccount) -> Result<(), RepositoryError> {
        self.with_state(|s| {
            let duplicate = s.links.iter().any(|l| {
                l.user_id == link.user_id
                    && l.is_for(
                        &link.bank_account.bank_code,
                        &link.bank_account.account_number,
                    )
            });
            if duplicate {
                return Err(RepositoryError::DuplicateLink);
            }

            let user = s
                .users
                .get_mut(&link.user_id)
                .ok_or(RepositoryError::UserMissing)?;
            user.verified = true;
            user.updated_utc = chrono::Utc::now();

            s.links.push(link.clone());
            Ok(())
        })
    }
}
