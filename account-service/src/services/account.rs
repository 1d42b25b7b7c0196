//! Registration and bank-account linking.

use crate::models::{
    BankAccount, User, UserBankAccount, MAX_ACCOUNT_NAME_LEN, MAX_ACCOUNT_NUMBER_LEN,
    MAX_BANK_CODE_LEN, MAX_EMAIL_LEN, MAX_NAME_LEN,
};
use crate::services::context::RequestContext;
use crate::services::error::ServiceError;
use crate::services::metrics::{record_link_outcome, USERS_REGISTERED_TOTAL};
use crate::services::name_match;
use crate::services::repository::UserRepository;
use crate::services::resolver::AccountResolver;
use crate::utils::{hash_password, Password};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn UserRepository>,
    resolver: Arc<dyn AccountResolver>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn UserRepository>, resolver: Arc<dyn AccountResolver>) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    pub fn repository(&self) -> &Arc<dyn UserRepository> {
        &self.repository
    }

    /// Register a new, unverified user.
    #[instrument(skip(self, ctx, name, email, password), fields(request_id = ctx.request_id()))]
    pub async fn register_user(
        &self,
        ctx: &RequestContext,
        name: &str,
        email: &str,
        password: Password,
    ) -> Result<User, ServiceError> {
        require("name", name, MAX_NAME_LEN)?;
        require("email", email, MAX_EMAIL_LEN)?;
        if password.is_blank() {
            return Err(ServiceError::Validation("password is required".to_string()));
        }

        // scrypt is CPU and memory bound; keep it off the async workers.
        let credential = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Hashing(anyhow::anyhow!("Hashing task failed: {}", e)))?
            .map_err(ServiceError::Hashing)?;

        let user = User::new(email, name, credential);
        self.repository.create_user(&user).await?;

        USERS_REGISTERED_TOTAL.inc();
        info!(user_id = %user.user_id, "User registered");

        Ok(user)
    }

    /// Verify `account` with the provider and link it to the user.
    ///
    /// On success the user is verified and the link persisted together.
    /// Any failure leaves the user and their links exactly as they were.
    #[instrument(
        skip(self, ctx, account),
        fields(
            request_id = ctx.request_id(),
            user_id = %user_id,
            bank_code = %account.bank_code,
            account_number = %account.account_number
        )
    )]
    pub async fn link_account(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        account: BankAccount,
    ) -> Result<bool, ServiceError> {
        require("bank_code", &account.bank_code, MAX_BANK_CODE_LEN)?;
        require("account_number", &account.account_number, MAX_ACCOUNT_NUMBER_LEN)?;
        require("account_name", &account.account_name, MAX_ACCOUNT_NAME_LEN)?;

        let result = self.verify_and_link(ctx, user_id, account).await;

        let outcome = match &result {
            Ok(_) => "verified",
            Err(ServiceError::DuplicateAccount) => "duplicate",
            Err(ServiceError::NameMismatch) => "name_mismatch",
            Err(ServiceError::Resolution(_)) => "resolution_failed",
            Err(_) => "error",
        };
        record_link_outcome(outcome);

        result
    }

    async fn verify_and_link(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        account: BankAccount,
    ) -> Result<bool, ServiceError> {
        self.repository
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if self
            .repository
            .find_linked_account_for_user(user_id, &account.bank_code, &account.account_number)
            .await?
            .is_some()
        {
            warn!("Bank account already linked to user");
            return Err(ServiceError::DuplicateAccount);
        }

        let resolved = self
            .resolver
            .resolve(ctx, &account.bank_code, &account.account_number)
            .await?;

        if !name_match::matches(&account.account_name, &resolved.account_name) {
            warn!("Claimed account name does not match provider record");
            return Err(ServiceError::NameMismatch);
        }

        // A concurrent duplicate that slipped past the pre-check fails here.
        let link = UserBankAccount::new(user_id, account);
        self.repository.create_linked_account(&link).await?;

        info!(link_id = %link.link_id, "Bank account linked");
        Ok(true)
    }

    /// Claimed holder name stored on the earliest link for the pair.
    #[instrument(skip(self, ctx), fields(request_id = ctx.request_id()))]
    pub async fn resolve_linked_account_name(
        &self,
        ctx: &RequestContext,
        bank_code: &str,
        account_number: &str,
    ) -> Result<String, ServiceError> {
        require("bank_code", bank_code, MAX_BANK_CODE_LEN)?;
        require("account_number", account_number, MAX_ACCOUNT_NUMBER_LEN)?;

        let link = self
            .repository
            .find_linked_account(bank_code, account_number)
            .await?
            .ok_or(ServiceError::AccountNotFound)?;

        Ok(link.bank_account.account_name)
    }
}

/// Reject input the store cannot hold before any I/O happens.
fn require(field: &str, value: &str, max_len: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    if value.contains('\0') {
        return Err(ServiceError::Validation(format!(
            "{} must not contain NUL characters",
            field
        )));
    }
    if value.chars().count() > max_len {
        return Err(ServiceError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::repository::InMemoryUserRepository;
    use crate::services::resolver::{ResolveError, ResolvedAccount};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolver returning a fixed name, or failing, and counting calls.
    struct StubResolver {
        name: Option<String>,
        calls: AtomicUsize,
    }

    impl StubResolver {
        fn returning(name: &str) -> Self {
            Self {
                name: Some(name.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                name: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountResolver for StubResolver {
        async fn resolve(
            &self,
            _ctx: &RequestContext,
            _bank_code: &str,
            account_number: &str,
        ) -> Result<ResolvedAccount, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.name {
                Some(name) => Ok(ResolvedAccount {
                    account_name: name.clone(),
                    account_number: Some(account_number.to_string()),
                    bank_id: Some(9),
                }),
                None => Err(ResolveError::Status(503)),
            }
        }
    }

    struct Fixture {
        service: AccountService,
        repository: Arc<InMemoryUserRepository>,
        resolver: Arc<StubResolver>,
        ctx: RequestContext,
    }

    fn fixture(resolver: StubResolver) -> Fixture {
        let repository = Arc::new(InMemoryUserRepository::new());
        let resolver = Arc::new(resolver);
        Fixture {
            service: AccountService::new(repository.clone(), resolver.clone()),
            repository,
            resolver,
            ctx: RequestContext::new("test-request"),
        }
    }

    async fn registered(f: &Fixture) -> User {
        f.service
            .register_user(
                &f.ctx,
                "Daniel Oluojomu",
                "daniel@example.com",
                Password::new("correct horse".to_string()),
            )
            .await
            .expect("registration succeeds")
    }

    async fn is_verified(f: &Fixture, user_id: Uuid) -> bool {
        f.repository
            .find_user_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .verified
    }

    fn claim() -> BankAccount {
        BankAccount::new("058", "0001234567", "Daniel Oluojomu")
    }

    #[tokio::test]
    async fn test_register_user_starts_unverified() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));
        let user = registered(&f).await;

        assert!(!user.verified);
        assert_eq!(user.password.hash.len(), 64);
        assert_eq!(user.password.salt.len(), 32);
        assert!(f.repository.find_user_by_id(user.user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_user_rejects_empty_fields() {
        let f = fixture(StubResolver::returning("x"));

        let cases = [
            ("", "a@b.com", "pw"),
            ("Ada", "", "pw"),
            ("Ada", "a@b.com", "   "),
        ];
        for (name, email, password) in cases {
            let err = f
                .service
                .register_user(&f.ctx, name, email, Password::new(password.to_string()))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_link_exact_name_verifies_then_duplicate_rejected() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));
        let user = registered(&f).await;

        let linked = f.service.link_account(&f.ctx, user.user_id, claim()).await;
        assert!(linked.unwrap());
        assert!(is_verified(&f, user.user_id).await);

        let err = f
            .service
            .link_account(&f.ctx, user.user_id, claim())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateAccount));
        assert!(is_verified(&f, user.user_id).await);
        assert_eq!(f.resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_link_within_tolerance_succeeds() {
        let f = fixture(StubResolver::returning("Daniel Olujomu"));
        let user = registered(&f).await;

        assert!(f.service.link_account(&f.ctx, user.user_id, claim()).await.unwrap());
    }

    #[tokio::test]
    async fn test_name_mismatch_leaves_user_unverified() {
        // Three edits away from the claim.
        let f = fixture(StubResolver::returning("Danie Oluojo"));
        let user = registered(&f).await;

        let err = f
            .service
            .link_account(&f.ctx, user.user_id, claim())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NameMismatch));
        assert!(!is_verified(&f, user.user_id).await);
        assert_eq!(f.repository.link_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_name_mismatch_keeps_earlier_verification() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));
        let user = registered(&f).await;
        f.service.link_account(&f.ctx, user.user_id, claim()).await.unwrap();

        let err = f
            .service
            .link_account(
                &f.ctx,
                user.user_id,
                BankAccount::new("044", "0987654321", "Someone Else Entirely"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NameMismatch));
        assert!(is_verified(&f, user.user_id).await);
    }

    #[tokio::test]
    async fn test_link_unknown_user() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));

        let err = f
            .service
            .link_account(&f.ctx, Uuid::new_v4(), claim())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::UserNotFound));
        assert_eq!(f.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolution_failure_mutates_nothing() {
        let f = fixture(StubResolver::failing());
        let user = registered(&f).await;

        let err = f
            .service
            .link_account(&f.ctx, user.user_id, claim())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Resolution(ResolveError::Status(503))));
        assert!(!is_verified(&f, user.user_id).await);
        assert_eq!(f.repository.link_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_link_rejects_empty_fields_before_io() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));

        let err = f
            .service
            .link_account(&f.ctx, Uuid::new_v4(), BankAccount::new("058", "", "Daniel"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(f.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_register_user_rejects_values_too_long_to_store() {
        let f = fixture(StubResolver::returning("x"));
        let long_name = "a".repeat(MAX_NAME_LEN + 1);

        let err = f
            .service
            .register_user(
                &f.ctx,
                &long_name,
                "ada@example.com",
                Password::new("pw".to_string()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.is_client_error());

        let long_email = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        let err = f
            .service
            .register_user(&f.ctx, "Ada", &long_email, Password::new("pw".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_user_accepts_names_at_column_width() {
        let f = fixture(StubResolver::returning("x"));
        // Multi-byte characters count once each.
        let name = "é".repeat(MAX_NAME_LEN);

        let user = f
            .service
            .register_user(&f.ctx, &name, "ada@example.com", Password::new("pw".to_string()))
            .await
            .unwrap();
        assert_eq!(user.name.chars().count(), MAX_NAME_LEN);
    }

    #[tokio::test]
    async fn test_link_rejects_oversized_or_nul_fields_before_resolving() {
        let long_name = "Daniel Oluojomu ".repeat(20);
        let f = fixture(StubResolver::returning(&long_name));
        let user = registered(&f).await;

        let cases = [
            BankAccount::new("058", "0001234567", long_name.clone()),
            BankAccount::new("0".repeat(MAX_BANK_CODE_LEN + 1), "0001234567", "Daniel"),
            BankAccount::new("058", "1".repeat(MAX_ACCOUNT_NUMBER_LEN + 1), "Daniel"),
            BankAccount::new("058", "000123\04567", "Daniel"),
            BankAccount::new("058", "0001234567", "Daniel\0Oluojomu"),
        ];
        for account in cases {
            let err = f
                .service
                .link_account(&f.ctx, user.user_id, account)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{:?}", err);
        }

        assert_eq!(f.resolver.calls(), 0);
        assert!(!is_verified(&f, user.user_id).await);
        assert_eq!(f.repository.link_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_rejects_nul_in_lookup_key() {
        let f = fixture(StubResolver::returning("x"));

        let err = f
            .service
            .resolve_linked_account_name(&f.ctx, "058", "0001\0")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_returns_claim_not_provider_name() {
        let f = fixture(StubResolver::returning("Daniel Olujomu"));
        let user = registered(&f).await;
        f.service.link_account(&f.ctx, user.user_id, claim()).await.unwrap();

        let name = f
            .service
            .resolve_linked_account_name(&f.ctx, "058", "0001234567")
            .await
            .unwrap();
        assert_eq!(name, "Daniel Oluojomu");
    }

    #[tokio::test]
    async fn test_resolve_unlinked_account() {
        let f = fixture(StubResolver::returning("x"));

        let err = f
            .service
            .resolve_linked_account_name(&f.ctx, "058", "0001234567")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccountNotFound));

        let err = f
            .service
            .resolve_linked_account_name(&f.ctx, "", "0001234567")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_links_commit_once() {
        let f = fixture(StubResolver::returning("Daniel Oluojomu"));
        let user = registered(&f).await;

        let attempts = (0..8).map(|_| {
            let service = f.service.clone();
            let ctx = f.ctx.clone();
            let user_id = user.user_id;
            tokio::spawn(async move { service.link_account(&ctx, user_id, claim()).await })
        });

        let mut successes = 0;
        for handle in attempts.collect::<Vec<_>>() {
            match handle.await.unwrap() {
                Ok(true) => successes += 1,
                Err(ServiceError::DuplicateAccount) => {}
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(f.repository.link_count().unwrap(), 1);
    }
}
