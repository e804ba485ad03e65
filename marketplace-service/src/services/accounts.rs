use super::store::MarketplaceStore;
use crate::models::{Account, Role};
use service_core::error::AppError;
use std::sync::Arc;

const MAX_GRANT_RETRIES: usize = 5;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn MarketplaceStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, user_id: &str) -> Result<Option<Account>, AppError> {
        self.store.find_account(user_id).await
    }

    /// Grants a capability and persists the resulting role set. Granting a
    /// role the account already holds is a no-op.
    pub async fn grant_capability(&self, user_id: &str, role: Role) -> Result<Account, AppError> {
        for _ in 0..MAX_GRANT_RETRIES {
            let mut account = self
                .store
                .find_account(user_id)
                .await?
                .ok_or_else(|| AppError::not_found("User not found"))?;

            if account.roles.contains(role) {
                return Ok(account);
            }

            let expected = account.version;
            account.roles = account.roles.grant(role);
            account.version += 1;

            if self.store.replace_account(&account, expected).await? {
                tracing::info!(user_id, role = %role, "Capability granted");
                return Ok(account);
            }
        }
        Err(AppError::conflict("Account is being updated concurrently"))
    }
}
