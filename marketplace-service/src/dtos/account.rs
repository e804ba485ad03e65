use crate::models::{Account, Role};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GrantCapabilityRequest {
    #[validate(length(min = 1, message = "capability is required"))]
    pub capability: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub roles: Vec<Role>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            roles: account.roles.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GrantCapabilityResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountResponse,
}
