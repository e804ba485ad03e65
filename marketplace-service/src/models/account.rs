use super::wallet::Wallet;
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Capability an account holds on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    Seller,
    #[serde(rename = "Service Provider")]
    ServiceProvider,
    Tutor,
    Influencer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "Seller",
            Role::ServiceProvider => "Service Provider",
            Role::Tutor => "Tutor",
            Role::Influencer => "Influencer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "seller" => Ok(Role::Seller),
            "service provider" | "service_provider" => Ok(Role::ServiceProvider),
            "tutor" => Ok(Role::Tutor),
            "influencer" => Ok(Role::Influencer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Immutable, deduplicated and ordered set of roles.
///
/// Granting returns a new set instead of pushing onto a shared list, so the
/// same role can never appear twice and ordering never depends on grant history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn grant(&self, role: Role) -> RoleSet {
        let mut roles = self.0.clone();
        roles.insert(role);
        RoleSet(roles)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.0.contains(r))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Banned,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorProfile {
    pub is_approved: bool,
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Platform account. Identity fields are owned by the auth collaborator; this
/// service reads roles and profiles, and owns the embedded wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub roles: RoleSet,
    pub status: AccountStatus,
    pub tutor_profile: Option<TutorProfile>,
    #[serde(default)]
    pub wallet: Wallet,
    /// Optimistic concurrency token, bumped on every write.
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime,
}

impl Account {
    pub fn new(name: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            roles,
            status: AccountStatus::Active,
            tutor_profile: None,
            wallet: Wallet::default(),
            version: 0,
            created_at: DateTime::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Hourly rate when the account currently holds the Tutor capability.
    pub fn tutor_rate(&self) -> Option<Decimal> {
        if !self.roles.contains(Role::Tutor) {
            return None;
        }
        self.tutor_profile.as_ref().and_then(|p| p.hourly_rate)
    }
}
