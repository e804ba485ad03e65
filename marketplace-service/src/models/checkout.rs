use super::cart::{CartItem, CartLine, ItemKind};
use super::catalog::{ContentType, Platform};
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// One revalidated cart line with its authoritative price, frozen into the
/// session so that a resumed settlement works from the same plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettlementLine {
    Product {
        line_id: String,
        product_id: String,
        title: String,
        quantity: u32,
        unit_price: Decimal,
        amount: Decimal,
    },
    Service {
        line_id: String,
        service_id: String,
        provider_id: String,
        amount: Decimal,
        custom_note: Option<String>,
    },
    Tutor {
        line_id: String,
        tutor_id: String,
        amount: Decimal,
        custom_note: Option<String>,
    },
    Influencer {
        line_id: String,
        influencer_id: String,
        rate_card_id: String,
        platform: Platform,
        content_type: ContentType,
        amount: Decimal,
        currency: String,
    },
}

impl SettlementLine {
    pub fn kind(&self) -> ItemKind {
        match self {
            SettlementLine::Product { .. } => ItemKind::Product,
            SettlementLine::Service { .. } => ItemKind::Service,
            SettlementLine::Tutor { .. } => ItemKind::Tutor,
            SettlementLine::Influencer { .. } => ItemKind::Influencer,
        }
    }

    pub fn line_id(&self) -> &str {
        match self {
            SettlementLine::Product { line_id, .. }
            | SettlementLine::Service { line_id, .. }
            | SettlementLine::Tutor { line_id, .. }
            | SettlementLine::Influencer { line_id, .. } => line_id,
        }
    }

    /// Effective price of the line.
    pub fn amount(&self) -> Decimal {
        match self {
            SettlementLine::Product { amount, .. }
            | SettlementLine::Service { amount, .. }
            | SettlementLine::Tutor { amount, .. }
            | SettlementLine::Influencer { amount, .. } => *amount,
        }
    }
}

/// Cart line that failed revalidation and was left out of the settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub line_id: String,
    #[serde(flatten)]
    pub item: CartItem,
    pub reason: String,
}

/// How long a charge claim keeps other runs away from a session. A claim
/// older than this belongs to a run that died; the charge may be retried
/// with the same gateway reference.
pub const CHARGE_LEASE_MILLIS: i64 = 120_000;

/// Claims made before the returned instant have expired.
pub fn charge_lease_cutoff(now: DateTime) -> DateTime {
    DateTime::from_millis(now.timestamp_millis() - CHARGE_LEASE_MILLIS)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    /// `user_id:cart_version`; unique while the session is live.
    pub idempotency_key: String,
    pub cart_version: i64,
    pub cart_snapshot: Vec<CartLine>,
    pub lines: Vec<SettlementLine>,
    #[serde(default)]
    pub dropped_items: Vec<DroppedItem>,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    /// When a run last claimed the right to charge this session.
    #[serde(default)]
    pub charge_claimed_at: Option<DateTime>,
    /// Ids of records created so far; doubles as the settlement step log.
    #[serde(default)]
    pub order_refs: Vec<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime,
    pub completed_at: Option<DateTime>,
}

impl CheckoutSession {
    pub fn idempotency_key_for(user_id: &str, cart_version: i64) -> String {
        format!("{}:{}", user_id, cart_version)
    }

    pub fn is_terminal(&self) -> bool {
        self.payment_status != PaymentStatus::Pending
    }

    /// Whether another run may be charging this session right now: the
    /// charge was claimed less than `CHARGE_LEASE_MILLIS` ago and no
    /// transaction id has been recorded yet.
    pub fn charge_in_flight(&self, now: DateTime) -> bool {
        self.transaction_id.is_none()
            && self
                .charge_claimed_at
                .is_some_and(|at| at > charge_lease_cutoff(now))
    }

    /// Deterministic id for the record produced by `step` of this session.
    pub fn record_id(&self, step: &str) -> String {
        let session = Uuid::parse_str(&self.id).unwrap_or(Uuid::nil());
        Uuid::new_v5(&session, step.as_bytes()).to_string()
    }
}
