use super::cart::CartLineDto;
use super::rfc3339;
use crate::models::{CheckoutSession, DroppedItem, ItemKind, PaymentStatus, SettlementLine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 64, message = "paymentMethod is required"))]
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledLineDto {
    pub line_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub amount: Decimal,
}

impl From<&SettlementLine> for SettledLineDto {
    fn from(line: &SettlementLine) -> Self {
        Self {
            line_id: line.line_id().to_string(),
            item_type: line.kind(),
            amount: line.amount(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedItemDto {
    pub line_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub item_id: String,
    pub reason: String,
}

impl From<&DroppedItem> for DroppedItemDto {
    fn from(item: &DroppedItem) -> Self {
        Self {
            line_id: item.line_id.clone(),
            item_type: item.item.kind(),
            item_id: item.item.item_id().to_string(),
            reason: item.reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionDto {
    pub id: String,
    pub user_id: String,
    pub cart_snapshot: Vec<CartLineDto>,
    pub settled_items: Vec<SettledLineDto>,
    pub dropped_items: Vec<DroppedItemDto>,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub order_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<&CheckoutSession> for CheckoutSessionDto {
    fn from(s: &CheckoutSession) -> Self {
        Self {
            id: s.id.clone(),
            user_id: s.user_id.clone(),
            cart_snapshot: s.cart_snapshot.iter().map(CartLineDto::from).collect(),
            settled_items: s.lines.iter().map(SettledLineDto::from).collect(),
            dropped_items: s.dropped_items.iter().map(DroppedItemDto::from).collect(),
            total_amount: s.total_amount,
            currency: s.currency.clone(),
            payment_status: s.payment_status,
            payment_method: s.payment_method.clone(),
            transaction_id: s.transaction_id.clone(),
            order_refs: s.order_refs.clone(),
            failure_reason: s.failure_reason.clone(),
            created_at: rfc3339(s.created_at),
            completed_at: s.completed_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checkout_session: CheckoutSessionDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutHistoryResponse {
    pub success: bool,
    pub count: usize,
    pub checkout_sessions: Vec<CheckoutSessionDto>,
}
