use super::rfc3339;
use crate::models::{Cart, CartItem, CartLine, ContentType, ItemKind, Platform};
use crate::services::cart::CartLineView;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub item_id: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<u32>,
    #[validate(length(max = 500))]
    pub custom_note: Option<String>,
    pub platform: Option<Platform>,
    pub content_type: Option<ContentType>,
}

impl AddCartItemRequest {
    /// Builds the typed line reference. Type and item id are required.
    pub fn to_item(&self) -> Result<CartItem, AppError> {
        let (Some(item_type), Some(item_id)) = (&self.item_type, &self.item_id) else {
            return Err(AppError::bad_request("type and itemId are required"));
        };
        if item_id.trim().is_empty() {
            return Err(AppError::bad_request("type and itemId are required"));
        }

        let kind: ItemKind = item_type.parse()?;
        let item = match kind {
            ItemKind::Influencer => CartItem::Influencer {
                item_id: item_id.clone(),
                platform: self.platform,
                content_type: self.content_type,
            },
            other => CartItem::new(other, item_id.clone()),
        };
        Ok(item)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<u32>,
    #[validate(length(max = 500))]
    pub custom_note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub line_id: String,
    #[serde(rename = "type")]
    pub item_type: ItemKind,
    pub item_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl From<&CartLine> for CartLineDto {
    fn from(line: &CartLine) -> Self {
        let (platform, content_type) = match &line.item {
            CartItem::Influencer {
                platform,
                content_type,
                ..
            } => (*platform, *content_type),
            _ => (None, None),
        };
        Self {
            line_id: line.line_id.clone(),
            item_type: line.item.kind(),
            item_id: line.item.item_id().to_string(),
            quantity: line.quantity,
            custom_note: line.custom_note.clone(),
            platform,
            content_type,
            title: None,
            price: None,
        }
    }
}

impl From<&CartLineView> for CartLineDto {
    fn from(view: &CartLineView) -> Self {
        Self {
            title: Some(view.entry.title.clone()),
            price: Some(view.entry.price),
            ..CartLineDto::from(&view.line)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartLineDto>,
    pub version: i64,
    pub updated_at: String,
}

impl CartDto {
    pub fn with_details(cart: &Cart, lines: &[CartLineView]) -> Self {
        Self {
            items: lines.iter().map(CartLineDto::from).collect(),
            ..Self::from(cart)
        }
    }
}

impl From<&Cart> for CartDto {
    fn from(cart: &Cart) -> Self {
        Self {
            id: cart.id.clone(),
            user_id: cart.user_id.clone(),
            items: cart.items.iter().map(CartLineDto::from).collect(),
            version: cart.version,
            updated_at: rfc3339(cart.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cart: CartDto,
}
