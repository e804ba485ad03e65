use super::catalog::{ContentType, Platform};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Service,
    Tutor,
    Influencer,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
            ItemKind::Tutor => "tutor",
            ItemKind::Influencer => "influencer",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(ItemKind::Product),
            "service" => Ok(ItemKind::Service),
            "tutor" => Ok(ItemKind::Tutor),
            "influencer" => Ok(ItemKind::Influencer),
            other => Err(CartError::InvalidType(other.to_string())),
        }
    }
}

/// Reference to a purchasable entity. Each variant resolves against a
/// different catalog collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CartItem {
    Product {
        item_id: String,
    },
    Service {
        item_id: String,
    },
    /// `item_id` is the tutor's account id.
    Tutor {
        item_id: String,
    },
    /// `item_id` is the rate card id. The platform and content type requested
    /// when the line was added are re-checked at checkout.
    Influencer {
        item_id: String,
        platform: Option<Platform>,
        content_type: Option<ContentType>,
    },
}

impl CartItem {
    pub fn new(kind: ItemKind, item_id: String) -> Self {
        match kind {
            ItemKind::Product => CartItem::Product { item_id },
            ItemKind::Service => CartItem::Service { item_id },
            ItemKind::Tutor => CartItem::Tutor { item_id },
            ItemKind::Influencer => CartItem::Influencer {
                item_id,
                platform: None,
                content_type: None,
            },
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            CartItem::Product { .. } => ItemKind::Product,
            CartItem::Service { .. } => ItemKind::Service,
            CartItem::Tutor { .. } => ItemKind::Tutor,
            CartItem::Influencer { .. } => ItemKind::Influencer,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            CartItem::Product { item_id }
            | CartItem::Service { item_id }
            | CartItem::Tutor { item_id }
            | CartItem::Influencer { item_id, .. } => item_id,
        }
    }

    fn same_target(&self, other: &CartItem) -> bool {
        self.kind() == other.kind() && self.item_id() == other.item_id()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: String,
    #[serde(flatten)]
    pub item: CartItem,
    pub quantity: u32,
    pub custom_note: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart item not found")]
    LineNotFound,
    #[error("Quantity must be at least 1")]
    ZeroQuantity,
    #[error("Quantity or customNote is required")]
    NothingToUpdate,
    #[error("Invalid item type: {0}")]
    InvalidType(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound => AppError::NotFound(anyhow::Error::new(err)),
            _ => AppError::BadRequest(anyhow::Error::new(err)),
        }
    }
}

/// Per-user cart. `version` is bumped on every mutation and used as a
/// compare-and-swap token by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartLine>,
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.items.iter().find(|l| l.line_id == line_id)
    }

    /// Adds a line, merging into an existing line for the same item by
    /// summing quantities. A given note replaces the previous one.
    pub fn add_line(
        &mut self,
        item: CartItem,
        quantity: u32,
        custom_note: Option<String>,
    ) -> Result<&CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let idx = match self.items.iter().position(|l| l.item.same_target(&item)) {
            Some(idx) => {
                let line = &mut self.items[idx];
                line.quantity = line.quantity.saturating_add(quantity);
                if custom_note.is_some() {
                    line.custom_note = custom_note;
                }
                // latest requested platform/content type wins
                line.item = item;
                idx
            }
            None => {
                self.items.push(CartLine {
                    line_id: Uuid::new_v4().to_string(),
                    item,
                    quantity,
                    custom_note,
                });
                self.items.len() - 1
            }
        };

        self.touch();
        Ok(&self.items[idx])
    }

    pub fn update_line(
        &mut self,
        line_id: &str,
        quantity: Option<u32>,
        custom_note: Option<String>,
    ) -> Result<&CartLine, CartError> {
        if quantity.is_none() && custom_note.is_none() {
            return Err(CartError::NothingToUpdate);
        }
        if quantity == Some(0) {
            return Err(CartError::ZeroQuantity);
        }

        let idx = self
            .items
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or(CartError::LineNotFound)?;

        let line = &mut self.items[idx];
        if let Some(q) = quantity {
            line.quantity = q;
        }
        if custom_note.is_some() {
            line.custom_note = custom_note;
        }

        self.touch();
        Ok(&self.items[idx])
    }

    pub fn remove_line(&mut self, line_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|l| l.line_id != line_id);
        if self.items.len() == before {
            return Err(CartError::LineNotFound);
        }
        self.touch();
        Ok(())
    }

    /// Removes every listed line that is still present; unknown ids are ignored.
    pub fn remove_lines(&mut self, line_ids: &[String]) {
        self.items.retain(|l| !line_ids.contains(&l.line_id));
        self.touch();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = DateTime::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str) -> CartItem {
        CartItem::Product { item_id: id.into() }
    }

    #[test]
    fn add_merges_same_item() {
        let mut cart = Cart::new("u1");
        cart.add_line(product("X"), 2, None).unwrap();
        cart.add_line(product("X"), 3, Some("gift wrap".into())).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].custom_note.as_deref(), Some("gift wrap"));
        assert_eq!(cart.version, 2);
    }

    #[test]
    fn same_id_different_kind_is_separate_line() {
        let mut cart = Cart::new("u1");
        cart.add_line(product("X"), 1, None).unwrap();
        cart.add_line(CartItem::Service { item_id: "X".into() }, 1, None)
            .unwrap();
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn update_requires_a_field() {
        let mut cart = Cart::new("u1");
        let line_id = cart.add_line(product("X"), 1, None).unwrap().line_id.clone();

        assert_eq!(
            cart.update_line(&line_id, None, None).unwrap_err(),
            CartError::NothingToUpdate
        );
        assert_eq!(
            cart.update_line("missing", Some(2), None).unwrap_err(),
            CartError::LineNotFound
        );

        let line = cart.update_line(&line_id, Some(4), None).unwrap();
        assert_eq!(line.quantity, 4);
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut cart = Cart::new("u1");
        assert_eq!(
            cart.add_line(product("X"), 0, None).unwrap_err(),
            CartError::ZeroQuantity
        );
    }

    #[test]
    fn remove_missing_line_is_not_found() {
        let mut cart = Cart::new("u1");
        assert_eq!(cart.remove_line("nope").unwrap_err(), CartError::LineNotFound);
    }

    #[test]
    fn remove_lines_keeps_unlisted() {
        let mut cart = Cart::new("u1");
        let a = cart.add_line(product("A"), 1, None).unwrap().line_id.clone();
        cart.add_line(product("B"), 1, None).unwrap();
        cart.remove_lines(&[a]);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].item.item_id(), "B");
    }

    #[test]
    fn line_serializes_with_type_tag() {
        let mut cart = Cart::new("u1");
        cart.add_line(
            CartItem::Influencer {
                item_id: "rc".into(),
                platform: Some(Platform::Instagram),
                content_type: None,
            },
            1,
            None,
        )
        .unwrap();
        let json = serde_json::to_value(&cart.items[0]).unwrap();
        assert_eq!(json["type"], "influencer");
        assert_eq!(json["item_id"], "rc");
        assert_eq!(json["platform"], "Instagram");
    }

    #[test]
    fn unknown_kind_is_invalid() {
        assert!(matches!(
            "course".parse::<ItemKind>(),
            Err(CartError::InvalidType(_))
        ));
    }
}
