use super::catalog::{CatalogEntry, CatalogLookup, CatalogSource};
use super::store::MarketplaceStore;
use crate::models::{Cart, CartError, CartItem, CartLine, ItemKind};
use service_core::error::AppError;
use std::sync::Arc;

const MAX_CART_RETRIES: usize = 5;

/// Cart line together with what it currently resolves to.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub line: CartLine,
    pub entry: CatalogEntry,
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn MarketplaceStore>,
    catalog: CatalogLookup,
}

impl CartService {
    pub fn new(store: Arc<dyn MarketplaceStore>, catalog: CatalogLookup) -> Self {
        Self { store, catalog }
    }

    pub async fn get_or_create(&self, user_id: &str) -> Result<Cart, AppError> {
        match self.store.find_cart(user_id).await? {
            Some(cart) => Ok(cart),
            None => self.store.create_cart(&Cart::new(user_id)).await,
        }
    }

    /// Cart with each line's current catalog details. Lines whose item has
    /// disappeared are left out of the view but stay in the stored cart.
    pub async fn view(&self, user_id: &str) -> Result<(Cart, Vec<CartLineView>), AppError> {
        let cart = self.get_or_create(user_id).await?;
        let mut lines = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            if let Some(entry) = self.catalog.resolve(&line.item).await? {
                lines.push(CartLineView {
                    line: line.clone(),
                    entry,
                });
            }
        }
        Ok((cart, lines))
    }

    pub async fn add_item(
        &self,
        user_id: &str,
        item: CartItem,
        quantity: u32,
        custom_note: Option<String>,
    ) -> Result<Cart, AppError> {
        self.check_addable(&item).await?;
        self.mutate(user_id, true, |cart| {
            cart.add_line(item.clone(), quantity, custom_note.clone())
                .map(|_| ())
        })
        .await
    }

    pub async fn update_item(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: Option<u32>,
        custom_note: Option<String>,
    ) -> Result<Cart, AppError> {
        if quantity.is_none() && custom_note.is_none() {
            return Err(CartError::NothingToUpdate.into());
        }
        self.mutate(user_id, false, |cart| {
            cart.update_line(line_id, quantity, custom_note.clone())
                .map(|_| ())
        })
        .await
    }

    pub async fn remove_item(&self, user_id: &str, line_id: &str) -> Result<Cart, AppError> {
        self.mutate(user_id, false, |cart| cart.remove_line(line_id))
            .await
    }

    pub async fn clear(&self, user_id: &str) -> Result<Cart, AppError> {
        self.mutate(user_id, false, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    async fn check_addable(&self, item: &CartItem) -> Result<(), AppError> {
        let entry = self.catalog.resolve(item).await?.ok_or_else(|| {
            AppError::not_found(match item.kind() {
                ItemKind::Product => "Product not found",
                ItemKind::Service => "Service not found",
                ItemKind::Tutor => "Tutor not found",
                ItemKind::Influencer => "Rate card not found",
            })
        })?;

        if let (
            CartItem::Influencer {
                platform,
                content_type,
                ..
            },
            CatalogSource::Influencer { card, .. },
        ) = (item, &entry.source)
        {
            if !card.matches(*platform, *content_type) {
                return Err(AppError::bad_request(
                    "Platform or content type does not match the rate card",
                ));
            }
        }
        Ok(())
    }

    /// Read-modify-write under the cart version, retried on contention.
    async fn mutate<F>(&self, user_id: &str, create: bool, mut apply: F) -> Result<Cart, AppError>
    where
        F: FnMut(&mut Cart) -> Result<(), CartError> + Send,
    {
        for attempt in 1..=MAX_CART_RETRIES {
            let mut cart = if create {
                self.get_or_create(user_id).await?
            } else {
                self.store
                    .find_cart(user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Cart not found"))?
            };

            let expected = cart.version;
            apply(&mut cart)?;

            if self.store.replace_cart(&cart, expected).await? {
                return Ok(cart);
            }
            tracing::debug!(user_id, attempt, "Cart changed concurrently, retrying");
        }
        Err(AppError::conflict("Cart is being updated concurrently"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, Service};
    use crate::services::memory::InMemoryStore;
    use crate::services::store::CatalogStore;
    use rust_decimal::Decimal;

    async fn service() -> (Arc<InMemoryStore>, CartService) {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_product(&Product {
                id: "p1".into(),
                owner_id: "seller".into(),
                title: "Mug".into(),
                price: Decimal::from(200),
                currency: "INR".into(),
            })
            .await
            .unwrap();
        store
            .upsert_service(&Service {
                id: "s1".into(),
                owner_id: "provider".into(),
                title: "Audit".into(),
                price: Decimal::from(900),
                currency: "INR".into(),
            })
            .await
            .unwrap();
        let catalog = CatalogLookup::new(store.clone());
        (store.clone(), CartService::new(store, catalog))
    }

    #[tokio::test]
    async fn add_merges_and_bumps_version() {
        let (_, carts) = service().await;
        let item = CartItem::Product { item_id: "p1".into() };
        carts.add_item("u1", item.clone(), 2, None).await.unwrap();
        let cart = carts.add_item("u1", item, 3, None).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.version, 2);
    }

    #[tokio::test]
    async fn add_unknown_item_is_not_found() {
        let (_, carts) = service().await;
        let err = carts
            .add_item("u1", CartItem::Product { item_id: "nope".into() }, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_without_cart_is_not_found() {
        let (_, carts) = service().await;
        let err = carts
            .update_item("u1", "line", Some(2), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = carts.clear("u1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn view_hides_vanished_items() {
        let (store, carts) = service().await;
        carts
            .add_item("u1", CartItem::Product { item_id: "p1".into() }, 1, None)
            .await
            .unwrap();
        carts
            .add_item("u1", CartItem::Service { item_id: "s1".into() }, 1, None)
            .await
            .unwrap();
        store.delete_service("s1").await.unwrap();

        let (cart, lines) = carts.view("u1").await.unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].entry.title, "Mug");
    }
}
