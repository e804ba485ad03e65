//! Re-prices a cart against live catalog data and decides which lines can
//! be settled.

use super::catalog::{CatalogLookup, CatalogSource};
use crate::models::{CartItem, CartLine, DroppedItem, SettlementLine};
use rust_decimal::Decimal;
use service_core::error::AppError;

/// Outcome of validating one cart snapshot.
#[derive(Debug, Clone, Default)]
pub struct PricedCart {
    pub lines: Vec<SettlementLine>,
    pub dropped: Vec<DroppedItem>,
    pub total_amount: Decimal,
}

impl PricedCart {
    pub fn is_settleable(&self) -> bool {
        !self.lines.is_empty()
    }
}

#[derive(Clone)]
pub struct PricingEngine {
    catalog: CatalogLookup,
}

impl PricingEngine {
    pub fn new(catalog: CatalogLookup) -> Self {
        Self { catalog }
    }

    /// Prices every line in cart order. Lines whose item vanished, lost the
    /// capability that made it sellable, or no longer matches the requested
    /// rate card are dropped and reported rather than failing the cart.
    pub async fn price(&self, items: &[CartLine]) -> Result<PricedCart, AppError> {
        let mut priced = PricedCart::default();

        for line in items {
            match self.price_line(line).await? {
                Ok(settlement) => {
                    priced.total_amount += settlement.amount();
                    priced.lines.push(settlement);
                }
                Err(reason) => {
                    tracing::info!(
                        line_id = %line.line_id,
                        item_type = %line.item.kind(),
                        item_id = %line.item.item_id(),
                        reason,
                        "Dropping cart line that failed revalidation"
                    );
                    priced.dropped.push(DroppedItem {
                        line_id: line.line_id.clone(),
                        item: line.item.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        Ok(priced)
    }

    async fn price_line(
        &self,
        line: &CartLine,
    ) -> Result<Result<SettlementLine, &'static str>, AppError> {
        let Some(entry) = self.catalog.resolve(&line.item).await? else {
            return Ok(Err("item no longer available"));
        };

        let settlement = match (&line.item, entry.source) {
            (CartItem::Product { .. }, CatalogSource::Product(product)) => {
                let quantity = line.quantity.max(1);
                SettlementLine::Product {
                    line_id: line.line_id.clone(),
                    product_id: product.id,
                    title: product.title,
                    quantity,
                    unit_price: entry.price,
                    amount: entry.price * Decimal::from(quantity),
                }
            }
            (CartItem::Service { .. }, CatalogSource::Service(service)) => {
                SettlementLine::Service {
                    line_id: line.line_id.clone(),
                    service_id: service.id,
                    provider_id: service.owner_id,
                    amount: entry.price,
                    custom_note: line.custom_note.clone(),
                }
            }
            (CartItem::Tutor { .. }, CatalogSource::Tutor(tutor)) => SettlementLine::Tutor {
                line_id: line.line_id.clone(),
                tutor_id: tutor.id,
                amount: entry.price,
                custom_note: line.custom_note.clone(),
            },
            (
                CartItem::Influencer {
                    platform,
                    content_type,
                    ..
                },
                CatalogSource::Influencer { card, influencer },
            ) => {
                if !card.matches(*platform, *content_type) {
                    return Ok(Err("rate card no longer matches requested platform or content type"));
                }
                SettlementLine::Influencer {
                    line_id: line.line_id.clone(),
                    influencer_id: influencer.id,
                    rate_card_id: card.id,
                    platform: card.platform,
                    content_type: card.content_type,
                    amount: entry.price,
                    currency: card.price.currency,
                }
            }
            _ => return Ok(Err("item type does not match catalog record")),
        };

        Ok(Ok(settlement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Account, Cart, ContentType, Platform, Product, RateCard, RateCardPrice, Role, RoleSet,
        Service, TutorProfile,
    };
    use crate::services::memory::InMemoryStore;
    use crate::services::store::{AccountStore, CatalogStore};
    use std::sync::Arc;

    struct Fixture {
        store: Arc<InMemoryStore>,
        engine: PricingEngine,
        tutor_id: String,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_product(&Product {
                id: "p1".into(),
                owner_id: "seller".into(),
                title: "Notebook".into(),
                price: Decimal::new(1250, 2),
                currency: "INR".into(),
            })
            .await
            .unwrap();
        store
            .upsert_service(&Service {
                id: "s1".into(),
                owner_id: "provider".into(),
                title: "Logo design".into(),
                price: Decimal::from(3000),
                currency: "INR".into(),
            })
            .await
            .unwrap();

        let mut tutor = Account::new("Ravi", RoleSet::new([Role::User, Role::Tutor]));
        tutor.tutor_profile = Some(TutorProfile {
            is_approved: true,
            hourly_rate: Some(Decimal::from(700)),
            subjects: vec![],
        });
        store.insert_account(&tutor).await.unwrap();

        let influencer = Account::new("Mira", RoleSet::new([Role::User, Role::Influencer]));
        store.insert_account(&influencer).await.unwrap();
        store
            .upsert_rate_card(&RateCard {
                id: "rc1".into(),
                owner_id: influencer.id.clone(),
                platform: Platform::Instagram,
                content_type: ContentType::Reel,
                price: RateCardPrice {
                    amount: Decimal::from(1000),
                    currency: "INR".into(),
                    negotiable: false,
                },
                description: None,
            })
            .await
            .unwrap();

        let engine = PricingEngine::new(CatalogLookup::new(store.clone()));
        Fixture {
            store,
            engine,
            tutor_id: tutor.id,
        }
    }

    #[tokio::test]
    async fn prices_each_kind_by_its_rule() {
        let f = fixture().await;
        let mut cart = Cart::new("buyer");
        cart.add_line(CartItem::Product { item_id: "p1".into() }, 4, None)
            .unwrap();
        cart.add_line(CartItem::Service { item_id: "s1".into() }, 3, None)
            .unwrap();
        cart.add_line(CartItem::Tutor { item_id: f.tutor_id.clone() }, 2, None)
            .unwrap();
        cart.add_line(
            CartItem::Influencer {
                item_id: "rc1".into(),
                platform: Some(Platform::Instagram),
                content_type: Some(ContentType::Reel),
            },
            5,
            None,
        )
        .unwrap();

        let priced = f.engine.price(&cart.items).await.unwrap();
        let amounts: Vec<Decimal> = priced.lines.iter().map(|l| l.amount()).collect();
        assert_eq!(
            amounts,
            vec![
                Decimal::from(50),
                Decimal::from(3000),
                Decimal::from(700),
                Decimal::from(1000)
            ]
        );
        assert_eq!(priced.total_amount, Decimal::from(4750));
        assert!(priced.dropped.is_empty());
    }

    #[tokio::test]
    async fn deleted_items_are_dropped_and_reported() {
        let f = fixture().await;
        let mut cart = Cart::new("buyer");
        cart.add_line(CartItem::Product { item_id: "p1".into() }, 2, None)
            .unwrap();
        let service_line = cart
            .add_line(CartItem::Service { item_id: "s1".into() }, 1, None)
            .unwrap()
            .line_id
            .clone();
        f.store.delete_service("s1").await.unwrap();

        let priced = f.engine.price(&cart.items).await.unwrap();
        assert_eq!(priced.lines.len(), 1);
        assert_eq!(priced.total_amount, Decimal::from(25));
        assert_eq!(priced.dropped.len(), 1);
        assert_eq!(priced.dropped[0].line_id, service_line);
    }

    #[tokio::test]
    async fn mismatched_rate_card_is_dropped() {
        let f = fixture().await;
        let mut cart = Cart::new("buyer");
        cart.add_line(
            CartItem::Influencer {
                item_id: "rc1".into(),
                platform: Some(Platform::TikTok),
                content_type: None,
            },
            1,
            None,
        )
        .unwrap();

        let priced = f.engine.price(&cart.items).await.unwrap();
        assert!(!priced.is_settleable());
        assert_eq!(priced.total_amount, Decimal::ZERO);
    }
}
