use super::store::MarketplaceStore;
use crate::models::{Account, CartItem, Product, RateCard, Role, Service};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;

/// Catalog record a cart line points at.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Product(Product),
    Service(Service),
    Tutor(Account),
    Influencer { card: RateCard, influencer: Account },
}

/// Current price and ownership of a resolvable cart line.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub price: Decimal,
    pub owner_id: String,
    pub title: String,
    pub source: CatalogSource,
}

/// Read-only resolution of cart line references against live catalog data.
#[derive(Clone)]
pub struct CatalogLookup {
    store: Arc<dyn MarketplaceStore>,
}

fn upstream(err: AppError) -> AppError {
    match err {
        AppError::DatabaseError(e) => AppError::UpstreamUnavailable(e),
        other => other,
    }
}

impl CatalogLookup {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Resolves a line reference. `Ok(None)` means the referenced item no
    /// longer exists or is no longer sellable; catalog read failures surface
    /// as `UpstreamUnavailable`.
    pub async fn resolve(&self, item: &CartItem) -> Result<Option<CatalogEntry>, AppError> {
        match item {
            CartItem::Product { item_id } => {
                let product = self.store.find_product(item_id).await.map_err(upstream)?;
                Ok(product.map(|p| CatalogEntry {
                    price: p.price,
                    owner_id: p.owner_id.clone(),
                    title: p.title.clone(),
                    source: CatalogSource::Product(p),
                }))
            }
            CartItem::Service { item_id } => {
                let service = self.store.find_service(item_id).await.map_err(upstream)?;
                Ok(service.map(|s| CatalogEntry {
                    price: s.price,
                    owner_id: s.owner_id.clone(),
                    title: s.title.clone(),
                    source: CatalogSource::Service(s),
                }))
            }
            CartItem::Tutor { item_id } => {
                let account = self.store.find_account(item_id).await.map_err(upstream)?;
                Ok(account.and_then(|a| {
                    let rate = a.tutor_rate()?;
                    if !a.is_active() {
                        return None;
                    }
                    Some(CatalogEntry {
                        price: rate,
                        owner_id: a.id.clone(),
                        title: a.name.clone(),
                        source: CatalogSource::Tutor(a),
                    })
                }))
            }
            CartItem::Influencer { item_id, .. } => {
                let Some(card) = self.store.find_rate_card(item_id).await.map_err(upstream)?
                else {
                    return Ok(None);
                };
                let influencer = self
                    .store
                    .find_account(&card.owner_id)
                    .await
                    .map_err(upstream)?;
                Ok(influencer
                    .filter(|a| a.is_active() && a.roles.contains(Role::Influencer))
                    .map(|a| CatalogEntry {
                        price: card.price.amount,
                        owner_id: a.id.clone(),
                        title: format!("{} {} by {}", card.platform, card.content_type, a.name),
                        source: CatalogSource::Influencer { card, influencer: a },
                    }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, Platform, RateCardPrice, RoleSet, TutorProfile};
    use crate::services::memory::InMemoryStore;
    use crate::services::store::{AccountStore, CatalogStore};

    async fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_product(&Product {
                id: "p1".into(),
                owner_id: "seller".into(),
                title: "Mug".into(),
                price: Decimal::from(250),
                currency: "INR".into(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn missing_records_resolve_to_none() {
        let lookup = CatalogLookup::new(store().await);
        let found = lookup
            .resolve(&CartItem::Product { item_id: "p1".into() })
            .await
            .unwrap();
        assert_eq!(found.unwrap().price, Decimal::from(250));

        let missing = lookup
            .resolve(&CartItem::Service { item_id: "gone".into() })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn tutor_requires_role_and_rate() {
        let store = store().await;
        let mut tutor = Account::new("Ravi", RoleSet::new([Role::User]));
        tutor.tutor_profile = Some(TutorProfile {
            is_approved: true,
            hourly_rate: Some(Decimal::from(800)),
            subjects: vec!["maths".into()],
        });
        store.insert_account(&tutor).await.unwrap();

        let lookup = CatalogLookup::new(store.clone());
        let item = CartItem::Tutor { item_id: tutor.id.clone() };
        assert!(lookup.resolve(&item).await.unwrap().is_none());

        let version = tutor.version;
        tutor.roles = tutor.roles.grant(Role::Tutor);
        tutor.version += 1;
        assert!(store.replace_account(&tutor, version).await.unwrap());
        let entry = lookup.resolve(&item).await.unwrap().unwrap();
        assert_eq!(entry.price, Decimal::from(800));
    }

    #[tokio::test]
    async fn influencer_card_needs_influencer_owner() {
        let store = store().await;
        let owner = Account::new("Mira", RoleSet::new([Role::User]));
        store.insert_account(&owner).await.unwrap();
        store
            .upsert_rate_card(&RateCard {
                id: "rc1".into(),
                owner_id: owner.id.clone(),
                platform: Platform::YouTube,
                content_type: ContentType::VideoShoutout,
                price: RateCardPrice {
                    amount: Decimal::from(1000),
                    currency: "INR".into(),
                    negotiable: true,
                },
                description: None,
            })
            .await
            .unwrap();

        let lookup = CatalogLookup::new(store);
        let item = CartItem::Influencer {
            item_id: "rc1".into(),
            platform: None,
            content_type: None,
        };
        assert!(lookup.resolve(&item).await.unwrap().is_none());
    }
}
