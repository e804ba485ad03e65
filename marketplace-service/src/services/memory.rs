//! In-process store used by the test suite and for running without MongoDB.

use super::store::{
    AccountStore, BookingStore, CartStore, CatalogStore, CheckoutStore, ConversationStore,
    LedgerStore, MarketplaceStore, OrderStore,
};
use crate::models::{
    Account, Cart, CheckoutSession, Conversation, InfluencerBooking, InfluencerBookingStatus,
    PaymentStatus, Product, ProductOrder, RateCard, Service, ServiceBooking, TutorBooking,
    WalletTransaction,
};
use async_trait::async_trait;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    products: HashMap<String, Product>,
    services: HashMap<String, Service>,
    rate_cards: HashMap<String, RateCard>,
    accounts: HashMap<String, Account>,
    carts: HashMap<String, Cart>,
    sessions: HashMap<String, CheckoutSession>,
    product_orders: HashMap<String, ProductOrder>,
    service_bookings: HashMap<String, ServiceBooking>,
    tutor_bookings: HashMap<String, TutorBooking>,
    influencer_bookings: HashMap<String, InfluencerBooking>,
    transactions: HashMap<String, WalletTransaction>,
    conversations: HashMap<String, Conversation>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("In-memory store mutex poisoned: {}", e)))
    }
}

fn insert_absent<T: Clone>(map: &mut HashMap<String, T>, id: &str, value: &T) -> bool {
    if map.contains_key(id) {
        return false;
    }
    map.insert(id.to_string(), value.clone());
    true
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.lock()?.products.get(id).cloned())
    }

    async fn find_service(&self, id: &str) -> Result<Option<Service>, AppError> {
        Ok(self.lock()?.services.get(id).cloned())
    }

    async fn find_rate_card(&self, id: &str) -> Result<Option<RateCard>, AppError> {
        Ok(self.lock()?.rate_cards.get(id).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), AppError> {
        self.lock()?
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn upsert_service(&self, service: &Service) -> Result<(), AppError> {
        self.lock()?
            .services
            .insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn upsert_rate_card(&self, card: &RateCard) -> Result<(), AppError> {
        self.lock()?.rate_cards.insert(card.id.clone(), card.clone());
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        self.lock()?.products.remove(id);
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<(), AppError> {
        self.lock()?.services.remove(id);
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        Ok(self.lock()?.accounts.get(id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        let mut state = self.lock()?;
        if !insert_absent(&mut state.accounts, &account.id, account) {
            return Err(AppError::conflict("Account already exists"));
        }
        Ok(())
    }

    async fn replace_account(
        &self,
        account: &Account,
        expected_version: i64,
    ) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        match state.accounts.get_mut(&account.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = account.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart(&self, user_id: &str) -> Result<Option<Cart>, AppError> {
        Ok(self.lock()?.carts.get(user_id).cloned())
    }

    async fn create_cart(&self, cart: &Cart) -> Result<Cart, AppError> {
        let mut state = self.lock()?;
        let stored = state
            .carts
            .entry(cart.user_id.clone())
            .or_insert_with(|| cart.clone());
        Ok(stored.clone())
    }

    async fn replace_cart(&self, cart: &Cart, expected_version: i64) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        match state.carts.get_mut(&cart.user_id) {
            Some(stored) if stored.version == expected_version => {
                *stored = cart.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    async fn insert_session(&self, session: &CheckoutSession) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        if state
            .sessions
            .values()
            .any(|s| s.idempotency_key == session.idempotency_key)
        {
            return Ok(false);
        }
        Ok(insert_absent(&mut state.sessions, &session.id, session))
    }

    async fn find_session(&self, id: &str) -> Result<Option<CheckoutSession>, AppError> {
        Ok(self.lock()?.sessions.get(id).cloned())
    }

    async fn find_session_by_key(&self, key: &str) -> Result<Option<CheckoutSession>, AppError> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .find(|s| s.idempotency_key == key)
            .cloned())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<CheckoutSession>, AppError> {
        let sessions = self
            .lock()?
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(sessions, |s| s.created_at))
    }

    async fn update_pending_session(&self, session: &CheckoutSession) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let key_taken = state.sessions.values().any(|s| {
            s.id != session.id && s.idempotency_key == session.idempotency_key
        });
        if key_taken {
            return Ok(false);
        }
        match state.sessions.get_mut(&session.id) {
            Some(stored) if !stored.is_terminal() => {
                *stored = session.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_charge(
        &self,
        session_id: &str,
        claimed_at: DateTime,
        stale_before: DateTime,
    ) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let Some(stored) = state.sessions.get_mut(session_id) else {
            return Ok(false);
        };
        let claimable = stored.payment_status == PaymentStatus::Pending
            && stored.transaction_id.is_none()
            && stored.charge_claimed_at.map_or(true, |at| at < stale_before);
        if claimable {
            stored.charge_claimed_at = Some(claimed_at);
        }
        Ok(claimable)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_product_order(&self, order: &ProductOrder) -> Result<bool, AppError> {
        Ok(insert_absent(&mut self.lock()?.product_orders, &order.id, order))
    }

    async fn insert_service_booking(&self, booking: &ServiceBooking) -> Result<bool, AppError> {
        Ok(insert_absent(
            &mut self.lock()?.service_bookings,
            &booking.id,
            booking,
        ))
    }

    async fn insert_tutor_booking(&self, booking: &TutorBooking) -> Result<bool, AppError> {
        Ok(insert_absent(
            &mut self.lock()?.tutor_bookings,
            &booking.id,
            booking,
        ))
    }

    async fn list_product_orders(&self, user_id: &str) -> Result<Vec<ProductOrder>, AppError> {
        let orders = self
            .lock()?
            .product_orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(orders, |o| o.created_at))
    }

    async fn list_service_bookings(
        &self,
        client_id: &str,
    ) -> Result<Vec<ServiceBooking>, AppError> {
        let bookings = self
            .lock()?
            .service_bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn list_tutor_bookings(&self, student_id: &str) -> Result<Vec<TutorBooking>, AppError> {
        let bookings = self
            .lock()?
            .tutor_bookings
            .values()
            .filter(|b| b.student_id == student_id)
            .cloned()
            .collect();
        Ok(newest_first(bookings, |b| b.created_at))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_influencer_booking(
        &self,
        booking: &InfluencerBooking,
    ) -> Result<bool, AppError> {
        Ok(insert_absent(
            &mut self.lock()?.influencer_bookings,
            &booking.id,
            booking,
        ))
    }

    async fn find_influencer_booking(
        &self,
        id: &str,
    ) -> Result<Option<InfluencerBooking>, AppError> {
        Ok(self.lock()?.influencer_bookings.get(id).cloned())
    }

    async fn list_bookings_by_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError> {
        let bookings = self
            .lock()?
            .influencer_bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn list_bookings_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError> {
        let bookings = self
            .lock()?
            .influencer_bookings
            .values()
            .filter(|b| b.influencer_id == influencer_id)
            .cloned()
            .collect();
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn replace_booking_if_status(
        &self,
        booking: &InfluencerBooking,
        expected: InfluencerBookingStatus,
    ) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        match state.influencer_bookings.get_mut(&booking.id) {
            Some(stored) if stored.status == expected => {
                *stored = booking.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_transaction(&self, tx: &WalletTransaction) -> Result<bool, AppError> {
        Ok(insert_absent(&mut self.lock()?.transactions, &tx.id, tx))
    }

    async fn find_transaction(&self, id: &str) -> Result<Option<WalletTransaction>, AppError> {
        Ok(self.lock()?.transactions.get(id).cloned())
    }

    async fn list_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let txs = self
            .lock()?
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        // id breaks timestamp ties so listing order is stable
        Ok(newest_first(txs, |t| (t.timestamp, t.id.clone())))
    }

    async fn list_unapplied_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let mut txs: Vec<WalletTransaction> = self
            .lock()?
            .transactions
            .values()
            .filter(|t| t.user_id == user_id && !t.applied)
            .cloned()
            .collect();
        txs.sort_by(|a, b| (a.timestamp, &a.id).cmp(&(b.timestamp, &b.id)));
        Ok(txs)
    }

    async fn mark_transaction_applied(&self, id: &str) -> Result<(), AppError> {
        if let Some(tx) = self.lock()?.transactions.get_mut(id) {
            tx.applied = true;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn find_conversation_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Conversation>, AppError> {
        Ok(self
            .lock()?
            .conversations
            .values()
            .find(|c| c.booking_id.as_deref() == Some(booking_id))
            .cloned())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        if let Some(booking_id) = &conversation.booking_id {
            if state
                .conversations
                .values()
                .any(|c| c.booking_id.as_ref() == Some(booking_id))
            {
                return Ok(false);
            }
        }
        Ok(insert_absent(
            &mut state.conversations,
            &conversation.id,
            conversation,
        ))
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, AppError> {
        let conversations = self
            .lock()?
            .conversations
            .values()
            .filter(|c| c.participants.iter().any(|p| p == user_id))
            .cloned()
            .collect();
        Ok(newest_first(conversations, |c| c.last_message_at))
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}
