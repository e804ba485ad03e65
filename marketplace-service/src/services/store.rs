//! Persistence seams. Every collection is reached through one of these
//! traits so the settlement logic runs unchanged against MongoDB or the
//! in-memory store.
//!
//! Inserts named `insert_*` that return `bool` are insert-if-absent: they
//! return `false` when a record with the same id (or unique key) exists,
//! which is what makes settlement steps safe to replay.

use crate::models::{
    Account, Cart, CheckoutSession, Conversation, InfluencerBooking, InfluencerBookingStatus,
    Product, ProductOrder, RateCard, Service, ServiceBooking, TutorBooking, WalletTransaction,
};
use async_trait::async_trait;
use mongodb::bson::DateTime;
use service_core::error::AppError;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError>;
    async fn find_service(&self, id: &str) -> Result<Option<Service>, AppError>;
    async fn find_rate_card(&self, id: &str) -> Result<Option<RateCard>, AppError>;

    async fn upsert_product(&self, product: &Product) -> Result<(), AppError>;
    async fn upsert_service(&self, service: &Service) -> Result<(), AppError>;
    async fn upsert_rate_card(&self, card: &RateCard) -> Result<(), AppError>;
    async fn delete_product(&self, id: &str) -> Result<(), AppError>;
    async fn delete_service(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: &str) -> Result<Option<Account>, AppError>;
    async fn insert_account(&self, account: &Account) -> Result<(), AppError>;
    /// Replaces the account only if the stored version still equals
    /// `expected_version`. The caller sets the new version on `account`.
    async fn replace_account(
        &self,
        account: &Account,
        expected_version: i64,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, user_id: &str) -> Result<Option<Cart>, AppError>;
    /// Stores `cart` unless the user already has one; returns whichever cart
    /// is stored afterwards.
    async fn create_cart(&self, cart: &Cart) -> Result<Cart, AppError>;
    async fn replace_cart(&self, cart: &Cart, expected_version: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Returns `false` when another session holds the same idempotency key.
    async fn insert_session(&self, session: &CheckoutSession) -> Result<bool, AppError>;
    async fn find_session(&self, id: &str) -> Result<Option<CheckoutSession>, AppError>;
    async fn find_session_by_key(&self, key: &str) -> Result<Option<CheckoutSession>, AppError>;
    /// Newest first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<CheckoutSession>, AppError>;
    /// Replaces a session that is still pending. Returns `false` once the
    /// stored session has reached a terminal status.
    async fn update_pending_session(&self, session: &CheckoutSession) -> Result<bool, AppError>;
    /// Stamps `claimed_at` on a pending, uncharged session unless another
    /// claim newer than `stale_before` holds it. Returns whether the claim
    /// was taken.
    async fn claim_charge(
        &self,
        session_id: &str,
        claimed_at: DateTime,
        stale_before: DateTime,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_product_order(&self, order: &ProductOrder) -> Result<bool, AppError>;
    async fn insert_service_booking(&self, booking: &ServiceBooking) -> Result<bool, AppError>;
    async fn insert_tutor_booking(&self, booking: &TutorBooking) -> Result<bool, AppError>;

    async fn list_product_orders(&self, user_id: &str) -> Result<Vec<ProductOrder>, AppError>;
    async fn list_service_bookings(&self, client_id: &str)
    -> Result<Vec<ServiceBooking>, AppError>;
    async fn list_tutor_bookings(&self, student_id: &str) -> Result<Vec<TutorBooking>, AppError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_influencer_booking(
        &self,
        booking: &InfluencerBooking,
    ) -> Result<bool, AppError>;
    async fn find_influencer_booking(
        &self,
        id: &str,
    ) -> Result<Option<InfluencerBooking>, AppError>;
    /// Newest first.
    async fn list_bookings_by_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError>;
    /// Newest first.
    async fn list_bookings_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError>;
    /// Compare-and-swap on status: replaces the booking only while the stored
    /// status is still `expected`.
    async fn replace_booking_if_status(
        &self,
        booking: &InfluencerBooking,
        expected: InfluencerBookingStatus,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_transaction(&self, tx: &WalletTransaction) -> Result<bool, AppError>;
    async fn find_transaction(&self, id: &str) -> Result<Option<WalletTransaction>, AppError>;
    /// Newest first.
    async fn list_transactions(&self, user_id: &str)
    -> Result<Vec<WalletTransaction>, AppError>;
    /// Entries not yet folded into the owner's snapshot, oldest first.
    async fn list_unapplied_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, AppError>;
    async fn mark_transaction_applied(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Conversation>, AppError>;
    /// Returns `false` when a conversation already exists for the booking.
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<bool, AppError>;
    /// Most recent activity first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, AppError>;
}

/// Everything the service persists, behind one object.
#[async_trait]
pub trait MarketplaceStore:
    CatalogStore
    + AccountStore
    + CartStore
    + CheckoutStore
    + OrderStore
    + BookingStore
    + LedgerStore
    + ConversationStore
{
    async fn ping(&self) -> Result<(), AppError>;
}
