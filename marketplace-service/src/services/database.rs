use super::store::{
    AccountStore, BookingStore, CartStore, CatalogStore, CheckoutStore, ConversationStore,
    LedgerStore, MarketplaceStore, OrderStore,
};
use crate::models::{
    Account, Cart, CheckoutSession, Conversation, InfluencerBooking, InfluencerBookingStatus,
    Product, ProductOrder, RateCard, Service, ServiceBooking, TutorBooking, WalletTransaction,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

fn db_error(context: &'static str) -> impl Fn(mongodb::error::Error) -> AppError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

/// Inserts `doc`, reporting a duplicate id or unique key as `Ok(false)`.
async fn insert_absent<T>(
    collection: &Collection<T>,
    doc: &T,
    context: &'static str,
) -> Result<bool, AppError>
where
    T: serde::Serialize + Send + Sync,
{
    match collection.insert_one(doc, None).await {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_key(&e) => Ok(false),
        Err(e) => Err(db_error(context)(e)),
    }
}

async fn find_sorted<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
    context: &'static str,
) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(sort).build();
    let cursor = collection
        .find(filter, options)
        .await
        .map_err(db_error(context))?;
    cursor.try_collect().await.map_err(db_error(context))
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(unique)
                .build(),
        )
        .build()
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for marketplace-service");

        self.carts()
            .create_index(index(doc! { "user_id": 1 }, "cart_user_idx", true), None)
            .await
            .map_err(db_error("Failed to create cart index"))?;

        self.sessions()
            .create_indexes(
                [
                    index(
                        doc! { "idempotency_key": 1 },
                        "checkout_idempotency_idx",
                        true,
                    ),
                    index(
                        doc! { "user_id": 1, "created_at": -1 },
                        "checkout_user_created_idx",
                        false,
                    ),
                ],
                None,
            )
            .await
            .map_err(db_error("Failed to create checkout session indexes"))?;

        self.conversations()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "booking_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("conversation_booking_idx".to_string())
                            .unique(true)
                            .sparse(true)
                            .build(),
                    )
                    .build(),
                None,
            )
            .await
            .map_err(db_error("Failed to create conversation index"))?;

        self.influencer_bookings()
            .create_indexes(
                [
                    index(doc! { "client_id": 1 }, "booking_client_idx", false),
                    index(doc! { "influencer_id": 1 }, "booking_influencer_idx", false),
                ],
                None,
            )
            .await
            .map_err(db_error("Failed to create influencer booking indexes"))?;

        self.transactions()
            .create_indexes(
                [
                    index(
                        doc! { "user_id": 1, "timestamp": -1 },
                        "wallet_tx_user_time_idx",
                        false,
                    ),
                    index(
                        doc! { "user_id": 1, "applied": 1 },
                        "wallet_tx_user_applied_idx",
                        false,
                    ),
                ],
                None,
            )
            .await
            .map_err(db_error("Failed to create wallet transaction indexes"))?;

        tracing::info!("MongoDB indexes created");
        Ok(())
    }

    fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    fn services(&self) -> Collection<Service> {
        self.db.collection("services")
    }

    fn rate_cards(&self) -> Collection<RateCard> {
        self.db.collection("rate_cards")
    }

    fn accounts(&self) -> Collection<Account> {
        self.db.collection("users")
    }

    fn carts(&self) -> Collection<Cart> {
        self.db.collection("carts")
    }

    fn sessions(&self) -> Collection<CheckoutSession> {
        self.db.collection("checkout_sessions")
    }

    fn product_orders(&self) -> Collection<ProductOrder> {
        self.db.collection("product_orders")
    }

    fn service_bookings(&self) -> Collection<ServiceBooking> {
        self.db.collection("service_bookings")
    }

    fn tutor_bookings(&self) -> Collection<TutorBooking> {
        self.db.collection("tutor_bookings")
    }

    fn influencer_bookings(&self) -> Collection<InfluencerBooking> {
        self.db.collection("influencer_bookings")
    }

    fn transactions(&self) -> Collection<WalletTransaction> {
        self.db.collection("wallet_transactions")
    }

    fn conversations(&self) -> Collection<Conversation> {
        self.db.collection("conversations")
    }
}

fn upsert() -> ReplaceOptions {
    ReplaceOptions::builder().upsert(true).build()
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        self.products()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find product"))
    }

    async fn find_service(&self, id: &str) -> Result<Option<Service>, AppError> {
        self.services()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find service"))
    }

    async fn find_rate_card(&self, id: &str) -> Result<Option<RateCard>, AppError> {
        self.rate_cards()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find rate card"))
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), AppError> {
        self.products()
            .replace_one(doc! { "_id": &product.id }, product, upsert())
            .await
            .map_err(db_error("Failed to save product"))?;
        Ok(())
    }

    async fn upsert_service(&self, service: &Service) -> Result<(), AppError> {
        self.services()
            .replace_one(doc! { "_id": &service.id }, service, upsert())
            .await
            .map_err(db_error("Failed to save service"))?;
        Ok(())
    }

    async fn upsert_rate_card(&self, card: &RateCard) -> Result<(), AppError> {
        self.rate_cards()
            .replace_one(doc! { "_id": &card.id }, card, upsert())
            .await
            .map_err(db_error("Failed to save rate card"))?;
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        self.products()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to delete product"))?;
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<(), AppError> {
        self.services()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to delete service"))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MongoStore {
    async fn find_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        self.accounts()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find account"))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        if !insert_absent(&self.accounts(), account, "Failed to insert account").await? {
            return Err(AppError::conflict("Account already exists"));
        }
        Ok(())
    }

    async fn replace_account(
        &self,
        account: &Account,
        expected_version: i64,
    ) -> Result<bool, AppError> {
        let result = self
            .accounts()
            .replace_one(
                doc! { "_id": &account.id, "version": expected_version },
                account,
                None,
            )
            .await
            .map_err(db_error("Failed to update account"))?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl CartStore for MongoStore {
    async fn find_cart(&self, user_id: &str) -> Result<Option<Cart>, AppError> {
        self.carts()
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(db_error("Failed to find cart"))
    }

    async fn create_cart(&self, cart: &Cart) -> Result<Cart, AppError> {
        if insert_absent(&self.carts(), cart, "Failed to create cart").await? {
            return Ok(cart.clone());
        }
        // lost the race to a concurrent first access
        self.find_cart(&cart.user_id)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Cart vanished after insert")))
    }

    async fn replace_cart(&self, cart: &Cart, expected_version: i64) -> Result<bool, AppError> {
        let result = self
            .carts()
            .replace_one(
                doc! { "user_id": &cart.user_id, "version": expected_version },
                cart,
                None,
            )
            .await
            .map_err(db_error("Failed to update cart"))?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl CheckoutStore for MongoStore {
    async fn insert_session(&self, session: &CheckoutSession) -> Result<bool, AppError> {
        insert_absent(&self.sessions(), session, "Failed to insert checkout session").await
    }

    async fn find_session(&self, id: &str) -> Result<Option<CheckoutSession>, AppError> {
        self.sessions()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find checkout session"))
    }

    async fn find_session_by_key(&self, key: &str) -> Result<Option<CheckoutSession>, AppError> {
        self.sessions()
            .find_one(doc! { "idempotency_key": key }, None)
            .await
            .map_err(db_error("Failed to find checkout session"))
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<CheckoutSession>, AppError> {
        find_sorted(
            &self.sessions(),
            doc! { "user_id": user_id },
            doc! { "created_at": -1 },
            "Failed to list checkout sessions",
        )
        .await
    }

    async fn update_pending_session(&self, session: &CheckoutSession) -> Result<bool, AppError> {
        let result = self
            .sessions()
            .replace_one(
                doc! { "_id": &session.id, "payment_status": "pending" },
                session,
                None,
            )
            .await;
        match result {
            Ok(r) => Ok(r.matched_count == 1),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(db_error("Failed to update checkout session")(e)),
        }
    }

    async fn claim_charge(
        &self,
        session_id: &str,
        claimed_at: DateTime,
        stale_before: DateTime,
    ) -> Result<bool, AppError> {
        let result = self
            .sessions()
            .update_one(
                doc! {
                    "_id": session_id,
                    "payment_status": "pending",
                    "transaction_id": null,
                    "$or": [
                        { "charge_claimed_at": null },
                        { "charge_claimed_at": { "$lt": stale_before } },
                    ],
                },
                doc! { "$set": { "charge_claimed_at": claimed_at } },
                None,
            )
            .await
            .map_err(db_error("Failed to claim checkout charge"))?;
        Ok(result.modified_count == 1)
    }
}

#[async_trait]
impl OrderStore for MongoStore {
    async fn insert_product_order(&self, order: &ProductOrder) -> Result<bool, AppError> {
        insert_absent(&self.product_orders(), order, "Failed to insert product order").await
    }

    async fn insert_service_booking(&self, booking: &ServiceBooking) -> Result<bool, AppError> {
        insert_absent(
            &self.service_bookings(),
            booking,
            "Failed to insert service booking",
        )
        .await
    }

    async fn insert_tutor_booking(&self, booking: &TutorBooking) -> Result<bool, AppError> {
        insert_absent(&self.tutor_bookings(), booking, "Failed to insert tutor booking").await
    }

    async fn list_product_orders(&self, user_id: &str) -> Result<Vec<ProductOrder>, AppError> {
        find_sorted(
            &self.product_orders(),
            doc! { "user_id": user_id },
            doc! { "created_at": -1 },
            "Failed to list product orders",
        )
        .await
    }

    async fn list_service_bookings(
        &self,
        client_id: &str,
    ) -> Result<Vec<ServiceBooking>, AppError> {
        find_sorted(
            &self.service_bookings(),
            doc! { "client_id": client_id },
            doc! { "created_at": -1 },
            "Failed to list service bookings",
        )
        .await
    }

    async fn list_tutor_bookings(&self, student_id: &str) -> Result<Vec<TutorBooking>, AppError> {
        find_sorted(
            &self.tutor_bookings(),
            doc! { "student_id": student_id },
            doc! { "created_at": -1 },
            "Failed to list tutor bookings",
        )
        .await
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert_influencer_booking(
        &self,
        booking: &InfluencerBooking,
    ) -> Result<bool, AppError> {
        insert_absent(
            &self.influencer_bookings(),
            booking,
            "Failed to insert influencer booking",
        )
        .await
    }

    async fn find_influencer_booking(
        &self,
        id: &str,
    ) -> Result<Option<InfluencerBooking>, AppError> {
        self.influencer_bookings()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find influencer booking"))
    }

    async fn list_bookings_by_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError> {
        find_sorted(
            &self.influencer_bookings(),
            doc! { "client_id": client_id },
            doc! { "created_at": -1 },
            "Failed to list client bookings",
        )
        .await
    }

    async fn list_bookings_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<InfluencerBooking>, AppError> {
        find_sorted(
            &self.influencer_bookings(),
            doc! { "influencer_id": influencer_id },
            doc! { "created_at": -1 },
            "Failed to list received bookings",
        )
        .await
    }

    async fn replace_booking_if_status(
        &self,
        booking: &InfluencerBooking,
        expected: InfluencerBookingStatus,
    ) -> Result<bool, AppError> {
        let result = self
            .influencer_bookings()
            .replace_one(
                doc! { "_id": &booking.id, "status": expected.as_str() },
                booking,
                None,
            )
            .await
            .map_err(db_error("Failed to update influencer booking"))?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn insert_transaction(&self, tx: &WalletTransaction) -> Result<bool, AppError> {
        insert_absent(&self.transactions(), tx, "Failed to insert wallet transaction").await
    }

    async fn find_transaction(&self, id: &str) -> Result<Option<WalletTransaction>, AppError> {
        self.transactions()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(db_error("Failed to find wallet transaction"))
    }

    async fn list_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        find_sorted(
            &self.transactions(),
            doc! { "user_id": user_id },
            doc! { "timestamp": -1, "_id": -1 },
            "Failed to list wallet transactions",
        )
        .await
    }

    async fn list_unapplied_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        find_sorted(
            &self.transactions(),
            doc! { "user_id": user_id, "applied": { "$ne": true } },
            doc! { "timestamp": 1, "_id": 1 },
            "Failed to list unapplied wallet transactions",
        )
        .await
    }

    async fn mark_transaction_applied(&self, id: &str) -> Result<(), AppError> {
        self.transactions()
            .update_one(doc! { "_id": id }, doc! { "$set": { "applied": true } }, None)
            .await
            .map_err(db_error("Failed to mark wallet transaction applied"))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MongoStore {
    async fn find_conversation_by_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Conversation>, AppError> {
        self.conversations()
            .find_one(doc! { "booking_id": booking_id }, None)
            .await
            .map_err(db_error("Failed to find conversation"))
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<bool, AppError> {
        insert_absent(
            &self.conversations(),
            conversation,
            "Failed to insert conversation",
        )
        .await
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, AppError> {
        find_sorted(
            &self.conversations(),
            doc! { "participants": user_id },
            doc! { "last_message_at": -1 },
            "Failed to list conversations",
        )
        .await
    }
}

#[async_trait]
impl MarketplaceStore for MongoStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(db_error("Database health check failed"))?;
        Ok(())
    }
}
