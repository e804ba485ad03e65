//! Checkout settlement.
//!
//! A checkout runs as a saga over independent collections:
//!
//! 1. the cart is priced and the plan is frozen into a `pending` session
//!    keyed by `user_id:cart_version`;
//! 2. the buyer is charged and the transaction id is recorded;
//! 3. product, service, tutor and influencer records are written in that
//!    order, each with an id derived from the session and line, and each
//!    appended to `order_refs` as it lands;
//! 4. the settled lines are removed from the cart;
//! 5. the session is marked `paid`.
//!
//! Any step may be interrupted. Re-running the session repeats the steps;
//! every write is insert-if-absent or idempotent on its entry id, so the
//! outcome is the same as an uninterrupted run. The charge itself is guarded
//! by a claim on the session, so only one run at a time calls the gateway.

use super::bookings::BookingService;
use super::metrics;
use super::payment::{PaymentGateway, PaymentOutcome};
use super::pricing::PricingEngine;
use super::store::MarketplaceStore;
use crate::models::checkout::charge_lease_cutoff;
use crate::models::{
    CheckoutSession, InfluencerBooking, InfluencerBookingStatus, OrderedProduct, PaymentStatus,
    ProductOrder, ProductOrderStatus, ServiceBooking, ServiceBookingStatus, SettlementLine,
    TutorBooking, TutorBookingStatus,
};
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

const MAX_CART_RETRIES: usize = 5;
const PRODUCT_ORDER_STEP: &str = "product-order";
const CART_CHANGED_REASON: &str = "cart changed during checkout";

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn MarketplaceStore>,
    pricing: PricingEngine,
    bookings: BookingService,
    payments: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        pricing: PricingEngine,
        bookings: BookingService,
        payments: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            pricing,
            bookings,
            payments,
            currency: currency.into(),
        }
    }

    /// Checks out the caller's cart. Retrying with an unchanged cart resumes
    /// or returns the session created by the first attempt.
    pub async fn checkout(
        &self,
        user_id: &str,
        payment_method: &str,
    ) -> Result<CheckoutSession, AppError> {
        let recovered = self.recover_captured(user_id).await?;

        let cart = match self.store.find_cart(user_id).await? {
            Some(cart) => cart,
            None => return recovered.ok_or_else(|| AppError::bad_request("Cart is empty")),
        };

        let key = CheckoutSession::idempotency_key_for(user_id, cart.version);
        if let Some(existing) = self.store.find_session_by_key(&key).await? {
            return self.continue_existing(existing).await;
        }

        if cart.is_empty() {
            return recovered.ok_or_else(|| AppError::bad_request("Cart is empty"));
        }

        let priced = self.pricing.price(&cart.items).await?;
        if !priced.is_settleable() {
            return Err(AppError::bad_request("No valid items in cart"));
        }

        let session = CheckoutSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            idempotency_key: key.clone(),
            cart_version: cart.version,
            cart_snapshot: cart.items.clone(),
            lines: priced.lines,
            dropped_items: priced.dropped,
            total_amount: priced.total_amount,
            currency: self.currency.clone(),
            payment_status: PaymentStatus::Pending,
            payment_method: payment_method.to_string(),
            transaction_id: None,
            charge_claimed_at: None,
            order_refs: Vec::new(),
            failure_reason: None,
            created_at: DateTime::now(),
            completed_at: None,
        };

        if !self.store.insert_session(&session).await? {
            // a concurrent request for the same cart version got there first
            let existing = self
                .store
                .find_session_by_key(&key)
                .await?
                .ok_or_else(|| AppError::conflict("Checkout already in progress"))?;
            return self.continue_existing(existing).await;
        }

        tracing::info!(
            session_id = %session.id,
            user_id,
            amount = %session.total_amount,
            lines = session.lines.len(),
            dropped = session.dropped_items.len(),
            "Checkout session created"
        );

        self.run(session).await
    }

    pub async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<CheckoutSession, AppError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Checkout session not found"))?;
        if session.user_id != user_id {
            return Err(AppError::forbidden("Not authorized to view this checkout session"));
        }
        Ok(session)
    }

    /// Newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<CheckoutSession>, AppError> {
        self.store.list_sessions(user_id).await
    }

    async fn continue_existing(&self, session: CheckoutSession) -> Result<CheckoutSession, AppError> {
        match session.payment_status {
            PaymentStatus::Paid => Ok(session),
            PaymentStatus::Pending => {
                tracing::info!(session_id = %session.id, "Resuming pending checkout session");
                self.run(session).await
            }
            PaymentStatus::Failed => Err(AppError::conflict("Checkout session already failed")),
        }
    }

    /// Finishes sessions whose payment was captured but whose settlement was
    /// interrupted, and fails uncharged sessions whose cart has changed since.
    /// Returns the most recent session finished.
    async fn recover_captured(&self, user_id: &str) -> Result<Option<CheckoutSession>, AppError> {
        let mut recovered = None;
        let sessions = self.store.list_sessions(user_id).await?;
        for session in sessions.into_iter().rev() {
            if session.payment_status != PaymentStatus::Pending {
                continue;
            }
            if session.transaction_id.is_some() {
                tracing::warn!(session_id = %session.id, user_id, "Recovering interrupted settlement");
                recovered = Some(self.run(session).await?);
            } else if self.cart_moved_on(&session).await? {
                self.abandon(session).await?;
            }
        }
        Ok(recovered)
    }

    /// Fails an uncharged session unless a live run holds its charge claim.
    async fn abandon(&self, mut session: CheckoutSession) -> Result<(), AppError> {
        let now = DateTime::now();
        if !self
            .store
            .claim_charge(&session.id, now, charge_lease_cutoff(now))
            .await?
        {
            tracing::debug!(session_id = %session.id, "Session is being charged, leaving it to its run");
            return Ok(());
        }
        session.charge_claimed_at = Some(now);

        match self.fail(&mut session, CART_CHANGED_REASON).await {
            Ok(()) | Err(AppError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn cart_moved_on(&self, session: &CheckoutSession) -> Result<bool, AppError> {
        let current_version = self.store.find_cart(&session.user_id).await?.map(|c| c.version);
        Ok(current_version != Some(session.cart_version))
    }

    async fn run(&self, mut session: CheckoutSession) -> Result<CheckoutSession, AppError> {
        if session.transaction_id.is_none() {
            self.charge(&mut session).await?;
        }

        self.settle_products(&mut session).await?;
        for line in session.lines.clone() {
            match line {
                SettlementLine::Product { .. } => {}
                SettlementLine::Service { .. } => self.settle_service(&mut session, &line).await?,
                SettlementLine::Tutor { .. } => self.settle_tutor(&mut session, &line).await?,
                SettlementLine::Influencer { .. } => {
                    self.settle_influencer(&mut session, &line).await?
                }
            }
        }

        self.clear_settled_lines(&session).await?;

        session.payment_status = PaymentStatus::Paid;
        session.completed_at = Some(DateTime::now());
        self.checkpoint(&session).await?;

        metrics::record_checkout(PaymentStatus::Paid.as_str());
        tracing::info!(
            session_id = %session.id,
            user_id = %session.user_id,
            amount = %session.total_amount,
            records = session.order_refs.len(),
            "Checkout settled"
        );
        Ok(session)
    }

    async fn charge(&self, session: &mut CheckoutSession) -> Result<(), AppError> {
        let now = DateTime::now();
        if !self
            .store
            .claim_charge(&session.id, now, charge_lease_cutoff(now))
            .await?
        {
            tracing::info!(session_id = %session.id, "Charge already claimed by another run");
            return Err(AppError::conflict("Checkout already in progress"));
        }
        session.charge_claimed_at = Some(now);

        // the plan is only valid for the cart it was priced from
        if self.cart_moved_on(session).await? {
            self.fail(session, CART_CHANGED_REASON).await?;
            return Err(AppError::conflict("Cart changed during checkout"));
        }

        let outcome = self
            .payments
            .charge(
                &session.id,
                session.total_amount,
                &session.currency,
                &session.payment_method,
            )
            .await?;

        match outcome {
            PaymentOutcome::Approved { transaction_id } => {
                tracing::info!(session_id = %session.id, transaction_id = %transaction_id, "Payment approved");
                session.transaction_id = Some(transaction_id);
                self.checkpoint(session).await
            }
            PaymentOutcome::Declined { reason } => {
                self.fail(session, &reason).await?;
                Err(AppError::PaymentDeclined(reason))
            }
        }
    }

    /// Terminal failure. The idempotency key is released so the same cart
    /// can be checked out again; the cart itself is untouched.
    async fn fail(&self, session: &mut CheckoutSession, reason: &str) -> Result<(), AppError> {
        session.payment_status = PaymentStatus::Failed;
        session.failure_reason = Some(reason.to_string());
        session.completed_at = Some(DateTime::now());
        session.idempotency_key = format!("{}:failed:{}", session.idempotency_key, session.id);
        self.checkpoint(session).await?;

        metrics::record_checkout(PaymentStatus::Failed.as_str());
        tracing::warn!(session_id = %session.id, user_id = %session.user_id, reason, "Checkout failed");
        Ok(())
    }

    async fn checkpoint(&self, session: &CheckoutSession) -> Result<(), AppError> {
        if !self.store.update_pending_session(session).await? {
            return Err(AppError::conflict("Checkout session was completed concurrently"));
        }
        Ok(())
    }

    async fn note_ref(&self, session: &mut CheckoutSession, record_id: String) -> Result<(), AppError> {
        if session.order_refs.contains(&record_id) {
            return Ok(());
        }
        session.order_refs.push(record_id);
        self.checkpoint(session).await
    }

    /// All product lines become a single order.
    async fn settle_products(&self, session: &mut CheckoutSession) -> Result<(), AppError> {
        let products: Vec<OrderedProduct> = session
            .lines
            .iter()
            .filter_map(|line| match line {
                SettlementLine::Product {
                    product_id,
                    title,
                    quantity,
                    unit_price,
                    amount,
                    ..
                } => Some(OrderedProduct {
                    product_id: product_id.clone(),
                    title: title.clone(),
                    quantity: *quantity,
                    unit_price: *unit_price,
                    amount: *amount,
                }),
                _ => None,
            })
            .collect();
        if products.is_empty() {
            return Ok(());
        }

        let order = ProductOrder {
            id: session.record_id(PRODUCT_ORDER_STEP),
            user_id: session.user_id.clone(),
            checkout_session_id: session.id.clone(),
            amount: products.iter().map(|p| p.amount).sum::<Decimal>(),
            products,
            currency: session.currency.clone(),
            status: ProductOrderStatus::Pending,
            created_at: DateTime::now(),
        };
        if self.store.insert_product_order(&order).await? {
            tracing::info!(session_id = %session.id, order_id = %order.id, amount = %order.amount, "Product order created");
        }
        self.note_ref(session, order.id).await
    }

    async fn settle_service(
        &self,
        session: &mut CheckoutSession,
        line: &SettlementLine,
    ) -> Result<(), AppError> {
        let SettlementLine::Service {
            line_id,
            service_id,
            provider_id,
            amount,
            custom_note,
        } = line
        else {
            return Ok(());
        };

        let booking = ServiceBooking {
            id: session.record_id(line_id),
            client_id: session.user_id.clone(),
            provider_id: provider_id.clone(),
            service_id: service_id.clone(),
            checkout_session_id: session.id.clone(),
            amount: *amount,
            currency: session.currency.clone(),
            custom_note: custom_note.clone(),
            status: ServiceBookingStatus::Pending,
            created_at: DateTime::now(),
        };
        if self.store.insert_service_booking(&booking).await? {
            tracing::info!(session_id = %session.id, booking_id = %booking.id, amount = %booking.amount, "Service booking created");
        }
        self.note_ref(session, booking.id).await
    }

    async fn settle_tutor(
        &self,
        session: &mut CheckoutSession,
        line: &SettlementLine,
    ) -> Result<(), AppError> {
        let SettlementLine::Tutor {
            line_id,
            tutor_id,
            amount,
            custom_note,
        } = line
        else {
            return Ok(());
        };

        let booking = TutorBooking {
            id: session.record_id(line_id),
            student_id: session.user_id.clone(),
            tutor_id: tutor_id.clone(),
            checkout_session_id: session.id.clone(),
            amount: *amount,
            currency: session.currency.clone(),
            custom_note: custom_note.clone(),
            status: TutorBookingStatus::Booked,
            created_at: DateTime::now(),
        };
        if self.store.insert_tutor_booking(&booking).await? {
            tracing::info!(session_id = %session.id, booking_id = %booking.id, amount = %booking.amount, "Tutor booking created");
        }
        self.note_ref(session, booking.id).await
    }

    /// Booking, wallet credit and conversation for one influencer line.
    async fn settle_influencer(
        &self,
        session: &mut CheckoutSession,
        line: &SettlementLine,
    ) -> Result<(), AppError> {
        let SettlementLine::Influencer {
            line_id,
            influencer_id,
            rate_card_id,
            platform,
            content_type,
            amount,
            currency,
        } = line
        else {
            return Ok(());
        };

        let now = DateTime::now();
        let booking = InfluencerBooking {
            id: session.record_id(line_id),
            client_id: session.user_id.clone(),
            influencer_id: influencer_id.clone(),
            rate_card_id: rate_card_id.clone(),
            platform: *platform,
            content_type: *content_type,
            amount_paid: *amount,
            currency: currency.clone(),
            status: InfluencerBookingStatus::Booked,
            checkout_session_id: Some(session.id.clone()),
            content_draft_url: None,
            posted_at: None,
            client_approval_date: None,
            created_at: now,
            updated_at: now,
        };

        let settled = self.bookings.settle(&booking).await?;
        self.note_ref(session, settled.id).await
    }

    async fn clear_settled_lines(&self, session: &CheckoutSession) -> Result<(), AppError> {
        let settled: Vec<String> = session
            .cart_snapshot
            .iter()
            .map(|l| l.line_id.clone())
            .collect();

        for attempt in 1..=MAX_CART_RETRIES {
            let Some(mut cart) = self.store.find_cart(&session.user_id).await? else {
                return Ok(());
            };
            let expected = cart.version;

            if expected == session.cart_version {
                cart.clear();
            } else if cart.items.iter().any(|l| settled.contains(&l.line_id)) {
                // keep lines added after submission
                cart.remove_lines(&settled);
            } else {
                return Ok(());
            }

            if self.store.replace_cart(&cart, expected).await? {
                tracing::debug!(session_id = %session.id, remaining = cart.items.len(), "Cart cleared after settlement");
                return Ok(());
            }
            tracing::debug!(session_id = %session.id, attempt, "Cart changed while clearing, retrying");
        }
        Err(AppError::conflict("Cart is being updated concurrently"))
    }
}
