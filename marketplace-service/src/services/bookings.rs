//! Influencer booking lifecycle and the booking step group shared by
//! checkout and direct booking.

use super::conversation::ConversationBootstrap;
use super::ledger::{Posting, WalletLedger};
use super::metrics;
use super::store::MarketplaceStore;
use crate::models::{ContentType, InfluencerBooking, InfluencerBookingStatus, Platform, Role, RoleSet};
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Direct booking request against an influencer's rate card.
#[derive(Debug, Clone)]
pub struct DirectBooking {
    pub influencer_id: String,
    pub rate_card_id: String,
    pub platform: Platform,
    pub content_type: ContentType,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn MarketplaceStore>,
    ledger: WalletLedger,
    conversations: Arc<dyn ConversationBootstrap>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        ledger: WalletLedger,
        conversations: Arc<dyn ConversationBootstrap>,
    ) -> Self {
        Self {
            store,
            ledger,
            conversations,
        }
    }

    /// Persists the booking, credits the influencer's pending payouts and
    /// opens the conversation. Every step is idempotent on the booking id,
    /// so a failed group is completed by running it again with the same
    /// booking.
    pub async fn settle(&self, booking: &InfluencerBooking) -> Result<InfluencerBooking, AppError> {
        let stored = if self.store.insert_influencer_booking(booking).await? {
            tracing::info!(
                booking_id = %booking.id,
                client_id = %booking.client_id,
                influencer_id = %booking.influencer_id,
                amount = %booking.amount_paid,
                "Influencer booking created"
            );
            booking.clone()
        } else {
            self.store
                .find_influencer_booking(&booking.id)
                .await?
                .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Booking {} vanished", booking.id)))?
        };

        let earning = Posting::booking_earning(
            stored.earning_entry_id(),
            &stored.influencer_id,
            &stored.id,
            stored.amount_paid,
        );
        self.ledger.record(&earning).await?;

        let conversation = self.conversations.create_for_booking(&stored).await?;
        tracing::debug!(booking_id = %stored.id, conversation_id = %conversation.id, "Booking conversation ready");

        Ok(stored)
    }

    pub async fn create_direct(
        &self,
        client_id: &str,
        roles: &RoleSet,
        request: DirectBooking,
    ) -> Result<InfluencerBooking, AppError> {
        if !roles.has_any(&[Role::Seller, Role::Tutor]) {
            return Err(AppError::forbidden(
                "Only sellers and tutors can book influencers",
            ));
        }

        let influencer = self
            .store
            .find_account(&request.influencer_id)
            .await?
            .filter(|a| a.is_active() && a.roles.contains(Role::Influencer))
            .ok_or_else(|| AppError::not_found("Influencer not found"))?;

        let card = self
            .store
            .find_rate_card(&request.rate_card_id)
            .await?
            .filter(|c| c.owner_id == influencer.id)
            .ok_or_else(|| AppError::not_found("Rate card not found for this influencer"))?;

        if !card.matches(Some(request.platform), Some(request.content_type)) {
            return Err(AppError::bad_request(
                "Platform or content type does not match the rate card",
            ));
        }

        let now = DateTime::now();
        let booking = InfluencerBooking {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            influencer_id: influencer.id,
            rate_card_id: card.id,
            platform: card.platform,
            content_type: card.content_type,
            amount_paid: card.price.amount,
            currency: card.price.currency,
            status: InfluencerBookingStatus::Booked,
            checkout_session_id: None,
            content_draft_url: None,
            posted_at: None,
            client_approval_date: None,
            created_at: now,
            updated_at: now,
        };

        self.settle(&booking).await
    }

    /// Booking visible to its client or influencer only.
    pub async fn get(&self, caller_id: &str, booking_id: &str) -> Result<InfluencerBooking, AppError> {
        let booking = self.find(booking_id).await?;
        if !booking.is_party(caller_id) {
            return Err(AppError::forbidden("Not authorized to view this booking"));
        }
        Ok(booking)
    }

    pub async fn list_as_client(&self, client_id: &str) -> Result<Vec<InfluencerBooking>, AppError> {
        self.store.list_bookings_by_client(client_id).await
    }

    pub async fn list_received(
        &self,
        influencer_id: &str,
        roles: &RoleSet,
    ) -> Result<Vec<InfluencerBooking>, AppError> {
        if !roles.contains(Role::Influencer) {
            return Err(AppError::forbidden("Only influencers receive bookings"));
        }
        self.store.list_bookings_by_influencer(influencer_id).await
    }

    /// Moves a booking to `status`. Influencers act on bookings they
    /// received, everyone else on bookings they made. Entering `paid`
    /// releases the held earning into the influencer's balance exactly once.
    pub async fn update_status(
        &self,
        caller_id: &str,
        roles: &RoleSet,
        booking_id: &str,
        status: InfluencerBookingStatus,
    ) -> Result<InfluencerBooking, AppError> {
        let booking = self.find(booking_id).await?;

        let permitted = if roles.contains(Role::Influencer) {
            booking.influencer_id == caller_id
        } else {
            booking.client_id == caller_id
        };
        if !permitted {
            return Err(AppError::forbidden("Not authorized to update this booking"));
        }

        if booking.status == InfluencerBookingStatus::Paid {
            if status != InfluencerBookingStatus::Paid {
                return Err(AppError::bad_request("Paid bookings cannot change status"));
            }
            // re-run the payout in case an earlier attempt stopped after the status write
            self.release_payout(&booking).await?;
            return Ok(booking);
        }

        let previous = booking.status;
        let mut updated = booking;
        updated.status = status;
        updated.updated_at = DateTime::now();
        if status == InfluencerBookingStatus::Posted {
            updated.posted_at = Some(updated.updated_at);
        }

        self.swap(&updated, previous).await?;

        if status == InfluencerBookingStatus::Paid {
            self.release_payout(&updated).await?;
        }
        Ok(updated)
    }

    /// Client sign-off on a draft.
    pub async fn approve(&self, caller_id: &str, booking_id: &str) -> Result<InfluencerBooking, AppError> {
        let booking = self.find(booking_id).await?;
        if booking.client_id != caller_id {
            return Err(AppError::forbidden("Only the client can approve content"));
        }
        if booking.status != InfluencerBookingStatus::Draft {
            return Err(AppError::bad_request("Booking is not in draft status"));
        }

        let mut updated = booking;
        updated.status = InfluencerBookingStatus::Approved;
        updated.updated_at = DateTime::now();
        updated.client_approval_date = Some(updated.updated_at);

        self.swap(&updated, InfluencerBookingStatus::Draft).await?;
        Ok(updated)
    }

    async fn find(&self, booking_id: &str) -> Result<InfluencerBooking, AppError> {
        self.store
            .find_influencer_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking not found"))
    }

    async fn swap(
        &self,
        updated: &InfluencerBooking,
        previous: InfluencerBookingStatus,
    ) -> Result<(), AppError> {
        if !self.store.replace_booking_if_status(updated, previous).await? {
            tracing::warn!(
                booking_id = %updated.id,
                from = %previous,
                to = %updated.status,
                "Booking status changed concurrently"
            );
            return Err(AppError::conflict("Booking status was changed concurrently"));
        }
        metrics::record_booking_transition(updated.status.as_str());
        tracing::info!(
            booking_id = %updated.id,
            from = %previous,
            to = %updated.status,
            "Booking status updated"
        );
        Ok(())
    }

    async fn release_payout(&self, booking: &InfluencerBooking) -> Result<(), AppError> {
        let payout = Posting::booking_payout(
            booking.payout_entry_id(),
            &booking.influencer_id,
            &booking.id,
            booking.amount_paid,
        );
        self.ledger.record(&payout).await?;
        Ok(())
    }
}
