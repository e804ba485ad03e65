use super::store::MarketplaceStore;
use crate::models::{Conversation, InfluencerBooking};
use async_trait::async_trait;
use mongodb::bson::DateTime;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

pub const BOOKING_CREATED_MESSAGE: &str = "Booking created";

/// Opens the client/influencer thread for a booking. Implementations must be
/// idempotent per booking id.
#[async_trait]
pub trait ConversationBootstrap: Send + Sync {
    async fn create_for_booking(&self, booking: &InfluencerBooking)
    -> Result<Conversation, AppError>;
}

/// Bootstrap backed by the conversations collection.
#[derive(Clone)]
pub struct StoreConversationBootstrap {
    store: Arc<dyn MarketplaceStore>,
}

impl StoreConversationBootstrap {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }
}

fn unavailable(err: AppError) -> AppError {
    match err {
        AppError::DatabaseError(e) => AppError::UpstreamUnavailable(e),
        other => other,
    }
}

#[async_trait]
impl ConversationBootstrap for StoreConversationBootstrap {
    async fn create_for_booking(
        &self,
        booking: &InfluencerBooking,
    ) -> Result<Conversation, AppError> {
        if let Some(existing) = self
            .store
            .find_conversation_by_booking(&booking.id)
            .await
            .map_err(unavailable)?
        {
            return Ok(existing);
        }

        let now = DateTime::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            participants: vec![booking.client_id.clone(), booking.influencer_id.clone()],
            booking_id: Some(booking.id.clone()),
            last_message: Some(BOOKING_CREATED_MESSAGE.to_string()),
            last_message_at: now,
            created_at: now,
        };

        if self
            .store
            .insert_conversation(&conversation)
            .await
            .map_err(unavailable)?
        {
            tracing::info!(
                conversation_id = %conversation.id,
                booking_id = %booking.id,
                "Conversation created for booking"
            );
            return Ok(conversation);
        }

        // a concurrent bootstrap for the same booking won
        self.store
            .find_conversation_by_booking(&booking.id)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Conversation for booking {} vanished",
                    booking.id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, InfluencerBookingStatus, Platform};
    use crate::services::memory::InMemoryStore;
    use crate::services::store::ConversationStore;
    use rust_decimal::Decimal;

    fn booking(id: &str) -> InfluencerBooking {
        let now = DateTime::now();
        InfluencerBooking {
            id: id.into(),
            client_id: "client".into(),
            influencer_id: "influencer".into(),
            rate_card_id: "rc".into(),
            platform: Platform::Instagram,
            content_type: ContentType::Story,
            amount_paid: Decimal::from(500),
            currency: "INR".into(),
            status: InfluencerBookingStatus::Booked,
            checkout_session_id: None,
            content_draft_url: None,
            posted_at: None,
            client_approval_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn same_booking_reuses_conversation() {
        let store = Arc::new(InMemoryStore::new());
        let bootstrap = StoreConversationBootstrap::new(store.clone());

        let first = bootstrap.create_for_booking(&booking("b1")).await.unwrap();
        let second = bootstrap.create_for_booking(&booking("b1")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.last_message.as_deref(), Some(BOOKING_CREATED_MESSAGE));

        let other = bootstrap.create_for_booking(&booking("b2")).await.unwrap();
        assert_ne!(first.id, other.id);
        assert_eq!(store.list_conversations("client").await.unwrap().len(), 2);
    }
}
