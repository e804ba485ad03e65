use super::rfc3339;
use crate::models::{ContentType, InfluencerBooking, InfluencerBookingStatus, Platform};
use crate::services::bookings::DirectBooking;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "influencerId is required"))]
    pub influencer_id: String,
    #[validate(length(min = 1, message = "rateCardId is required"))]
    pub rate_card_id: String,
    pub platform: Platform,
    pub content_type: ContentType,
}

impl From<CreateBookingRequest> for DirectBooking {
    fn from(req: CreateBookingRequest) -> Self {
        Self {
            influencer_id: req.influencer_id,
            rate_card_id: req.rate_card_id,
            platform: req.platform,
            content_type: req.content_type,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

impl UpdateBookingStatusRequest {
    pub fn parsed(&self) -> Result<InfluencerBookingStatus, AppError> {
        self.status.parse().map_err(AppError::bad_request)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluencerBookingDto {
    pub id: String,
    pub client_id: String,
    pub influencer_id: String,
    pub rate_card_id: String,
    pub platform: Platform,
    pub content_type: ContentType,
    pub amount_paid: Decimal,
    pub currency: String,
    pub status: InfluencerBookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_draft_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_approval_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<InfluencerBooking> for InfluencerBookingDto {
    fn from(b: InfluencerBooking) -> Self {
        Self {
            id: b.id,
            client_id: b.client_id,
            influencer_id: b.influencer_id,
            rate_card_id: b.rate_card_id,
            platform: b.platform,
            content_type: b.content_type,
            amount_paid: b.amount_paid,
            currency: b.currency,
            status: b.status,
            checkout_session_id: b.checkout_session_id,
            content_draft_url: b.content_draft_url,
            posted_at: b.posted_at.map(rfc3339),
            client_approval_date: b.client_approval_date.map(rfc3339),
            created_at: rfc3339(b.created_at),
            updated_at: rfc3339(b.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub booking: InfluencerBookingDto,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub count: usize,
    pub bookings: Vec<InfluencerBookingDto>,
}

impl From<Vec<InfluencerBooking>> for BookingListResponse {
    fn from(bookings: Vec<InfluencerBooking>) -> Self {
        Self {
            success: true,
            count: bookings.len(),
            bookings: bookings.into_iter().map(Into::into).collect(),
        }
    }
}
