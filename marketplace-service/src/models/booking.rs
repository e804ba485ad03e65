use super::catalog::{ContentType, Platform};
use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an influencer booking:
/// booked → delivered → draft → approved → posted → paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfluencerBookingStatus {
    Booked,
    Delivered,
    Draft,
    Approved,
    Posted,
    Paid,
}

impl InfluencerBookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::Delivered => "delivered",
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Posted => "posted",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for InfluencerBookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfluencerBookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(Self::Booked),
            "delivered" => Ok(Self::Delivered),
            "draft" => Ok(Self::Draft),
            "approved" => Ok(Self::Approved),
            "posted" => Ok(Self::Posted),
            "paid" => Ok(Self::Paid),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluencerBooking {
    #[serde(rename = "_id")]
    pub id: String,
    pub client_id: String,
    pub influencer_id: String,
    pub rate_card_id: String,
    pub platform: Platform,
    pub content_type: ContentType,
    pub amount_paid: Decimal,
    pub currency: String,
    pub status: InfluencerBookingStatus,
    /// Set when the booking came from a checkout rather than a direct booking.
    pub checkout_session_id: Option<String>,
    pub content_draft_url: Option<String>,
    pub posted_at: Option<DateTime>,
    pub client_approval_date: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl InfluencerBooking {
    pub fn is_party(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.influencer_id == user_id
    }

    /// Ledger entry id for the pending earning credited at booking time.
    pub fn earning_entry_id(&self) -> String {
        format!("{}:earning", self.id)
    }

    /// Ledger entry id for releasing the earning once the booking is paid.
    pub fn payout_entry_id(&self) -> String {
        format!("{}:payout", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in ["booked", "delivered", "draft", "approved", "posted", "paid"] {
            let status: InfluencerBookingStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("cancelled".parse::<InfluencerBookingStatus>().is_err());
    }
}
