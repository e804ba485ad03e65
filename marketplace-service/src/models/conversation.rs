use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// 1:1 thread between a client and an influencer, opened per booking.
/// Message delivery lives in the messaging service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub participants: Vec<String>,
    /// Omitted when absent so the sparse unique index skips it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: DateTime,
    pub created_at: DateTime,
}
