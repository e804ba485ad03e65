//! Records produced by checkout for products, services and tutoring.

use mongodb::bson::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedProduct {
    pub product_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// All product lines of one checkout, aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub checkout_session_id: String,
    pub products: Vec<OrderedProduct>,
    pub amount: Decimal,
    pub currency: String,
    pub status: ProductOrderStatus,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceBookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBooking {
    #[serde(rename = "_id")]
    pub id: String,
    pub client_id: String,
    pub provider_id: String,
    pub service_id: String,
    pub checkout_session_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub custom_note: Option<String>,
    pub status: ServiceBookingStatus,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorBookingStatus {
    Booked,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorBooking {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_id: String,
    pub tutor_id: String,
    pub checkout_session_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub custom_note: Option<String>,
    pub status: TutorBookingStatus,
    pub created_at: DateTime,
}
