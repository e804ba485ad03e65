//! HTTP handlers for marketplace-service.

pub mod account;
pub mod bookings;
pub mod cart;
pub mod checkout;
pub mod conversations;
pub mod health;
pub mod wallet;
