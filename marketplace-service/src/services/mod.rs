//! Services layer for marketplace-service.
//!
//! Persistence sits behind the traits in [`store`]; everything else is
//! business logic over those traits.

pub mod accounts;
pub mod bookings;
pub mod cart;
pub mod catalog;
pub mod conversation;
pub mod database;
mod jwt;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod payment;
pub mod pricing;
pub mod settlement;
pub mod store;

pub use accounts::AccountService;
pub use bookings::{BookingService, DirectBooking};
pub use cart::CartService;
pub use catalog::CatalogLookup;
pub use conversation::{ConversationBootstrap, StoreConversationBootstrap};
pub use database::MongoStore;
pub use jwt::{AccessTokenClaims, JwtService};
pub use ledger::WalletLedger;
pub use memory::InMemoryStore;
pub use payment::{DecliningGateway, PaymentGateway, SimulatedGateway};
pub use pricing::PricingEngine;
pub use settlement::CheckoutService;
pub use store::MarketplaceStore;
