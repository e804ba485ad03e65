pub mod account;
pub mod booking;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod conversation;
pub mod order;
pub mod wallet;

pub use account::{Account, AccountStatus, Role, RoleSet, TutorProfile};
pub use booking::{InfluencerBooking, InfluencerBookingStatus};
pub use cart::{Cart, CartError, CartItem, CartLine, ItemKind};
pub use catalog::{ContentType, Platform, Product, RateCard, RateCardPrice, Service};
pub use checkout::{CheckoutSession, DroppedItem, PaymentStatus, SettlementLine};
pub use conversation::Conversation;
pub use order::{
    OrderedProduct, ProductOrder, ProductOrderStatus, ServiceBooking, ServiceBookingStatus,
    TutorBooking, TutorBookingStatus,
};
pub use wallet::{TransactionSource, TransactionType, Wallet, WalletDelta, WalletTransaction};
