pub mod account;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod conversation;
pub mod wallet;

use mongodb::bson::DateTime;

pub(crate) fn rfc3339(dt: DateTime) -> String {
    dt.to_chrono().to_rfc3339()
}
