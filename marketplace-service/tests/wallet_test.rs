//! Wallet snapshot and ledger history tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use marketplace_service::models::{ContentType, Platform, Role};
use marketplace_service::services::store::AccountStore;
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn new_accounts_start_with_an_empty_wallet() {
    let app = TestApp::spawn();
    let influencer = app.account("Mira", &[Role::Influencer]).await;

    let (balance, pending, earned, paid_out, consistent) = app.wallet(&influencer).await;
    assert_eq!(balance, Decimal::ZERO);
    assert_eq!(pending, Decimal::ZERO);
    assert_eq!(earned, Decimal::ZERO);
    assert_eq!(paid_out, Decimal::ZERO);
    assert!(consistent);

    let (status, body) = app.get("/wallet/transactions", &influencer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn wallet_requires_authentication() {
    let app = TestApp::spawn();

    let (status, _) = app.request(Method::GET, "/wallet", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/wallet/transactions", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn paid_booking_leaves_an_earning_and_a_payout_entry() {
    let app = TestApp::spawn();
    let client = app.account("Sam", &[Role::Seller]).await;
    let influencer = app.account("Mira", &[Role::Influencer]).await;
    let card = app
        .rate_card(&influencer, Platform::TikTok, ContentType::Story, 400)
        .await;

    let (status, body) = app
        .post(
            "/bookings/influencer",
            &client,
            json!({
                "influencerId": influencer.id,
                "rateCardId": card.id,
                "platform": "TikTok",
                "contentType": "Story"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(
            &format!("/bookings/influencer/{}/status", booking_id),
            &influencer,
            json!({ "status": "paid" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/wallet/transactions", &influencer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    for entry in body["transactions"].as_array().unwrap() {
        assert_eq!(entry["type"], "credit");
        assert_eq!(entry["source"], "influencer_post");
        assert_eq!(entry["linkedBooking"], booking_id.as_str());
        assert_eq!(decimal(&entry["amount"]), Decimal::from(400));
    }

    // the client earns nothing
    let (_, body) = app.get("/wallet/transactions", &client).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn tampered_snapshot_is_reported_inconsistent() {
    let app = TestApp::spawn();
    let influencer = app.account("Mira", &[Role::Influencer]).await;

    let mut account = app
        .store
        .find_account(&influencer.id)
        .await
        .unwrap()
        .unwrap();
    let expected = account.version;
    account.wallet.balance = Decimal::from(50);
    account.version += 1;
    assert!(app.store.replace_account(&account, expected).await.unwrap());

    let (balance, _, _, _, consistent) = app.wallet(&influencer).await;
    assert_eq!(balance, Decimal::from(50));
    assert!(!consistent);
}
