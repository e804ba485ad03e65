//! Checkout settlement integration tests.

mod common;

use axum::http::StatusCode;
use common::{decimal, TestApp};
use marketplace_service::models::{ContentType, Platform, Role};
use marketplace_service::services::store::{
    BookingStore, CartStore, CatalogStore, ConversationStore, OrderStore,
};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn checkout_settles_every_line_type() {
    // 1. Catalog with one item of each type
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let provider = app.account("Provider", &[Role::ServiceProvider]).await;
    let influencer = app.account("Mira", &[Role::Influencer]).await;
    let tutor = app.tutor("Tara", 500).await;
    let buyer = app.account("Buyer", &[]).await;

    let mug = app.product(&seller, "Mug", 250).await;
    let audit = app.service(&provider, "Audit", 900).await;
    let card = app
        .rate_card(&influencer, Platform::Instagram, ContentType::Reel, 1000)
        .await;

    // 2. Fill the cart
    app.add_to_cart(
        &buyer,
        json!({ "type": "product", "itemId": mug.id, "quantity": 2 }),
    )
    .await;
    app.add_to_cart(&buyer, json!({ "type": "service", "itemId": audit.id }))
        .await;
    app.add_to_cart(
        &buyer,
        json!({ "type": "tutor", "itemId": tutor.id, "customNote": "algebra" }),
    )
    .await;
    app.add_to_cart(&buyer, json!({ "type": "influencer", "itemId": card.id }))
        .await;

    // 3. Checkout
    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let session = &body["checkoutSession"];
    assert_eq!(session["paymentStatus"], "paid");
    assert_eq!(session["currency"], "INR");
    assert!(session["transactionId"].is_string());
    assert_eq!(session["orderRefs"].as_array().unwrap().len(), 4);
    assert_eq!(session["droppedItems"].as_array().unwrap().len(), 0);

    // 4. Total is the sum of effective prices and of the records created
    let total = decimal(&session["totalAmount"]);
    assert_eq!(total, Decimal::from(500 + 900 + 500 + 1000));

    let settled: Decimal = session["settledItems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| decimal(&line["amount"]))
        .sum();
    assert_eq!(settled, total);

    let orders = app.store.list_product_orders(&buyer.id).await.unwrap();
    let services = app.store.list_service_bookings(&buyer.id).await.unwrap();
    let tutoring = app.store.list_tutor_bookings(&buyer.id).await.unwrap();
    let bookings = app.store.list_bookings_by_client(&buyer.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(services.len(), 1);
    assert_eq!(tutoring.len(), 1);
    assert_eq!(bookings.len(), 1);
    assert_eq!(tutoring[0].custom_note.as_deref(), Some("algebra"));

    let recorded = orders[0].amount
        + services[0].amount
        + tutoring[0].amount
        + bookings[0].amount_paid;
    assert_eq!(recorded, total);
}

#[tokio::test]
async fn cart_is_cleared_after_a_paid_checkout() {
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let buyer = app.account("Buyer", &[]).await;
    let mug = app.product(&seller, "Mug", 250).await;

    app.add_to_cart(&buyer, json!({ "type": "product", "itemId": mug.id }))
        .await;
    let (status, _) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/cart", &buyer).await;
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn declined_payment_leaves_the_cart_untouched() {
    let app = TestApp::spawn_declining("card declined");
    let seller = app.account("Seller", &[Role::Seller]).await;
    let buyer = app.account("Buyer", &[]).await;
    let mug = app.product(&seller, "Mug", 250).await;

    app.add_to_cart(
        &buyer,
        json!({ "type": "product", "itemId": mug.id, "quantity": 3 }),
    )
    .await;
    let before = app.store.find_cart(&buyer.id).await.unwrap().unwrap();

    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "payment_declined");

    let after = app.store.find_cart(&buyer.id).await.unwrap().unwrap();
    assert_eq!(after.items, before.items);
    assert_eq!(after.version, before.version);
    assert!(app.store.list_product_orders(&buyer.id).await.unwrap().is_empty());

    // the failed attempt is kept for audit
    let (status, body) = app.get("/checkout/history", &buyer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let session = &body["checkoutSessions"][0];
    assert_eq!(session["paymentStatus"], "failed");
    assert_eq!(session["failureReason"], "card declined");
}

#[tokio::test]
async fn deleted_items_are_dropped_from_the_settlement() {
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let provider = app.account("Provider", &[Role::ServiceProvider]).await;
    let buyer = app.account("Buyer", &[]).await;
    let mug = app.product(&seller, "Mug", 250).await;
    let audit = app.service(&provider, "Audit", 900).await;

    app.add_to_cart(&buyer, json!({ "type": "product", "itemId": mug.id }))
        .await;
    app.add_to_cart(&buyer, json!({ "type": "service", "itemId": audit.id }))
        .await;
    app.store.delete_service(&audit.id).await.unwrap();

    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let session = &body["checkoutSession"];
    assert_eq!(decimal(&session["totalAmount"]), Decimal::from(250));
    assert_eq!(session["settledItems"].as_array().unwrap().len(), 1);
    assert_eq!(session["settledItems"][0]["type"], "product");

    let dropped = session["droppedItems"].as_array().unwrap();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0]["itemId"], audit.id.as_str());
    assert_eq!(dropped[0]["type"], "service");

    assert!(app.store.list_service_bookings(&buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_or_fully_invalid_carts_cannot_checkout() {
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let buyer = app.account("Buyer", &[]).await;

    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cart is empty");

    let mug = app.product(&seller, "Mug", 250).await;
    app.add_to_cart(&buyer, json!({ "type": "product", "itemId": mug.id }))
        .await;
    app.store.delete_product(&mug.id).await.unwrap();

    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid items in cart");
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn payment_method_is_required() {
    let app = TestApp::spawn();
    let buyer = app.account("Buyer", &[]).await;

    let (status, _) = app
        .post("/checkout", &buyer, json!({ "paymentMethod": "" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn sessions_are_visible_to_their_owner_only() {
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let buyer = app.account("Buyer", &[]).await;
    let stranger = app.account("Stranger", &[]).await;
    let mug = app.product(&seller, "Mug", 250).await;

    app.add_to_cart(&buyer, json!({ "type": "product", "itemId": mug.id }))
        .await;
    let (_, body) = app.checkout(&buyer).await;
    let session_id = body["checkoutSession"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .get(&format!("/checkout/{}", session_id), &buyer)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checkoutSession"]["id"], session_id.as_str());

    let (status, body) = app
        .get(&format!("/checkout/{}", session_id), &stranger)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _) = app.get("/checkout/does-not-exist", &buyer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/checkout/history", &stranger).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn influencer_checkout_credits_pending_payouts_and_opens_a_conversation() {
    let app = TestApp::spawn();
    let influencer = app.account("Mira", &[Role::Influencer]).await;
    let buyer = app.account("Buyer", &[]).await;
    let card = app
        .rate_card(&influencer, Platform::YouTube, ContentType::VideoShoutout, 1000)
        .await;

    app.add_to_cart(
        &buyer,
        json!({
            "type": "influencer",
            "itemId": card.id,
            "platform": "YouTube",
            "contentType": "Video Shoutout"
        }),
    )
    .await;
    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (balance, pending, earned, paid_out, consistent) = app.wallet(&influencer).await;
    assert_eq!(balance, Decimal::ZERO);
    assert_eq!(pending, Decimal::from(1000));
    assert_eq!(earned, Decimal::from(1000));
    assert_eq!(paid_out, Decimal::ZERO);
    assert!(consistent);

    let booking = &app.store.list_bookings_by_client(&buyer.id).await.unwrap()[0];
    let conversation = app
        .store
        .find_conversation_by_booking(&booking.id)
        .await
        .unwrap()
        .expect("conversation for booking");
    assert!(conversation.participants.contains(&buyer.id));
    assert!(conversation.participants.contains(&influencer.id));

    let (status, body) = app.get("/conversations", &influencer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["conversations"][0]["lastMessage"], "Booking created");
    assert_eq!(body["conversations"][0]["bookingId"], booking.id.as_str());
}

#[tokio::test]
async fn rate_card_changed_after_add_is_dropped_at_checkout() {
    let app = TestApp::spawn();
    let seller = app.account("Seller", &[Role::Seller]).await;
    let influencer = app.account("Mira", &[Role::Influencer]).await;
    let buyer = app.account("Buyer", &[]).await;
    let mug = app.product(&seller, "Mug", 250).await;
    let mut card = app
        .rate_card(&influencer, Platform::Instagram, ContentType::Reel, 1000)
        .await;

    app.add_to_cart(&buyer, json!({ "type": "product", "itemId": mug.id }))
        .await;
    app.add_to_cart(
        &buyer,
        json!({ "type": "influencer", "itemId": card.id, "platform": "Instagram" }),
    )
    .await;

    card.platform = Platform::TikTok;
    app.store.upsert_rate_card(&card).await.unwrap();

    let (status, body) = app.checkout(&buyer).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        decimal(&body["checkoutSession"]["totalAmount"]),
        Decimal::from(250)
    );
    assert_eq!(
        body["checkoutSession"]["droppedItems"][0]["type"],
        "influencer"
    );
    assert!(app.store.list_bookings_by_client(&buyer.id).await.unwrap().is_empty());
}
