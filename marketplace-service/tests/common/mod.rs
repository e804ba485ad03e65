#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use marketplace_service::config::{CheckoutConfig, JwtConfig, MarketplaceConfig, MongoConfig};
use marketplace_service::models::{
    Account, ContentType, Platform, Product, RateCard, RateCardPrice, Role, RoleSet, Service,
    TutorProfile,
};
use marketplace_service::services::store::{AccountStore, CatalogStore};
use marketplace_service::services::{
    DecliningGateway, InMemoryStore, JwtService, PaymentGateway, SimulatedGateway,
};
use marketplace_service::{build_router, AppState};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::{Config as CoreConfig, Environment};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "marketplace-test-secret";
pub const TEST_CURRENCY: &str = "INR";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    jwt: JwtService,
}

impl TestApp {
    /// Router over a fresh in-memory store; every charge is approved.
    pub fn spawn() -> Self {
        Self::spawn_with_gateway(Arc::new(SimulatedGateway))
    }

    /// Router whose gateway declines every charge with `reason`.
    pub fn spawn_declining(reason: &str) -> Self {
        Self::spawn_with_gateway(Arc::new(DecliningGateway {
            reason: reason.to_string(),
        }))
    }

    pub fn spawn_with_gateway(payments: Arc<dyn PaymentGateway>) -> Self {
        let secret = Secret::new(TEST_JWT_SECRET.to_string());
        let config = MarketplaceConfig {
            common: CoreConfig::default(),
            environment: Environment::Dev,
            service_name: "marketplace-service".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            mongodb: MongoConfig {
                uri: Secret::new("mongodb://unused".to_string()),
                database: format!("marketplace_test_{}", Uuid::new_v4()),
            },
            jwt: JwtConfig {
                secret: secret.clone(),
            },
            checkout: CheckoutConfig {
                currency: TEST_CURRENCY.to_string(),
            },
            allowed_origins: vec!["http://localhost:3000".to_string()],
        };

        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, store.clone(), payments);

        TestApp {
            router: build_router(state.clone()),
            store,
            state,
            jwt: JwtService::new(&secret),
        }
    }

    /// Active account holding `User` plus `roles`.
    pub async fn account(&self, name: &str, roles: &[Role]) -> Account {
        let roles = roles
            .iter()
            .fold(RoleSet::new([Role::User]), |set, role| set.grant(*role));
        let account = Account::new(name, roles);
        self.store
            .insert_account(&account)
            .await
            .expect("Failed to insert account");
        account
    }

    pub async fn tutor(&self, name: &str, hourly_rate: i64) -> Account {
        let mut account = Account::new(name, RoleSet::new([Role::User, Role::Tutor]));
        account.tutor_profile = Some(TutorProfile {
            is_approved: true,
            hourly_rate: Some(Decimal::from(hourly_rate)),
            subjects: vec!["Mathematics".to_string()],
        });
        self.store
            .insert_account(&account)
            .await
            .expect("Failed to insert tutor");
        account
    }

    pub async fn product(&self, owner: &Account, title: &str, price: i64) -> Product {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            title: title.to_string(),
            price: Decimal::from(price),
            currency: TEST_CURRENCY.to_string(),
        };
        self.store
            .upsert_product(&product)
            .await
            .expect("Failed to insert product");
        product
    }

    pub async fn service(&self, owner: &Account, title: &str, price: i64) -> Service {
        let service = Service {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            title: title.to_string(),
            price: Decimal::from(price),
            currency: TEST_CURRENCY.to_string(),
        };
        self.store
            .upsert_service(&service)
            .await
            .expect("Failed to insert service");
        service
    }

    pub async fn rate_card(
        &self,
        influencer: &Account,
        platform: Platform,
        content_type: ContentType,
        amount: i64,
    ) -> RateCard {
        let card = RateCard {
            id: Uuid::new_v4().to_string(),
            owner_id: influencer.id.clone(),
            platform,
            content_type,
            price: RateCardPrice {
                amount: Decimal::from(amount),
                currency: TEST_CURRENCY.to_string(),
                negotiable: false,
            },
            description: None,
        };
        self.store
            .upsert_rate_card(&card)
            .await
            .expect("Failed to insert rate card");
        card
    }

    pub fn token(&self, account: &Account) -> String {
        self.jwt
            .issue_access_token(&account.id, chrono::Duration::minutes(15))
            .expect("Failed to issue token")
    }

    /// Sends one request through the router and returns status and JSON body
    /// (`Value::Null` for an empty body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, as_user: &Account) -> (StatusCode, Value) {
        let token = self.token(as_user);
        self.request(Method::GET, uri, Some(&token), None).await
    }

    pub async fn post(&self, uri: &str, as_user: &Account, body: Value) -> (StatusCode, Value) {
        let token = self.token(as_user);
        self.request(Method::POST, uri, Some(&token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, as_user: &Account, body: Value) -> (StatusCode, Value) {
        let token = self.token(as_user);
        self.request(Method::PUT, uri, Some(&token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, as_user: &Account) -> (StatusCode, Value) {
        let token = self.token(as_user);
        self.request(Method::DELETE, uri, Some(&token), None).await
    }

    /// Adds a cart line and returns the cart from the response.
    pub async fn add_to_cart(&self, as_user: &Account, body: Value) -> Value {
        let (status, json) = self.post("/cart/items", as_user, body).await;
        assert_eq!(status, StatusCode::OK, "add to cart failed: {}", json);
        json["cart"].clone()
    }

    pub async fn checkout(&self, as_user: &Account) -> (StatusCode, Value) {
        self.post(
            "/checkout",
            as_user,
            serde_json::json!({ "paymentMethod": "card" }),
        )
        .await
    }

    /// Wallet figures: (balance, pendingPayouts, totalEarned, totalPaidOut, consistent).
    pub async fn wallet(&self, owner: &Account) -> (Decimal, Decimal, Decimal, Decimal, bool) {
        let (status, json) = self.get("/wallet", owner).await;
        assert_eq!(status, StatusCode::OK, "wallet read failed: {}", json);
        let wallet = &json["wallet"];
        (
            decimal(&wallet["balance"]),
            decimal(&wallet["pendingPayouts"]),
            decimal(&wallet["totalEarned"]),
            decimal(&wallet["totalPaidOut"]),
            wallet["consistent"].as_bool().expect("consistent flag"),
        )
    }
}

/// Money is serialized as a decimal string.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("money should be a string")
        .parse()
        .expect("money should parse as a decimal")
}
