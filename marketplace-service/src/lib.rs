pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MarketplaceConfig;
use crate::services::{
    AccountService, BookingService, CartService, CatalogLookup, CheckoutService,
    ConversationBootstrap, JwtService, MarketplaceStore, PaymentGateway, PricingEngine,
    StoreConversationBootstrap, WalletLedger,
};

#[derive(Clone)]
pub struct AppState {
    pub config: MarketplaceConfig,
    pub store: Arc<dyn MarketplaceStore>,
    pub jwt: JwtService,
    pub accounts: AccountService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub bookings: BookingService,
    pub ledger: WalletLedger,
}

impl AppState {
    /// Wires every service over one store and one payment gateway.
    pub fn new(
        config: MarketplaceConfig,
        store: Arc<dyn MarketplaceStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog = CatalogLookup::new(store.clone());
        let ledger = WalletLedger::new(store.clone());
        let conversations: Arc<dyn ConversationBootstrap> =
            Arc::new(StoreConversationBootstrap::new(store.clone()));
        let bookings = BookingService::new(store.clone(), ledger.clone(), conversations);
        let checkout = CheckoutService::new(
            store.clone(),
            PricingEngine::new(catalog.clone()),
            bookings.clone(),
            payments,
            config.checkout.currency.clone(),
        );

        Self {
            jwt: JwtService::new(&config.jwt.secret),
            accounts: AccountService::new(store.clone()),
            carts: CartService::new(store.clone(), catalog),
            checkout,
            bookings,
            ledger,
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cart_routes = Router::new()
        .route(
            "/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/cart/items", post(handlers::cart::add_item))
        .route(
            "/cart/items/:item_id",
            put(handlers::cart::update_item).delete(handlers::cart::remove_item),
        );

    let checkout_routes = Router::new()
        .route("/checkout", post(handlers::checkout::checkout))
        .route("/checkout/history", get(handlers::checkout::history))
        .route("/checkout/:id", get(handlers::checkout::get_session));

    let booking_routes = Router::new()
        .route(
            "/bookings/influencer",
            post(handlers::bookings::create_booking),
        )
        .route(
            "/bookings/influencer/client",
            get(handlers::bookings::client_bookings),
        )
        .route(
            "/bookings/influencer/received",
            get(handlers::bookings::received_bookings),
        )
        .route(
            "/bookings/influencer/:id",
            get(handlers::bookings::get_booking),
        )
        .route(
            "/bookings/influencer/:id/status",
            put(handlers::bookings::update_status),
        )
        .route(
            "/bookings/influencer/:id/approve",
            put(handlers::bookings::approve),
        );

    let protected = Router::new()
        .merge(cart_routes)
        .merge(checkout_routes)
        .merge(booking_routes)
        .route("/wallet", get(handlers::wallet::get_wallet))
        .route("/wallet/transactions", get(handlers::wallet::transactions))
        .route(
            "/conversations",
            get(handlers::conversations::list_conversations),
        )
        .route(
            "/me/capabilities",
            post(handlers::account::grant_capability),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .merge(protected)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}
