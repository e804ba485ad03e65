use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::cart::{AddCartItemRequest, CartDto, CartResponse, UpdateCartItemRequest},
    middleware::AuthUser,
    AppState,
};

pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CartResponse>, AppError> {
    let (cart, lines) = state.carts.view(&user.user_id).await?;

    Ok(Json(CartResponse {
        success: true,
        message: None,
        cart: CartDto::with_details(&cart, &lines),
    }))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    req.validate()?;
    let item = req.to_item()?;

    let cart = state
        .carts
        .add_item(
            &user.user_id,
            item,
            req.quantity.unwrap_or(1),
            req.custom_note.clone(),
        )
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        cart_version = cart.version,
        "Item added to cart"
    );

    Ok(Json(CartResponse {
        success: true,
        message: Some("Item added to cart".to_string()),
        cart: CartDto::from(&cart),
    }))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    req.validate()?;

    let cart = state
        .carts
        .update_item(&user.user_id, &item_id, req.quantity, req.custom_note)
        .await?;

    Ok(Json(CartResponse {
        success: true,
        message: Some("Cart updated".to_string()),
        cart: CartDto::from(&cart),
    }))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.carts.remove_item(&user.user_id, &item_id).await?;

    Ok(Json(CartResponse {
        success: true,
        message: Some("Item removed from cart".to_string()),
        cart: CartDto::from(&cart),
    }))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.carts.clear(&user.user_id).await?;

    Ok(Json(CartResponse {
        success: true,
        message: Some("Cart cleared".to_string()),
        cart: CartDto::from(&cart),
    }))
}
