use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::booking::{
        BookingListResponse, BookingResponse, CreateBookingRequest, UpdateBookingStatusRequest,
    },
    middleware::AuthUser,
    AppState,
};

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    req.validate()?;

    let booking = state
        .bookings
        .create_direct(&user.user_id, &user.roles, req.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: Some("Booking created successfully".to_string()),
            booking: booking.into(),
        }),
    ))
}

pub async fn client_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BookingListResponse>, AppError> {
    let bookings = state.bookings.list_as_client(&user.user_id).await?;
    Ok(Json(bookings.into()))
}

pub async fn received_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BookingListResponse>, AppError> {
    let bookings = state
        .bookings
        .list_received(&user.user_id, &user.roles)
        .await?;
    Ok(Json(bookings.into()))
}

pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.get(&user.user_id, &booking_id).await?;

    Ok(Json(BookingResponse {
        success: true,
        message: None,
        booking: booking.into(),
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let status = req.parsed()?;

    let booking = state
        .bookings
        .update_status(&user.user_id, &user.roles, &booking_id, status)
        .await?;

    Ok(Json(BookingResponse {
        success: true,
        message: Some(format!("Booking status updated to {}", booking.status)),
        booking: booking.into(),
    }))
}

pub async fn approve(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.approve(&user.user_id, &booking_id).await?;

    Ok(Json(BookingResponse {
        success: true,
        message: Some("Content approved".to_string()),
        booking: booking.into(),
    }))
}
