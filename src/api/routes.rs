/*
 * Responsibility
 * - URL structure of the drinks API
 * - each protected method declares its required permission here, at registration
 * - fallbacks so unknown paths / methods still answer in the error envelope
 */
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::api::handlers::{
    drinks::{create_drink, delete_drink, list_drinks, list_drinks_detail, update_drink},
    health::health,
};
use crate::error::AppError;
use crate::middleware::auth::access::protect;
use crate::services::auth::permissions::{
    DELETE_DRINKS, GET_DRINKS_DETAIL, PATCH_DRINKS, POST_DRINKS,
};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/drinks",
            get(list_drinks).merge(protect(post(create_drink), state, POST_DRINKS)),
        )
        .route(
            "/drinks-detail",
            protect(get(list_drinks_detail), state, GET_DRINKS_DETAIL),
        )
        .route(
            "/drinks/{drink_id}",
            protect(patch(update_drink), state, PATCH_DRINKS)
                .merge(protect(delete(delete_drink), state, DELETE_DRINKS)),
        )
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}
