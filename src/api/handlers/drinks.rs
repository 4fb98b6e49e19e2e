/*
 * Responsibility
 * - /drinks handlers: one store operation each
 * - success envelope { success: true, ... }; failures go out as AppError
 * - reads surface store outages as 500, writes as 400 (AppError::from_write)
 * - protected handlers take AuthClaims (verified by the access middleware)
 */
use axum::{Json, extract::State};

use crate::{
    api::{
        dto::drinks::{
            CreateDrinkRequest, DeleteResponse, DrinkLong, DrinkShort, DrinksResponse,
            UpdateDrinkRequest,
        },
        extractors::{ApiJson, AuthClaims, DrinkId},
    },
    error::AppError,
    state::AppState,
};

pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>, AppError> {
    let drinks = state.drinks.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.into_iter().map(DrinkShort::from).collect(),
    )))
}

pub async fn list_drinks_detail(
    State(state): State<AppState>,
    AuthClaims(_claims): AuthClaims,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let drinks = state.drinks.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.into_iter().map(DrinkLong::from).collect(),
    )))
}

pub async fn create_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    ApiJson(req): ApiJson<CreateDrinkRequest>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    req.validate().map_err(AppError::unprocessable)?;

    let drink = state
        .drinks
        .create(req.into())
        .await
        .map_err(AppError::from_write)?;
    tracing::info!(
        subject = claims.subject(),
        issuer = claims.issuer(),
        drink_id = drink.id,
        "drink created"
    );

    Ok(Json(DrinksResponse::new(vec![drink.into()])))
}

/// The drink is looked up before the body is parsed: an unknown id is a 404
/// whatever the body contains.
pub async fn update_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    DrinkId(id): DrinkId,
    body: Result<ApiJson<UpdateDrinkRequest>, AppError>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    state.drinks.get(id).await?.ok_or(AppError::NotFound)?;

    let ApiJson(req) = body?;
    req.validate().map_err(AppError::unprocessable)?;

    let drink = state
        .drinks
        .update(id, req.into())
        .await
        .map_err(AppError::from_write)?
        .ok_or(AppError::NotFound)?;
    tracing::info!(
        subject = claims.subject(),
        issuer = claims.issuer(),
        drink_id = id,
        "drink updated"
    );

    Ok(Json(DrinksResponse::new(vec![drink.into()])))
}

pub async fn delete_drink(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    DrinkId(id): DrinkId,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state
        .drinks
        .delete(id)
        .await
        .map_err(AppError::from_write)?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    tracing::info!(
        subject = claims.subject(),
        issuer = claims.issuer(),
        drink_id = id,
        "drink deleted"
    );

    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
