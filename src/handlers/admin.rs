//! Administration endpoints: create, full update and delete for every record kind.

use crate::error::AppError;
use crate::model::{AddressFields, LettingFields, ProfileFields, UserFields};
use crate::response::{success_many, success_one, success_one_ok};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

pub async fn list_addresses(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.lettings.list_addresses().await?))
}

pub async fn create_address(
    State(state): State<AppState>,
    Json(body): Json<AddressFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.lettings.create_address(body).await?))
}

pub async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AddressFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(state.lettings.update_address(id, body).await?))
}

pub async fn delete_address(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.lettings.delete_address(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_lettings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.lettings.list().await?))
}

pub async fn create_letting(
    State(state): State<AppState>,
    Json(body): Json<LettingFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.lettings.create_letting(body).await?))
}

pub async fn update_letting(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<LettingFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(state.lettings.update_letting(id, body).await?))
}

pub async fn delete_letting(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.lettings.delete_letting(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_profiles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.profiles.list().await?))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Json(body): Json<ProfileFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.profiles.create(body).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProfileFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(state.profiles.update(id, body).await?))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.profiles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.users.list().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<UserFields>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.users.create(body).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
