//! Public profile pages: index and detail by username.

use crate::error::AppError;
use crate::model::ProfileDetail;
use crate::response::{success_many, success_one_ok};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct ProfileSummary {
    pub username: String,
}

#[derive(Serialize)]
pub struct ProfilePage {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub favorite_city: String,
}

impl From<ProfileDetail> for ProfilePage {
    fn from(p: ProfileDetail) -> Self {
        ProfilePage {
            username: p.user.username,
            first_name: p.user.first_name,
            last_name: p.user.last_name,
            email: p.user.email,
            favorite_city: p.favorite_city,
        }
    }
}

pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let profiles = state.profiles.list().await?;
    Ok(success_many(
        profiles
            .into_iter()
            .map(|p| ProfileSummary {
                username: p.user.username,
            })
            .collect(),
    ))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.profiles.get(&username).await?;
    Ok(success_one_ok(ProfilePage::from(profile)))
}
