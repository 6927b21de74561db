//! Public letting pages: index and detail.

use crate::error::AppError;
use crate::model::{Address, Letting};
use crate::response::{success_many, success_one_ok};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct LettingSummary {
    pub id: i64,
    pub title: String,
}

impl From<Letting> for LettingSummary {
    fn from(l: Letting) -> Self {
        LettingSummary {
            id: l.id,
            title: l.title,
        }
    }
}

#[derive(Serialize)]
pub struct LettingPage {
    pub title: String,
    pub address: Address,
}

pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let lettings = state.lettings.list().await?;
    Ok(success_many(
        lettings.into_iter().map(LettingSummary::from).collect(),
    ))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(letting_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let letting = state.lettings.get(letting_id).await?;
    Ok(success_one_ok(LettingPage {
        title: letting.title,
        address: letting.address,
    }))
}
