//! Public pages: home, lettings and profiles.

use crate::handlers::{lettings, profiles, site};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn site_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(site::index))
        .route("/lettings", get(lettings::index))
        .route("/lettings/:letting_id", get(lettings::detail))
        .route("/profiles", get(profiles::index))
        .route("/profiles/:username", get(profiles::detail))
        .with_state(state)
}
