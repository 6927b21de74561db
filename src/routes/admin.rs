//! Administration routes, mounted under /admin by [`crate::routes::app_router`]. Every route
//! requires a staff login.

use crate::extractors::StaffUser;
use crate::handlers::admin::*;
use crate::state::AppState;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, put},
    Router,
};

async fn require_staff(StaffUser(user): StaffUser, request: Request, next: Next) -> Response {
    tracing::debug!(username = %user.username, path = %request.uri().path(), "admin request");
    next.run(request).await
}

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/:id", put(update_address).delete(delete_address))
        .route("/lettings", get(list_lettings).post(create_letting))
        .route("/lettings/:id", put(update_letting).delete(delete_letting))
        .route("/profiles", get(list_profiles).post(create_profile))
        .route("/profiles/:id", put(update_profile).delete(delete_profile))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_staff))
        .with_state(state)
}
