mod admin;
mod common;
mod site;

pub use admin::admin_routes;
pub use common::common_routes;
pub use site::site_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Every route of the site with request tracing.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(site_routes(state.clone()))
        .merge(common_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .layer(TraceLayer::new_for_http())
}
