//! Require a logged-in staff user (HTTP Basic `Authorization` header).

use crate::auth::Credentials;
use crate::error::AppError;
use crate::model::User;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// The staff user who sent the request.
#[derive(Clone, Debug)]
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(Credentials::from_basic)
            .transpose()?;
        state.auth.authenticate_staff(credentials).await.map(StaffUser)
    }
}
