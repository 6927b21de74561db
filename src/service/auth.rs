use crate::auth::{verify_password, Credentials, LoginFailure};
use crate::error::AppError;
use crate::model::User;
use crate::reporting::{ErrorReporter, Severity};
use crate::store::RecordStore;
use std::sync::Arc;

/// Checks administration logins. Every refused attempt is reported with its reason.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl AuthService {
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        AuthService { store, reporter }
    }

    /// The user behind `credentials` when the password matches, or why it does not.
    pub async fn check(
        &self,
        credentials: &Credentials,
    ) -> Result<Result<User, LoginFailure>, AppError> {
        if credentials.username.is_empty() {
            return Ok(Err(LoginFailure::MissingUsername));
        }
        let mut uow = self.store.begin().await?;
        let user = uow.find_user_by_username(&credentials.username).await?;
        Ok(match user {
            None => Err(LoginFailure::UnknownUser(credentials.username.clone())),
            Some(user) if !verify_password(&credentials.password, &user.password) => {
                Err(LoginFailure::WrongPassword(credentials.username.clone()))
            }
            Some(user) => Ok(user),
        })
    }

    /// A logged-in staff user. No credentials is `Unauthorized` without a report; a non-staff
    /// user with the right password is `Forbidden`.
    pub async fn authenticate_staff(
        &self,
        credentials: Option<Credentials>,
    ) -> Result<User, AppError> {
        let credentials =
            credentials.ok_or_else(|| AppError::Unauthorized("credentials required".into()))?;
        let checked = super::observe(
            &*self.reporter,
            self.check(&credentials).await,
            "error checking login",
        )?;
        let user = match checked {
            Ok(user) => user,
            Err(failure) => {
                self.reporter.report_message(Severity::Info, &failure.to_string());
                return Err(AppError::Unauthorized(failure.to_string()));
            }
        };
        if !user.is_staff {
            return Err(AppError::Forbidden(format!("{} is not staff", user.username)));
        }
        Ok(user)
    }
}
