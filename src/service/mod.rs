//! Query façade over the record store: what the HTTP layer calls.
//!
//! Every failure except a missing record is handed to the error reporter before it is returned.

mod auth;
mod lettings;
mod profiles;
mod users;

pub use auth::AuthService;
pub use lettings::LettingsService;
pub use profiles::ProfilesService;
pub use users::UsersService;

use crate::error::AppError;
use crate::reporting::ErrorReporter;

pub(crate) fn observe<T>(
    reporter: &dyn ErrorReporter,
    result: Result<T, AppError>,
    context: &str,
) -> Result<T, AppError> {
    match &result {
        Ok(_)
        | Err(AppError::NotFound(_) | AppError::Unauthorized(_) | AppError::Forbidden(_)) => {}
        Err(AppError::Validation(invalid)) => {
            reporter.report_error(invalid, &format!("validation error in model {}", invalid.model))
        }
        Err(other) => reporter.report_error(other, context),
    }
    result
}
