use super::observe;
use crate::auth::hash_password;
use crate::error::AppError;
use crate::model::{User, UserFields};
use crate::reporting::ErrorReporter;
use crate::store::RecordStore;
use std::sync::Arc;

/// Administration of the user identities that profiles point at.
#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl UsersService {
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        UsersService { store, reporter }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.list_users().await
        }
        .await;
        observe(&*self.reporter, result, "error in user list")
    }

    /// A non-empty password is stored as an argon2 hash.
    pub async fn create(&self, fields: UserFields) -> Result<User, AppError> {
        let result = async {
            let mut fields = fields;
            if !fields.password.is_empty() {
                fields.password = hash_password(&fields.password)?;
            }
            let mut uow = self.store.begin().await?;
            let user = uow.create_user(fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(user)
        }
        .await;
        observe(&*self.reporter, result, "error creating user")
    }

    /// Deletes the user and its profile.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.delete_user(id).await?;
            uow.commit().await
        }
        .await;
        observe(&*self.reporter, result, "error deleting user")
    }
}
