use super::observe;
use crate::error::AppError;
use crate::model::{Profile, ProfileDetail, ProfileFields};
use crate::reporting::ErrorReporter;
use crate::schema::{ProfilesSchema, PROFILES};
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProfilesService {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn ErrorReporter>,
    schema: ProfilesSchema,
}

impl ProfilesService {
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        ProfilesService {
            store,
            reporter,
            schema: PROFILES,
        }
    }

    /// All profiles with their users, ordered by profile id.
    pub async fn list(&self) -> Result<Vec<ProfileDetail>, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let profiles = uow.list_profiles(&self.schema).await?;
            let mut out = Vec::with_capacity(profiles.len());
            for profile in profiles {
                let user = uow.find_user(profile.user_id).await?.ok_or_else(|| {
                    AppError::Reference(format!(
                        "profile {} has no user {}",
                        profile.id, profile.user_id
                    ))
                })?;
                out.push(ProfileDetail {
                    id: profile.id,
                    favorite_city: profile.favorite_city,
                    user,
                });
            }
            Ok::<_, AppError>(out)
        }
        .await;
        observe(&*self.reporter, result, "error in profiles index")
    }

    /// Profile of the user called `username`; `NotFound` when the user or the profile is absent.
    pub async fn get(&self, username: &str) -> Result<ProfileDetail, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.profile_by_username(&self.schema, username).await
        }
        .await;
        observe(&*self.reporter, result, "error in profiles detail")
    }

    pub async fn create(&self, fields: ProfileFields) -> Result<Profile, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let profile = uow.create_profile(&self.schema, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(profile)
        }
        .await;
        observe(&*self.reporter, result, "error creating profile")
    }

    pub async fn update(&self, id: i64, fields: ProfileFields) -> Result<Profile, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let profile = uow.update_profile(&self.schema, id, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(profile)
        }
        .await;
        observe(&*self.reporter, result, "error updating profile")
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.delete_profile(&self.schema, id).await?;
            uow.commit().await
        }
        .await;
        observe(&*self.reporter, result, "error deleting profile")
    }
}
