use super::observe;
use crate::error::AppError;
use crate::model::{Address, AddressFields, Letting, LettingDetail, LettingFields};
use crate::reporting::ErrorReporter;
use crate::schema::{LettingsSchema, LETTINGS};
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct LettingsService {
    store: Arc<dyn RecordStore>,
    reporter: Arc<dyn ErrorReporter>,
    schema: LettingsSchema,
}

impl LettingsService {
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        LettingsService {
            store,
            reporter,
            schema: LETTINGS,
        }
    }

    /// All lettings, ordered by id.
    pub async fn list(&self) -> Result<Vec<Letting>, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.list_lettings(&self.schema).await
        }
        .await;
        observe(&*self.reporter, result, "error in lettings index")
    }

    /// One letting with its address; `NotFound` when absent.
    pub async fn get(&self, id: i64) -> Result<LettingDetail, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.letting_detail(&self.schema, id).await
        }
        .await;
        observe(&*self.reporter, result, "error in lettings detail")
    }

    pub async fn list_addresses(&self) -> Result<Vec<Address>, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.list_addresses(&self.schema).await
        }
        .await;
        observe(&*self.reporter, result, "error in address list")
    }

    pub async fn create_address(&self, fields: AddressFields) -> Result<Address, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let address = uow.create_address(&self.schema, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(address)
        }
        .await;
        observe(&*self.reporter, result, "error creating address")
    }

    pub async fn update_address(
        &self,
        id: i64,
        fields: AddressFields,
    ) -> Result<Address, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let address = uow.update_address(&self.schema, id, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(address)
        }
        .await;
        observe(&*self.reporter, result, "error updating address")
    }

    /// Deletes the address and the letting that owns it.
    pub async fn delete_address(&self, id: i64) -> Result<(), AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.delete_address(&self.schema, id).await?;
            uow.commit().await
        }
        .await;
        observe(&*self.reporter, result, "error deleting address")
    }

    pub async fn create_letting(&self, fields: LettingFields) -> Result<Letting, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let letting = uow.create_letting(&self.schema, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(letting)
        }
        .await;
        observe(&*self.reporter, result, "error creating letting")
    }

    pub async fn update_letting(
        &self,
        id: i64,
        fields: LettingFields,
    ) -> Result<Letting, AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            let letting = uow.update_letting(&self.schema, id, fields).await?;
            uow.commit().await?;
            Ok::<_, AppError>(letting)
        }
        .await;
        observe(&*self.reporter, result, "error updating letting")
    }

    pub async fn delete_letting(&self, id: i64) -> Result<(), AppError> {
        let result = async {
            let mut uow = self.store.begin().await?;
            uow.delete_letting(&self.schema, id).await?;
            uow.commit().await
        }
        .await;
        observe(&*self.reporter, result, "error deleting letting")
    }
}
