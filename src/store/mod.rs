//! Record store: keyed storage for addresses, lettings, profiles and users.
//!
//! All access goes through a unit of work opened with [`RecordStore::begin`]. Changes become
//! visible to other units only after [`UnitOfWork::commit`]; dropping a unit discards them.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::{
    Address, AddressFields, Letting, LettingDetail, LettingFields, Profile, ProfileDetail,
    ProfileFields, User, UserFields, Validate,
};
use crate::schema::{LettingsSchema, ProfilesSchema, Table, USERS};
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;
}

#[async_trait]
pub trait UnitOfWork: Tables {
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// How a row write treats an existing row with the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `Conflict` when the id is taken.
    Insert,
    /// Replace the row holding the id.
    Replace,
}

/// Table operations. The `write_*` methods skip validation; use `insert_*` and `create_*` for
/// checked writes.
#[async_trait]
pub trait Tables: Send {
    /// Create the table if it does not exist.
    async fn create_table(&mut self, table: Table) -> Result<(), AppError>;
    /// Drop the table and every row in it. Fails with `MissingTable` when it does not exist.
    async fn drop_table(&mut self, table: Table) -> Result<(), AppError>;
    async fn table_exists(&mut self, table: Table) -> Result<bool, AppError>;
    /// Smallest id greater than every id in the table.
    async fn next_id(&mut self, table: Table) -> Result<i64, AppError>;

    async fn write_address(
        &mut self,
        schema: &LettingsSchema,
        address: &Address,
        mode: WriteMode,
    ) -> Result<(), AppError>;
    async fn find_address(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Address>, AppError>;
    async fn list_addresses(&mut self, schema: &LettingsSchema) -> Result<Vec<Address>, AppError>;
    /// Removes the address and the letting that owns it. Returns false when absent.
    async fn remove_address(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError>;

    /// Fails with `Reference` when the address is missing from `schema.address`.
    async fn write_letting(
        &mut self,
        schema: &LettingsSchema,
        letting: &Letting,
        mode: WriteMode,
    ) -> Result<(), AppError>;
    async fn find_letting(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Letting>, AppError>;
    async fn find_letting_by_address(
        &mut self,
        schema: &LettingsSchema,
        address_id: i64,
    ) -> Result<Option<Letting>, AppError>;
    async fn list_lettings(&mut self, schema: &LettingsSchema) -> Result<Vec<Letting>, AppError>;
    async fn remove_letting(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError>;

    /// Fails with `Reference` when the user does not exist.
    async fn write_profile(
        &mut self,
        schema: &ProfilesSchema,
        profile: &Profile,
        mode: WriteMode,
    ) -> Result<(), AppError>;
    async fn find_profile(
        &mut self,
        schema: &ProfilesSchema,
        id: i64,
    ) -> Result<Option<Profile>, AppError>;
    async fn find_profile_by_user(
        &mut self,
        schema: &ProfilesSchema,
        user_id: i64,
    ) -> Result<Option<Profile>, AppError>;
    async fn list_profiles(&mut self, schema: &ProfilesSchema) -> Result<Vec<Profile>, AppError>;
    async fn remove_profile(&mut self, schema: &ProfilesSchema, id: i64) -> Result<bool, AppError>;

    async fn write_user(&mut self, user: &User, mode: WriteMode) -> Result<(), AppError>;
    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&mut self) -> Result<Vec<User>, AppError>;
    /// Removes the user and its profile in every existing profile table.
    async fn remove_user(&mut self, id: i64) -> Result<bool, AppError>;

    /// Validated insert-or-replace by id.
    async fn insert_address(
        &mut self,
        schema: &LettingsSchema,
        address: &Address,
    ) -> Result<Address, AppError> {
        address.validate()?;
        self.write_address(schema, address, WriteMode::Replace).await?;
        Ok(address.clone())
    }

    /// Validated insert under the next free id. `Conflict` when a concurrent unit took the id.
    async fn create_address(
        &mut self,
        schema: &LettingsSchema,
        fields: AddressFields,
    ) -> Result<Address, AppError> {
        let address = fields.with_id(self.next_id(schema.address).await?);
        address.validate()?;
        self.write_address(schema, &address, WriteMode::Insert).await?;
        Ok(address)
    }

    async fn update_address(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
        fields: AddressFields,
    ) -> Result<Address, AppError> {
        self.get_address(schema, id).await?;
        self.insert_address(schema, &fields.with_id(id)).await
    }

    async fn get_address(&mut self, schema: &LettingsSchema, id: i64) -> Result<Address, AppError> {
        self.find_address(schema, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("address {}", id)))
    }

    async fn delete_address(&mut self, schema: &LettingsSchema, id: i64) -> Result<(), AppError> {
        if self.remove_address(schema, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("address {}", id)))
        }
    }

    async fn insert_letting(
        &mut self,
        schema: &LettingsSchema,
        letting: &Letting,
    ) -> Result<Letting, AppError> {
        letting.validate()?;
        self.write_letting(schema, letting, WriteMode::Replace).await?;
        Ok(letting.clone())
    }

    async fn create_letting(
        &mut self,
        schema: &LettingsSchema,
        fields: LettingFields,
    ) -> Result<Letting, AppError> {
        let letting = fields.with_id(self.next_id(schema.letting).await?);
        letting.validate()?;
        self.write_letting(schema, &letting, WriteMode::Insert).await?;
        Ok(letting)
    }

    async fn update_letting(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
        fields: LettingFields,
    ) -> Result<Letting, AppError> {
        self.get_letting(schema, id).await?;
        self.insert_letting(schema, &fields.with_id(id)).await
    }

    async fn get_letting(&mut self, schema: &LettingsSchema, id: i64) -> Result<Letting, AppError> {
        self.find_letting(schema, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("letting {}", id)))
    }

    async fn delete_letting(&mut self, schema: &LettingsSchema, id: i64) -> Result<(), AppError> {
        if self.remove_letting(schema, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("letting {}", id)))
        }
    }

    async fn letting_detail(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<LettingDetail, AppError> {
        let letting = self.get_letting(schema, id).await?;
        let address = self.find_address(schema, letting.address_id).await?.ok_or_else(|| {
            AppError::Reference(format!("letting {} has no address {}", id, letting.address_id))
        })?;
        Ok(LettingDetail {
            id: letting.id,
            title: letting.title,
            address,
        })
    }

    async fn insert_profile(
        &mut self,
        schema: &ProfilesSchema,
        profile: &Profile,
    ) -> Result<Profile, AppError> {
        profile.validate()?;
        self.write_profile(schema, profile, WriteMode::Replace).await?;
        Ok(profile.clone())
    }

    async fn create_profile(
        &mut self,
        schema: &ProfilesSchema,
        fields: ProfileFields,
    ) -> Result<Profile, AppError> {
        let profile = fields.with_id(self.next_id(schema.profile).await?);
        profile.validate()?;
        self.write_profile(schema, &profile, WriteMode::Insert).await?;
        Ok(profile)
    }

    async fn update_profile(
        &mut self,
        schema: &ProfilesSchema,
        id: i64,
        fields: ProfileFields,
    ) -> Result<Profile, AppError> {
        self.get_profile(schema, id).await?;
        self.insert_profile(schema, &fields.with_id(id)).await
    }

    async fn get_profile(&mut self, schema: &ProfilesSchema, id: i64) -> Result<Profile, AppError> {
        self.find_profile(schema, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", id)))
    }

    async fn delete_profile(&mut self, schema: &ProfilesSchema, id: i64) -> Result<(), AppError> {
        if self.remove_profile(schema, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("profile {}", id)))
        }
    }

    async fn profile_by_username(
        &mut self,
        schema: &ProfilesSchema,
        username: &str,
    ) -> Result<ProfileDetail, AppError> {
        let user = self
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile of {}", username)))?;
        let profile = self
            .find_profile_by_user(schema, user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile of {}", username)))?;
        Ok(ProfileDetail {
            id: profile.id,
            favorite_city: profile.favorite_city,
            user,
        })
    }

    async fn insert_user(&mut self, user: &User) -> Result<User, AppError> {
        user.validate()?;
        self.write_user(user, WriteMode::Replace).await?;
        Ok(user.clone())
    }

    async fn create_user(&mut self, fields: UserFields) -> Result<User, AppError> {
        let user = fields.with_id(self.next_id(USERS).await?);
        user.validate()?;
        self.write_user(&user, WriteMode::Insert).await?;
        Ok(user)
    }

    async fn get_user(&mut self, id: i64) -> Result<User, AppError> {
        self.find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
    }

    async fn delete_user(&mut self, id: i64) -> Result<(), AppError> {
        if self.remove_user(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user {}", id)))
        }
    }
}

/// Create every table in `tables` that does not exist yet, in order, and commit.
pub async fn ensure_tables(store: &dyn RecordStore, tables: &[Table]) -> Result<(), AppError> {
    let mut uow = store.begin().await?;
    for table in tables {
        uow.create_table(*table).await?;
    }
    uow.commit().await
}
