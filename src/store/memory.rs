//! In-process store. A unit of work holds the store's lock for its whole life, edits a private copy
//! of the database and publishes it on commit. Units therefore run one at a time.

use super::{RecordStore, Tables, UnitOfWork, WriteMode};
use crate::error::AppError;
use crate::model::{Address, Letting, Profile, User};
use crate::schema::{LettingsSchema, Model, ProfilesSchema, Table, USERS};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug)]
enum Rows {
    Addresses(BTreeMap<i64, Address>),
    Lettings(BTreeMap<i64, Letting>),
    Profiles(BTreeMap<i64, Profile>),
    Users(BTreeMap<i64, User>),
}

impl Rows {
    fn empty(model: Model) -> Self {
        match model {
            Model::Address => Rows::Addresses(BTreeMap::new()),
            Model::Letting => Rows::Lettings(BTreeMap::new()),
            Model::Profile => Rows::Profiles(BTreeMap::new()),
            Model::User => Rows::Users(BTreeMap::new()),
        }
    }

    fn max_id(&self) -> Option<i64> {
        match self {
            Rows::Addresses(m) => m.keys().next_back().copied(),
            Rows::Lettings(m) => m.keys().next_back().copied(),
            Rows::Profiles(m) => m.keys().next_back().copied(),
            Rows::Users(m) => m.keys().next_back().copied(),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Database {
    tables: HashMap<Table, Rows>,
}

/// Rejects an `Insert` onto an id that is already taken.
fn check_free<T>(
    rows: &BTreeMap<i64, T>,
    table: Table,
    id: i64,
    mode: WriteMode,
) -> Result<(), AppError> {
    if mode == WriteMode::Insert && rows.contains_key(&id) {
        return Err(AppError::Conflict(format!("{} already holds id {}", table, id)));
    }
    Ok(())
}

fn wrong_kind(table: Table) -> AppError {
    AppError::Internal(format!("table {} holds {} rows", table, table.model.as_str()))
}

impl Database {
    fn rows(&self, table: Table) -> Result<&Rows, AppError> {
        self.tables
            .get(&table)
            .ok_or_else(|| AppError::MissingTable(table.name()))
    }

    fn rows_mut(&mut self, table: Table) -> Result<&mut Rows, AppError> {
        self.tables
            .get_mut(&table)
            .ok_or_else(|| AppError::MissingTable(table.name()))
    }

    fn addresses(&self, table: Table) -> Result<&BTreeMap<i64, Address>, AppError> {
        match self.rows(table)? {
            Rows::Addresses(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn addresses_mut(&mut self, table: Table) -> Result<&mut BTreeMap<i64, Address>, AppError> {
        match self.rows_mut(table)? {
            Rows::Addresses(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn lettings(&self, table: Table) -> Result<&BTreeMap<i64, Letting>, AppError> {
        match self.rows(table)? {
            Rows::Lettings(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn lettings_mut(&mut self, table: Table) -> Result<&mut BTreeMap<i64, Letting>, AppError> {
        match self.rows_mut(table)? {
            Rows::Lettings(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn profiles(&self, table: Table) -> Result<&BTreeMap<i64, Profile>, AppError> {
        match self.rows(table)? {
            Rows::Profiles(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn profiles_mut(&mut self, table: Table) -> Result<&mut BTreeMap<i64, Profile>, AppError> {
        match self.rows_mut(table)? {
            Rows::Profiles(m) => Ok(m),
            _ => Err(wrong_kind(table)),
        }
    }

    fn users(&self) -> Result<&BTreeMap<i64, User>, AppError> {
        match self.rows(USERS)? {
            Rows::Users(m) => Ok(m),
            _ => Err(wrong_kind(USERS)),
        }
    }

    fn users_mut(&mut self) -> Result<&mut BTreeMap<i64, User>, AppError> {
        match self.rows_mut(USERS)? {
            Rows::Users(m) => Ok(m),
            _ => Err(wrong_kind(USERS)),
        }
    }
}

/// Store kept in process memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    db: Arc<Mutex<Database>>,
    /// Tables whose drop is refused, to exercise teardown failures.
    refuse_drop: Arc<HashSet<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to drop the given tables.
    pub fn refusing_drop(tables: &[Table]) -> Self {
        MemoryStore {
            db: Arc::default(),
            refuse_drop: Arc::new(tables.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.db.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnit {
            guard,
            refuse_drop: self.refuse_drop.clone(),
            working,
        }))
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<Database>,
    refuse_drop: Arc<HashSet<Table>>,
    working: Database,
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnit {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl Tables for MemoryUnit {
    async fn create_table(&mut self, table: Table) -> Result<(), AppError> {
        self.working
            .tables
            .entry(table)
            .or_insert_with(|| Rows::empty(table.model));
        Ok(())
    }

    async fn drop_table(&mut self, table: Table) -> Result<(), AppError> {
        if self.refuse_drop.contains(&table) {
            return Err(AppError::Internal(format!("drop of {} refused", table)));
        }
        self.working
            .tables
            .remove(&table)
            .map(|_| ())
            .ok_or_else(|| AppError::MissingTable(table.name()))
    }

    async fn table_exists(&mut self, table: Table) -> Result<bool, AppError> {
        Ok(self.working.tables.contains_key(&table))
    }

    async fn next_id(&mut self, table: Table) -> Result<i64, AppError> {
        Ok(self.working.rows(table)?.max_id().map_or(1, |id| id + 1))
    }

    async fn write_address(
        &mut self,
        schema: &LettingsSchema,
        address: &Address,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        let rows = self.working.addresses_mut(schema.address)?;
        check_free(rows, schema.address, address.id, mode)?;
        rows.insert(address.id, address.clone());
        Ok(())
    }

    async fn find_address(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Address>, AppError> {
        Ok(self.working.addresses(schema.address)?.get(&id).cloned())
    }

    async fn list_addresses(&mut self, schema: &LettingsSchema) -> Result<Vec<Address>, AppError> {
        Ok(self.working.addresses(schema.address)?.values().cloned().collect())
    }

    async fn remove_address(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError> {
        if self.working.addresses_mut(schema.address)?.remove(&id).is_none() {
            return Ok(false);
        }
        if self.working.tables.contains_key(&schema.letting) {
            self.working
                .lettings_mut(schema.letting)?
                .retain(|_, l| l.address_id != id);
        }
        Ok(true)
    }

    async fn write_letting(
        &mut self,
        schema: &LettingsSchema,
        letting: &Letting,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        if !self
            .working
            .addresses(schema.address)?
            .contains_key(&letting.address_id)
        {
            return Err(AppError::Reference(format!(
                "{} has no address {}",
                schema.address, letting.address_id
            )));
        }
        let rows = self.working.lettings_mut(schema.letting)?;
        check_free(rows, schema.letting, letting.id, mode)?;
        if let Some(other) = rows
            .values()
            .find(|l| l.address_id == letting.address_id && l.id != letting.id)
        {
            return Err(AppError::Conflict(format!(
                "address {} already belongs to letting {}",
                letting.address_id, other.id
            )));
        }
        rows.insert(letting.id, letting.clone());
        Ok(())
    }

    async fn find_letting(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Letting>, AppError> {
        Ok(self.working.lettings(schema.letting)?.get(&id).cloned())
    }

    async fn find_letting_by_address(
        &mut self,
        schema: &LettingsSchema,
        address_id: i64,
    ) -> Result<Option<Letting>, AppError> {
        Ok(self
            .working
            .lettings(schema.letting)?
            .values()
            .find(|l| l.address_id == address_id)
            .cloned())
    }

    async fn list_lettings(&mut self, schema: &LettingsSchema) -> Result<Vec<Letting>, AppError> {
        Ok(self.working.lettings(schema.letting)?.values().cloned().collect())
    }

    async fn remove_letting(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError> {
        Ok(self.working.lettings_mut(schema.letting)?.remove(&id).is_some())
    }

    async fn write_profile(
        &mut self,
        schema: &ProfilesSchema,
        profile: &Profile,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        if !self.working.users()?.contains_key(&profile.user_id) {
            return Err(AppError::Reference(format!("{} has no user {}", USERS, profile.user_id)));
        }
        let rows = self.working.profiles_mut(schema.profile)?;
        check_free(rows, schema.profile, profile.id, mode)?;
        if let Some(other) = rows
            .values()
            .find(|p| p.user_id == profile.user_id && p.id != profile.id)
        {
            return Err(AppError::Conflict(format!(
                "user {} already has profile {}",
                profile.user_id, other.id
            )));
        }
        rows.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn find_profile(
        &mut self,
        schema: &ProfilesSchema,
        id: i64,
    ) -> Result<Option<Profile>, AppError> {
        Ok(self.working.profiles(schema.profile)?.get(&id).cloned())
    }

    async fn find_profile_by_user(
        &mut self,
        schema: &ProfilesSchema,
        user_id: i64,
    ) -> Result<Option<Profile>, AppError> {
        Ok(self
            .working
            .profiles(schema.profile)?
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn list_profiles(&mut self, schema: &ProfilesSchema) -> Result<Vec<Profile>, AppError> {
        Ok(self.working.profiles(schema.profile)?.values().cloned().collect())
    }

    async fn remove_profile(&mut self, schema: &ProfilesSchema, id: i64) -> Result<bool, AppError> {
        Ok(self.working.profiles_mut(schema.profile)?.remove(&id).is_some())
    }

    async fn write_user(&mut self, user: &User, mode: WriteMode) -> Result<(), AppError> {
        let rows = self.working.users_mut()?;
        check_free(rows, USERS, user.id, mode)?;
        if let Some(other) = rows
            .values()
            .find(|u| u.username == user.username && u.id != user.id)
        {
            return Err(AppError::Conflict(format!(
                "username {} already taken by user {}",
                user.username, other.id
            )));
        }
        rows.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.working.users()?.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .working
            .users()?
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&mut self) -> Result<Vec<User>, AppError> {
        Ok(self.working.users()?.values().cloned().collect())
    }

    async fn remove_user(&mut self, id: i64) -> Result<bool, AppError> {
        if self.working.users_mut()?.remove(&id).is_none() {
            return Ok(false);
        }
        for rows in self.working.tables.values_mut() {
            if let Rows::Profiles(profiles) = rows {
                profiles.retain(|_, p| p.user_id != id);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressFields, UserFields};
    use crate::schema::{app_tables, legacy_tables, LEGACY_LETTINGS, LETTINGS};
    use crate::store::ensure_tables;
    use std::time::Duration;

    fn address(id: i64) -> Address {
        Address {
            id,
            number: 7,
            street: "Rue de la Paix".into(),
            city: "Paris".into(),
            state: "IF".into(),
            zip_code: 75002,
            country_iso_code: "FRA".into(),
        }
    }

    fn fields() -> AddressFields {
        AddressFields {
            number: 12,
            street: "Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: 62704,
            country_iso_code: "USA".into(),
        }
    }

    #[tokio::test]
    async fn uncommitted_changes_are_discarded() {
        let store = MemoryStore::new();
        ensure_tables(&store, &legacy_tables()).await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.insert_address(&LEGACY_LETTINGS, &address(1)).await.unwrap();
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        assert!(uow.list_addresses(&LEGACY_LETTINGS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reading_a_missing_table_fails() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = uow.list_addresses(&LETTINGS).await.unwrap_err();
        assert!(matches!(err, AppError::MissingTable(name) if name == "lettings_address"));
    }

    #[tokio::test]
    async fn next_id_follows_highest_id() {
        let store = MemoryStore::new();
        ensure_tables(&store, &legacy_tables()).await.unwrap();
        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.next_id(LEGACY_LETTINGS.address).await.unwrap(), 1);
        uow.insert_address(&LEGACY_LETTINGS, &address(41)).await.unwrap();
        assert_eq!(uow.next_id(LEGACY_LETTINGS.address).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn refused_drop_keeps_table() {
        let store = MemoryStore::refusing_drop(&[LEGACY_LETTINGS.address]);
        ensure_tables(&store, &legacy_tables()).await.unwrap();
        let mut uow = store.begin().await.unwrap();
        assert!(uow.drop_table(LEGACY_LETTINGS.address).await.is_err());
        assert!(uow.table_exists(LEGACY_LETTINGS.address).await.unwrap());
    }

    #[tokio::test]
    async fn overlapping_units_keep_both_writes() {
        let store = MemoryStore::new();
        ensure_tables(&store, &app_tables()).await.unwrap();

        let mut first = store.begin().await.unwrap();
        let user = UserFields {
            username: "alice".into(),
            ..UserFields::default()
        };
        first.create_user(user).await.unwrap();
        first.create_address(&LETTINGS, fields()).await.unwrap();

        let other = store.clone();
        let second = tokio::spawn(async move {
            let mut uow = other.begin().await?;
            let address = uow.create_address(&LETTINGS, fields()).await?;
            uow.commit().await?;
            Ok::<_, AppError>(address)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        first.commit().await.unwrap();
        let address = second.await.unwrap().unwrap();
        assert_eq!(address.id, 2);

        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_user_by_username("alice").await.unwrap().is_some());
        let ids: Vec<i64> = uow
            .list_addresses(&LETTINGS)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn insert_onto_taken_id_conflicts() {
        let store = MemoryStore::new();
        ensure_tables(&store, &legacy_tables()).await.unwrap();
        let mut uow = store.begin().await.unwrap();
        uow.insert_address(&LEGACY_LETTINGS, &address(1)).await.unwrap();

        let mut other = address(1);
        other.street = "Elm St".into();
        let err = uow
            .write_address(&LEGACY_LETTINGS, &other, WriteMode::Insert)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let kept = uow.find_address(&LEGACY_LETTINGS, 1).await.unwrap().unwrap();
        assert_eq!(kept.street, "Rue de la Paix");

        uow.write_address(&LEGACY_LETTINGS, &other, WriteMode::Replace)
            .await
            .unwrap();
        let replaced = uow.find_address(&LEGACY_LETTINGS, 1).await.unwrap().unwrap();
        assert_eq!(replaced.street, "Elm St");
    }
}
