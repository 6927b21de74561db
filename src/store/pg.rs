//! PostgreSQL store. Each unit of work is one database transaction; DDL participates in it.

use super::{RecordStore, Tables, UnitOfWork, WriteMode};
use crate::error::AppError;
use crate::model::{Address, Letting, Profile, User};
use crate::schema::{LettingsSchema, Model, ProfilesSchema, Table, USERS};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, PgPool, Postgres, Transaction};
use std::str::FromStr;

/// Quote an identifier; embedded double quotes are doubled.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified(table: Table) -> String {
    quote(&table.name())
}

const ADDRESS_COLUMNS: &[&str] = &[
    "id",
    "number",
    "street",
    "city",
    "state",
    "zip_code",
    "country_iso_code",
];
const LETTING_COLUMNS: &[&str] = &["id", "title", "address_id"];
const PROFILE_COLUMNS: &[&str] = &["id", "user_id", "favorite_city"];
const USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "first_name",
    "last_name",
    "email",
    "password",
    "is_staff",
];

/// Column definitions for each model. Letting and Profile reference with ON DELETE CASCADE.
fn table_ddl(table: Table) -> String {
    let columns = match table.model {
        Model::Address => vec![
            "id BIGINT PRIMARY KEY".to_string(),
            "number INTEGER NOT NULL CHECK (number >= 0)".into(),
            "street VARCHAR(64) NOT NULL".into(),
            "city VARCHAR(64) NOT NULL".into(),
            "state VARCHAR(2) NOT NULL".into(),
            "zip_code INTEGER NOT NULL CHECK (zip_code >= 0)".into(),
            "country_iso_code VARCHAR(3) NOT NULL".into(),
        ],
        Model::Letting => vec![
            "id BIGINT PRIMARY KEY".to_string(),
            "title VARCHAR(256) NOT NULL".into(),
            format!(
                "address_id BIGINT NOT NULL UNIQUE REFERENCES {} (id) ON DELETE CASCADE",
                qualified(Table::new(table.app, Model::Address))
            ),
        ],
        Model::Profile => vec![
            "id BIGINT PRIMARY KEY".to_string(),
            "favorite_city VARCHAR(64) NOT NULL DEFAULT ''".into(),
            format!(
                "user_id BIGINT NOT NULL UNIQUE REFERENCES {} (id) ON DELETE CASCADE",
                qualified(USERS)
            ),
        ],
        Model::User => vec![
            "id BIGINT PRIMARY KEY".to_string(),
            "username VARCHAR(150) NOT NULL UNIQUE".into(),
            "first_name VARCHAR(150) NOT NULL DEFAULT ''".into(),
            "last_name VARCHAR(150) NOT NULL DEFAULT ''".into(),
            "email VARCHAR(254) NOT NULL DEFAULT ''".into(),
            "password VARCHAR(128) NOT NULL DEFAULT ''".into(),
            "is_staff BOOLEAN NOT NULL DEFAULT FALSE".into(),
        ],
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified(table),
        columns.join(",\n  ")
    )
}

/// `INSERT` of every column. `Replace` overwrites the row holding the id; `Insert` lets the
/// primary key reject it.
fn write_sql(table: Table, columns: &[&str], mode: WriteMode) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    if mode == WriteMode::Replace {
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "id")
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        sql.push_str(" ON CONFLICT (id) DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }
    sql
}

fn select_sql(table: Table, columns: &[&str], filter: &str) -> String {
    format!(
        "SELECT {} FROM {}{} ORDER BY id",
        columns.join(", "),
        qualified(table),
        filter
    )
}

/// Map constraint and catalog errors onto the store's error kinds.
fn map_db_error(err: sqlx::Error, table: Table) -> AppError {
    if let Some(db) = err.as_database_error() {
        match db.code().as_deref() {
            Some("23503") => return AppError::Reference(format!("{}: {}", table, db.message())),
            Some("23505") => return AppError::Conflict(format!("{}: {}", table, db.message())),
            Some("42P01") => return AppError::MissingTable(table.name()),
            _ => {}
        }
    }
    AppError::Db(err)
}

fn unsigned(value: i32, column: &str, table: Table) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| {
        AppError::Internal(format!("{}.{} holds negative value {}", table, column, value))
    })
}

fn signed(value: u32, column: &str) -> Result<i32, AppError> {
    i32::try_from(value)
        .map_err(|_| AppError::BadRequest(format!("{} out of range: {}", column, value)))
}

type AddressRow = (i64, i32, String, String, String, i32, String);
type UserRow = (i64, String, String, String, String, String, bool);

fn address_from_row(row: AddressRow, table: Table) -> Result<Address, AppError> {
    let (id, number, street, city, state, zip_code, country_iso_code) = row;
    Ok(Address {
        id,
        number: unsigned(number, "number", table)?,
        street,
        city,
        state,
        zip_code: unsigned(zip_code, "zip_code", table)?,
        country_iso_code,
    })
}

fn user_from_row(row: UserRow) -> User {
    let (id, username, first_name, last_name, email, password, is_staff) = row;
    User {
        id,
        username,
        first_name,
        last_name,
        email,
        password,
        is_staff,
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }
}

struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

impl PgUnit {
    async fn execute(&mut self, sql: &str, table: Table) -> Result<u64, AppError> {
        tracing::debug!(sql = %sql, "query (tx)");
        let done = sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(done.rows_affected())
    }

    async fn delete_by_id(&mut self, table: Table, id: i64) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", qualified(table));
        tracing::debug!(sql = %sql, id, "query (tx)");
        let done = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(done.rows_affected() > 0)
    }

    async fn exists_by_id(&mut self, table: Table, id: i64) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            qualified(table)
        );
        let found: (bool,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(found.0)
    }

    async fn select_addresses(
        &mut self,
        table: Table,
        filter: &str,
        id: Option<i64>,
    ) -> Result<Vec<Address>, AppError> {
        let sql = select_sql(table, ADDRESS_COLUMNS, filter);
        tracing::debug!(sql = %sql, ?id, "query (tx)");
        let mut query = sqlx::query_as::<_, AddressRow>(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        rows.into_iter().map(|r| address_from_row(r, table)).collect()
    }

    async fn select_lettings(
        &mut self,
        table: Table,
        filter: &str,
        value: Option<i64>,
    ) -> Result<Vec<Letting>, AppError> {
        let sql = select_sql(table, LETTING_COLUMNS, filter);
        tracing::debug!(sql = %sql, ?value, "query (tx)");
        let mut query = sqlx::query_as::<_, (i64, String, i64)>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(rows
            .into_iter()
            .map(|(id, title, address_id)| Letting { id, title, address_id })
            .collect())
    }

    async fn select_profiles(
        &mut self,
        table: Table,
        filter: &str,
        value: Option<i64>,
    ) -> Result<Vec<Profile>, AppError> {
        let sql = select_sql(table, PROFILE_COLUMNS, filter);
        tracing::debug!(sql = %sql, ?value, "query (tx)");
        let mut query = sqlx::query_as::<_, (i64, i64, String)>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(rows
            .into_iter()
            .map(|(id, user_id, favorite_city)| Profile {
                id,
                user_id,
                favorite_city,
            })
            .collect())
    }

    async fn select_users(
        &mut self,
        filter: &str,
        value: Option<&str>,
        id: Option<i64>,
    ) -> Result<Vec<User>, AppError> {
        let sql = select_sql(USERS, USER_COLUMNS, filter);
        tracing::debug!(sql = %sql, ?value, ?id, "query (tx)");
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        if let Some(value) = value {
            query = query.bind(value.to_string());
        }
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, USERS))?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PgUnit { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Tables for PgUnit {
    async fn create_table(&mut self, table: Table) -> Result<(), AppError> {
        let ddl = table_ddl(table);
        self.execute(&ddl, table).await?;
        Ok(())
    }

    async fn drop_table(&mut self, table: Table) -> Result<(), AppError> {
        let sql = format!("DROP TABLE {}", qualified(table));
        self.execute(&sql, table).await?;
        Ok(())
    }

    async fn table_exists(&mut self, table: Table) -> Result<bool, AppError> {
        let found: (bool,) = sqlx::query_as("SELECT to_regclass($1) IS NOT NULL")
            .bind(table.name())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(found.0)
    }

    async fn next_id(&mut self, table: Table) -> Result<i64, AppError> {
        let sql = format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {}", qualified(table));
        let next: (i64,) = sqlx::query_as(&sql)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(next.0)
    }

    async fn write_address(
        &mut self,
        schema: &LettingsSchema,
        address: &Address,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        let table = schema.address;
        let sql = write_sql(table, ADDRESS_COLUMNS, mode);
        tracing::debug!(sql = %sql, id = address.id, "query (tx)");
        sqlx::query(&sql)
            .bind(address.id)
            .bind(signed(address.number, "number")?)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(signed(address.zip_code, "zip_code")?)
            .bind(&address.country_iso_code)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(())
    }

    async fn find_address(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Address>, AppError> {
        Ok(self
            .select_addresses(schema.address, " WHERE id = $1", Some(id))
            .await?
            .into_iter()
            .next())
    }

    async fn list_addresses(&mut self, schema: &LettingsSchema) -> Result<Vec<Address>, AppError> {
        self.select_addresses(schema.address, "", None).await
    }

    async fn remove_address(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError> {
        // The letting goes with it through ON DELETE CASCADE.
        self.delete_by_id(schema.address, id).await
    }

    async fn write_letting(
        &mut self,
        schema: &LettingsSchema,
        letting: &Letting,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        if !self.exists_by_id(schema.address, letting.address_id).await? {
            return Err(AppError::Reference(format!(
                "{} has no address {}",
                schema.address, letting.address_id
            )));
        }
        let table = schema.letting;
        let sql = write_sql(table, LETTING_COLUMNS, mode);
        tracing::debug!(sql = %sql, id = letting.id, "query (tx)");
        sqlx::query(&sql)
            .bind(letting.id)
            .bind(&letting.title)
            .bind(letting.address_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(())
    }

    async fn find_letting(
        &mut self,
        schema: &LettingsSchema,
        id: i64,
    ) -> Result<Option<Letting>, AppError> {
        Ok(self
            .select_lettings(schema.letting, " WHERE id = $1", Some(id))
            .await?
            .into_iter()
            .next())
    }

    async fn find_letting_by_address(
        &mut self,
        schema: &LettingsSchema,
        address_id: i64,
    ) -> Result<Option<Letting>, AppError> {
        Ok(self
            .select_lettings(schema.letting, " WHERE address_id = $1", Some(address_id))
            .await?
            .into_iter()
            .next())
    }

    async fn list_lettings(&mut self, schema: &LettingsSchema) -> Result<Vec<Letting>, AppError> {
        self.select_lettings(schema.letting, "", None).await
    }

    async fn remove_letting(&mut self, schema: &LettingsSchema, id: i64) -> Result<bool, AppError> {
        self.delete_by_id(schema.letting, id).await
    }

    async fn write_profile(
        &mut self,
        schema: &ProfilesSchema,
        profile: &Profile,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        if !self.exists_by_id(USERS, profile.user_id).await? {
            return Err(AppError::Reference(format!(
                "{} has no user {}",
                USERS, profile.user_id
            )));
        }
        let table = schema.profile;
        let sql = write_sql(table, PROFILE_COLUMNS, mode);
        tracing::debug!(sql = %sql, id = profile.id, "query (tx)");
        sqlx::query(&sql)
            .bind(profile.id)
            .bind(profile.user_id)
            .bind(&profile.favorite_city)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, table))?;
        Ok(())
    }

    async fn find_profile(
        &mut self,
        schema: &ProfilesSchema,
        id: i64,
    ) -> Result<Option<Profile>, AppError> {
        Ok(self
            .select_profiles(schema.profile, " WHERE id = $1", Some(id))
            .await?
            .into_iter()
            .next())
    }

    async fn find_profile_by_user(
        &mut self,
        schema: &ProfilesSchema,
        user_id: i64,
    ) -> Result<Option<Profile>, AppError> {
        Ok(self
            .select_profiles(schema.profile, " WHERE user_id = $1", Some(user_id))
            .await?
            .into_iter()
            .next())
    }

    async fn list_profiles(&mut self, schema: &ProfilesSchema) -> Result<Vec<Profile>, AppError> {
        self.select_profiles(schema.profile, "", None).await
    }

    async fn remove_profile(&mut self, schema: &ProfilesSchema, id: i64) -> Result<bool, AppError> {
        self.delete_by_id(schema.profile, id).await
    }

    async fn write_user(&mut self, user: &User, mode: WriteMode) -> Result<(), AppError> {
        let sql = write_sql(USERS, USER_COLUMNS, mode);
        tracing::debug!(sql = %sql, id = user.id, "query (tx)");
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.is_staff)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_db_error(e, USERS))?;
        Ok(())
    }

    async fn find_user(&mut self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self
            .select_users(" WHERE id = $1", None, Some(id))
            .await?
            .into_iter()
            .next())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .select_users(" WHERE username = $1", Some(username), None)
            .await?
            .into_iter()
            .next())
    }

    async fn list_users(&mut self) -> Result<Vec<User>, AppError> {
        self.select_users("", None, None).await
    }

    async fn remove_user(&mut self, id: i64) -> Result<bool, AppError> {
        self.delete_by_id(USERS, id).await
    }
}

/// Connection options for the maintenance database of the server in `database_url`, plus the
/// database name the URL asks for.
fn maintenance_options(database_url: &str) -> Result<(PgConnectOptions, Option<String>), AppError> {
    let opts = PgConnectOptions::from_str(database_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let wanted = opts.get_database().map(str::to_string);
    Ok((opts.database("postgres"), wanted))
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the server's
/// `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin, wanted) = maintenance_options(database_url)?;
    let db_name = match wanted {
        Some(name) if !name.is_empty() && name != "postgres" => name,
        _ => return Ok(()),
    };
    let mut conn = admin.connect().await?;
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}
