//! PostgreSQL backend. Runs only when DATABASE_URL is set; the database's oc-lettings tables are
//! dropped first.

use oc_lettings::error::{AppError, MigrationError};
use oc_lettings::model::{Address, AddressFields, Letting};
use oc_lettings::schema::{
    legacy_tables, Table, LEGACY_LETTINGS, LEGACY_PROFILES, LETTINGS, PROFILES, USERS,
};
use oc_lettings::store::{
    ensure_database_exists, ensure_tables, PgStore, RecordStore, Tables, WriteMode,
};
use oc_lettings::{migrate_forward, migrate_reverse, Domain, MemoryReporter};

async fn fresh_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ensure_database_exists(&url).await.unwrap();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    let store = PgStore::new(pool);
    let teardown: [Table; 7] = [
        LETTINGS.letting,
        LETTINGS.address,
        LEGACY_LETTINGS.letting,
        LEGACY_LETTINGS.address,
        PROFILES.profile,
        LEGACY_PROFILES.profile,
        USERS,
    ];
    for table in teardown {
        let mut uow = store.begin().await.unwrap();
        if uow.table_exists(table).await.unwrap() {
            uow.drop_table(table).await.unwrap();
        }
        uow.commit().await.unwrap();
    }
    ensure_tables(&store, &legacy_tables()).await.unwrap();
    Some(store)
}

fn main_st(id: i64) -> Address {
    Address {
        id,
        number: 123,
        street: "Main St".into(),
        city: "Springfield".into(),
        state: "IL".into(),
        zip_code: 62704,
        country_iso_code: "USA".into(),
    }
}

// Single test so runs against the shared tables never interleave.
#[tokio::test]
async fn postgres_store_round_trip() {
    let Some(store) = fresh_store().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let reporter = MemoryReporter::new();

    let mut uow = store.begin().await.unwrap();
    uow.insert_address(&LEGACY_LETTINGS, &main_st(1)).await.unwrap();
    uow.insert_letting(
        &LEGACY_LETTINGS,
        &Letting {
            id: 1,
            title: "Nice Apartment".into(),
            address_id: 1,
        },
    )
    .await
    .unwrap();
    let dangling = uow
        .write_letting(
            &LEGACY_LETTINGS,
            &Letting {
                id: 2,
                title: "Nowhere".into(),
                address_id: 99,
            },
            WriteMode::Replace,
        )
        .await;
    assert!(matches!(dangling, Err(AppError::Reference(_))));
    drop(uow);

    // Dropping the unit rolled it back.
    let mut uow = store.begin().await.unwrap();
    assert!(uow.list_addresses(&LEGACY_LETTINGS).await.unwrap().is_empty());
    uow.insert_address(&LEGACY_LETTINGS, &main_st(1)).await.unwrap();
    uow.insert_letting(
        &LEGACY_LETTINGS,
        &Letting {
            id: 1,
            title: "Nice Apartment".into(),
            address_id: 1,
        },
    )
    .await
    .unwrap();
    uow.commit().await.unwrap();

    migrate_forward(&store, &reporter, Domain::Lettings).await.unwrap();
    let mut uow = store.begin().await.unwrap();
    let detail = uow.letting_detail(&LETTINGS, 1).await.unwrap();
    assert_eq!(detail.address, main_st(1));
    assert!(!uow.table_exists(LEGACY_LETTINGS.address).await.unwrap());
    drop(uow);

    let err = migrate_forward(&store, &reporter, Domain::Lettings).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Copy { source: AppError::MissingTable(_), .. }
    ));

    migrate_reverse(&store, &reporter, Domain::Lettings).await.unwrap();
    let mut uow = store.begin().await.unwrap();
    assert_eq!(uow.list_addresses(&LEGACY_LETTINGS).await.unwrap(), vec![main_st(1)]);
    uow.delete_address(&LEGACY_LETTINGS, 1).await.unwrap();
    assert!(uow.list_lettings(&LEGACY_LETTINGS).await.unwrap().is_empty());
    drop(uow);

    concurrent_creates_do_not_overwrite(&store).await;
}

fn fields(street: &str) -> AddressFields {
    AddressFields {
        number: 1,
        street: street.into(),
        city: "Springfield".into(),
        state: "IL".into(),
        zip_code: 62704,
        country_iso_code: "USA".into(),
    }
}

/// Two units pick the same next id; the one committing second gets `Conflict`.
async fn concurrent_creates_do_not_overwrite(store: &PgStore) {
    ensure_tables(store, &[LETTINGS.address, LETTINGS.letting]).await.unwrap();

    let mut first = store.begin().await.unwrap();
    let mut second = store.begin().await.unwrap();
    let created = first.create_address(&LETTINGS, fields("First St")).await.unwrap();
    let id = second.next_id(LETTINGS.address).await.unwrap();
    assert_eq!(id, created.id);
    first.commit().await.unwrap();

    let err = second
        .write_address(&LETTINGS, &fields("Second St").with_id(id), WriteMode::Insert)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    drop(second);

    let mut uow = store.begin().await.unwrap();
    assert_eq!(uow.get_address(&LETTINGS, id).await.unwrap().street, "First St");
}
