//! Record store and query services against the memory backend.

use oc_lettings::error::AppError;
use oc_lettings::model::{AddressFields, LettingFields, ProfileFields, UserFields};
use oc_lettings::schema::{app_tables, LETTINGS, PROFILES};
use oc_lettings::store::{ensure_tables, MemoryStore, RecordStore, Tables};
use oc_lettings::{AppState, MemoryReporter};
use rstest::rstest;
use std::sync::Arc;

fn main_st() -> AddressFields {
    AddressFields {
        number: 123,
        street: "Main St".into(),
        city: "Springfield".into(),
        state: "IL".into(),
        zip_code: 62704,
        country_iso_code: "USA".into(),
    }
}

async fn app_state() -> (AppState, Arc<MemoryReporter>) {
    let store = Arc::new(MemoryStore::new());
    ensure_tables(store.as_ref(), &app_tables()).await.unwrap();
    let reporter = Arc::new(MemoryReporter::new());
    (AppState::new(store, reporter.clone()), reporter)
}

#[tokio::test]
async fn created_letting_is_listed_with_its_address() {
    let (state, reporter) = app_state().await;
    let address = state.lettings.create_address(main_st()).await.unwrap();
    let letting = state
        .lettings
        .create_letting(LettingFields {
            title: "Nice Apartment".into(),
            address_id: address.id,
        })
        .await
        .unwrap();
    assert_eq!((address.id, letting.id), (1, 1));

    let listed = state.lettings.list().await.unwrap();
    assert_eq!(listed, vec![letting]);
    let detail = state.lettings.get(1).await.unwrap();
    assert_eq!(detail.address.street, "Main St");
    assert_eq!(detail.address.to_string(), "123 Main St");
    assert!(reporter.events().is_empty());
}

#[tokio::test]
async fn missing_letting_is_not_found_and_not_reported() {
    let (state, reporter) = app_state().await;
    let err = state.lettings.get(999).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(reporter.events().is_empty());
}

#[rstest]
#[case(10000, "number")]
#[case(0, "")]
#[tokio::test]
async fn address_number_bound(#[case] number: u32, #[case] failing_field: &str) {
    let (state, reporter) = app_state().await;
    let result = state
        .lettings
        .create_address(AddressFields { number, ..main_st() })
        .await;
    if failing_field.is_empty() {
        assert!(result.is_ok());
    } else {
        match result {
            Err(AppError::Validation(v)) => assert!(v.has_field(failing_field)),
            other => panic!("expected validation error, got {:?}", other.map(|a| a.id)),
        }
        assert_eq!(reporter.messages(), vec!["validation error in model Address".to_string()]);
    }
}

#[tokio::test]
async fn deleting_an_address_removes_its_letting() {
    let (state, _) = app_state().await;
    let address = state.lettings.create_address(main_st()).await.unwrap();
    state
        .lettings
        .create_letting(LettingFields {
            title: "Nice Apartment".into(),
            address_id: address.id,
        })
        .await
        .unwrap();

    state.lettings.delete_address(address.id).await.unwrap();
    assert!(state.lettings.list().await.unwrap().is_empty());
    assert!(state.lettings.delete_address(address.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn letting_needs_an_existing_unclaimed_address() {
    let (state, reporter) = app_state().await;
    let dangling = state
        .lettings
        .create_letting(LettingFields {
            title: "Nowhere".into(),
            address_id: 42,
        })
        .await;
    assert!(matches!(dangling, Err(AppError::Reference(_))));

    let address = state.lettings.create_address(main_st()).await.unwrap();
    let fields = LettingFields {
        title: "First".into(),
        address_id: address.id,
    };
    state.lettings.create_letting(fields.clone()).await.unwrap();
    let second = state.lettings.create_letting(fields).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(reporter.events().len(), 2);
}

#[tokio::test]
async fn update_replaces_the_whole_record() {
    let (state, _) = app_state().await;
    let address = state.lettings.create_address(main_st()).await.unwrap();
    let updated = state
        .lettings
        .update_address(
            address.id,
            AddressFields {
                street: "Broadway".into(),
                ..main_st()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, address.id);
    assert_eq!(updated.street, "Broadway");
    assert!(state
        .lettings
        .update_address(77, main_st())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn profile_is_found_by_username_and_removed_with_user() {
    let (state, _) = app_state().await;
    let user = state
        .users
        .create(UserFields {
            username: "alice".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            email: "alice@example.com".into(),
            ..UserFields::default()
        })
        .await
        .unwrap();
    state
        .profiles
        .create(ProfileFields {
            user_id: user.id,
            favorite_city: "Oxford".into(),
        })
        .await
        .unwrap();

    let profile = state.profiles.get("alice").await.unwrap();
    assert_eq!(profile.favorite_city, "Oxford");
    assert_eq!(profile.to_string(), "alice");
    assert!(state.profiles.get("bob").await.unwrap_err().is_not_found());

    state.users.delete(user.id).await.unwrap();
    assert!(state.profiles.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn usernames_are_unique() {
    let (state, _) = app_state().await;
    let fields = UserFields {
        username: "alice".into(),
        ..UserFields::default()
    };
    state.users.create(fields.clone()).await.unwrap();
    assert!(matches!(
        state.users.create(fields).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn lists_are_ordered_by_id() {
    let store = MemoryStore::new();
    ensure_tables(&store, &app_tables()).await.unwrap();
    let mut uow = store.begin().await.unwrap();
    for street in ["C St", "A St", "B St"] {
        uow.create_address(
            &LETTINGS,
            AddressFields {
                street: street.into(),
                ..main_st()
            },
        )
        .await
        .unwrap();
    }
    uow.delete_address(&LETTINGS, 2).await.unwrap();
    uow.create_address(&LETTINGS, main_st()).await.unwrap();
    let ids: Vec<i64> = uow
        .list_addresses(&LETTINGS)
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert!(uow.list_profiles(&PROFILES).await.unwrap().is_empty());
}
