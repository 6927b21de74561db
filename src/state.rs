//! Shared application state for all routes.

use crate::reporting::ErrorReporter;
use crate::service::{AuthService, LettingsService, ProfilesService, UsersService};
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub auth: AuthService,
    pub lettings: LettingsService,
    pub profiles: ProfilesService,
    pub users: UsersService,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        AppState {
            auth: AuthService::new(store.clone(), reporter.clone()),
            lettings: LettingsService::new(store.clone(), reporter.clone()),
            profiles: ProfilesService::new(store.clone(), reporter.clone()),
            users: UsersService::new(store.clone(), reporter.clone()),
            store,
            reporter,
        }
    }
}
