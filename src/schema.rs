//! Table layout. Each app owns a fixed set of tables named `<app>_<model>`.
//! The legacy app `oc_lettings_site` holds everything; `lettings` and `profiles` split it.

use std::fmt;

pub const LEGACY_APP: &str = "oc_lettings_site";
pub const LETTINGS_APP: &str = "lettings";
pub const PROFILES_APP: &str = "profiles";
pub const AUTH_APP: &str = "auth";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Model {
    Address,
    Letting,
    Profile,
    User,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Address => "address",
            Model::Letting => "letting",
            Model::Profile => "profile",
            Model::User => "user",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Table {
    pub app: &'static str,
    pub model: Model,
}

impl Table {
    pub const fn new(app: &'static str, model: Model) -> Self {
        Table { app, model }
    }

    /// Physical table name, e.g. `lettings_address`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.app, self.model.as_str())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.app, self.model.as_str())
    }
}

/// Address and Letting tables of one app. A Letting always references the Address table of the
/// same app.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LettingsSchema {
    pub address: Table,
    pub letting: Table,
}

impl LettingsSchema {
    pub const fn of(app: &'static str) -> Self {
        LettingsSchema {
            address: Table::new(app, Model::Address),
            letting: Table::new(app, Model::Letting),
        }
    }

    /// Tables in creation order (referenced before referencing).
    pub fn tables(&self) -> [Table; 2] {
        [self.address, self.letting]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfilesSchema {
    pub profile: Table,
}

impl ProfilesSchema {
    pub const fn of(app: &'static str) -> Self {
        ProfilesSchema {
            profile: Table::new(app, Model::Profile),
        }
    }

    pub fn tables(&self) -> [Table; 1] {
        [self.profile]
    }
}

pub const LEGACY_LETTINGS: LettingsSchema = LettingsSchema::of(LEGACY_APP);
pub const LETTINGS: LettingsSchema = LettingsSchema::of(LETTINGS_APP);
pub const LEGACY_PROFILES: ProfilesSchema = ProfilesSchema::of(LEGACY_APP);
pub const PROFILES: ProfilesSchema = ProfilesSchema::of(PROFILES_APP);

/// External user identities. Referenced by profiles, never migrated.
pub const USERS: Table = Table::new(AUTH_APP, Model::User);

/// Tables of a fresh legacy install, in creation order.
pub fn legacy_tables() -> Vec<Table> {
    vec![USERS, LEGACY_LETTINGS.address, LEGACY_LETTINGS.letting, LEGACY_PROFILES.profile]
}

/// Tables the application reads from, in creation order.
pub fn app_tables() -> Vec<Table> {
    vec![USERS, LETTINGS.address, LETTINGS.letting, PROFILES.profile]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_follow_app_model_convention() {
        assert_eq!(LEGACY_LETTINGS.address.name(), "oc_lettings_site_address");
        assert_eq!(LETTINGS.letting.name(), "lettings_letting");
        assert_eq!(PROFILES.profile.to_string(), "profiles_profile");
        assert_eq!(USERS.name(), "auth_user");
    }

    #[test]
    fn address_is_created_before_letting() {
        assert_eq!(LETTINGS.tables(), [LETTINGS.address, LETTINGS.letting]);
    }
}
