use super::{Rules, User, Validate};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extra information attached to exactly one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub favorite_city: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub user_id: i64,
    #[serde(default)]
    pub favorite_city: String,
}

impl ProfileFields {
    pub fn with_id(self, id: i64) -> Profile {
        Profile {
            id,
            user_id: self.user_id,
            favorite_city: self.favorite_city,
        }
    }
}

/// Profile with its user resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileDetail {
    pub id: i64,
    pub favorite_city: String,
    pub user: User,
}

impl Validate for Profile {
    fn validate(&self) -> Result<(), ValidationError> {
        Rules::new("Profile")
            .max_length("favorite_city", &self.favorite_city, 64)
            .finish()
    }
}

impl fmt::Display for ProfileDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user.username)
    }
}
