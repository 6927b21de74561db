use super::{Rules, Validate};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// PHC-format password hash; empty when the user cannot log in.
    #[serde(default, skip_serializing)]
    pub password: String,
    /// May use the administration endpoints.
    #[serde(default)]
    pub is_staff: bool,
}

/// User as submitted for creation. `password` is plain text here; it is hashed before storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserFields {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl UserFields {
    pub fn with_id(self, id: i64) -> User {
        User {
            id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
            is_staff: self.is_staff,
        }
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationError> {
        Rules::new("User")
            .required("username", &self.username)
            .max_length("username", &self.username, 150)
            .max_length("first_name", &self.first_name, 150)
            .max_length("last_name", &self.last_name, 150)
            .max_length("email", &self.email, 254)
            .max_length("password", &self.password, 128)
            .finish()
    }
}
