use super::{Address, Rules, Validate};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rental listing. Owns its address exclusively: one letting per address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letting {
    pub id: i64,
    pub title: String,
    pub address_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LettingFields {
    pub title: String,
    pub address_id: i64,
}

impl LettingFields {
    pub fn with_id(self, id: i64) -> Letting {
        Letting {
            id,
            title: self.title,
            address_id: self.address_id,
        }
    }
}

/// Letting with its address resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LettingDetail {
    pub id: i64,
    pub title: String,
    pub address: Address,
}

impl Validate for Letting {
    fn validate(&self) -> Result<(), ValidationError> {
        Rules::new("Letting")
            .required("title", &self.title)
            .max_length("title", &self.title, 256)
            .finish()
    }
}

impl fmt::Display for Letting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
