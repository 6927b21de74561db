use super::{Rules, Validate};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub number: u32,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: u32,
    pub country_iso_code: String,
}

/// Address without identity, as submitted for create or full update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub number: u32,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: u32,
    pub country_iso_code: String,
}

impl AddressFields {
    pub fn with_id(self, id: i64) -> Address {
        Address {
            id,
            number: self.number,
            street: self.street,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country_iso_code: self.country_iso_code,
        }
    }
}

impl Validate for Address {
    fn validate(&self) -> Result<(), ValidationError> {
        Rules::new("Address")
            .maximum("number", self.number, 9999)
            .required("street", &self.street)
            .max_length("street", &self.street, 64)
            .required("city", &self.city)
            .max_length("city", &self.city, 64)
            .required("state", &self.state)
            .min_length("state", &self.state, 2)
            .max_length("state", &self.state, 2)
            .maximum("zip_code", self.zip_code, 99999)
            .required("country_iso_code", &self.country_iso_code)
            .min_length("country_iso_code", &self.country_iso_code, 3)
            .max_length("country_iso_code", &self.country_iso_code, 3)
            .finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.street)
    }
}
