//! Entity records and their field constraints.

mod address;
mod letting;
mod profile;
mod user;

pub use address::{Address, AddressFields};
pub use letting::{Letting, LettingDetail, LettingFields};
pub use profile::{Profile, ProfileDetail, ProfileFields};
pub use user::{User, UserFields};

use crate::error::{FieldError, ValidationError};

/// Field-level constraint check, run before a record is persisted.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Collects every violated constraint of one record instead of stopping at the first.
pub(crate) struct Rules {
    model: &'static str,
    errors: Vec<FieldError>,
}

impl Rules {
    pub(crate) fn new(model: &'static str) -> Self {
        Rules {
            model,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, field: &'static str, message: String) {
        self.errors.push(FieldError { field, message });
    }

    pub(crate) fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.push(field, "cannot be blank".into());
        }
        self
    }

    /// Length is counted in characters, not bytes.
    pub(crate) fn max_length(&mut self, field: &'static str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.push(field, format!("must be at most {} characters", max));
        }
        self
    }

    pub(crate) fn min_length(&mut self, field: &'static str, value: &str, min: usize) -> &mut Self {
        // Blank values are reported by `required`.
        let len = value.chars().count();
        if len > 0 && len < min {
            self.push(field, format!("must be at least {} characters", min));
        }
        self
    }

    pub(crate) fn maximum(&mut self, field: &'static str, value: u32, max: u32) -> &mut Self {
        if value > max {
            self.push(field, format!("must be at most {}", max));
        }
        self
    }

    pub(crate) fn finish(&mut self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(ValidationError {
            model: self.model,
            errors: std::mem::take(&mut self.errors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn address() -> Address {
        Address {
            id: 1,
            number: 1,
            street: "123 Main St".into(),
            city: "Test City".into(),
            state: "TS".into(),
            zip_code: 12345,
            country_iso_code: "TST".into(),
        }
    }

    #[test]
    fn valid_address_passes() {
        assert!(address().validate().is_ok());
    }

    #[rstest]
    #[case::number_too_large(|a: &mut Address| a.number = 10000, "number")]
    #[case::zip_too_large(|a: &mut Address| a.zip_code = 100_000, "zip_code")]
    #[case::state_too_short(|a: &mut Address| a.state = "T".into(), "state")]
    #[case::state_too_long(|a: &mut Address| a.state = "TSX".into(), "state")]
    #[case::country_too_short(
        |a: &mut Address| a.country_iso_code = "TS".into(),
        "country_iso_code"
    )]
    #[case::country_too_long(
        |a: &mut Address| a.country_iso_code = "TSTX".into(),
        "country_iso_code"
    )]
    #[case::street_too_long(|a: &mut Address| a.street = "s".repeat(65), "street")]
    #[case::city_blank(|a: &mut Address| a.city = String::new(), "city")]
    fn invalid_address_is_rejected(#[case] mutate: fn(&mut Address), #[case] field: &str) {
        let mut a = address();
        mutate(&mut a);
        let err = a.validate().unwrap_err();
        assert_eq!(err.model, "Address");
        assert!(err.has_field(field), "expected {} in {}", field, err);
    }

    #[test]
    fn upper_bounds_are_inclusive() {
        let mut a = address();
        a.number = 9999;
        a.zip_code = 99999;
        a.street = "s".repeat(64);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let mut a = address();
        a.number = 10000;
        a.state = "T".into();
        let err = a.validate().unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn lengths_count_characters() {
        let mut a = address();
        a.city = "é".repeat(64);
        assert!(a.validate().is_ok());
    }

    #[rstest]
    #[case("", false)]
    #[case("Nice Apartment", true)]
    #[case(&"t".repeat(256), true)]
    #[case(&"t".repeat(257), false)]
    fn letting_title_bounds(#[case] title: &str, #[case] ok: bool) {
        let letting = Letting {
            id: 1,
            title: title.to_string(),
            address_id: 1,
        };
        assert_eq!(letting.validate().is_ok(), ok);
    }

    #[rstest]
    #[case("", true)]
    #[case("Paris", true)]
    #[case(&"c".repeat(65), false)]
    fn favorite_city_may_be_blank(#[case] city: &str, #[case] ok: bool) {
        let profile = Profile {
            id: 1,
            user_id: 1,
            favorite_city: city.to_string(),
        };
        assert_eq!(profile.validate().is_ok(), ok);
    }

    #[test]
    fn user_requires_username() {
        let user = User {
            id: 1,
            ..User::default()
        };
        assert!(user.validate().unwrap_err().has_field("username"));
    }
}
