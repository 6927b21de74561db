//! HTTP handlers for the public pages and the administration endpoints.

pub mod admin;
pub mod lettings;
pub mod profiles;
pub mod site;
