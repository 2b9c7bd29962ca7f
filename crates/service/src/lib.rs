//! Service layer for the tenancy views.
//! - Keeps query, validation and transaction logic out of the HTTP handlers.
//! - Reuses entity definitions and field rules from the `models` crate.

pub mod errors;
pub mod permissions;
pub mod auth;
pub mod tenant_group_service;
pub mod tenant_service;
pub mod stats;
pub mod import;
pub mod export;
#[cfg(test)]
pub mod test_support;
