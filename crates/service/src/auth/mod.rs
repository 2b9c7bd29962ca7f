//! Auth module: domain types, repository abstraction and the login/token service.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
