use thiserror::Error;

use models::errors::{FieldErrors, ModelError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid input: {0}")]
    Invalid(FieldErrors),
    #[error("not found: {0}")]
    NotFound(String),
    /// The object still owns related rows and cannot be deleted.
    #[error("protected: {0}")]
    Protected(String),
    #[error("database error: {0}")]
    Db(String),
    /// Writing an export body failed.
    #[error("export error: {0}")]
    Export(String),
    #[error("model error: {0}")]
    Model(ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Single field error, e.g. a uniqueness clash found after validation.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Invalid(errors)
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Invalid(errors) => Self::Invalid(errors),
            other => Self::Model(other),
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { Self::Db(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_survive_conversion() {
        let mut errors = FieldErrors::new();
        errors.add("slug", "bad");
        match ServiceError::from(ModelError::Invalid(errors)) {
            ServiceError::Invalid(e) => assert_eq!(e.get("slug"), ["bad"]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(ServiceError::from(ModelError::Db("x".into())), ServiceError::Model(_)));
    }
}
