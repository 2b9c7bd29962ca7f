use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::context;
use thiserror::Error;
use tracing::{error, warn};

use service::errors::ServiceError;
use service::permissions::AccessError;

use crate::templates;

/// Errors a view can end in; each renders as an HTML error page.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("{0}")]
    NotFound(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Protected(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ViewError {
    pub fn status(&self) -> StatusCode {
        match self {
            ViewError::NotFound(_) => StatusCode::NOT_FOUND,
            ViewError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ViewError::Forbidden(_) => StatusCode::FORBIDDEN,
            ViewError::Protected(_) => StatusCode::CONFLICT,
            ViewError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ViewError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ViewError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(msg) => ViewError::NotFound(msg),
            ServiceError::Protected(msg) => ViewError::Protected(msg),
            ServiceError::Validation(msg) => ViewError::BadRequest(msg),
            ServiceError::Invalid(errors) => ViewError::BadRequest(errors.to_string()),
            other => ViewError::Internal(other.to_string()),
        }
    }
}

impl From<AccessError> for ViewError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Unauthenticated => ViewError::Unauthenticated,
            AccessError::Forbidden(_) => ViewError::Forbidden("You do not have permission to access this page.".into()),
        }
    }
}

impl From<minijinja::Error> for ViewError {
    fn from(e: minijinja::Error) -> Self { ViewError::Internal(format!("template error: {}", e)) }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else if matches!(self, ViewError::Forbidden(_)) {
            warn!(error = %self, "permission denied");
        }
        let title = match &self {
            ViewError::Forbidden(_) => "Permission denied",
            ViewError::Protected(_) => "Unable to delete",
            _ => status.canonical_reason().unwrap_or("Error"),
        };
        // Internal details stay in the log.
        let message = match &self {
            ViewError::Internal(_) => "There was a problem with your request.".to_string(),
            other => other.to_string(),
        };
        let ctx = context! {
            status => status.as_u16(),
            title => title,
            message => message.clone(),
            login => matches!(self, ViewError::Unauthenticated),
        };
        match templates::render("error.html", ctx) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                error!(error = %e, "error page failed to render");
                (status, message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::permissions::Permission;

    #[test]
    fn statuses() {
        assert_eq!(ViewError::from(ServiceError::not_found("tenant")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ViewError::from(ServiceError::Protected("x".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ViewError::from(AccessError::Unauthenticated).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ViewError::from(AccessError::Forbidden(Permission::DeleteTenant)).status(), StatusCode::FORBIDDEN);
        assert_eq!(ViewError::from(ServiceError::Db("boom".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ViewError::from(ServiceError::Export("short write".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
