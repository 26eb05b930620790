use axum::http::StatusCode;
use sea_orm::error::DbErr;
use sea_orm::TransactionError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A single form field failed validation; handlers re-render the form
    #[error("{message}")]
    FieldInvalid { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A business rule rejected the operation; message is shown to the user
    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Mail error: {0}")]
    MailError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db) => ServiceError::DatabaseError(db),
            TransactionError::Transaction(inner) => inner,
        }
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::FieldInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::FieldInvalid { .. } | Self::ValidationError(_) | Self::InvalidOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) | Self::JwtError(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::MailError(_)
            | Self::ExportError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing errors surface as flash messages; the rest are logged.
    pub fn is_user_facing(&self) -> bool {
        !self.status_code().is_server_error()
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::HashError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::MailError(_) => "Failed to send email".to_string(),
            Self::ExportError(_) => "Export failed".to_string(),
            Self::JwtError(_) => "Invalid or expired token".to_string(),
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::InvalidOperation(msg)
            | Self::InsufficientStock(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Unauthorized(msg) | Self::Forbidden(msg) => msg.clone(),
            Self::FieldInvalid { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::not_found("Asset", 4), StatusCode::NOT_FOUND)]
    #[case(ServiceError::field("name", "required"), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::InvalidOperation("busy".into()), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::InsufficientStock("low".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ServiceError::Forbidden("admins only".into()), StatusCode::FORBIDDEN)]
    #[case(ServiceError::MailError("smtp down".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_status_codes(#[case] err: ServiceError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ServiceError::DatabaseError(DbErr::Custom("syntax error near SELECT".into()));
        assert_eq!(err.response_message(), "Database error");
        assert!(!err.is_user_facing());

        let err = ServiceError::MailError("535 bad credentials".into());
        assert_eq!(err.response_message(), "Failed to send email");
    }

    #[test]
    fn business_messages_pass_through() {
        let err = ServiceError::InvalidOperation("This asset has already been checked in.".into());
        assert_eq!(err.response_message(), "This asset has already been checked in.");
        assert!(err.is_user_facing());
    }

    #[test]
    fn transaction_errors_unwrap_inner() {
        let err: ServiceError =
            TransactionError::Transaction(ServiceError::Conflict("taken".into())).into();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err: ServiceError =
            TransactionError::<ServiceError>::Connection(DbErr::Custom("gone".into())).into();
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
