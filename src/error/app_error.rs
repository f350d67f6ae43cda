use crate::error::DatabaseErrorConverter;
use serde::Serialize;
use thiserror::Error;

/// A single field-level validation failure reported back to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

/// Application-wide error type that represents all possible errors in the system.
///
/// Variants are grouped the way the transport boundary reports them:
/// authentication, not-found, validation, and internal failures. Each
/// variant maps to a fixed HTTP status in the error handler middleware, and
/// variants carrying a `source` never expose it to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------
    /// No `Authorization` header was supplied
    #[error("Missing authorization header")]
    MissingCredential,

    /// The bearer token is malformed, expired, or carries a bad signature
    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// The token verified but its subject no longer resolves to a user
    #[error("Principal not found")]
    PrincipalNotFound,

    /// Login failure (unknown email or wrong password)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Authenticated principal is not allowed to act on the target user
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // ------------------------------------------------------------------
    // Not found
    // ------------------------------------------------------------------
    #[error("User not found: {user_ref}")]
    UserNotFound { user_ref: String },

    #[error("Product not in cart: {product_name}")]
    ProductNotInCart { product_name: String },

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------
    #[error("Product already in cart: {product_name}")]
    DuplicateItem { product_name: String },

    #[error("Quantity of {product_name} cannot be less than 1")]
    MinimumQuantityReached { product_name: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors collected from a request DTO
    #[error("Validation failed")]
    ValidationErrors { errors: Vec<ValidationFieldError> },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------
    /// Storage operation error with operation context
    #[error("Storage operation failed: {operation}")]
    StorageFailure {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Storage call exceeded the configured query timeout
    #[error("Storage operation timed out: {operation}")]
    StorageTimeout { operation: String },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Returns `true` for failures a client may safely retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StorageTimeout { .. } | AppError::ConnectionPool { .. }
        )
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<bb8::RunError<diesel_async::pooled_connection::PoolError>> for AppError {
    fn from(error: bb8::RunError<diesel_async::pooled_connection::PoolError>) -> Self {
        AppError::ConnectionPool {
            source: anyhow::anyhow!("{}", error),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut collected = Vec::new();
        collect_field_errors(&errors, "", &mut collected);
        collected.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationErrors { errors: collected }
    }
}

/// Flattens nested validation errors into `parent.child` field paths.
fn collect_field_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<ValidationFieldError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| ValidationFieldError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AppError::Internal {
            source: anyhow::anyhow!("Password hashing failed: {}", error),
        }
    }
}

impl From<crate::config::error::ConfigError> for AppError {
    fn from(error: crate::config::error::ConfigError) -> Self {
        AppError::Validation {
            field: "configuration".to_string(),
            reason: error.to_string(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(range(min = 1))]
        quantity: i32,
    }

    #[test]
    fn test_validation_errors_are_collected_per_field() {
        let probe = Probe {
            name: String::new(),
            quantity: 0,
        };
        let error = AppError::from(probe.validate().unwrap_err());
        match error {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "name");
                assert_eq!(errors[0].message, "must not be empty");
                assert_eq!(errors[1].field, "quantity");
                assert_eq!(errors[1].message, "range");
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[derive(Debug, Validate)]
    struct Wrapper {
        #[validate(nested)]
        probe: Probe,
    }

    #[test]
    fn test_nested_errors_use_dotted_paths() {
        let wrapper = Wrapper {
            probe: Probe {
                name: String::new(),
                quantity: 3,
            },
        };
        match AppError::from(wrapper.validate().unwrap_err()) {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "probe.name");
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::StorageTimeout {
            operation: "load cart".to_string()
        }
        .is_retryable());
        assert!(!AppError::MissingCredential.is_retryable());
        assert!(!AppError::Internal {
            source: anyhow::anyhow!("boom")
        }
        .is_retryable());
    }

    #[test]
    fn test_display_does_not_include_source() {
        let error = AppError::StorageFailure {
            operation: "insert cart item".to_string(),
            source: anyhow::anyhow!("password=hunter2"),
        };
        assert_eq!(error.to_string(), "Storage operation failed: insert cart item");
    }
}
