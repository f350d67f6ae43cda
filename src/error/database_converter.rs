use crate::error::AppError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Utility for converting database errors to structured AppError variants.
///
/// Constraint violations that the repository does not already translate
/// into domain outcomes surface here. Everything else becomes a
/// `StorageFailure` whose source is logged but never returned to callers.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    ///
    /// # Arguments
    /// * `error` - The Diesel error to convert
    /// * `operation` - Description of the database operation that failed
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            other => AppError::StorageFailure {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: &(dyn diesel::result::DatabaseErrorInformation + Send + Sync),
        operation: &str,
    ) -> AppError {
        let message = info.message();

        match kind {
            DatabaseErrorKind::UniqueViolation => {
                match info.constraint_name().and_then(Self::parse_constraint_name) {
                    Some((entity, field)) => {
                        let value = info
                            .details()
                            .and_then(Self::extract_key_value)
                            .map(|(_, v)| v)
                            .unwrap_or_else(|| "duplicate_value".to_string());
                        AppError::Duplicate {
                            entity,
                            field,
                            value,
                        }
                    }
                    None => AppError::StorageFailure {
                        operation: operation.to_string(),
                        source: anyhow::Error::msg(format!(
                            "Unique constraint violation: {}",
                            message
                        )),
                    },
                }
            }
            DatabaseErrorKind::CheckViolation => {
                match info.constraint_name().and_then(Self::parse_constraint_name) {
                    Some((_, field)) => AppError::Validation {
                        field,
                        reason: "Check constraint failed".to_string(),
                    },
                    None => AppError::StorageFailure {
                        operation: operation.to_string(),
                        source: anyhow::Error::msg(format!(
                            "Check constraint violation: {}",
                            message
                        )),
                    },
                }
            }
            DatabaseErrorKind::ClosedConnection => AppError::ConnectionPool {
                source: anyhow::Error::msg(format!("Connection closed: {}", message)),
            },
            _ => AppError::StorageFailure {
                operation: operation.to_string(),
                source: anyhow::Error::msg(format!("Database error: {}", message)),
            },
        }
    }

    /// Splits a PostgreSQL constraint name such as `users_email_key` or
    /// `cart_items_cart_quantity_check` into `(table, column)`.
    ///
    /// Table names containing underscores are resolved against the known
    /// tables of this schema before falling back to the first segment.
    pub fn parse_constraint_name(constraint: &str) -> Option<(String, String)> {
        const TABLES: &[&str] = &["order_items", "cart_items", "orders", "users"];
        const SUFFIXES: &[&str] = &["_key", "_check", "_fkey", "_pkey"];

        let stem = SUFFIXES
            .iter()
            .find_map(|suffix| constraint.strip_suffix(suffix))?;

        let (table, column) = TABLES
            .iter()
            .find_map(|table| {
                stem.strip_prefix(table)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|column| (table.to_string(), column.to_string()))
            })
            .or_else(|| {
                stem.split_once('_')
                    .map(|(t, c)| (t.to_string(), c.to_string()))
            })?;

        if column.is_empty() {
            return None;
        }
        Some((table, column))
    }

    /// Extracts `(field, value)` from PostgreSQL detail text of the form
    /// `Key (email)=(someone@example.com) already exists.`
    pub fn extract_key_value(details: &str) -> Option<(String, String)> {
        let rest = details.split_once("Key (")?.1;
        let (field, rest) = rest.split_once(")=(")?;
        let (value, _) = rest.split_once(')')?;
        Some((field.to_string(), value.to_string()))
    }
}
