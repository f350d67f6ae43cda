//! Error handler for converting AppError to HTTP responses.
//!
//! Every failure leaves the API as an [`ErrorResponse`] with a stable `code`.
//! Storage and internal sources are logged here and never serialized.

use axum::{
    Json,
    body::Bytes,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Error bodies larger than this are replaced rather than rewritten.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        let code = error_to_code(&self);

        let body = match &self {
            AppError::MissingCredential => ErrorResponse::new(code, "Missing authorization header"),
            AppError::InvalidCredential { reason } => ErrorResponse::new(code, reason.as_str()),
            AppError::PrincipalNotFound => {
                ErrorResponse::new(code, "Authenticated user no longer exists")
            }
            AppError::Unauthorized { message } | AppError::Forbidden { message } => {
                ErrorResponse::new(code, message.as_str())
            }
            AppError::UserNotFound { user_ref } => ErrorResponse::new(code, "User not found")
                .with_details(json!({ "userRef": user_ref })),
            AppError::ProductNotInCart { product_name } => {
                ErrorResponse::new(code, "Product not found in user's cart")
                    .with_details(json!({ "productName": product_name }))
            }
            AppError::DuplicateItem { product_name } => {
                ErrorResponse::new(code, "Product is already in the cart")
                    .with_details(json!({ "productName": product_name }))
            }
            AppError::MinimumQuantityReached { product_name } => {
                ErrorResponse::new(code, "Cannot be less than 1")
                    .with_details(json!({ "productName": product_name }))
            }
            AppError::MissingRequiredField { field } => {
                ErrorResponse::new(code, format!("Missing required field: {}", field))
                    .with_details(json!({ "field": field }))
            }
            AppError::Validation { field, reason } => {
                ErrorResponse::new(code, format!("Validation failed for {}", field))
                    .with_details(json!({ "field": field, "reason": reason }))
            }
            AppError::ValidationErrors { errors } => {
                ErrorResponse::new(code, "Validation failed").with_details(json!(errors))
            }
            AppError::Duplicate { entity, field, .. } => {
                ErrorResponse::new(code, format!("{} with this {} already exists", entity, field))
                    .with_details(json!({ "entity": entity, "field": field }))
            }
            AppError::BadRequest { message } => ErrorResponse::new(code, message.as_str()),
            AppError::StorageTimeout { .. } => {
                ErrorResponse::new(code, "Storage is temporarily unavailable, retry later")
            }
            AppError::ConnectionPool { source } => {
                tracing::error!(error = %format!("{:#}", source), "Connection pool failure");
                ErrorResponse::new(code, "Database connection unavailable")
            }
            AppError::StorageFailure { operation, source } => {
                tracing::error!(
                    operation = %operation,
                    error = %format!("{:#}", source),
                    "Storage operation failed"
                );
                ErrorResponse::new(code, "Internal server error")
            }
            AppError::Internal { source } => {
                tracing::error!(error = %format!("{:#}", source), "Unhandled internal error");
                ErrorResponse::new(code, "Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::MissingCredential
        | AppError::InvalidCredential { .. }
        | AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AppError::PrincipalNotFound
        | AppError::UserNotFound { .. }
        | AppError::ProductNotInCart { .. } => StatusCode::NOT_FOUND,
        AppError::DuplicateItem { .. }
        | AppError::MissingRequiredField { .. }
        | AppError::Validation { .. }
        | AppError::ValidationErrors { .. }
        | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::MinimumQuantityReached { .. } | AppError::Duplicate { .. } => {
            StatusCode::CONFLICT
        }
        AppError::StorageTimeout { .. } | AppError::ConnectionPool { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AppError::StorageFailure { .. } | AppError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::MissingCredential => "MISSING_CREDENTIAL",
        AppError::InvalidCredential { .. } => "INVALID_CREDENTIAL",
        AppError::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
        AppError::Unauthorized { .. } => "UNAUTHORIZED",
        AppError::Forbidden { .. } => "FORBIDDEN",
        AppError::UserNotFound { .. } => "USER_NOT_FOUND",
        AppError::ProductNotInCart { .. } => "PRODUCT_NOT_IN_CART",
        AppError::DuplicateItem { .. } => "DUPLICATE_ITEM",
        AppError::MinimumQuantityReached { .. } => "MINIMUM_QUANTITY_REACHED",
        AppError::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
        AppError::Validation { .. } | AppError::ValidationErrors { .. } => "VALIDATION_ERROR",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::StorageTimeout { .. } => "STORAGE_TIMEOUT",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::StorageFailure { .. } => "STORAGE_ERROR",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

/// Normalizes every 4xx/5xx response leaving the router.
///
/// JSON error bodies get the request ID attached; anything else (axum's
/// plain-text rejections, 404 for unknown routes, 408 from the timeout
/// layer) is replaced by an `ErrorResponse` for its status.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());
    let response = next.run(request).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let bytes = axum::body::to_bytes(body, MAX_ERROR_BODY_BYTES)
        .await
        .unwrap_or_else(|_| Bytes::new());

    let parsed = if is_json {
        serde_json::from_slice::<Value>(&bytes).ok()
    } else {
        None
    };

    let body = match parsed {
        Some(Value::Object(mut map)) => {
            if let Some(id) = request_id {
                map.insert("requestId".to_string(), Value::String(id));
            }
            Value::Object(map)
        }
        _ => {
            let original = String::from_utf8_lossy(&bytes).trim().to_string();
            let mut error = fallback_error(status, original);
            if let Some(id) = request_id.as_deref() {
                error = error.with_request_id(id);
            }
            json!(error)
        }
    };

    let mut rebuilt = (status, Json(body)).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rebuilt.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rebuilt
}

fn fallback_error(status: StatusCode, original: String) -> ErrorResponse {
    let (code, default_message) = match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "Bad request"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "The requested resource was not found"),
        StatusCode::METHOD_NOT_ALLOWED => (
            "METHOD_NOT_ALLOWED",
            "HTTP method not allowed for this endpoint",
        ),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Unsupported media type"),
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "Request timeout"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request payload too large"),
        s if s.is_server_error() => ("INTERNAL_ERROR", "Internal server error"),
        _ => ("ERROR", "Request failed"),
    };

    // Plain-text bodies from server errors are not passed through.
    if original.is_empty() || status.is_server_error() {
        ErrorResponse::new(code, default_message)
    } else {
        ErrorResponse::new(code, original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::MissingCredential, StatusCode::UNAUTHORIZED),
            (
                AppError::InvalidCredential {
                    reason: "Token has expired".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::PrincipalNotFound, StatusCode::NOT_FOUND),
            (
                AppError::UserNotFound {
                    user_ref: "a@b.c".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::DuplicateItem {
                    product_name: "Mug".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::MinimumQuantityReached {
                    product_name: "Mug".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::StorageTimeout {
                    operation: "load cart".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::StorageFailure {
                    operation: "load cart".to_string(),
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error_to_status_code(&error), status, "{:?}", error);
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_not_serialized() {
        let response = AppError::StorageFailure {
            operation: "finalize order".to_string(),
            source: anyhow::anyhow!("relation \"orders\" does not exist"),
        }
        .into_response();
        let body = body_json(response).await;

        assert_eq!(body["code"], "STORAGE_ERROR");
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("relation"));
    }

    #[tokio::test]
    async fn test_validation_errors_carry_field_details() {
        let response = AppError::ValidationErrors {
            errors: vec![crate::error::ValidationFieldError {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            }],
        }
        .into_response();
        let body = body_json(response).await;

        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[test]
    fn test_fallback_hides_server_error_text() {
        let error = fallback_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "panic at line 3".to_string(),
        );
        assert_eq!(error.message, "Internal server error");

        let error = fallback_error(StatusCode::NOT_FOUND, String::new());
        assert_eq!(error.code, "NOT_FOUND");
    }
}
