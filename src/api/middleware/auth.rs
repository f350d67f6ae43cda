//! Bearer token middleware.
//!
//! Both variants resolve the caller through [`AuthGate`](crate::services::AuthGate)
//! and store the resulting [`Principal`] in request extensions, where handlers
//! pick it up with `Extension<Principal>`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, AppResult};
use crate::services::Principal;
use crate::state::AppState;

/// Requires a valid bearer token.
///
/// # Errors
/// `MissingCredential`, `InvalidCredential` or `PrincipalNotFound`, as
/// reported by the auth gate.
///
/// # Example
/// ```ignore
/// OpenApiRouter::new()
///     .routes(routes!(add_to_cart))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = authorization_header(&request)?;
    let principal = state.services.auth.authenticate(header.as_deref()).await?;
    tracing::debug!(user_id = principal.user_id, "Request authenticated");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Lets anonymous requests through, but a header that is present must
/// still verify.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(header) = authorization_header(&request)? {
        let principal: Principal = state.services.auth.authenticate(Some(&header)).await?;
        request.extensions_mut().insert(principal);
    }
    Ok(next.run(request).await)
}

fn authorization_header(request: &Request) -> AppResult<Option<String>> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| AppError::InvalidCredential {
                    reason: "Authorization header is not valid text".to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_absent() {
        let request = Request::new(Body::empty());
        assert_eq!(authorization_header(&request).unwrap(), None);
    }

    #[test]
    fn test_header_present() {
        let mut request = Request::new(Body::empty());
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(
            authorization_header(&request).unwrap().as_deref(),
            Some("Bearer abc")
        );
    }

    #[test]
    fn test_header_not_text() {
        let mut request = Request::new(Body::empty());
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        );
        assert!(matches!(
            authorization_header(&request),
            Err(AppError::InvalidCredential { .. })
        ));
    }
}
