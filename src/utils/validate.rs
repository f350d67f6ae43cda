use crate::error::{AppError, AppResult};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body extractor that runs `validator` rules after deserializing.
///
/// A body missing a required field is reported as `MissingRequiredField`;
/// any other malformed body becomes `BadRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    if let Some(field) = missing_field(&text) {
        return AppError::MissingRequiredField { field };
    }
    AppError::BadRequest { message: text }
}

/// Pulls `x` out of serde's "missing field `x`" message.
fn missing_field(text: &str) -> Option<String> {
    let rest = text.split_once("missing field `")?.1;
    let (field, _) = rest.split_once('`')?;
    Some(field.to_string())
}
