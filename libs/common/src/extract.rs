//! Request extractors that reject with the shared error envelope

use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `axum::Json` whose rejection is a 400 `ApiError` instead of axum's plain-text body
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(match rejection {
                JsonRejection::JsonDataError(e) => ApiError::BadRequest(e.body_text()),
                JsonRejection::JsonSyntaxError(_) => {
                    ApiError::BadRequest("Malformed JSON body".to_string())
                }
                JsonRejection::MissingJsonContentType(_) => ApiError::BadRequest(
                    "Expected request with `Content-Type: application/json`".to_string(),
                ),
                other => ApiError::BadRequest(other.body_text()),
            }),
        }
    }
}
