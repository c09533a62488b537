/// Request extractors that report malformed input as validation errors
use crate::error::ModError;
use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequest, Query, Request},
    Json,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that must deserialize and pass its `Validate` rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ModError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ModError::Validation(e.body_text()))?;

        value
            .validate()
            .map_err(|e| ModError::Validation(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

/// Unwrap a query string, mapping a parse failure to a validation error
pub fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ModError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ModError::Validation(e.body_text()))
}

/// Treat empty query values as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse an optional RFC 3339 query value
pub fn timestamp(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, ModError> {
    non_empty(value)
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| ModError::Validation(format!("{} must be an RFC 3339 timestamp", field)))
        })
        .transpose()
}
