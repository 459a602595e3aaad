use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// ValidatedJson
///
/// Drop-in replacement for `Json<T>` that runs the payload's validation rules
/// before the handler ever sees it. Malformed JSON and rule violations both
/// surface as 400 responses through [`ApiError`], so handlers can assume every
/// deserialized payload is well-formed.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        payload
            .validate()
            .map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct SamplePayload {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_payload() {
        let req = json_request(r#"{"name":"Stamps"}"#);
        let result = ValidatedJson::<SamplePayload>::from_request(req, &()).await;

        let ValidatedJson(payload) = result.expect("valid payload should pass");
        assert_eq!(payload.name, "Stamps");
    }

    #[tokio::test]
    async fn rejects_failing_validation_rule() {
        let req = json_request(r#"{"name":""}"#);
        let result = ValidatedJson::<SamplePayload>::from_request(req, &()).await;

        match result {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "name");
                assert_eq!(errors[0].message, "Name is required");
            }
            other => panic!("expected validation error, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let req = json_request("{not json");
        let result = ValidatedJson::<SamplePayload>::from_request(req, &()).await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
