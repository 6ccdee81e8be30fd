//! Error responses shaped like the real API's: `{"detail": "..."}` for most
//! failures and `{"detail": [{loc, msg, type}, ...]}` for 422.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum ApiFailure {
    Detail(StatusCode, String),
    Invalid(Vec<(Vec<String>, String, String)>),
}

impl ApiFailure {
    pub fn not_found(what: &str) -> Self {
        Self::Detail(StatusCode::NOT_FOUND, format!("{what} not found."))
    }

    pub fn unauthorized() -> Self {
        Self::Detail(StatusCode::UNAUTHORIZED, "Invalid credentials.".to_string())
    }

    pub fn forbidden() -> Self {
        Self::Detail(StatusCode::FORBIDDEN, "Missing permissions.".to_string())
    }

    pub fn conflict(detail: &str) -> Self {
        Self::Detail(StatusCode::CONFLICT, detail.to_string())
    }

    pub fn invalid(loc: &[&str], msg: &str, kind: &str) -> Self {
        Self::Invalid(vec![(
            loc.iter().map(|s| s.to_string()).collect(),
            msg.to_string(),
            kind.to_string(),
        )])
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            ApiFailure::Detail(status, detail) => (status, Json(json!({ "detail": detail }))).into_response(),
            ApiFailure::Invalid(issues) => {
                let detail: Vec<_> = issues
                    .into_iter()
                    .map(|(loc, msg, kind)| json!({ "loc": loc, "msg": msg, "type": kind }))
                    .collect();
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
            }
        }
    }
}

/// `Json` whose rejections come back as 422 issue lists.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiFailure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(ApiFailure::invalid(
                &["body"],
                &rejection.body_text(),
                "value_error.jsondecode",
            )),
        }
    }
}
