use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
    http::{HeaderMap, request::Parts},
};

use crate::error::AppError;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const MAX_COMMENT_CHARS: usize = 1000;

pub fn client_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Anonymous caller id, required wherever per-client state is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        client_id(&parts.headers)
            .map(ClientId)
            .ok_or(AppError::MissingClientId)
    }
}

/// JSON body whose rejections answer with the usual error body.
#[derive(FromRequest, Debug)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string whose rejections answer with the usual error body.
#[derive(FromRequestParts, Debug)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

pub fn comment_content(raw: &str) -> Result<String, AppError> {
    let content = raw.trim();

    if content.is_empty() {
        return Err(AppError::MalformedPayload(
            "Comment content is empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::MalformedPayload(format!(
            "Comment is longer than {MAX_COMMENT_CHARS} characters"
        )));
    }

    Ok(content.to_string())
}
