use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deck::{SheetsError, catalog::PageError};
use serde::Serialize;
use thiserror::Error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing x-client-id header")]
    MissingClientId,

    #[error("Invalid redeem code")]
    InvalidRedeemCode,

    #[error("{0}")]
    Configuration(String),

    #[error("{source}")]
    Sheets {
        context: &'static str,
        source: SheetsError,
        details: Option<String>,
    },

    #[error("{0}")]
    Paging(#[from] PageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// `details` carries the debug form of the error, only filled in development.
    pub fn sheets(context: &'static str, source: SheetsError, development: bool) -> Self {
        let details = development.then(|| format!("{source:?}"));

        AppError::Sheets {
            context,
            source,
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::MissingClientId | AppError::Paging(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidRedeemCode => StatusCode::FORBIDDEN,
            AppError::Sheets { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Configuration(_) | AppError::Sheets { .. } | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::MalformedPayload(_) | AppError::Paging(_) => "Malformed payload",
            AppError::MissingClientId => "Missing client id",
            AppError::InvalidRedeemCode => "Invalid redeem code",
            AppError::Configuration(_) => "Configuration error",
            AppError::Sheets { context, .. } => *context,
            AppError::Store(_) => "Store unavailable",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Sheets { details, .. } => details.clone(),
            _ => None,
        };

        let body = ErrorBody {
            error: self.label().to_string(),
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
