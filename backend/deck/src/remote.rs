//! # Google Sheets
//!
//! Read-only client for the Sheets v4 REST API.
//!
//! ## Auth
//! - Service account JSON (`client_email`, `private_key`, `token_uri`)
//! - RS256 signed assertion exchanged for a bearer token at `token_uri`
//! - Token is cached until a minute before it expires
//!
//! ## Fetch
//! 1. List the sheet titles of the spreadsheet
//! 2. Pick the configured sheet by exact title, otherwise the first sheet
//! 3. Read the whole sheet as a value range
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::models::SheetData;

pub const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const DEFAULT_SPREADSHEET_ID: &str = "1PI1MR0w4c6jM6_8-ReI1i_73BemdcPHrJuYY8oj0Uyo";
pub const DEFAULT_SHEET_NAME: &str =
    "나노바나나 AI 비포&애프터 미친 활용법 71제 슈퍼 프롬프트 복붙 시트";
pub const DEFAULT_SPECIAL_SHEET_NAME: &str = "special";

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_MARGIN_SECS: i64 = 60;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("GOOGLE_SERVICE_ACCOUNT_JSON environment variable is not set")]
    MissingCredentials,

    #[error("Failed to parse GOOGLE_SERVICE_ACCOUNT_JSON. Make sure it is valid JSON: {0}")]
    InvalidCredentials(#[source] serde_json::Error),

    #[error("Service account private key is not a valid RSA PEM key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to sign token assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchange { status: u16, message: String },

    #[error(
        "Permission denied. Please check if the service account has access to the spreadsheet."
    )]
    PermissionDenied,

    #[error("Spreadsheet not found. Please check the spreadsheet ID.")]
    SpreadsheetNotFound,

    #[error("Sheet not found")]
    SheetNotFound,

    #[error("Sheets API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Sheets API endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Request to Google failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SheetsError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SheetsError::SpreadsheetNotFound | SheetsError::SheetNotFound
        )
    }
}

/// Spreadsheet id plus the preferred sheet title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetData, SheetsError>;
}

#[derive(Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    TOKEN_LIFETIME_SECS
}

#[derive(Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    #[serde(default)]
    properties: Option<SheetProperties>,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    range: String,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct SheetsClient {
    http: Client,
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsClient {
    /// Parses service account credentials. Malformed JSON or key fails here, before any request.
    pub fn from_service_account_json(json: &str) -> Result<Self, SheetsError> {
        let account: ServiceAccount =
            serde_json::from_str(json).map_err(SheetsError::InvalidCredentials)?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(SheetsError::InvalidKey)?;

        info!("Loaded service account {}", account.client_email);

        Ok(Self {
            http: Client::new(),
            client_email: account.client_email,
            token_uri: account
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(TOKEN_MARGIN_SECS) {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange_token().await?;
        let value = token.value.clone();
        *cached = Some(token);

        Ok(value)
    }

    async fn exchange_token(&self) -> Result<AccessToken, SheetsError> {
        let now = Utc::now();
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(SheetsError::Signing)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetsError::TokenExchange {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!("Access token refreshed, expires in {}s", token.expires_in);

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SheetsError> {
        let token = self.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        Ok(check_status(response).await?.json().await?)
    }

    pub async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetsError> {
        let mut url = endpoint(spreadsheet_id, &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let spreadsheet: Spreadsheet = self.get_json(url).await?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|properties| properties.title))
            .collect())
    }
}

#[async_trait]
impl SheetSource for SheetsClient {
    async fn fetch(&self, sheet: &SheetRef) -> Result<SheetData, SheetsError> {
        let titles = self.sheet_titles(&sheet.spreadsheet_id).await?;
        let title = resolve_sheet(&titles, &sheet.sheet_name).ok_or(SheetsError::SheetNotFound)?;

        if title != sheet.sheet_name {
            info!("Sheet {:?} not found, falling back to {title:?}", sheet.sheet_name);
        }

        let url = endpoint(&sheet.spreadsheet_id, &["values", &quote_range(title)])?;
        let range: ValueRange = self.get_json(url).await?;

        debug!("Fetched {} rows from {}", range.values.len(), range.range);

        Ok(SheetData {
            values: range.values,
            range: range.range,
        })
    }
}

async fn check_status(response: Response) -> Result<Response, SheetsError> {
    match response.status() {
        StatusCode::FORBIDDEN => Err(SheetsError::PermissionDenied),
        StatusCode::NOT_FOUND => Err(SheetsError::SpreadsheetNotFound),
        status if !status.is_success() => Err(SheetsError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        }),
        _ => Ok(response),
    }
}

fn endpoint(spreadsheet_id: &str, tail: &[&str]) -> Result<Url, SheetsError> {
    let mut url = Url::parse(SHEETS_API)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .push(spreadsheet_id)
        .extend(tail);

    Ok(url)
}

/// Exact title if present, otherwise the first sheet.
pub fn resolve_sheet<'a>(titles: &'a [String], wanted: &str) -> Option<&'a str> {
    titles
        .iter()
        .find(|title| title.as_str() == wanted)
        .or_else(|| titles.first())
        .map(String::as_str)
}

/// A1 notation needs sheet names with spaces or symbols quoted, embedded quotes doubled.
pub fn quote_range(sheet_name: &str) -> String {
    format!("'{}'", sheet_name.replace('\'', "''"))
}
