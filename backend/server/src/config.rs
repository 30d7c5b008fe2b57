use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use deck::{
    Layout, SheetRef,
    remote::{DEFAULT_SHEET_NAME, DEFAULT_SPECIAL_SHEET_NAME, DEFAULT_SPREADSHEET_ID},
};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_REDEEM_CODE: &str = "GDRB2026-banana";
const SERVICE_ACCOUNT_KEY: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: String, message: String },
}

pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub service_account_json: Option<String>,
    pub primary: SheetRef,
    pub special: SheetRef,
    pub primary_layout: Layout,
    pub redeem_code: String,
    pub development: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            redis_url: None,
            service_account_json: None,
            primary: SheetRef::new(DEFAULT_SPREADSHEET_ID, DEFAULT_SHEET_NAME),
            special: SheetRef::new(DEFAULT_SPREADSHEET_ID, DEFAULT_SPECIAL_SHEET_NAME),
            primary_layout: Layout::Super,
            redeem_code: DEFAULT_REDEEM_CODE.to_string(),
            development: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let spreadsheet_id: String = try_load("SPREADSHEET_ID", DEFAULT_SPREADSHEET_ID)?;

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: var("REDIS_URL"),
            service_account_json: var(SERVICE_ACCOUNT_KEY)
                .or_else(|| read_secret(SERVICE_ACCOUNT_KEY)),
            primary: SheetRef::new(
                spreadsheet_id.clone(),
                try_load::<String>("SHEET_NAME", DEFAULT_SHEET_NAME)?,
            ),
            special: SheetRef::new(
                try_load::<String>("SPECIAL_SPREADSHEET_ID", &spreadsheet_id)?,
                try_load::<String>("SPECIAL_SHEET_NAME", DEFAULT_SPECIAL_SHEET_NAME)?,
            ),
            primary_layout: try_load("PRIMARY_LAYOUT", "super")?,
            redeem_code: try_load("REDEEM_CODE", DEFAULT_REDEEM_CODE)?,
            development: try_load::<String>("APP_ENV", "production")?
                .eq_ignore_ascii_case("development"),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }
        })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources() {
        let config = Config::default();

        assert_eq!(config.primary.spreadsheet_id, config.special.spreadsheet_id);
        assert_eq!(config.special.sheet_name, "special");
        assert_eq!(config.primary_layout, Layout::Super);
        assert!(!config.development);
    }

    #[test]
    fn test_try_load_default() {
        let port: u16 = try_load("PROMPTDECK_TEST_UNSET_PORT", "2222").unwrap();

        assert_eq!(port, 2222);
    }

    #[test]
    fn test_try_load_invalid_default() {
        let error = try_load::<u16>("PROMPTDECK_TEST_UNSET_PORT", "not-a-port")
            .err()
            .unwrap();

        assert!(error.to_string().starts_with("Invalid PROMPTDECK_TEST_UNSET_PORT"));
    }

    #[test]
    fn test_try_load_layout() {
        let layout: Layout = try_load("PROMPTDECK_TEST_UNSET_LAYOUT", "tips").unwrap();

        assert_eq!(layout, Layout::Tips);
    }
}
