//! # Sheet Sources
//!
//! Two spreadsheets feed the catalog.
//!
//! - Primary ("super" prompts): only shown to clients that activated a redeem code
//! - Special: always shown, after the primary cards
//!
//! Both are fetched fresh on every request, there is no cache and no retry.
use deck::{Layout, PromptCard, SheetData, SheetRef, drive::rewrite_images, group_rows};
use tracing::{debug, error};

use crate::{config::Config, error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Primary,
    Special,
}

impl SheetKind {
    pub fn sheet(self, config: &Config) -> &SheetRef {
        match self {
            SheetKind::Primary => &config.primary,
            SheetKind::Special => &config.special,
        }
    }

    pub fn layout(self, config: &Config) -> Layout {
        match self {
            SheetKind::Primary => config.primary_layout,
            SheetKind::Special => Layout::Special,
        }
    }

    pub fn failure(self) -> &'static str {
        match self {
            SheetKind::Primary => "Failed to fetch sheet data",
            SheetKind::Special => "Failed to fetch special sheet data",
        }
    }
}

pub async fn fetch_sheet(state: &AppState, kind: SheetKind) -> Result<SheetData, AppError> {
    let Some(sheets) = state.sheets.as_ref() else {
        error!("GOOGLE_SERVICE_ACCOUNT_JSON is not set");

        return Err(AppError::Configuration(
            "GOOGLE_SERVICE_ACCOUNT_JSON environment variable is not set".to_string(),
        ));
    };

    sheets
        .fetch(kind.sheet(&state.config))
        .await
        .map_err(|e| {
            error!("Error fetching {kind:?} sheet: {e}");

            AppError::sheets(kind.failure(), e, state.config.development)
        })
}

pub async fn load_cards(state: &AppState, kind: SheetKind) -> Result<Vec<PromptCard>, AppError> {
    let data = fetch_sheet(state, kind).await?;
    let cards = group_rows(&data.values, kind.layout(&state.config));

    debug!("Grouped {} rows into {} {kind:?} cards", data.values.len(), cards.len());

    Ok(cards)
}

/// Primary cards (when redeemed) followed by special cards, image links made direct.
pub async fn load_feed(state: &AppState, redeemed: bool) -> Result<Vec<PromptCard>, AppError> {
    let mut cards = if redeemed {
        let (mut primary, special) = tokio::try_join!(
            load_cards(state, SheetKind::Primary),
            load_cards(state, SheetKind::Special)
        )?;

        primary.extend(special);
        primary
    } else {
        load_cards(state, SheetKind::Special).await?
    };

    rewrite_images(&mut cards);

    Ok(cards)
}
