//! # Catalog
//!
//! Search and pagination over the combined card feed.
//!
//! ## Search
//! - Blank query matches everything
//! - Case-insensitive substring over title, the first before-item's tool, and every item's english/korean text
//!
//! ## Pages
//! Page 1 shows a cover in its first slot, so it only holds `per_page - 1` cards.
//! Every later page holds `per_page` cards and is shifted back by that one slot.
use serde::Serialize;
use thiserror::Error;

use crate::models::PromptCard;

pub const DEFAULT_PER_PAGE: usize = 6;
pub const MIN_PER_PAGE: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageError {
    #[error("Page numbers start at 1")]
    InvalidPage,

    #[error("At least {MIN_PER_PAGE} items per page are required, got {0}")]
    PerPageTooSmall(usize),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub cards: Vec<PromptCard>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

pub fn matches(card: &PromptCard, query: &str) -> bool {
    let query = query.trim().to_lowercase();

    if query.is_empty() {
        return true;
    }

    let contains = |text: &str| text.to_lowercase().contains(&query);

    let tool_matches = card
        .before_items
        .first()
        .and_then(|item| item.tool.as_deref())
        .is_some_and(contains);

    contains(&card.title)
        || tool_matches
        || card
            .items()
            .any(|item| contains(&item.english) || contains(&item.korean))
}

pub fn filter(cards: Vec<PromptCard>, query: &str) -> Vec<PromptCard> {
    cards.into_iter().filter(|card| matches(card, query)).collect()
}

pub fn total_pages(total: usize, per_page: usize) -> usize {
    (total + 1).div_ceil(per_page)
}

pub fn paginate(cards: Vec<PromptCard>, page: usize, per_page: usize) -> Result<Page, PageError> {
    if page == 0 {
        return Err(PageError::InvalidPage);
    }
    if per_page < MIN_PER_PAGE {
        return Err(PageError::PerPageTooSmall(per_page));
    }

    let total = cards.len();
    let (start, len) = match page {
        1 => (0, per_page - 1),
        // Overflowing offsets are past any feed.
        _ => (
            (page - 1)
                .checked_mul(per_page)
                .map_or(usize::MAX, |offset| offset - 1),
            per_page,
        ),
    };

    let cards = cards.into_iter().skip(start).take(len).collect();

    Ok(Page {
        cards,
        page,
        total_pages: total_pages(total, per_page),
        total,
    })
}
