//! # Row Grouping
//!
//! Turns a sheet grid into cards.
//!
//! - Row 0 is the header and is dropped
//! - Column 0 is the title, trimmed; rows with an empty title are skipped
//! - The first row with a title creates the card, later rows with the same trimmed title append to it
//! - A side (before/after) gets an item only if its image, english or korean cell is filled
//!
//! Only exact trimmed titles merge. "Foo" and "foo" are two cards.
use std::{fmt, str::FromStr, sync::LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

use crate::models::{BeforeAfterItem, PromptCard};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Column positions for one side of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Side {
    image: Option<usize>,
    english: usize,
    korean: usize,
    tip: Option<usize>,
    tool: Option<usize>,
}

/// Column layout of a sheet variant.
///
/// | variant   | columns                                                                          |
/// |-----------|----------------------------------------------------------------------------------|
/// | `super`   | title, b-img, b-eng, b-kor, b-tool, a-img, a-eng, a-kor, a-tool                  |
/// | `tips`    | title, b-img, b-eng, b-kor, b-tip, b-tool, a-img, a-eng, a-kor, a-tip, a-tool    |
/// | `special` | title, b-eng, b-kor, b-tool, a-eng, a-kor, a-tool                                |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Super,
    Tips,
    Special,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown sheet layout: {0} (expected super, tips or special)")]
pub struct UnknownLayout(pub String);

impl Layout {
    pub fn id_prefix(self) -> &'static str {
        match self {
            Layout::Super | Layout::Tips => "super-",
            Layout::Special => "special-title-",
        }
    }

    fn sides(self) -> (Side, Side) {
        match self {
            Layout::Super => (
                Side {
                    image: Some(1),
                    english: 2,
                    korean: 3,
                    tip: None,
                    tool: Some(4),
                },
                Side {
                    image: Some(5),
                    english: 6,
                    korean: 7,
                    tip: None,
                    tool: Some(8),
                },
            ),
            Layout::Tips => (
                Side {
                    image: Some(1),
                    english: 2,
                    korean: 3,
                    tip: Some(4),
                    tool: Some(5),
                },
                Side {
                    image: Some(6),
                    english: 7,
                    korean: 8,
                    tip: Some(9),
                    tool: Some(10),
                },
            ),
            Layout::Special => (
                Side {
                    image: None,
                    english: 1,
                    korean: 2,
                    tip: None,
                    tool: Some(3),
                },
                Side {
                    image: None,
                    english: 4,
                    korean: 5,
                    tip: None,
                    tool: Some(6),
                },
            ),
        }
    }
}

impl FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "super" => Ok(Layout::Super),
            "tips" => Ok(Layout::Tips),
            "special" => Ok(Layout::Special),
            other => Err(UnknownLayout(other.to_string())),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layout::Super => "super",
            Layout::Tips => "tips",
            Layout::Special => "special",
        };

        f.write_str(name)
    }
}

/// Missing trailing cells read as empty.
fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|value| value.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl Side {
    fn extract(&self, row: &[String], id: String) -> Option<BeforeAfterItem> {
        let image = self.image.map(|index| cell(row, index)).unwrap_or_default();
        let english = cell(row, self.english);
        let korean = cell(row, self.korean);

        if image.is_empty() && english.is_empty() && korean.is_empty() {
            return None;
        }

        Some(BeforeAfterItem {
            id,
            english: english.to_string(),
            korean: korean.to_string(),
            tool: self.tool.and_then(|index| non_empty(cell(row, index))),
            image: non_empty(image),
            tip: self.tip.and_then(|index| non_empty(cell(row, index))),
        })
    }
}

pub fn card_id(layout: Layout, title: &str, row_index: usize) -> String {
    format!(
        "{}{}-{}",
        layout.id_prefix(),
        WHITESPACE.replace_all(title, "-"),
        row_index
    )
}

/// Groups data rows into cards, in first-seen title order.
pub fn group_rows(rows: &[Vec<String>], layout: Layout) -> Vec<PromptCard> {
    if rows.len() < 2 {
        return Vec::new();
    }

    let (before, after) = layout.sides();
    let mut cards: IndexMap<String, PromptCard> = IndexMap::new();

    for (index, row) in rows[1..].iter().enumerate() {
        let title = cell(row, 0);

        if title.is_empty() {
            continue;
        }

        let row_index = index + 1;
        let card = cards
            .entry(title.to_string())
            .or_insert_with(|| PromptCard::new(card_id(layout, title, row_index), title, row_index));

        let before_id = format!("{}-before-{}", card.id, card.before_items.len());
        if let Some(item) = before.extract(row, before_id) {
            card.before_items.push(item);
        }

        let after_id = format!("{}-after-{}", card.id, card.after_items.len());
        if let Some(item) = after.extract(row, after_id) {
            card.after_items.push(item);
        }
    }

    cards.into_values().collect()
}
