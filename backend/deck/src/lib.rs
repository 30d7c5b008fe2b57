//! # Deck
//!
//! Shared logic behind prompt cards.
//!
//! ## Overall Data Flow
//!
//! - A Google Sheet holds one before/after example per row
//! - [`remote::SheetsClient`] pulls the raw cell grid with a service account
//! - [`grouper::group_rows`] folds rows sharing a title into one [`models::PromptCard`]
//! - [`catalog`] filters and paginates the combined feed
//! - [`drive`] rewrites Google Drive share links into direct image links
//!
//! ## Sheet Layouts
//!
//! Row 0 is always a header. Column meaning depends on the sheet, see [`grouper::Layout`].
//!
//! Cards are rebuilt from scratch on every fetch. Nothing here is persisted.

pub mod catalog;
pub mod drive;
pub mod grouper;
pub mod models;
pub mod remote;

pub use grouper::{Layout, group_rows};
pub use models::{BeforeAfterItem, ClickEvent, Comment, PromptCard, PromptStats, SheetData};
pub use remote::{SheetRef, SheetSource, SheetsClient, SheetsError};
