use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw cell grid as returned by the Sheets values endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    #[serde(default)]
    pub values: Vec<Vec<String>>,
    #[serde(default)]
    pub range: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BeforeAfterItem {
    pub id: String,
    pub english: String,
    pub korean: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptCard {
    pub id: String,
    pub title: String,
    pub before_items: Vec<BeforeAfterItem>,
    pub after_items: Vec<BeforeAfterItem>,
    /// 1-based data row of the first row carrying this title
    pub row_index: usize,
}

impl PromptCard {
    pub fn new(id: String, title: &str, row_index: usize) -> Self {
        Self {
            id,
            title: title.to_string(),
            before_items: Vec::new(),
            after_items: Vec::new(),
            row_index,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &BeforeAfterItem> {
        self.before_items.iter().chain(self.after_items.iter())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub prompt_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptStats {
    pub prompt_id: String,
    pub click_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub prompt_id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
