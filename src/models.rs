// Data types shared by the fetcher, the flagging pipeline and the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fetched post. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub id: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl TextItem {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            created_at: None,
        }
    }
}

/// One flagged result: a post, the category it was flagged for, and the
/// post's toxicity confidence (0.0 to 1.0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub item_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub source_text: String,
    pub category: String,
    pub score: f64,
}

impl Finding {
    pub(crate) fn from_item(item: &TextItem, category: &str, score: f64) -> Self {
        Self {
            item_id: item.id.clone(),
            created_at: item.created_at,
            source_text: item.body.clone(),
            category: category.to_string(),
            score,
        }
    }
}
