// Timeline fetching: paginated retrieval of an account's recent posts.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::client::XClient;
use crate::error::Result;
use crate::models::TextItem;

/// The API accepts 5..=100 results per page.
const MIN_PAGE_SIZE: usize = 5;
const MAX_PAGE_SIZE: usize = 100;

/// Fetch up to `max_posts` recent posts for `user_id`, newest first,
/// following pagination tokens until enough are collected or the timeline ends.
///
/// An account without posts yields an empty vector, not an error.
pub async fn fetch_recent_posts(
    client: &XClient,
    user_id: &str,
    max_posts: usize,
) -> Result<Vec<TextItem>> {
    let mut items = Vec::new();
    let mut next_token: Option<String> = None;
    let page_size = max_posts.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE).to_string();
    let path = format!("/2/users/{user_id}/tweets");

    while items.len() < max_posts {
        let mut params: Vec<(&str, &str)> = vec![
            ("tweet.fields", "created_at"),
            ("max_results", &page_size),
        ];
        if let Some(ref token) = next_token {
            params.push(("pagination_token", token));
        }

        let page: TimelinePage = client.get_json(&path, &params).await?;
        let page_len = page.data.len();

        for tweet in page.data {
            if items.len() >= max_posts {
                break;
            }
            items.push(tweet.into_item());
        }

        debug!(
            page_posts = page_len,
            total_collected = items.len(),
            "Fetched page of posts for user {}",
            user_id
        );

        next_token = page.meta.and_then(|m| m.next_token);
        if next_token.is_none() || page_len == 0 {
            break;
        }
    }

    info!(count = items.len(), user_id = user_id, "Collected posts for analysis");
    Ok(items)
}

// -- Serde types for GET /2/users/:id/tweets --

#[derive(Debug, Deserialize)]
struct TimelinePage {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<DateTime<Utc>>,
}

impl Tweet {
    fn into_item(self) -> TextItem {
        TextItem {
            id: self.id,
            body: self.text,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeline_page() {
        let body = r#"{
            "data": [
                {"id": "2", "text": "second", "created_at": "2024-05-02T10:00:00.000Z"},
                {"id": "1", "text": "first", "created_at": "2024-05-01T09:30:00.000Z"}
            ],
            "meta": {"result_count": 2, "next_token": "abc"}
        }"#;
        let page: TimelinePage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.unwrap().next_token.as_deref(), Some("abc"));

        let item = page.data.into_iter().next().unwrap().into_item();
        assert_eq!(item.id, "2");
        assert_eq!(item.body, "second");
        assert_eq!(
            item.created_at.unwrap().to_rfc3339(),
            "2024-05-02T10:00:00+00:00"
        );
    }

    #[test]
    fn empty_timeline_has_no_data_field() {
        let page: TimelinePage = serde_json::from_str(r#"{"meta": {"result_count": 0}}"#).unwrap();
        assert!(page.data.is_empty());
        assert!(page.meta.unwrap().next_token.is_none());
    }
}
