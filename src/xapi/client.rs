// Authenticated X API v2 client.
//
// All requests carry the operator's bearer token. Failures of any kind
// surface as FetchFailed; retry policy, if any, belongs to the caller.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::rate_limiter::RateLimiter;

/// Default X API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.twitter.com";

/// Minimal pacing between X API calls while paging a timeline.
const REQUESTS_PER_SECOND: f64 = 2.0;

/// HTTP client for the X API v2.
pub struct XClient {
    client: reqwest::Client,
    base_url: String,
    bearer: SecretString,
    rate_limiter: RateLimiter,
}

impl XClient {
    /// Create a client pointing at `base_url` (normally [`DEFAULT_API_URL`]).
    pub fn new(base_url: &str, bearer: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nextsight/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer,
            rate_limiter: RateLimiter::new(REQUESTS_PER_SECOND),
        })
    }

    /// GET `path` (e.g. "/2/users/by/username/jack") and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(path = path, "X API GET request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.bearer.expose_secret())
            .query(params)
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("request to {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FetchFailed(format!("{path} returned {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to parse {path} response: {e}")))
    }

    /// Resolve a username (without @) to its numeric user id.
    pub async fn resolve_user_id(&self, username: &str) -> Result<String> {
        let resp: UserLookupResponse = self
            .get_json(&format!("/2/users/by/username/{username}"), &[])
            .await?;
        resp.data
            .map(|u| u.id)
            .ok_or_else(|| Error::FetchFailed(format!("user @{username} not found")))
    }
}

/// Extract the username from a profile URL or handle.
///
/// Accepts `https://x.com/name`, `twitter.com/name/`, `@name` and `name`;
/// query strings, fragments and trailing path segments such as
/// `/with_replies` are ignored.
pub fn parse_username(profile: &str) -> Result<String> {
    let trimmed = profile.trim();
    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let without_scheme = without_query
        .strip_prefix("https://")
        .or_else(|| without_query.strip_prefix("http://"))
        .unwrap_or(without_query);

    let mut segments = without_scheme.split('/').filter(|s| !s.is_empty());
    let first = segments.next().unwrap_or_default();
    let is_host = matches!(
        first.trim_start_matches("www.").trim_start_matches("mobile."),
        "x.com" | "twitter.com"
    );
    let candidate = if is_host {
        segments.next().unwrap_or_default()
    } else {
        first
    };

    let username = candidate.trim_start_matches('@');
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::FetchFailed(format!(
            "cannot find a username in \"{trimmed}\""
        )));
    }
    Ok(username.to_string())
}

// -- Serde types for user lookup --

#[derive(Deserialize)]
struct UserLookupResponse {
    data: Option<UserData>,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_urls() {
        for input in [
            "https://x.com/jack",
            "https://twitter.com/jack/",
            "http://www.x.com/jack?lang=en",
            "x.com/jack/with_replies",
            "https://mobile.twitter.com/jack#top",
            "@jack",
            "jack",
            "  jack  ",
        ] {
            assert_eq!(parse_username(input).unwrap(), "jack", "input: {input}");
        }
    }

    #[test]
    fn rejects_inputs_without_username() {
        for input in ["", "https://x.com/", "@", "not a name", "https://x.com/?q=1"] {
            let err = parse_username(input).unwrap_err();
            assert!(matches!(err, Error::FetchFailed(_)), "input: {input}");
        }
    }

    #[test]
    fn user_lookup_without_data_has_no_id() {
        let resp: UserLookupResponse =
            serde_json::from_str(r#"{"errors":[{"detail":"Could not find user"}]}"#).unwrap();
        assert!(resp.data.is_none());
    }
}
