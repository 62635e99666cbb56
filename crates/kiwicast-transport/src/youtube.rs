//! YouTube Data API v3 client.
//!
//! Only the two read endpoints kiwicast needs are covered:
//!
//! | Endpoint | Used for |
//! |----------|----------|
//! | `liveChat/messages` | the [`ChatFeed`] the poller drives |
//! | `liveBroadcasts` | picking the broadcast whose chat to follow |
//!
//! Requests are authenticated either with an OAuth access token (sent as a
//! bearer token) or with an API key (sent as the `key` query parameter).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use kiwicast_core::{ChatFeed, ChatMessage, ChatPage, FetchError, FetchResult};

/// Base URL of the YouTube Data API.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

/// Largest page `liveChat/messages` returns.
pub const MAX_RESULTS: u32 = 2000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum YouTubeCredentials {
    /// OAuth 2.0 access token.
    AccessToken(String),
    /// Public API key.
    ApiKey(String),
}

impl fmt::Debug for YouTubeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

/// An active broadcast of the authenticated channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBroadcast {
    /// Broadcast id.
    pub id: String,
    /// Broadcast title.
    pub title: String,
    /// Id of the broadcast's live chat.
    pub live_chat_id: String,
}

/// YouTube Data API client.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    credentials: YouTubeCredentials,
}

impl YouTubeClient {
    /// Creates a client for the public API.
    pub fn new(credentials: YouTubeCredentials) -> FetchResult<Self> {
        Self::with_base_url(credentials, DEFAULT_API_BASE)
    }

    /// Creates a client for an API rooted at `base_url`.
    pub fn with_base_url(credentials: YouTubeCredentials, base_url: &str) -> FetchResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Transport(format!("invalid API base URL '{base_url}': {e}")))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Lists the broadcasts of the authenticated channel that are live now.
    ///
    /// Broadcasts without a live chat are skipped.
    pub async fn list_active_broadcasts(&self) -> FetchResult<Vec<LiveBroadcast>> {
        let url = self.endpoint(
            "liveBroadcasts",
            &[("part", "snippet"), ("broadcastStatus", "active")],
        )?;
        let body = self.get(url).await?;
        parse_broadcasts(&body)
    }

    /// Builds the URL of `path` with `params`, adding the API key if used.
    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> FetchResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::Transport(format!("invalid endpoint '{path}': {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params);
            if let YouTubeCredentials::ApiKey(key) = &self.credentials {
                query.append_pair("key", key);
            }
        }

        Ok(url)
    }

    /// Sends a GET request and returns the body of a successful response.
    async fn get(&self, url: Url) -> FetchResult<String> {
        trace!(path = url.path(), "YouTube API request");

        let mut request = self.client.get(url);
        if let YouTubeCredentials::AccessToken(token) = &self.credentials {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ChatFeed for YouTubeClient {
    async fn fetch(&self, chat_id: &str, page_token: Option<&str>) -> FetchResult<ChatPage> {
        let max_results = MAX_RESULTS.to_string();
        let mut params = vec![
            ("liveChatId", chat_id),
            ("part", "snippet,authorDetails"),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let url = self.endpoint("liveChat/messages", &params)?;
        let page = parse_chat_page(&self.get(url).await?)?;

        debug!(
            messages = page.messages.len(),
            polling_interval = ?page.polling_interval,
            "Fetched live chat messages"
        );
        Ok(page)
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    items: Vec<MessageItem>,
    next_page_token: Option<String>,
    #[serde(default)]
    polling_interval_millis: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageItem {
    id: String,
    #[serde(default)]
    snippet: MessageSnippet,
    #[serde(default)]
    author_details: AuthorDetails,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSnippet {
    text_message_details: Option<TextMessageDetails>,
    display_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextMessageDetails {
    message_text: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
struct BroadcastListResponse {
    #[serde(default)]
    items: Vec<BroadcastItem>,
}

#[derive(Deserialize)]
struct BroadcastItem {
    id: String,
    snippet: BroadcastSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastSnippet {
    #[serde(default)]
    title: String,
    live_chat_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decodes a `liveChat/messages` response.
///
/// Messages carrying neither text details nor a display message (e.g. deleted
/// messages or membership events) are dropped.
pub fn parse_chat_page(body: &str) -> FetchResult<ChatPage> {
    let response: MessageListResponse = serde_json::from_str(body)?;

    let messages = response
        .items
        .into_iter()
        .filter_map(|item| {
            let text = match item.snippet.text_message_details {
                Some(details) => details.message_text,
                None => item.snippet.display_message?,
            };
            Some(ChatMessage {
                id: item.id,
                text,
                author: item.author_details.display_name,
            })
        })
        .collect();

    Ok(ChatPage {
        messages,
        next_page_token: response.next_page_token,
        polling_interval: Duration::from_millis(response.polling_interval_millis),
    })
}

/// Decodes a `liveBroadcasts` response.
pub fn parse_broadcasts(body: &str) -> FetchResult<Vec<LiveBroadcast>> {
    let response: BroadcastListResponse = serde_json::from_str(body)?;

    Ok(response
        .items
        .into_iter()
        .filter_map(|item| {
            Some(LiveBroadcast {
                live_chat_id: item.snippet.live_chat_id?,
                id: item.id,
                title: item.snippet.title,
            })
        })
        .collect())
}

/// Extracts the message of a Google API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
