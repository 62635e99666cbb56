//! Chat feed abstractions.
//!
//! A [`ChatFeed`] hands out pages of messages together with a continuation
//! token and the interval the server wants clients to wait before asking again.
//! The runtime's poller drives the feed and forwards parsed commands to a
//! [`CommandSink`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchResult;

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Feed-assigned identifier, unique per message.
    pub id: String,
    /// Message body.
    pub text: String,
    /// Display name of the author.
    pub author: String,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(id: impl Into<String>, text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author: author.into(),
        }
    }
}

/// One page of chat messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPage {
    /// Messages in feed order.
    pub messages: Vec<ChatMessage>,
    /// Token to continue from on the next fetch.
    pub next_page_token: Option<String>,
    /// Minimum wait the server asks for before the next fetch. Zero if not advised.
    pub polling_interval: Duration,
}

/// Where the next fetch continues and how long to wait before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollCursor {
    /// Opaque continuation token; `None` starts from the live edge.
    pub page_token: Option<String>,
    /// Server-advised wait. Zero if not advised.
    pub interval: Duration,
}

impl From<&ChatPage> for PollCursor {
    fn from(page: &ChatPage) -> Self {
        Self {
            page_token: page.next_page_token.clone(),
            interval: page.polling_interval,
        }
    }
}

/// A paginated chat feed.
#[async_trait]
pub trait ChatFeed: Send + Sync {
    /// Fetches the page following `page_token` from the chat `chat_id`.
    async fn fetch(&self, chat_id: &str, page_token: Option<&str>) -> FetchResult<ChatPage>;
}

/// Receives parsed chat commands.
///
/// This is the single inbound API of the command dispatcher. Implementations
/// must not fail: errors are handled and logged inside.
#[async_trait]
pub trait CommandSink: Send {
    /// Handles the command `name` with its optional argument.
    async fn handle_command(&mut self, name: &str, argument: Option<&str>);
}
