//! Live chat polling loop.
//!
//! The poller fetches one page at a time, drops messages it has already seen,
//! parses the rest and hands every command to a [`CommandSink`]. Between pages
//! it waits for the interval advised by the feed. A failed fetch is logged and
//! retried from the same position after the wait.
//!
//! ```rust,ignore
//! use kiwicast_runtime::poller::ChatPoller;
//!
//! let poller = ChatPoller::from_config(feed, chat_id, &config.youtube);
//! let token = poller.cancellation_token();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     token.cancel();
//! });
//! poller.run(&mut sink).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use kiwicast_core::{
    ChatFeed, CommandSink, DedupWindow, PollCursor, YoutubeConfig, parse_command,
};

/// Wait used when neither the feed nor the configuration advise one.
pub const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(10);

/// Polls a [`ChatFeed`] and forwards commands to a [`CommandSink`].
pub struct ChatPoller {
    feed: Arc<dyn ChatFeed>,
    chat_id: String,
    dedup: DedupWindow,
    cursor: PollCursor,
    fallback_interval: Duration,
    cancel: CancellationToken,
}

impl ChatPoller {
    /// Creates a poller starting from the live edge of `chat_id`.
    pub fn new(feed: Arc<dyn ChatFeed>, chat_id: impl Into<String>) -> Self {
        Self {
            feed,
            chat_id: chat_id.into(),
            dedup: DedupWindow::default(),
            cursor: PollCursor::default(),
            fallback_interval: DEFAULT_FALLBACK_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a poller using the `youtube` configuration section.
    pub fn from_config(
        feed: Arc<dyn ChatFeed>,
        chat_id: impl Into<String>,
        config: &YoutubeConfig,
    ) -> Self {
        Self::new(feed, chat_id)
            .with_dedup_window(DedupWindow::with_capacity(config.dedup_capacity))
            .with_fallback_interval(Duration::from_secs(config.live_chat_poll_interval))
    }

    /// Replaces the deduplication window.
    pub fn with_dedup_window(mut self, dedup: DedupWindow) -> Self {
        self.dedup = dedup;
        self
    }

    /// Sets the wait used when the feed advises no interval.
    pub fn with_fallback_interval(mut self, interval: Duration) -> Self {
        self.fallback_interval = interval;
        self
    }

    /// Returns a token that stops [`run`](Self::run) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the chat being polled.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Returns where the next fetch continues.
    pub fn cursor(&self) -> &PollCursor {
        &self.cursor
    }

    /// Returns the deduplication window.
    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    /// Fetches and dispatches one page, returning how long to wait before the next.
    pub async fn poll_once<S>(&mut self, sink: &mut S) -> Duration
    where
        S: CommandSink + ?Sized,
    {
        let result = self
            .feed
            .fetch(&self.chat_id, self.cursor.page_token.as_deref())
            .await;
        let page = match result {
            Ok(page) => {
                self.cursor = PollCursor::from(&page);
                page
            }
            Err(e) => {
                warn!(chat_id = %self.chat_id, error = %e, "Failed to fetch live chat messages");
                return self.wait_interval();
            }
        };

        trace!(
            messages = page.messages.len(),
            next_page_token = ?self.cursor.page_token,
            "Fetched live chat page"
        );

        for message in &page.messages {
            if self.dedup.seen(&message.id) {
                continue;
            }
            self.dedup.mark(message.id.as_str());

            let Some(command) = parse_command(&message.text) else {
                continue;
            };

            debug!(
                message_id = %message.id,
                author = %message.author,
                command = %command.name,
                "Received command"
            );
            sink.handle_command(&command.name, command.argument()).await;
        }

        self.wait_interval()
    }

    /// Polls until the cancellation token fires.
    pub async fn run<S>(mut self, sink: &mut S)
    where
        S: CommandSink + ?Sized,
    {
        info!(chat_id = %self.chat_id, "Listening for commands");

        while !self.cancel.is_cancelled() {
            let wait = self.poll_once(sink).await;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!(chat_id = %self.chat_id, "Stopped listening for commands");
    }

    fn wait_interval(&self) -> Duration {
        if self.cursor.interval.is_zero() {
            self.fallback_interval
        } else {
            self.cursor.interval
        }
    }
}

impl std::fmt::Debug for ChatPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPoller")
            .field("chat_id", &self.chat_id)
            .field("cursor", &self.cursor)
            .field("seen", &self.dedup.len())
            .field("fallback_interval", &self.fallback_interval)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use kiwicast_core::{ChatMessage, ChatPage, FetchError, FetchResult};

    /// Replays queued results, then empty pages.
    #[derive(Default)]
    struct ScriptedFeed {
        script: Mutex<VecDeque<FetchResult<ChatPage>>>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedFeed {
        fn new(script: impl IntoIterator<Item = FetchResult<ChatPage>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<Option<String>> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl ChatFeed for ScriptedFeed {
        async fn fetch(&self, _chat_id: &str, page_token: Option<&str>) -> FetchResult<ChatPage> {
            self.requests.lock().push(page_token.map(str::to_string));
            self.script.lock().pop_front().unwrap_or_else(|| {
                Ok(ChatPage {
                    polling_interval: Duration::from_secs(10),
                    ..Default::default()
                })
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        commands: Vec<(String, Option<String>)>,
    }

    #[async_trait]
    impl CommandSink for RecordingSink {
        async fn handle_command(&mut self, name: &str, argument: Option<&str>) {
            self.commands
                .push((name.to_string(), argument.map(str::to_string)));
        }
    }

    fn page(ids_and_texts: &[(&str, &str)], token: &str, interval_ms: u64) -> FetchResult<ChatPage> {
        Ok(ChatPage {
            messages: ids_and_texts
                .iter()
                .map(|(id, text)| ChatMessage::new(*id, *text, "viewer"))
                .collect(),
            next_page_token: Some(token.to_string()),
            polling_interval: Duration::from_millis(interval_ms),
        })
    }

    fn command(name: &str, argument: Option<&str>) -> (String, Option<String>) {
        (name.to_string(), argument.map(str::to_string))
    }

    #[tokio::test]
    async fn test_poll_once_dispatches_commands_in_order() {
        let feed = ScriptedFeed::new([page(
            &[("a", "!scene lobby"), ("b", "hello"), ("c", "!stop")],
            "t1",
            3000,
        )]);
        let mut poller = ChatPoller::new(feed.clone(), "chat");
        let mut sink = RecordingSink::default();

        let wait = poller.poll_once(&mut sink).await;

        assert_eq!(wait, Duration::from_secs(3));
        assert_eq!(
            sink.commands,
            vec![command("scene", Some("lobby")), command("stop", None)]
        );
        assert_eq!(poller.cursor().page_token.as_deref(), Some("t1"));
        assert_eq!(poller.dedup().len(), 3);
        assert_eq!(feed.requests(), vec![None]);
    }

    #[tokio::test]
    async fn test_overlapping_pages_dispatch_once() {
        let feed = ScriptedFeed::new([
            page(&[("a", "!scene lobby"), ("b", "!stop")], "t1", 1000),
            page(&[("b", "!stop"), ("c", "!reload"), ("c", "!reload")], "t2", 1000),
        ]);
        let mut poller = ChatPoller::new(feed.clone(), "chat");
        let mut sink = RecordingSink::default();

        poller.poll_once(&mut sink).await;
        poller.poll_once(&mut sink).await;

        assert_eq!(
            sink.commands,
            vec![
                command("scene", Some("lobby")),
                command("stop", None),
                command("reload", None),
            ]
        );
        assert_eq!(feed.requests(), vec![None, Some("t1".to_string())]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cursor() {
        let feed = ScriptedFeed::new([
            page(&[("a", "!stop")], "t1", 2000),
            Err(FetchError::Transport("connection reset".into())),
            page(&[("a", "!stop"), ("b", "!scene lobby")], "t2", 2000),
        ]);
        let mut poller = ChatPoller::new(feed.clone(), "chat");
        let mut sink = RecordingSink::default();

        poller.poll_once(&mut sink).await;
        let wait = poller.poll_once(&mut sink).await;
        assert_eq!(wait, Duration::from_secs(2));
        assert_eq!(poller.cursor().page_token.as_deref(), Some("t1"));

        poller.poll_once(&mut sink).await;
        assert_eq!(
            feed.requests(),
            vec![None, Some("t1".to_string()), Some("t1".to_string())]
        );
        assert_eq!(
            sink.commands,
            vec![command("stop", None), command("scene", Some("lobby"))]
        );
    }

    #[tokio::test]
    async fn test_zero_interval_uses_fallback() {
        let feed = ScriptedFeed::new([page(&[], "t1", 0)]);
        let mut poller =
            ChatPoller::new(feed, "chat").with_fallback_interval(Duration::from_secs(7));

        let wait = poller.poll_once(&mut RecordingSink::default()).await;
        assert_eq!(wait, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_from_config() {
        let feed = Arc::new(ScriptedFeed::default());
        let config = YoutubeConfig {
            live_chat_poll_interval: 4,
            dedup_capacity: 2,
        };
        let poller = ChatPoller::from_config(feed, "chat", &config);
        assert_eq!(poller.fallback_interval, Duration::from_secs(4));
        assert_eq!(poller.dedup().capacity(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_cancelled() {
        let feed = ScriptedFeed::new([page(&[("a", "!stop")], "t1", 10_000)]);
        let poller = ChatPoller::new(feed.clone(), "chat");
        let token = poller.cancellation_token();
        let mut sink = RecordingSink::default();

        tokio::join!(poller.run(&mut sink), async {
            tokio::time::sleep(Duration::from_secs(25)).await;
            token.cancel();
        });

        // Fetches at 0s, 10s and 20s; the wait after the third is interrupted.
        assert_eq!(feed.requests().len(), 3);
        assert_eq!(sink.commands, vec![command("stop", None)]);
    }

    #[tokio::test]
    async fn test_run_cancelled_before_start() {
        let feed = Arc::new(ScriptedFeed::default());
        let poller = ChatPoller::new(feed.clone(), "chat");
        poller.cancellation_token().cancel();

        poller.run(&mut RecordingSink::default()).await;
        assert!(feed.requests().is_empty());
    }
}
