//! Conversation controller: owns the transcript and drives one exchange at a time

use crate::config::Config;
use crate::conversation::{Conversation, Message, GREETING};
use crate::events::{ConversationRole, Preferences};
use crate::notice::NoticeBoard;
use crate::render::Renderer;
use crate::service::{ChatReply, ChatRequest, RecipeService, ServiceError};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use ratatui::text::Line;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const DOWNLOAD_FILE_NAME: &str = "chatbite-recipe.txt";

pub const NETWORK_NOTICE: &str = "Network hiccup. Check your connection and try again.";
pub const GENERIC_NOTICE: &str = "Something went wrong. Please try again.";
pub const EMPTY_REPLY_NOTICE: &str = "The response was empty. Let's try another combo.";

pub type ExchangeResult = Result<ChatReply, ServiceError>;

/// Identifies one in-flight exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending { ticket: Ticket, placeholder: usize },
}

/// One rendered entry of the visual transcript
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub role: ConversationRole,
    pub raw: String,
    pub rendered: Vec<Line<'static>>,
    pub loading: bool,
    pub timestamp: DateTime<Local>,
}

/// Everything needed to run the network half of a submit
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub ticket: Ticket,
    pub request: ChatRequest,
}

/// Why a submit did not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// Nothing left after trimming
    EmptyEntry,
    /// Another exchange is still in flight
    Busy,
}

/// How an exchange ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Reply appended to the conversation
    Replied,
    /// User message removed again; `entry` is the text that was submitted
    RolledBack { notice: String, entry: String },
    /// The exchange no longer belongs to this session and was ignored
    Stale,
}

/// Owns the conversation, its visual transcript and the input state.
pub struct ChatController {
    conversation: Conversation,
    transcript: Vec<TranscriptEntry>,
    phase: Phase,
    last_reply: Option<String>,
    notices: NoticeBoard,
    renderer: Renderer,
    download_dir: PathBuf,
    next_ticket: u64,
    focus_requested: bool,
}

impl ChatController {
    pub fn new(renderer: Renderer, notice_duration: Duration, download_dir: PathBuf) -> Self {
        let mut controller = Self {
            conversation: Conversation::new(),
            transcript: Vec::new(),
            phase: Phase::Idle,
            last_reply: None,
            notices: NoticeBoard::new(notice_duration),
            renderer,
            download_dir,
            next_ticket: 0,
            focus_requested: false,
        };
        controller.reset();
        controller
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Renderer::from_config(config),
            Duration::from_millis(config.notice_millis),
            config.download_dir.clone(),
        )
    }

    /// First half of a submit: optimistic append, loading placeholder, input
    /// disabled. The returned request must be sent and its result handed to
    /// [`ChatController::settle`].
    pub fn begin_submit(
        &mut self,
        entry: &str,
        preferences: Preferences,
    ) -> Result<PendingExchange, SubmitRejection> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(SubmitRejection::EmptyEntry);
        }
        if self.is_pending() || !self.conversation.begin(entry) {
            tracing::debug!("submit ignored while an exchange is pending");
            return Err(SubmitRejection::Busy);
        }

        self.push_entry(ConversationRole::User, entry.to_string(), false);
        self.push_entry(ConversationRole::Assistant, String::new(), true);

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.phase = Phase::Pending {
            ticket,
            placeholder: self.transcript.len() - 1,
        };

        let request = ChatRequest::new(entry, self.conversation.messages().to_vec(), preferences);
        tracing::info!(
            ticket = ticket.0,
            history = request.history.len(),
            meal = %request.meal_type,
            "exchange started"
        );

        Ok(PendingExchange { ticket, request })
    }

    /// Second half of a submit: commit or compensate, then re-enable input.
    pub fn settle(&mut self, ticket: Ticket, result: ExchangeResult) -> Settlement {
        let placeholder = match self.phase {
            Phase::Pending { ticket: current, placeholder } if current == ticket => placeholder,
            _ => {
                tracing::debug!(ticket = ticket.0, "discarding result of abandoned exchange");
                return Settlement::Stale;
            }
        };

        self.phase = Phase::Idle;
        self.focus_requested = true;

        let notice = match result {
            Ok(reply) => {
                let reply = reply.text();
                if !reply.is_empty() {
                    let committed = self.conversation.commit(reply);
                    debug_assert!(committed, "pending phase without an open exchange");
                    debug_assert!(self.conversation.is_alternating());
                    let rendered = self.renderer.render(reply);
                    if let Some(entry) = self.transcript.get_mut(placeholder) {
                        entry.raw = reply.to_string();
                        entry.rendered = rendered;
                        entry.loading = false;
                        entry.timestamp = Local::now();
                    }
                    self.last_reply = Some(reply.to_string());
                    tracing::info!(ticket = ticket.0, chars = reply.len(), "exchange completed");
                    return Settlement::Replied;
                }
                tracing::warn!(ticket = ticket.0, "empty reply from recipe service");
                EMPTY_REPLY_NOTICE.to_string()
            }
            Err(ServiceError::Transport(err)) => {
                tracing::error!(ticket = ticket.0, error = %err, "recipe request failed");
                NETWORK_NOTICE.to_string()
            }
            Err(ServiceError::Server { status, message }) => {
                tracing::warn!(ticket = ticket.0, status, ?message, "recipe service refused request");
                message.unwrap_or_else(|| GENERIC_NOTICE.to_string())
            }
        };

        let entry = self.roll_back(placeholder);
        debug_assert!(self.conversation.is_alternating());
        self.notices.show(notice.clone());
        Settlement::RolledBack { notice, entry }
    }

    /// Run a whole exchange against `service`.
    pub async fn submit(
        &mut self,
        service: &dyn RecipeService,
        entry: &str,
        preferences: Preferences,
    ) -> Result<Settlement, SubmitRejection> {
        let pending = self.begin_submit(entry, preferences)?;
        let result = service.send_chat(&pending.request).await;
        Ok(self.settle(pending.ticket, result))
    }

    /// Clear everything and start over from the greeting.
    pub fn reset(&mut self) {
        if let Phase::Pending { ticket, .. } = self.phase {
            tracing::info!(ticket = ticket.0, "reset abandons pending exchange");
        }
        self.conversation.reset();
        self.transcript.clear();
        self.push_entry(ConversationRole::Assistant, GREETING.to_string(), false);
        self.phase = Phase::Idle;
        self.last_reply = None;
        self.focus_requested = true;
    }

    /// Save the latest reply as a plain text file. Returns `None` when there is
    /// nothing to save yet.
    pub fn download(&self) -> Result<Option<PathBuf>> {
        let Some(reply) = self.last_reply() else {
            return Ok(None);
        };

        fs::create_dir_all(&self.download_dir)
            .with_context(|| format!("Failed to create {}", self.download_dir.display()))?;
        let path = self.download_dir.join(DOWNLOAD_FILE_NAME);
        fs::write(&path, reply)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), "recipe saved");
        Ok(Some(path))
    }

    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.notices.show(text);
    }

    pub fn notice(&self) -> Option<&str> {
        self.notices.current()
    }

    /// Drop an expired notice; true when the screen needs a redraw.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        self.notices.expire(now)
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    pub fn is_input_enabled(&self) -> bool {
        !self.is_pending()
    }

    pub fn can_download(&self) -> bool {
        self.last_reply().is_some()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.last_reply.as_deref()
    }

    /// Whether the entry field should take focus; clears the request.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    fn push_entry(&mut self, role: ConversationRole, raw: String, loading: bool) {
        let rendered = if loading {
            Vec::new()
        } else {
            self.renderer.render(&raw)
        };
        self.transcript.push(TranscriptEntry {
            role,
            raw,
            rendered,
            loading,
            timestamp: Local::now(),
        });
    }

    /// Remove the placeholder and the user entry before it, and the tentative
    /// message from the conversation.
    fn roll_back(&mut self, placeholder: usize) -> String {
        if placeholder < self.transcript.len() {
            self.transcript.remove(placeholder);
        }
        let user_entry = placeholder
            .checked_sub(1)
            .filter(|&index| {
                self.transcript
                    .get(index)
                    .is_some_and(|entry| entry.role == ConversationRole::User)
            })
            .map(|index| self.transcript.remove(index));

        let removed = self.conversation.compensate();
        removed
            .map(|message| message.content)
            .or_else(|| user_entry.map(|entry| entry.raw))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MealType;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results and records every request it sees
    struct ScriptedService {
        results: Mutex<VecDeque<ExchangeResult>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedService {
        fn new(results: Vec<ExchangeResult>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(ChatReply::new(*r))).collect())
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RecipeService for ScriptedService {
        async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::Transport("no scripted result".into())))
        }
    }

    fn controller_in(dir: &std::path::Path) -> ChatController {
        ChatController::new(Renderer::terminal(), Duration::from_millis(3200), dir.to_path_buf())
    }

    fn controller() -> ChatController {
        controller_in(&std::env::temp_dir())
    }

    fn dinner() -> Preferences {
        Preferences {
            meal_type: MealType::Dinner,
            ..Preferences::default()
        }
    }

    #[tokio::test]
    async fn successful_exchange_appends_pair_and_enables_download() {
        let service = ScriptedService::replying(&["Try chicken fried rice."]);
        let mut chat = controller();

        assert!(!chat.can_download());
        let settlement = chat.submit(&service, "chicken, rice", dinner()).await.unwrap();

        assert_eq!(settlement, Settlement::Replied);
        assert_eq!(
            chat.messages(),
            &[
                Message::assistant(GREETING),
                Message::user("chicken, rice"),
                Message::assistant("Try chicken fried rice."),
            ]
        );
        assert!(chat.can_download());
        assert!(chat.is_input_enabled());

        let request = &service.requests.lock().unwrap()[0];
        assert_eq!(request.message, "chicken, rice");
        assert_eq!(request.meal_type, "dinner");
        assert_eq!(request.history.last(), Some(&Message::user("chicken, rice")));
    }

    #[tokio::test]
    async fn download_turns_on_once_and_stays_on() {
        let service = ScriptedService::replying(&["First.", "Second."]);
        let mut chat = controller();
        let mut transitions = 0;
        let mut enabled = chat.can_download();

        for entry in ["eggs", "more eggs"] {
            let pending = chat.begin_submit(entry, dinner()).unwrap();
            if chat.can_download() != enabled {
                transitions += 1;
                enabled = chat.can_download();
            }
            let result = service.send_chat(&pending.request).await;
            chat.settle(pending.ticket, result);
            if chat.can_download() != enabled {
                transitions += 1;
                enabled = chat.can_download();
            }
        }

        assert_eq!(transitions, 1);
        assert!(enabled);
    }

    #[tokio::test]
    async fn alternation_holds_across_many_exchanges() {
        let service = ScriptedService::replying(&["a", "b", "c", "d"]);
        let mut chat = controller();
        for entry in ["1", "2", "3", "4"] {
            chat.submit(&service, entry, Preferences::default()).await.unwrap();
            assert!(chat.conversation.is_alternating());
        }
        assert_eq!(chat.messages().len(), 9);
        assert_eq!(chat.transcript().len(), 9);
    }

    #[tokio::test]
    async fn server_error_message_is_shown_and_rolled_back() {
        let service = ScriptedService::new(vec![Err(ServiceError::server(500, Some("rate limited")))]);
        let mut chat = controller();

        let settlement = chat.submit(&service, "chicken, rice", dinner()).await.unwrap();

        assert_eq!(
            settlement,
            Settlement::RolledBack {
                notice: "rate limited".to_string(),
                entry: "chicken, rice".to_string(),
            }
        );
        assert_eq!(chat.notice(), Some("rate limited"));
        assert_eq!(chat.messages(), &[Message::assistant(GREETING)]);
        assert_eq!(chat.transcript().len(), 1);
        assert!(chat.is_input_enabled());
        assert!(!chat.can_download());
    }

    #[tokio::test]
    async fn server_error_without_message_uses_generic_notice() {
        let service = ScriptedService::new(vec![Err(ServiceError::server(502, None))]);
        let mut chat = controller();
        chat.submit(&service, "tofu", Preferences::default()).await.unwrap();
        assert_eq!(chat.notice(), Some(GENERIC_NOTICE));
    }

    #[tokio::test]
    async fn transport_failure_uses_network_notice() {
        let service = ScriptedService::new(vec![Err(ServiceError::Transport("refused".into()))]);
        let mut chat = controller();
        chat.submit(&service, "tofu", Preferences::default()).await.unwrap();
        assert_eq!(chat.notice(), Some(NETWORK_NOTICE));
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn blank_reply_counts_as_failure() {
        let service = ScriptedService::replying(&["   \n"]);
        let mut chat = controller();
        chat.submit(&service, "tofu", Preferences::default()).await.unwrap();
        assert_eq!(chat.notice(), Some(EMPTY_REPLY_NOTICE));
        assert_eq!(chat.messages().len(), 1);
        assert!(!chat.can_download());
    }

    #[tokio::test]
    async fn null_reply_counts_as_empty_not_network() {
        let service = ScriptedService::new(vec![Ok(ChatReply { reply: None })]);
        let mut chat = controller();
        chat.submit(&service, "tofu", Preferences::default()).await.unwrap();
        assert_eq!(chat.notice(), Some(EMPTY_REPLY_NOTICE));
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_earlier_exchanges() {
        let service = ScriptedService::new(vec![
            Ok(ChatReply::new("Dal.")),
            Err(ServiceError::Transport("timeout".into())),
        ]);
        let mut chat = controller();
        chat.submit(&service, "lentils", Preferences::default()).await.unwrap();
        let before = chat.messages().len();

        chat.submit(&service, "rice", Preferences::default()).await.unwrap();

        assert_eq!(chat.messages().len(), before);
        assert!(chat.conversation.is_alternating());
        assert_eq!(chat.last_reply(), Some("Dal."));
    }

    #[tokio::test]
    async fn blank_entries_are_ignored() {
        let service = ScriptedService::replying(&["unused"]);
        let mut chat = controller();

        for entry in ["", "   "] {
            let outcome = chat.submit(&service, entry, Preferences::default()).await;
            assert_eq!(outcome, Err(SubmitRejection::EmptyEntry));
        }

        assert_eq!(service.request_count(), 0);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.transcript().len(), 1);
        assert!(chat.notice().is_none());
    }

    #[test]
    fn second_submit_while_pending_is_rejected() {
        let mut chat = controller();
        let first = chat.begin_submit("eggs", Preferences::default()).unwrap();

        assert!(!chat.is_input_enabled());
        assert_eq!(
            chat.begin_submit("bacon", Preferences::default()).unwrap_err(),
            SubmitRejection::Busy
        );
        assert_eq!(chat.messages().len(), 2);

        let placeholder = chat.transcript().last().unwrap();
        assert!(placeholder.loading);
        assert_eq!(placeholder.role, ConversationRole::Assistant);

        chat.settle(first.ticket, Ok(ChatReply::new("Bacon and eggs.")));
        assert!(chat.is_input_enabled());
        assert!(!chat.transcript().last().unwrap().loading);
    }

    #[test]
    fn late_result_after_reset_is_ignored() {
        let mut chat = controller();
        let pending = chat.begin_submit("eggs", Preferences::default()).unwrap();
        chat.reset();
        assert!(chat.is_input_enabled());

        let next = chat.begin_submit("rice", Preferences::default()).unwrap();
        let outcome = chat.settle(pending.ticket, Ok(ChatReply::new("Old reply.")));

        assert_eq!(outcome, Settlement::Stale);
        assert!(chat.is_pending());
        assert_eq!(chat.messages().len(), 2);

        chat.settle(next.ticket, Ok(ChatReply::new("Fried rice.")));
        assert_eq!(chat.last_reply(), Some("Fried rice."));
    }

    #[tokio::test]
    async fn reset_always_returns_to_greeting() {
        let service = ScriptedService::replying(&["Soup."]);
        let mut chat = controller();
        chat.submit(&service, "carrots", Preferences::default()).await.unwrap();
        chat.take_focus_request();

        chat.reset();
        chat.reset();

        assert_eq!(chat.messages(), &[Message::assistant(GREETING)]);
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript()[0].raw, GREETING);
        assert!(!chat.can_download());
        assert!(chat.take_focus_request());
    }

    #[tokio::test]
    async fn download_writes_latest_raw_reply() {
        let dir = tempfile::tempdir().unwrap();
        let service = ScriptedService::replying(&["**Bread**", "Mix flour and water."]);
        let mut chat = controller_in(dir.path());

        assert_eq!(chat.download().unwrap(), None);
        assert!(!dir.path().join(DOWNLOAD_FILE_NAME).exists());

        chat.submit(&service, "flour", Preferences::default()).await.unwrap();
        chat.submit(&service, "water", Preferences::default()).await.unwrap();

        let path = chat.download().unwrap().unwrap();
        assert_eq!(path, dir.path().join(DOWNLOAD_FILE_NAME));
        assert_eq!(fs::read_to_string(path).unwrap(), "Mix flour and water.");
        assert_eq!(chat.messages().len(), 5);
    }

    #[tokio::test]
    async fn rendered_reply_keeps_raw_markdown() {
        let service = ScriptedService::replying(&["**Bold** move"]);
        let mut chat = controller();
        chat.submit(&service, "anything", Preferences::default()).await.unwrap();

        let entry = chat.transcript().last().unwrap();
        assert_eq!(entry.raw, "**Bold** move");
        assert_eq!(crate::render::lines_to_text(&entry.rendered), "Bold move");
    }

    #[test]
    fn settle_requests_focus() {
        let mut chat = controller();
        chat.take_focus_request();
        let pending = chat.begin_submit("eggs", Preferences::default()).unwrap();
        assert!(!chat.take_focus_request());
        chat.settle(pending.ticket, Err(ServiceError::Transport("down".into())));
        assert!(chat.take_focus_request());
    }
}
