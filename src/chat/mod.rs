//! Chat sessions
//!
//! [`ChatStore`] persists the session collection; [`ChatService`] tracks the
//! current session and runs text turns against the assistant.

mod interchange;
mod session;
mod storage;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

pub use interchange::{parse_sessions, to_json};
pub use session::{
    ChatSession, DEFAULT_TITLE, Message, Role, SessionUpdate, TITLE_MAX_CHARS, derive_title,
    next_id,
};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{ChatStore, STORAGE_KEY, WELCOME_MESSAGE};

use crate::assistant::{PromptBuilder, ResponseGenerator, RetryPolicy, generate_with_retry};
use crate::notify::{Notice, Notifier};
use crate::voice::VoiceHandle;
use crate::{Error, Result};

/// Conversation record shared with the voice session
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// Messages of the current conversation, oldest first
    async fn history(&self) -> Vec<Message>;

    /// Append a message to the current conversation
    async fn record(&self, message: Message);
}

/// Chat front end: current-session tracking and the text turn
pub struct ChatService {
    store: ChatStore,
    current_id: String,
    generator: Arc<dyn ResponseGenerator>,
    prompts: PromptBuilder,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    speaker: Option<VoiceHandle>,
    auto_speak: bool,
}

impl ChatService {
    /// Create a service over a loaded store; the first session becomes current
    #[must_use]
    pub fn new(
        store: ChatStore,
        generator: Arc<dyn ResponseGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let current_id = store
            .sessions()
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_default();
        let mut service = Self {
            store,
            current_id,
            generator,
            prompts: PromptBuilder::default(),
            notifier,
            retry: RetryPolicy::default(),
            speaker: None,
            auto_speak: false,
        };
        service.resync_current();
        service
    }

    /// Use a custom prompt builder (assistant name)
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Use a custom overload retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a voice session; replies are spoken when `auto_speak` is set
    pub fn attach_speaker(&mut self, speaker: VoiceHandle, auto_speak: bool) {
        self.speaker = Some(speaker);
        self.auto_speak = auto_speak;
    }

    /// Toggle speaking of text replies
    pub const fn set_auto_speak(&mut self, auto_speak: bool) {
        self.auto_speak = auto_speak;
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Id of the current session
    #[must_use]
    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    /// The current session
    #[must_use]
    pub fn current(&self) -> Option<&ChatSession> {
        self.store.get(&self.current_id)
    }

    /// Create a session and make it current
    pub fn new_chat(&mut self) -> ChatSession {
        let session = self.store.create_session();
        self.current_id.clone_from(&session.id);
        session
    }

    /// Make an existing session current
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has this id
    pub fn select(&mut self, session_id: &str) -> Result<()> {
        if self.store.get(session_id).is_none() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        self.current_id = session_id.to_string();
        Ok(())
    }

    /// Delete a session; deleting the current one selects the first remaining
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has this id
    pub fn delete(&mut self, session_id: &str) -> Result<()> {
        self.store.delete_session(session_id)?;
        self.resync_current();
        Ok(())
    }

    /// Drop every session and start over with a fresh one
    ///
    /// # Errors
    ///
    /// Returns error if the stored document cannot be removed
    pub fn clear_all(&mut self) -> Result<()> {
        let cleared = self.store.clear_all_sessions();
        self.resync_current();
        cleared
    }

    /// Serialize the collection in the interchange format
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn export_sessions(&self) -> Result<String> {
        self.store.export_sessions()
    }

    /// Write the collection to a dated export file inside `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        self.store.export_to_dir(dir)
    }

    /// Replace the collection from an export file
    ///
    /// Emits an import notice either way.
    ///
    /// # Errors
    ///
    /// Returns error if the file is unreadable or malformed; the collection
    /// is left untouched in that case
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        match self.store.import_file(path) {
            Ok(count) => {
                self.resync_current();
                self.notifier.notify(Notice::info(
                    "Import Successful",
                    "Chat sessions have been imported successfully.",
                ));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "chat import failed");
                self.notifier.notify(Notice::destructive(
                    "Import Failed",
                    "Failed to import chat sessions. Please check the file format.",
                ));
                Err(e)
            }
        }
    }

    /// Run one typed turn in the current session
    ///
    /// Blank input is ignored (`Ok(None)`). Otherwise the user message is
    /// appended, the reply is generated from prior typed turns only, and the
    /// reply (or a failure message) is appended and returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the current session vanished
    pub async fn send_text(&mut self, input: &str) -> Result<Option<Message>> {
        let content = input.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let session_id = self.current_id.clone();
        let history = self
            .store
            .get(&session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| Error::SessionNotFound(session_id.clone()))?;

        tracing::debug!(session_id = %session_id, history = history.len(), "sending text message");

        let prompt = self.prompts.text(&history, content);
        self.append(&session_id, Message::user(content, false))?;

        let (reply, succeeded) =
            match generate_with_retry(self.generator.as_ref(), &prompt, self.retry).await {
                Ok(text) => (Message::assistant(text, false), true),
                Err(e) => {
                    tracing::error!(error = %e, session_id = %session_id, "text reply failed");
                    self.notifier.notify(Notice::destructive(
                        "Connection Error",
                        "Failed to connect to AI service. Please check your API key and try again.",
                    ));
                    let content = format!(
                        "I apologize, but I'm experiencing technical difficulties. Error: {e}"
                    );
                    (Message::assistant(content, false), false)
                }
            };

        self.store.add_message(&session_id, reply.clone())?;

        let speaker = self.speaker.as_ref().filter(|_| succeeded && self.auto_speak);
        if let Some(speaker) = speaker {
            if let Err(e) = speaker.speak(reply.content.clone()).await {
                tracing::warn!(error = %e, "failed to speak reply");
            }
        }

        Ok(Some(reply))
    }

    /// Append a message to the current session
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the current session vanished
    pub fn record(&mut self, message: Message) -> Result<()> {
        let session_id = self.current_id.clone();
        self.append(&session_id, message)
    }

    /// Append, titling the session after its first user message
    fn append(&mut self, session_id: &str, message: Message) -> Result<()> {
        let first_user = message.role == Role::User
            && self
                .store
                .get(session_id)
                .is_some_and(|s| s.user_message_count() == 0);
        let title = first_user.then(|| derive_title(&message.content));

        self.store.add_message(session_id, message)?;
        if let Some(title) = title {
            self.store
                .update_session(session_id, SessionUpdate::title(title))?;
        }
        Ok(())
    }

    fn resync_current(&mut self) {
        if self.store.get(&self.current_id).is_some() {
            return;
        }
        if let Some(first) = self.store.sessions().first() {
            self.current_id.clone_from(&first.id);
        }
    }
}

#[async_trait]
impl ConversationLog for tokio::sync::Mutex<ChatService> {
    async fn history(&self) -> Vec<Message> {
        self.lock()
            .await
            .current()
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    async fn record(&self, message: Message) {
        if let Err(e) = self.lock().await.record(message) {
            tracing::error!(error = %e, "failed to record voice turn");
        }
    }
}

/// Conversation log kept only in memory
#[derive(Debug, Default)]
pub struct InMemoryLog {
    messages: std::sync::Mutex<Vec<Message>>,
}

impl InMemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded messages
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(e) => {
                tracing::error!(error = %e, "in-memory conversation log unreadable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ConversationLog for InMemoryLog {
    async fn history(&self) -> Vec<Message> {
        self.messages()
    }

    async fn record(&self, message: Message) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(e) => tracing::error!(error = %e, "failed to record voice turn"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poisoned() -> Arc<InMemoryLog> {
        let log = Arc::new(InMemoryLog::new());
        let held = Arc::clone(&log);
        let _ = std::thread::spawn(move || {
            let _guard = held.messages.lock().unwrap();
            panic!("poison the log");
        })
        .join();
        assert!(log.messages.is_poisoned());
        log
    }

    #[tokio::test]
    async fn in_memory_log_keeps_order() {
        let log = InMemoryLog::new();
        log.record(Message::user("hi", true)).await;
        log.record(Message::assistant("hello", true)).await;

        let history = log.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "hello");
    }

    #[tokio::test]
    async fn poisoned_log_reads_empty_and_drops_writes() {
        let log = poisoned();
        log.record(Message::user("lost", true)).await;
        assert!(log.messages().is_empty());
        assert!(log.history().await.is_empty());
    }
}
