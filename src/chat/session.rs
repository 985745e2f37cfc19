//! Chat sessions and messages

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to a session before its first user message
pub const DEFAULT_TITLE: &str = "New Chat";

/// Maximum title length (in characters) derived from the first user message
pub const TITLE_MAX_CHARS: usize = 50;

/// Last issued timestamp-derived id
static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Issue a timestamp-derived id (epoch milliseconds as a decimal string)
///
/// Ids are strictly increasing within the process: two ids requested in the
/// same millisecond are bumped apart instead of colliding.
#[must_use]
pub fn next_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(observed) => last = observed,
        }
    }
}

/// Current time truncated to millisecond precision
///
/// Stored timestamps use the same precision as the JSON interchange format.
#[must_use]
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    /// Whether the message was spoken rather than typed
    #[serde(default)]
    pub is_voice: bool,
}

impl Message {
    /// Create a message stamped with a fresh id and the current time
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, is_voice: bool) -> Self {
        Self {
            id: next_id(),
            content: content.into(),
            role,
            timestamp: now(),
            is_voice,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>, is_voice: bool) -> Self {
        Self::new(Role::User, content, is_voice)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>, is_voice: bool) -> Self {
        Self::new(Role::Assistant, content, is_voice)
    }
}

/// A titled conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create a session seeded with a single assistant welcome message
    #[must_use]
    pub fn new(id: String, welcome: &str) -> Self {
        let created = now();
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: vec![Message::assistant(welcome, false)],
            created_at: created,
            updated_at: created,
        }
    }

    /// Number of messages authored by the user
    #[must_use]
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Most recent message, if any
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Refresh the modification time
    pub(crate) fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Partial update applied by [`ChatStore::update_session`](super::ChatStore::update_session)
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
}

impl SessionUpdate {
    /// Update that only replaces the title
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

/// Derive a session title from the first user message
///
/// Truncates to [`TITLE_MAX_CHARS`] characters and appends `...` when cut.
#[must_use]
pub fn derive_title(first_user_message: &str) -> String {
    let mut chars = first_user_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
