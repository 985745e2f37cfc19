//! JSON interchange for the session collection
//!
//! The stored document and export files share one shape: an array of sessions
//! with camelCase keys and ISO-8601 timestamps. Parsing is lenient about
//! missing timestamps and message lists (both default) and accepts epoch
//! milliseconds wherever a timestamp is expected.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::session::{ChatSession, DEFAULT_TITLE, Message, Role, next_id, now};
use crate::{Error, Result};

/// Serialize the collection as pretty-printed JSON
///
/// # Errors
///
/// Returns error if serialization fails
pub fn to_json(sessions: &[ChatSession]) -> Result<String> {
    Ok(serde_json::to_string_pretty(sessions)?)
}

/// Parse a session collection, re-hydrating every timestamp
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if the document is not a session array or
/// contains an unparseable timestamp
pub fn parse_sessions(contents: &str) -> Result<Vec<ChatSession>> {
    let raw: Vec<RawSession> =
        serde_json::from_str(contents).map_err(|e| Error::InvalidFormat(e.to_string()))?;
    raw.into_iter().map(RawSession::hydrate).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    messages: Vec<RawMessage>,
    created_at: Option<RawInstant>,
    updated_at: Option<RawInstant>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: Option<String>,
    #[serde(default)]
    content: String,
    role: Role,
    timestamp: Option<RawInstant>,
    #[serde(default)]
    is_voice: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Millis(i64),
    Text(String),
}

impl RawInstant {
    fn resolve(self) -> Result<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| Error::InvalidFormat(format!("timestamp out of range: {ms}"))),
            Self::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::InvalidFormat(format!("bad timestamp {text:?}: {e}"))),
        }
    }
}

fn resolve_or_now(instant: Option<RawInstant>) -> Result<DateTime<Utc>> {
    instant.map_or_else(|| Ok(now()), RawInstant::resolve)
}

impl RawSession {
    fn hydrate(self) -> Result<ChatSession> {
        let messages = self
            .messages
            .into_iter()
            .map(RawMessage::hydrate)
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatSession {
            id: self.id.unwrap_or_else(next_id),
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            messages,
            created_at: resolve_or_now(self.created_at)?,
            updated_at: resolve_or_now(self.updated_at)?,
        })
    }
}

impl RawMessage {
    fn hydrate(self) -> Result<Message> {
        Ok(Message {
            id: self.id.unwrap_or_else(next_id),
            content: self.content,
            role: self.role,
            timestamp: resolve_or_now(self.timestamp)?,
            is_voice: self.is_voice,
        })
    }
}
