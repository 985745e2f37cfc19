//! Chat session store
//!
//! Holds the ordered session collection in memory and rewrites the whole
//! collection as one JSON document under [`STORAGE_KEY`] after every mutation.
//! At least one session exists once loading finishes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::interchange;
use super::session::{ChatSession, Message, SessionUpdate, next_id};
use super::storage::{KeyValueStorage, atomic_write};
use crate::{Error, Result};

/// Storage key of the session collection
pub const STORAGE_KEY: &str = "kyra-chat-sessions";

/// Welcome message seeded into every new session
pub const WELCOME_MESSAGE: &str = "Hello! I'm Kyra, your AI assistant. How can I help you today? You can type or use voice commands!";

/// Persistent, ordered collection of chat sessions (newest first)
pub struct ChatStore {
    storage: Arc<dyn KeyValueStorage>,
    sessions: Vec<ChatSession>,
    welcome: String,
}

impl ChatStore {
    /// Load the collection from storage with the default welcome message
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::load_with_welcome(storage, WELCOME_MESSAGE)
    }

    /// Load the collection from storage
    ///
    /// A missing or unreadable document yields an empty collection (logged),
    /// after which a fresh session is created so the collection is never empty.
    #[must_use]
    pub fn load_with_welcome(storage: Arc<dyn KeyValueStorage>, welcome: &str) -> Self {
        let sessions = match storage.get(STORAGE_KEY) {
            Ok(Some(doc)) => match interchange::parse_sessions(&doc) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::error!(error = %e, "failed to parse stored chat sessions");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "failed to load chat sessions");
                Vec::new()
            }
        };

        tracing::debug!(count = sessions.len(), "loaded chat sessions");

        let mut store = Self {
            storage,
            sessions,
            welcome: welcome.to_string(),
        };
        store.ensure_session();
        store
    }

    /// All sessions, newest first
    #[must_use]
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Look up a session by id
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// Number of sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the collection is empty (only between a clear and the re-seed)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Create a session seeded with the welcome message and prepend it
    pub fn create_session(&mut self) -> ChatSession {
        let mut id = next_id();
        while self.get(&id).is_some() {
            id = next_id();
        }

        let session = ChatSession::new(id, &self.welcome);
        tracing::info!(session_id = %session.id, "created chat session");
        self.sessions.insert(0, session.clone());
        self.save();
        session
    }

    /// Append a message to a session and refresh its `updated_at`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has this id
    pub fn add_message(&mut self, session_id: &str, message: Message) -> Result<()> {
        let session = self.get_mut(session_id)?;
        session.messages.push(message);
        session.touch();
        self.save();
        Ok(())
    }

    /// Merge fields into a session and refresh its `updated_at`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has this id
    pub fn update_session(&mut self, session_id: &str, update: SessionUpdate) -> Result<()> {
        let session = self.get_mut(session_id)?;
        if let Some(title) = update.title {
            session.title = title;
        }
        session.touch();
        self.save();
        Ok(())
    }

    /// Remove a session by id
    ///
    /// Deleting the last session re-seeds a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if no session has this id
    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != session_id);
        if self.sessions.len() == before {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }

        tracing::info!(session_id, "deleted chat session");
        self.save();
        self.ensure_session();
        Ok(())
    }

    /// Remove the stored document, then drop every session and re-seed
    ///
    /// The in-memory collection is left untouched when the removal fails.
    ///
    /// # Errors
    ///
    /// Returns error if the stored document cannot be removed
    pub fn clear_all_sessions(&mut self) -> Result<()> {
        self.storage.remove(STORAGE_KEY)?;
        self.sessions.clear();
        tracing::info!("cleared all chat sessions");
        self.ensure_session();
        Ok(())
    }

    /// Serialize the full collection in the interchange format
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn export_sessions(&self) -> Result<String> {
        interchange::to_json(&self.sessions)
    }

    /// Write the collection to `kyra-chat-sessions-<date>.json` inside `dir`
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let name = format!(
            "{STORAGE_KEY}-{}.json",
            chrono::Utc::now().format("%Y-%m-%d")
        );
        let path = dir.join(name);
        atomic_write(&path, self.export_sessions()?.as_bytes())?;
        tracing::info!(path = %path.display(), count = self.sessions.len(), "exported chat sessions");
        Ok(path)
    }

    /// Replace the collection with the sessions parsed from `contents`
    ///
    /// Returns the number of imported sessions. On a parse failure the
    /// existing collection is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if `contents` is not a session collection
    pub fn import_sessions(&mut self, contents: &str) -> Result<usize> {
        let imported = interchange::parse_sessions(contents)?;
        let count = imported.len();
        self.sessions = imported;
        tracing::info!(count, "imported chat sessions");
        self.save();
        self.ensure_session();
        Ok(count)
    }

    /// Import a previously exported file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read, or
    /// [`Error::InvalidFormat`] if it is not a session collection
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read file {}: {e}", path.display())))?;
        self.import_sessions(&contents)
    }

    fn get_mut(&mut self, session_id: &str) -> Result<&mut ChatSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    fn ensure_session(&mut self) {
        if self.sessions.is_empty() {
            self.create_session();
        }
    }

    /// Rewrite the stored document; failures are logged, memory stays authoritative
    fn save(&self) {
        let result = interchange::to_json(&self.sessions)
            .and_then(|doc| self.storage.set(STORAGE_KEY, &doc));
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to save chat sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::storage::MemoryStorage;
    use crate::chat::session::Role;

    fn store() -> (Arc<MemoryStorage>, ChatStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ChatStore::load(storage.clone());
        (storage, store)
    }

    /// Storage that reads and writes but refuses to delete
    #[derive(Default)]
    struct UndeletableStorage(MemoryStorage);

    impl KeyValueStorage for UndeletableStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            Err(Error::Storage(format!("cannot remove {key}")))
        }
    }

    #[test]
    fn failed_clear_keeps_a_session() {
        let storage = Arc::new(UndeletableStorage::default());
        let mut store = ChatStore::load(storage.clone());
        let id = store.sessions()[0].id.clone();

        assert!(store.clear_all_sessions().is_err());
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_some());
        assert!(storage.get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn load_seeds_one_session() {
        let (storage, store) = store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.sessions()[0].messages.len(), 1);
        assert!(storage.get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_document_yields_fresh_session() {
        let storage = Arc::new(MemoryStorage::with_entry(STORAGE_KEY, "not json"));
        let store = ChatStore::load(storage);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_prepends_with_unique_id() {
        let (_, mut store) = store();
        let first = store.sessions()[0].id.clone();
        let created = store.create_session();
        assert_eq!(store.sessions()[0].id, created.id);
        assert_ne!(created.id, first);
        assert_eq!(created.messages.len(), 1);
        assert_eq!(created.messages[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn add_message_appends_and_touches() {
        let (_, mut store) = store();
        let id = store.sessions()[0].id.clone();
        let before = store.get(&id).unwrap().clone();

        let msg = Message::user("hello", false);
        store.add_message(&id, msg.clone()).unwrap();

        let after = store.get(&id).unwrap();
        assert_eq!(&after.messages[..1], &before.messages[..]);
        assert_eq!(after.messages.last(), Some(&msg));
        assert!(after.updated_at >= before.updated_at);
    }

    #[test]
    fn add_message_to_unknown_session_fails() {
        let (_, mut store) = store();
        let err = store.add_message("missing", Message::user("x", false)).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[test]
    fn update_session_sets_title() {
        let (_, mut store) = store();
        let id = store.sessions()[0].id.clone();
        store.update_session(&id, SessionUpdate::title("Plans")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Plans");
    }

    #[test]
    fn deleting_only_session_reseeds() {
        let (_, mut store) = store();
        let id = store.sessions()[0].id.clone();
        store.delete_session(&id).unwrap();
        assert_eq!(store.len(), 1);
        assert_ne!(store.sessions()[0].id, id);
        assert_eq!(store.sessions()[0].messages[0].role, Role::Assistant);
    }

    #[test]
    fn mutations_are_persisted() {
        let (storage, mut store) = store();
        let id = store.sessions()[0].id.clone();
        store.add_message(&id, Message::user("persist me", false)).unwrap();

        let reloaded = ChatStore::load(storage);
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[test]
    fn clear_removes_document_then_reseeds() {
        let (storage, mut store) = store();
        store.create_session();
        let old: Vec<String> = store.sessions().iter().map(|s| s.id.clone()).collect();

        store.clear_all_sessions().unwrap();
        assert_eq!(store.len(), 1);
        assert!(!old.contains(&store.sessions()[0].id));

        let doc = storage.get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(interchange::parse_sessions(&doc).unwrap().len(), 1);
    }

    #[test]
    fn failed_import_leaves_collection_untouched() {
        let (_, mut store) = store();
        let before = store.sessions().to_vec();
        let err = store.import_sessions("{broken").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert_eq!(store.sessions(), &before[..]);
    }

    #[test]
    fn import_replaces_wholesale() {
        let (_, mut store) = store();
        let doc = r#"[{"id": "x", "title": "Imported", "messages": [], "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}]"#;
        assert_eq!(store.import_sessions(doc).unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.sessions()[0].title, "Imported");
    }

    #[test]
    fn export_to_dir_writes_dated_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, store) = store();
        let path = store.export_to_dir(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("kyra-chat-sessions-"));
        assert!(name.ends_with(".json"));
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(interchange::parse_sessions(&contents).unwrap(), store.sessions());
    }
}
