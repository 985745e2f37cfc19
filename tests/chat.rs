//! Chat service tests
//!
//! Text turns, session management and import/export through [`ChatService`].

mod common;

use std::sync::Arc;

use kyra_assistant::assistant::RetryPolicy;
use kyra_assistant::chat::{
    ConversationLog, DEFAULT_TITLE, KeyValueStorage, MemoryStorage, STORAGE_KEY, TITLE_MAX_CHARS, WELCOME_MESSAGE,
};
use kyra_assistant::voice::{OrbTimings, Permission, VoicePorts};
use kyra_assistant::{
    ChatService, ChatStore, Error, Message, Orb, PromptBuilder, Role, VoiceSession, VoiceSettings,
};
use tokio::sync::Mutex;

use common::{
    FixedPermission, RecordingNotifier, RecordingOutput, ScriptedGenerator, ScriptedInput,
    eventually,
};

/// Service over in-memory storage with immediate retries
fn service(
    generator: Arc<ScriptedGenerator>,
) -> (ChatService, Arc<MemoryStorage>, Arc<RecordingNotifier>) {
    let storage = Arc::new(MemoryStorage::new());
    let notifier = RecordingNotifier::new();
    let store = ChatStore::load(storage.clone());
    let service = ChatService::new(store, generator, notifier.clone())
        .with_retry(RetryPolicy::immediate());
    (service, storage, notifier)
}

#[tokio::test]
async fn test_first_message_titles_session() {
    let (mut chat, _, _) = service(ScriptedGenerator::replying("4"));
    assert_eq!(chat.current().expect("session").title, DEFAULT_TITLE);

    let reply = chat.send_text("What's 2+2").await.expect("send").expect("reply");
    assert_eq!(reply.content, "4");
    assert_eq!(reply.role, Role::Assistant);
    assert!(!reply.is_voice);

    let session = chat.current().expect("session");
    assert_eq!(session.title, "What's 2+2");
    let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, [WELCOME_MESSAGE, "What's 2+2", "4"]);

    // Later messages keep the first title
    chat.send_text("and 3+3?").await.expect("send");
    assert_eq!(chat.current().expect("session").title, "What's 2+2");
}

#[tokio::test]
async fn test_long_first_message_title_is_truncated() {
    let (mut chat, _, _) = service(ScriptedGenerator::new([]));
    let long = "Tell me everything about the history of the Roman empire please";

    chat.send_text(long).await.expect("send");

    let title = &chat.current().expect("session").title;
    assert!(title.ends_with("..."));
    assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
}

#[tokio::test]
async fn test_text_prompt_excludes_voice_turns() {
    let generator = ScriptedGenerator::new([]);
    let (mut chat, _, _) = service(generator.clone());

    chat.record(Message::user("spoken question", true)).expect("record");
    chat.record(Message::assistant("spoken answer", true)).expect("record");
    chat.send_text("What's 2+2").await.expect("send");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("model: Hello! I'm Kyra"));
    assert!(prompts[0].contains("User: What's 2+2"));
    assert!(!prompts[0].contains("spoken question"));
    assert!(!prompts[0].contains("spoken answer"));
}

#[tokio::test]
async fn test_voice_prompt_excludes_text_turns() {
    let generator = ScriptedGenerator::new([]);
    let (chat, _, _) = service(generator);
    let chat = Mutex::new(chat);

    chat.lock().await.send_text("typed question").await.expect("send");
    chat.record(Message::user("spoken question", true)).await;

    let history = chat.history().await;
    let prompt = PromptBuilder::default().voice(&history, "next");
    assert!(prompt.contains("user: spoken question"));
    assert!(!prompt.contains("typed question"));
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let generator = ScriptedGenerator::new([]);
    let (mut chat, _, _) = service(generator.clone());

    assert!(chat.send_text("   \n").await.expect("send").is_none());
    assert!(generator.prompts().is_empty());
    assert_eq!(chat.current().expect("session").messages.len(), 1);
}

#[tokio::test]
async fn test_failed_reply_is_recorded_with_notice() {
    let generator = ScriptedGenerator::new([Err(Error::Ai("connection refused".to_string()))]);
    let (mut chat, _, notifier) = service(generator);

    let reply = chat.send_text("hello").await.expect("send").expect("reply");

    assert!(reply.content.starts_with("I apologize, but I'm experiencing technical difficulties."));
    assert!(reply.content.contains("connection refused"));
    assert_eq!(notifier.titles(), ["Connection Error"]);
    assert_eq!(chat.current().expect("session").messages.len(), 3);
}

#[tokio::test]
async fn test_overload_is_retried_once() {
    let generator = ScriptedGenerator::new([
        Err(ScriptedGenerator::overloaded()),
        Ok("Recovered.".to_string()),
    ]);
    let (mut chat, _, notifier) = service(generator.clone());

    let reply = chat.send_text("hello").await.expect("send").expect("reply");

    assert_eq!(reply.content, "Recovered.");
    assert_eq!(generator.prompts().len(), 2);
    assert!(notifier.titles().is_empty());
}

#[tokio::test]
async fn test_second_overload_fails_the_turn() {
    let generator = ScriptedGenerator::new([
        Err(ScriptedGenerator::overloaded()),
        Err(ScriptedGenerator::overloaded()),
    ]);
    let (mut chat, _, notifier) = service(generator.clone());

    let reply = chat.send_text("hello").await.expect("send").expect("reply");

    assert!(reply.content.starts_with("I apologize"));
    assert_eq!(generator.prompts().len(), 2);
    assert_eq!(notifier.titles(), ["Connection Error"]);
}

#[tokio::test]
async fn test_new_chat_becomes_current() {
    let (mut chat, _, _) = service(ScriptedGenerator::new([]));
    let first = chat.current_id().to_string();

    let created = chat.new_chat();

    assert_eq!(chat.current_id(), created.id);
    assert_eq!(chat.store().sessions()[0].id, created.id);
    assert_eq!(chat.store().len(), 2);

    chat.select(&first).expect("select");
    assert_eq!(chat.current_id(), first);
    assert!(matches!(chat.select("missing"), Err(Error::SessionNotFound(_))));
}

#[tokio::test]
async fn test_deleting_current_selects_first_remaining() {
    let (mut chat, _, _) = service(ScriptedGenerator::new([]));
    let oldest = chat.current_id().to_string();
    let middle = chat.new_chat().id;
    let newest = chat.new_chat().id;

    chat.select(&middle).expect("select");
    chat.delete(&middle).expect("delete");

    assert_eq!(chat.current_id(), newest);
    assert!(chat.store().get(&middle).is_none());
    assert!(chat.store().get(&oldest).is_some());

    // Deleting a non-current session keeps the selection
    chat.delete(&oldest).expect("delete");
    assert_eq!(chat.current_id(), newest);
}

#[tokio::test]
async fn test_deleting_last_session_reseeds() {
    let (mut chat, _, _) = service(ScriptedGenerator::new([]));
    let only = chat.current_id().to_string();

    chat.delete(&only).expect("delete");

    assert_eq!(chat.store().len(), 1);
    assert_ne!(chat.current_id(), only);
    let session = chat.current().expect("session");
    assert_eq!(session.messages[0].content, WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_clear_all_starts_over() {
    let (mut chat, storage, _) = service(ScriptedGenerator::new([]));
    chat.send_text("remember this").await.expect("send");
    chat.new_chat();

    chat.clear_all().expect("clear");

    assert_eq!(chat.store().len(), 1);
    assert_eq!(chat.current().expect("session").messages.len(), 1);

    let reloaded = ChatStore::load(storage);
    assert_eq!(reloaded.sessions(), chat.store().sessions());
}

/// Storage whose delete always fails
#[derive(Default)]
struct UndeletableStorage(MemoryStorage);

impl KeyValueStorage for UndeletableStorage {
    fn get(&self, key: &str) -> kyra_assistant::Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> kyra_assistant::Result<()> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> kyra_assistant::Result<()> {
        Err(Error::Storage(format!("cannot remove {key}")))
    }
}

#[tokio::test]
async fn test_failed_clear_all_keeps_current_session() {
    let store = ChatStore::load(Arc::new(UndeletableStorage::default()));
    let mut chat = ChatService::new(
        store,
        ScriptedGenerator::replying("still here"),
        RecordingNotifier::new(),
    )
    .with_retry(RetryPolicy::immediate());

    let err = chat.clear_all().expect_err("remove fails");
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(chat.store().len(), 1);

    chat.send_text("are you there?").await.expect("send after failed clear");
    let session = chat.current().expect("session");
    assert_eq!(session.messages.last().expect("reply").content, "still here");
}

#[tokio::test]
async fn test_sessions_survive_reload() {
    let (mut chat, storage, _) = service(ScriptedGenerator::replying("noted"));
    chat.send_text("remember this").await.expect("send");

    let doc = kyra_assistant::chat::KeyValueStorage::get(storage.as_ref(), STORAGE_KEY)
        .expect("read")
        .expect("document");
    assert!(doc.contains("\"isVoice\""));

    let reloaded = ChatStore::load(storage);
    assert_eq!(reloaded.sessions(), chat.store().sessions());
}

#[tokio::test]
async fn test_export_then_import() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let (mut source, _, _) = service(ScriptedGenerator::replying("exported"));
    source.send_text("keep me").await.expect("send");
    source.new_chat();
    let path = source.export_to_dir(dir.path()).expect("export");

    let (mut target, _, notifier) = service(ScriptedGenerator::new([]));
    let count = tokio_test::assert_ok!(target.import_file(&path));

    assert_eq!(count, 2);
    assert_eq!(target.store().sessions(), source.store().sessions());
    assert!(target.store().get(target.current_id()).is_some());
    assert_eq!(notifier.titles(), ["Import Successful"]);
}

#[tokio::test]
async fn test_failed_import_keeps_sessions() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not sessions").expect("write");

    let (mut chat, _, notifier) = service(ScriptedGenerator::new([]));
    let before = chat.store().sessions().to_vec();

    let err = tokio_test::assert_err!(chat.import_file(&path));
    assert!(matches!(err, Error::InvalidFormat(_)));
    assert_eq!(chat.store().sessions(), &before[..]);
    assert_eq!(notifier.titles(), ["Import Failed"]);
}

#[tokio::test]
async fn test_auto_speak_routes_reply_to_voice() {
    let output = RecordingOutput::new();
    let ports = VoicePorts {
        input: ScriptedInput::hearing(&[]),
        output: output.clone(),
        permission: Arc::new(FixedPermission(true)),
        notifier: RecordingNotifier::new(),
        generator: ScriptedGenerator::new([]),
        log: Arc::new(kyra_assistant::chat::InMemoryLog::new()),
    };
    let orb = Orb::new(VoiceSettings::default(), OrbTimings::immediate())
        .with_permission(Permission::Granted);
    let (speaker, _task) = VoiceSession::spawn(orb, ports, PromptBuilder::default());

    let generator = ScriptedGenerator::new([
        Ok("Spoken aloud.".to_string()),
        Err(Error::Ai("down".to_string())),
        Ok("Quiet.".to_string()),
    ]);
    let (mut chat, _, _) = service(generator);
    chat.attach_speaker(speaker, true);

    chat.send_text("talk to me").await.expect("send");
    eventually("reply spoken", || output.spoken() == ["Spoken aloud."]).await;

    // Failures are never spoken
    chat.send_text("again").await.expect("send");

    chat.set_auto_speak(false);
    chat.send_text("quietly").await.expect("send");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(output.spoken(), ["Spoken aloud."]);
}
