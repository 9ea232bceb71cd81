use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use super::*;
use crate::net::api::test_helpers::{MockChatApi, chat, message};
use crate::net::relay::test_helpers::MockFetch;
use crate::state::document::test_helpers::{ViewerLog, fake_host};
use crate::state::thread::Delivery;

const FIRST: &str = "http://relay.test/uploads/aaaa?name=intro.pptx";
const SECOND: &str = "http://relay.test/uploads/bbbb?name=results.pptx";

struct Fixture {
    session: ChatSession,
    api: Arc<MockChatApi>,
    fetch: Arc<MockFetch>,
    log: Arc<Mutex<ViewerLog>>,
}

fn fixture(chats: Vec<Chat>) -> Fixture {
    let api = Arc::new(MockChatApi::with_chats(chats));
    let fetch = Arc::new(MockFetch::default());
    fetch.insert(FIRST, b"first deck");
    fetch.insert(SECOND, b"second deck");
    let (host, log) = fake_host();
    let document = DocumentOrchestrator::new(Box::new(host), fetch.clone());
    let session = ChatSession::new(api.clone(), document);
    Fixture { session, api, fetch, log }
}

fn review_chat() -> Chat {
    chat(
        "A",
        "Review",
        vec![
            message("m1", "first upload", Some(FIRST)),
            message("m2", "second upload", Some(SECOND)),
            message("m3", "looks good", None),
        ],
    )
}

fn temp_file(name: &str, bytes: &[u8]) -> (PathBuf, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (path, dir)
}

#[tokio::test]
async fn select_chat_shows_newest_attachment() {
    let mut f = fixture(vec![review_chat()]);

    let (outcome, status) = f.session.select_chat(Some("A")).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Loaded { count: 3 });
    let DocumentStatus::Loaded(doc) = status else { panic!("expected a loaded document") };
    assert_eq!(doc.name, "bbbb");
    assert_eq!(doc.source, DocumentSource::Url(SECOND.into()));
    assert_eq!(f.session.chats().current.as_deref(), Some("A"));
    assert!(f.session.document().is_mounted());
}

#[tokio::test]
async fn reselecting_same_chat_does_not_refetch() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();

    let (_, status) = f.session.select_chat(Some("A")).await.unwrap();
    assert_eq!(status, DocumentStatus::Unchanged);
    assert_eq!(f.fetch.requests().len(), 1);
}

#[tokio::test]
async fn selecting_no_chat_clears_thread_and_keeps_viewer() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();

    let (outcome, status) = f.session.select_chat(None).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Cleared);
    assert_eq!(status, DocumentStatus::Unchanged);
    assert!(f.session.thread().messages().is_empty());
    assert!(f.session.document().current().is_some());
}

#[tokio::test]
async fn failed_fetch_is_reported_not_raised() {
    let mut f = fixture(vec![chat("B", "Broken", vec![message("x1", "gone", Some("http://relay.test/uploads/missing"))])]);

    let (outcome, status) = f.session.select_chat(Some("B")).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Loaded { count: 1 });
    assert!(matches!(status, DocumentStatus::Failed(_)));
}

#[tokio::test]
async fn select_reference_rerenders_its_attachment() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();

    let DocumentStatus::Loaded(doc) = f.session.select_reference("m1").await.unwrap() else {
        panic!("expected a loaded document")
    };
    assert_eq!(doc.name, "aaaa");
    assert_eq!(f.session.thread().reference().as_deref(), Some("m1"));

    // Same attachment again still reloads.
    assert!(matches!(f.session.select_reference("m1").await.unwrap(), DocumentStatus::Loaded(_)));
    assert_eq!(f.fetch.requests(), vec![SECOND.to_owned(), FIRST.to_owned(), FIRST.to_owned()]);
}

#[tokio::test]
async fn reference_without_attachment_leaves_viewer() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();

    assert_eq!(f.session.select_reference("m3").await.unwrap(), DocumentStatus::Unchanged);
    assert!(matches!(
        f.session.select_reference("nope").await,
        Err(SessionError::Thread(ThreadError::UnknownMessage(_)))
    ));
}

#[tokio::test]
async fn send_keeps_displayed_attachment() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();

    let (outcome, status) = f.session.send("what about slide 3?").await.unwrap();
    assert!(matches!(outcome, SendOutcome::Confirmed { count: 4, applied: true, .. }));
    assert_eq!(status, DocumentStatus::Unchanged);
    assert_eq!(f.api.message_count("A"), 4);
    assert_eq!(f.fetch.requests().len(), 1);
}

#[tokio::test]
async fn plain_reply_keeps_referenced_deck_on_screen() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();
    f.session.select_reference("m1").await.unwrap();

    let (outcome, status) = f.session.send("what about slide 3 of the intro?").await.unwrap();
    assert!(matches!(outcome, SendOutcome::Confirmed { applied: true, .. }));
    assert_eq!(status, DocumentStatus::Unchanged);
    assert_eq!(f.session.document().current().map(|d| d.source.clone()), Some(DocumentSource::Url(FIRST.into())));
    assert_eq!(f.fetch.requests(), vec![SECOND.to_owned(), FIRST.to_owned()]);
}

#[tokio::test]
async fn create_chat_selects_opens_and_shows_upload() {
    let mut f = fixture(vec![]);
    f.fetch.insert("http://relay.test/uploads/chat-1?name=slides.pptx", b"uploaded deck");

    let deck = Presentation::new("slides.pptx", b"local deck".to_vec());
    let (created, status) = f.session.create_chat("Pitch", Some(deck)).await.unwrap();

    assert_eq!(created.id, "chat-1");
    assert_eq!(f.session.chats().current.as_deref(), Some("chat-1"));
    assert_eq!(f.session.thread().chat_id().as_deref(), Some("chat-1"));
    let DocumentStatus::Loaded(doc) = status else { panic!("expected a loaded document") };
    assert_eq!(doc.size, b"uploaded deck".len());
}

#[tokio::test]
async fn create_chat_falls_back_to_local_bytes() {
    let mut f = fixture(vec![]);

    let deck = Presentation::new("slides.pptx", b"local deck".to_vec());
    let (_, status) = f.session.create_chat("Pitch", Some(deck)).await.unwrap();

    let DocumentStatus::Loaded(doc) = status else { panic!("expected a loaded document") };
    assert_eq!(doc.name, "slides.pptx");
    assert_eq!(doc.source, DocumentSource::Bytes);
}

#[tokio::test]
async fn create_chat_succeeds_when_history_load_fails() {
    let mut f = fixture(vec![]);
    f.api.fail_get.store(true, Ordering::SeqCst);

    let deck = Presentation::new("slides.pptx", b"local deck".to_vec());
    let (created, status) = f.session.create_chat("Quarterly", Some(deck)).await.unwrap();

    assert_eq!(created.id, "chat-1");
    assert_eq!(f.api.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.session.chats().items.len(), 1);
    assert_eq!(f.session.chats().current.as_deref(), Some("chat-1"));
    let DocumentStatus::Loaded(doc) = status else { panic!("expected the local deck") };
    assert_eq!(doc.source, DocumentSource::Bytes);
}

#[tokio::test]
async fn create_chat_validation_skips_network() {
    let mut f = fixture(vec![]);

    let err = f.session.create_chat("Pitch", None).await.unwrap_err();
    assert!(matches!(err, SessionError::ChatList(ChatListError::Validation(_))));
    assert!(f.session.thread().chat_id().is_none());
}

#[tokio::test]
async fn attach_file_confirms_entry_on_success() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();
    let (path, _dir) = temp_file("appendix.pptx", b"appendix");

    let doc = f.session.attach_file(&path).await.unwrap();
    assert_eq!(doc.name, "appendix.pptx");

    let messages = f.session.thread().messages();
    let last = messages.last().unwrap();
    assert_eq!(last.text, "Uploaded file: appendix.pptx");
    assert_eq!(last.delivery, Delivery::Confirmed);
    assert!(!f.session.thread().is_busy());
}

#[tokio::test]
async fn attach_file_rolls_back_when_viewer_rejects() {
    let mut f = fixture(vec![review_chat()]);
    f.session.select_chat(Some("A")).await.unwrap();
    let (path, _dir) = temp_file("empty.pptx", b"");

    let err = f.session.attach_file(&path).await.unwrap_err();
    assert!(matches!(err, SessionError::Document(DocumentError::Viewer(_))));
    assert_eq!(f.session.thread().messages().len(), 3);
    assert!(!f.session.thread().is_busy());
}

#[tokio::test]
async fn attach_file_validates_before_touching_thread() {
    let mut f = fixture(vec![review_chat()]);

    let no_chat = f.session.attach_file(Path::new("/tmp/deck.pptx")).await;
    assert!(matches!(no_chat, Err(SessionError::Validation(_))));

    f.session.select_chat(Some("A")).await.unwrap();
    let pdf = f.session.attach_file(Path::new("/tmp/notes.pdf")).await;
    assert!(matches!(pdf, Err(SessionError::Validation(_))));
    assert_eq!(f.session.thread().messages().len(), 3);
    assert_eq!(f.log.lock().unwrap().created, 1);
}
