use super::*;

#[test]
fn chat_with_messages_decodes() {
    let json = r#"{
        "id": "c1",
        "title": "Quarterly review",
        "created_at": "2025-04-20T10:15:00",
        "messages": [
            {"id": "m1", "message": "hello", "created_at": "2025-04-20T10:16:00", "path": null},
            {"id": "m2", "message": "see deck", "created_at": "2025-04-20T10:17:00", "path": "http://relay/uploads/ab?name=a.pptx"}
        ]
    }"#;
    let chat: Chat = serde_json::from_str(json).unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert!(chat.messages[0].path.is_none());
    assert_eq!(chat.messages[1].path.as_deref(), Some("http://relay/uploads/ab?name=a.pptx"));
}

#[test]
fn chat_summary_without_messages_decodes_empty() {
    let chat: Chat = serde_json::from_str(r#"{"id":"c1","title":"t","created_at":"x"}"#).unwrap();
    assert!(chat.messages.is_empty());
}

#[test]
fn chat_with_null_messages_decodes_empty() {
    let chat: Chat = serde_json::from_str(r#"{"id":"c1","title":"t","messages":null}"#).unwrap();
    assert!(chat.messages.is_empty());
    assert!(chat.created_at.is_empty());
}

#[test]
fn accepted_extensions_are_case_insensitive() {
    assert!(has_accepted_extension("deck.pptx"));
    assert!(has_accepted_extension("DECK.PPT"));
    assert!(!has_accepted_extension("deck.pdf"));
    assert!(!has_accepted_extension("pptx"));
}

#[test]
fn file_name_of_uses_last_component() {
    assert_eq!(file_name_of(Path::new("/tmp/decks/slides.pptx")), "slides.pptx");
}

#[tokio::test]
async fn read_missing_presentation_is_io_error() {
    let err = Presentation::read(Path::new("/definitely/not/here.pptx")).await.unwrap_err();
    assert!(matches!(err, ApiError::Io(_)));
}
