use edu_assistant::models::conversation::{Conversation, ConversationUpdate, DEFAULT_TITLE};
use edu_assistant::models::message::{Message, MessageRole};
use edu_assistant::models::profile::{Profile, UserRole};
use edu_assistant::AppError;

#[test]
fn new_conversation_has_default_title_and_no_token() {
    let conversation = Conversation::new("user-1".into());
    assert_eq!(conversation.title, DEFAULT_TITLE);
    assert_eq!(conversation.title, "New Chat");
    assert!(conversation.resume_token.is_none());
    assert_eq!(conversation.created_at, conversation.updated_at);
    assert!(conversation.is_owned_by("user-1"));
    assert!(!conversation.is_owned_by("user-2"));
}

#[test]
fn conversation_update_carries_token() {
    let update = ConversationUpdate::now("sess-9".into());
    assert_eq!(update.resume_token, "sess-9");
}

#[test]
fn message_serializes_without_conversation_id() {
    let message = Message::new("conv".into(), MessageRole::Assistant, "4".into());
    let json = serde_json::to_value(&message).expect("serialize");
    assert_eq!(json["role"], "assistant");
    assert_eq!(json["content"], "4");
    assert!(json.get("conversation_id").is_none());
}

#[test]
fn role_parsing_accepts_only_known_roles() {
    assert_eq!(UserRole::parse("teacher").ok(), Some(UserRole::Teacher));
    assert_eq!(UserRole::parse("student").ok(), Some(UserRole::Student));
    assert!(matches!(
        UserRole::parse("admin"),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn teacher_profile_discards_standard() {
    let profile = Profile::new("u".into(), UserRole::Teacher, Some(5)).expect("valid");
    assert_eq!(profile.standard, None);
}

#[test]
fn student_profile_requires_standard_in_range() {
    assert!(Profile::new("u".into(), UserRole::Student, Some(1)).is_ok());
    assert!(Profile::new("u".into(), UserRole::Student, Some(12)).is_ok());

    for standard in [None, Some(0), Some(13)] {
        let err = Profile::new("u".into(), UserRole::Student, standard).expect_err("invalid");
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("1-12")));
    }
}
