// tests/store_test.rs — Integration test: session lifecycle writes against SQLite

use pretty_assertions::assert_eq;
use rehearsal::core::types::{
    ScoreCard, ScoreSource, SessionStatus, SpeakerRole, SubScore, TranscriptMessage,
};
use rehearsal::store::schema;
use rehearsal::store::store::{NewSession, Store};
use rusqlite::Connection;

/// Create an in-memory SQLite store with schema applied.
fn test_store() -> Store {
    let conn = Connection::open_in_memory().unwrap();
    schema::run_migrations(&conn).unwrap();
    Store::new(conn)
}

fn new_session(id: &str, conversation_id: &str) -> NewSession {
    NewSession {
        id: id.into(),
        conversation_id: conversation_id.into(),
        category: "software engineering".into(),
        name: "Mock interview".into(),
        expected_duration_minutes: 15,
    }
}

fn card(score: u8) -> ScoreCard {
    let sub = |s: u8| SubScore {
        score: s,
        reason: "ok".into(),
    };
    ScoreCard {
        clarity: sub(score),
        grammar: sub(score),
        substance: sub(score),
        weighted_score: score,
    }
}

#[test]
fn test_insert_session_starts_created_and_unscored() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();

    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.status, SessionStatus::Created);
    assert_eq!(row.conversation_id.as_deref(), Some("c-1"));
    assert_eq!(row.expected_duration_minutes, 15);
    assert_eq!(row.score, None);
    assert_eq!(row.actual_duration_minutes, None);
    assert_eq!(row.completed_at, None);

    let by_conv = store.get_session_by_conversation("c-1").unwrap().unwrap();
    assert_eq!(by_conv.id, "s-1");
}

#[test]
fn test_conversation_id_is_unique() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();
    assert!(store.insert_session(&new_session("s-2", "c-1")).is_err());
}

#[test]
fn test_status_follows_lifecycle_only() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();

    // Cannot complete without passing through active
    assert!(!store.complete_session("s-1", 3, "user_ended").unwrap());
    assert_eq!(
        store.get_session("s-1").unwrap().unwrap().status,
        SessionStatus::Created
    );

    assert!(store.mark_session_active("s-1").unwrap());
    assert!(!store.mark_session_active("s-1").unwrap());
    // Cancel only applies before the call went live
    assert!(!store.cancel_session("s-1").unwrap());

    assert!(store.complete_session("s-1", 12, "conversation_ended").unwrap());
    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.actual_duration_minutes, Some(12));
    assert_eq!(row.end_reason.as_deref(), Some("conversation_ended"));
    let completed_at = row.completed_at.clone().unwrap();

    // A second completion touches nothing
    assert!(!store.complete_session("s-1", 99, "time_limit_reached").unwrap());
    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.actual_duration_minutes, Some(12));
    assert_eq!(row.completed_at, Some(completed_at));
}

#[test]
fn test_cancel_from_created_writes_no_duration() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();
    assert!(store.cancel_session("s-1").unwrap());

    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.status, SessionStatus::Cancelled);
    assert_eq!(row.actual_duration_minutes, None);
    assert!(!store.mark_session_active("s-1").unwrap());
}

#[test]
fn test_questions_answered_written_after_completion() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();
    store.mark_session_active("s-1").unwrap();
    store.complete_session("s-1", 7, "user_ended").unwrap();

    assert!(store.update_questions_answered("c-1", 4).unwrap());
    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.questions_answered, Some(4));
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.actual_duration_minutes, Some(7));

    assert!(!store.update_questions_answered("unknown", 4).unwrap());
}

#[test]
fn test_manual_score_not_replaced_by_auto() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();

    assert!(store.apply_auto_score("c-1", 60).unwrap());
    // A redelivery may refresh its own automatic score
    assert!(store.apply_auto_score("c-1", 64).unwrap());
    assert_eq!(store.get_session("s-1").unwrap().unwrap().score, Some(64));

    assert!(store.set_manual_score("s-1", 90).unwrap());
    assert!(!store.apply_auto_score("c-1", 40).unwrap());

    let row = store.get_session("s-1").unwrap().unwrap();
    assert_eq!(row.score, Some(90));
    assert_eq!(row.score_source, Some(ScoreSource::Manual));
}

#[test]
fn test_transcript_upsert_is_idempotent() {
    let store = test_store();
    let messages = vec![
        TranscriptMessage::new(SpeakerRole::Assistant, "Why this role?"),
        TranscriptMessage::new(SpeakerRole::User, "I like distributed systems."),
    ];

    let counts = store.upsert_transcript("c-1", &messages).unwrap();
    assert_eq!(counts.message_count, 2);
    assert_eq!(counts.user_message_count, 1);
    assert_eq!(counts.assistant_message_count, 1);
    let first = store.get_transcript("c-1").unwrap().unwrap();

    store.upsert_transcript("c-1", &messages).unwrap();
    store.upsert_transcript("c-1", &messages).unwrap();
    let again = store.get_transcript("c-1").unwrap().unwrap();
    assert_eq!(first, again);

    let count: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_transcript_upsert_overwrites_changed_content() {
    let store = test_store();
    store
        .upsert_transcript("c-1", &[TranscriptMessage::new(SpeakerRole::User, "first")])
        .unwrap();
    let longer = vec![
        TranscriptMessage::new(SpeakerRole::User, "first"),
        TranscriptMessage::new(SpeakerRole::Assistant, "second"),
    ];
    store.upsert_transcript("c-1", &longer).unwrap();

    let row = store.get_transcript("c-1").unwrap().unwrap();
    assert_eq!(row.messages, longer);
    assert_eq!(row.counts.message_count, 2);
}

#[test]
fn test_score_detail_upsert_by_conversation() {
    let store = test_store();
    store.upsert_score_detail("c-1", &card(50)).unwrap();
    store.upsert_score_detail("c-1", &card(70)).unwrap();

    let row = store.get_score_detail("c-1").unwrap().unwrap();
    assert_eq!(row.card, card(70));
    assert!(store.get_score_detail("c-2").unwrap().is_none());
}

#[test]
fn test_score_check_constraint() {
    let store = test_store();
    store.insert_session(&new_session("s-1", "c-1")).unwrap();
    let result = store
        .conn()
        .execute("UPDATE sessions SET score = 101 WHERE id = 's-1'", []);
    assert!(result.is_err());
}
