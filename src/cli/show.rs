// src/cli/show.rs — Print one stored session

use crate::infra::config::Config;

pub async fn run_show(config: &Config, session_id: &str) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    let session = store
        .get_session(session_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No session with id {session_id}"))?;

    println!("Session {}", session.id);
    println!("  Name:       {}", session.name);
    println!("  Category:   {}", session.category);
    println!("  Status:     {}", session.status);
    println!(
        "  Duration:   {} min expected, {}",
        session.expected_duration_minutes,
        session
            .actual_duration_minutes
            .map(|m| format!("{m} min actual"))
            .unwrap_or_else(|| "not finished".into())
    );
    if let Some(reason) = &session.end_reason {
        println!("  Ended:      {reason}");
    }
    println!(
        "  Questions:  {}",
        session
            .questions_answered
            .map(|q| q.to_string())
            .unwrap_or_else(|| "-".into())
    );
    match (session.score, session.score_source) {
        (Some(score), Some(source)) => println!("  Score:      {score} ({})", source.as_str()),
        (Some(score), None) => println!("  Score:      {score}"),
        _ => println!("  Score:      not yet scored"),
    }

    let Some(conversation_id) = session.conversation_id else {
        return Ok(());
    };
    println!("  Conversation: {conversation_id}");

    match store.get_transcript(&conversation_id).await? {
        Some(t) => println!(
            "  Transcript: {} messages ({} candidate, {} interviewer), updated {}",
            t.counts.message_count,
            t.counts.user_message_count,
            t.counts.assistant_message_count,
            t.updated_at
        ),
        None => println!("  Transcript: not received"),
    }

    if let Some(detail) = store.get_score_detail(&conversation_id).await? {
        let card = detail.card;
        println!();
        println!("  Substance {:>3}  {}", card.substance.score, card.substance.reason);
        println!("  Clarity   {:>3}  {}", card.clarity.score, card.clarity.reason);
        println!("  Grammar   {:>3}  {}", card.grammar.score, card.grammar.reason);
        println!("  Weighted  {:>3}", card.weighted_score);
    }
    Ok(())
}
