// src/evaluator/parser.rs — Parse scoring-service replies into a clamped ScoreCard
//
// The service is asked for a bare JSON object but may wrap it in prose or a
// code fence, so the first well-formed object anywhere in the text is used.

use serde_json::Value;

use super::composite_score;
use crate::core::types::{ScoreCard, SubScore};
use crate::infra::errors::ScoringError;

pub const MISSING_REASON: &str = "No justification provided.";

/// Return the first balanced `{...}` substring that parses as a JSON object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            let candidate = &text[start..=end];
            if matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_))) {
                return Some(candidate);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Index of the `}` closing the `{` at `start`, skipping braces inside strings.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Clamp a raw score into `[0, 100]` and round to an integer.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn read_score(obj: &serde_json::Map<String, Value>, key: &str) -> Result<u8, ScoringError> {
    let raw = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.map(clamp_score)
        .ok_or_else(|| ScoringError::InvalidJson(format!("missing or non-numeric '{key}'")))
}

fn read_reason(obj: &serde_json::Map<String, Value>, key: &str, max_chars: usize) -> String {
    match obj.get(key).and_then(Value::as_str).map(str::trim) {
        Some(reason) if !reason.is_empty() => truncate_chars(reason, max_chars),
        _ => MISSING_REASON.to_string(),
    }
}

fn sub_score(
    obj: &serde_json::Map<String, Value>,
    name: &str,
    max_chars: usize,
) -> Result<SubScore, ScoringError> {
    Ok(SubScore {
        score: read_score(obj, &format!("{name}_score"))?,
        reason: read_reason(obj, &format!("{name}_reason"), max_chars),
    })
}

/// Parse a free-form reply into a ScoreCard with clamped sub-scores.
pub fn parse_score_response(text: &str, reason_max_chars: usize) -> Result<ScoreCard, ScoringError> {
    let json = extract_json_object(text).ok_or(ScoringError::NoJson)?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ScoringError::InvalidJson(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ScoringError::InvalidJson("not an object".into()))?;

    let clarity = sub_score(obj, "clarity", reason_max_chars)?;
    let grammar = sub_score(obj, "grammar", reason_max_chars)?;
    let substance = sub_score(obj, "substance", reason_max_chars)?;
    let weighted_score = composite_score(clarity.score, grammar.score, substance.score);

    Ok(ScoreCard {
        clarity,
        grammar,
        substance,
        weighted_score,
    })
}
