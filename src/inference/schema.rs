//! Validation of the model's JSON answer.
//!
//! The wire format is loose on purpose (models put numbers in strings and
//! wrap JSON in code fences), so it is read into [`RawAnswer`] first and
//! checked field by field before becoming an [`ExtractionResult`].

use serde::Deserialize;
use serde_json::Value;

use crate::inference::errors::InferenceError;
use crate::model::{BookingLink, ExtractionResult, TeeTime};

#[derive(Debug, Default, Deserialize)]
struct RawAnswer {
    kind: Option<String>,
    time: Option<Value>,
    players: Option<Value>,
    price: Option<Value>,
    notes: Option<Value>,
    url: Option<Value>,
    #[serde(alias = "link_text")]
    text: Option<Value>,
    reason: Option<Value>,
}

pub fn parse_answer(raw: &str) -> Result<ExtractionResult, InferenceError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(InferenceError::EmptyResponse);
    }

    let answer: RawAnswer = serde_json::from_str(body)?;
    let kind = answer
        .kind
        .as_deref()
        .map(|k| k.trim().to_lowercase())
        .ok_or_else(|| InferenceError::schema("kind", "is missing"))?;

    match kind.as_str() {
        "tee_time" => Ok(ExtractionResult::TeeTime(TeeTime {
            time: required_string("time", answer.time)?,
            players: players(answer.players)?,
            price: optional_string("price", answer.price)?,
            notes: optional_string("notes", answer.notes)?,
        })),
        "booking_link" => Ok(ExtractionResult::BookingLink(BookingLink {
            url: required_string("url", answer.url)?,
            link_text: required_string("text", answer.text)?,
            reason: required_string("reason", answer.reason)?,
        })),
        "empty" => Ok(ExtractionResult::Empty),
        other => Err(InferenceError::schema(
            "kind",
            format!("has unknown value {:?}", other),
        )),
    }
}

/// Drop a surrounding ```json fence if the model added one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn required_string(field: &'static str, value: Option<Value>) -> Result<String, InferenceError> {
    match optional_string(field, value)? {
        Some(s) => Ok(s),
        None => Err(InferenceError::schema(field, "is missing")),
    }
}

fn optional_string(
    field: &'static str,
    value: Option<Value>,
) -> Result<Option<String>, InferenceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(InferenceError::schema(
            field,
            format!("must be a string, got {}", type_name(&other)),
        )),
    }
}

/// A positive whole number, as JSON integer or numeric string.
fn players(value: Option<Value>) -> Result<u32, InferenceError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(InferenceError::schema("players", "is missing")),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(other) => {
            return Err(InferenceError::schema(
                "players",
                format!("must be a number, got {}", type_name(&other)),
            ));
        }
    };

    match parsed {
        Some(n) if n > 0 => Ok(n),
        _ => Err(InferenceError::schema(
            "players",
            "must be a positive whole number",
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
