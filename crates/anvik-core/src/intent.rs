//! Parsing model output into an [`IntentResult`].

use std::borrow::Cow;

use anvik_models::{Intent, IntentResult};
use serde_json::{Map, Value};

/// Words that suggest the user wants a calendar entry.
const EVENT_KEYWORDS: &[&str] = &["birthday", "meeting", "event", "appointment", "schedule"];

/// Words that count as a date even without digits.
const DATE_WORDS: &[&str] = &[
    "today", "tomorrow", "tonight",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "mon", "tue", "tues", "wed", "thu", "thur", "thurs", "fri", "sat", "sun",
    "january", "february", "march", "april", "may", "june", "july", "august",
    "september", "october", "november", "december",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Prefix added to undated event requests before classification.
pub const EVENT_NUDGE: &str = "Create an event: ";

/// Byte ranges of every top-level `{...}` span, skipping braces in strings.
fn top_level_objects(raw: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

/// Finds the last top-level JSON object in `raw` that parses.
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    top_level_objects(raw)
        .into_iter()
        .rev()
        .find_map(|(start, end)| match serde_json::from_str(&raw[start..end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Builds an [`IntentResult`] from model output.
///
/// Returns `None` when the output holds no JSON object. Unknown or missing
/// intents become `general`; a non-object `details` becomes empty.
pub fn parse_intent(raw: &str) -> Option<IntentResult> {
    let mut obj = extract_json_object(raw)?;

    let intent = obj
        .get("intent")
        .and_then(Value::as_str)
        .map(Intent::from_name)
        .unwrap_or_default();

    let details = match obj.remove("details") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let reply = obj
        .get("reply")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    Some(IntentResult {
        intent,
        details,
        reply,
    })
}

fn has_date_token(lower: &str) -> bool {
    if lower.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| DATE_WORDS.contains(&word))
}

/// Whether an event-ish message lacks any date.
pub fn needs_event_nudge(text: &str) -> bool {
    let lower = text.to_lowercase();
    EVENT_KEYWORDS.iter().any(|k| lower.contains(k)) && !has_date_token(&lower)
}

/// Text to send to the classifier, nudged toward `create_event` when needed.
pub fn classifier_input(text: &str) -> Cow<'_, str> {
    if needs_event_nudge(text) {
        Cow::Owned(format!("{}{}", EVENT_NUDGE, text))
    } else {
        Cow::Borrowed(text)
    }
}
