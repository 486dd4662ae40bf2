/// Structured command extraction: find the `{"action": ..., "params": {...}}`
/// block a model embeds in an otherwise free-text response.
///
/// Candidates are brace-balanced substrings, scanned left to right. The first
/// candidate that parses as JSON *and* is a well-formed command wins. A
/// candidate that parses but is not a command is skipped as a whole, so
/// objects nested inside it are never promoted to commands. A candidate that
/// does not parse is retried from its next inner `{`.
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::types::{ExtractedCommand, ParamValue};

/// Extract the first valid structured command from `text`.
///
/// Returns `None` for plain conversational text, malformed JSON, or records
/// without a string `action`. Never fails.
pub fn extract_command(text: &str) -> Option<ExtractedCommand> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let Some(end) = balanced_block_end(text, start) else {
            search_from = start + 1;
            continue;
        };

        let candidate = &text[start..=end];
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                if let Some(command) = command_from_value(&value) {
                    trace!(action = %command.action, start, end, "Extracted command");
                    return Some(command);
                }
                search_from = end + 1;
            }
            Err(_) => search_from = start + 1,
        }
    }

    None
}

/// Byte index of the `}` closing the block opened at `start`, honouring
/// JSON string literals and escapes.
fn balanced_block_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                in_string = false;
            }
            continue;
        }
        match c {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn command_from_value(value: &Value) -> Option<ExtractedCommand> {
    let object = value.as_object()?;
    let action = object.get("action")?.as_str()?.trim();
    if action.is_empty() {
        return None;
    }

    let params = match object.get("params") {
        None => BTreeMap::new(),
        Some(Value::Object(map)) => flat_params(map)?,
        Some(_) => return None,
    };

    Some(ExtractedCommand {
        action: action.to_string(),
        params,
    })
}

/// Only string and number values are accepted; anything nested rejects the record.
fn flat_params(map: &Map<String, Value>) -> Option<BTreeMap<String, ParamValue>> {
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => ParamValue::Text(s.clone()),
                Value::Number(n) => ParamValue::Number(n.clone()),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}
