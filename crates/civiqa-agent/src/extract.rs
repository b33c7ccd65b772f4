use regex::Regex;
use serde_json::{json, Map, Value};

use civiqa_models::ToolCall;

/// Marker the prompts instruct the model to emit ahead of a tool request.
pub const TOOL_CALL_MARKER: &str = "TOOL_CALL:";

/// True when the text asks for a tool at all.
pub fn contains_marker(text: &str) -> bool {
    text.contains(TOOL_CALL_MARKER)
}

/// Extract the first tool call from model output.
///
/// Models get the format wrong in predictable ways, so extraction runs a
/// ladder of strategies over the text after the first `TOOL_CALL:` marker:
///
/// 1. Brace-balanced scan (string- and escape-aware) for the first JSON
///    object, closing any braces the model left unterminated.
/// 2. A repair pass over that candidate: smart quotes normalized, trailing
///    commas stripped, text after the object dropped.
/// 3. Regex field extraction of `"name"` plus scalar argument pairs.
///
/// No marker, or a marker nothing can be salvaged from, yields `None`;
/// extraction itself never fails. A call without an `arguments` object
/// gets an empty one.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let marker_at = text.find(TOOL_CALL_MARKER)?;
    let after = &text[marker_at + TOOL_CALL_MARKER.len()..];

    if let Some(candidate) = balanced_candidate(after) {
        if let Some(call) = parse_call(&candidate) {
            return Some(call);
        }
        if let Some(call) = parse_call(&repair(&candidate)) {
            return Some(call);
        }
    }

    fields_from_regex(after)
}

/// Slice out the first `{ ... }` after the marker, tracking string and
/// escape state so braces inside values do not end the scan. When the
/// text runs out mid-object, the dangling braces are closed.
fn balanced_candidate(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    let mut candidate = text[start..].trim_end().to_string();
    for _ in 0..depth {
        candidate.push('}');
    }
    Some(candidate)
}

fn parse_call(candidate: &str) -> Option<ToolCall> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;
    let name = object.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let arguments = match object.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    Some(ToolCall {
        name: name.to_string(),
        arguments,
    })
}

/// Normalize the model's most common JSON mistakes: typographic quotes,
/// trailing commas, and prose glued on after the closing brace.
fn repair(candidate: &str) -> String {
    let normalized = candidate
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let stripped = strip_trailing_commas(&normalized);

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => stripped,
    }
}

fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape_next {
            escape_next = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => {
                escape_next = true;
                out.push(ch);
            }
            '"' => {
                in_string = !in_string;
                out.push(ch);
            }
            ',' if !in_string => {
                let next_meaningful = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next_meaningful, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Last-resort extraction: pull the tool name and any flat scalar
/// arguments by pattern. Scans only up to the first closing brace, the
/// way a flat argument object would end.
fn fields_from_regex(after_marker: &str) -> Option<ToolCall> {
    let window = match after_marker.find('}') {
        Some(end) => &after_marker[..=end],
        None => after_marker,
    };

    let name_re = Regex::new(r#""name"\s*:\s*"([A-Za-z0-9_]+)""#).ok()?;
    let name = name_re.captures(window)?.get(1)?.as_str().to_string();

    let mut call = ToolCall::new(&name);
    let pair_re = Regex::new(
        r#""([A-Za-z0-9_]+)"\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?|true|false)"#,
    )
    .ok()?;
    for caps in pair_re.captures_iter(window) {
        let key = &caps[1];
        if key == "name" || key == "arguments" {
            continue;
        }
        let raw = &caps[2];
        let value = if raw.starts_with('"') {
            match serde_json::from_str::<Value>(raw) {
                Ok(string) => string,
                Err(_) => continue,
            }
        } else if raw == "true" || raw == "false" {
            Value::Bool(raw == "true")
        } else if let Ok(int) = raw.parse::<i64>() {
            json!(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            json!(float)
        } else {
            continue;
        };
        call.arguments.insert(key.to_string(), value);
    }
    Some(call)
}
