//! Argument validation shared by every domain.
//!
//! LLM-supplied arguments arrive as loose JSON: integers may be strings,
//! booleans may be `"true"`, and extra keys the schema never declared are
//! common. Readers here coerce the representable cases and return an
//! `InvalidParameter` outcome for the rest; unknown keys are ignored.

use civiqa_models::{ToolDefinition, ToolOutcome};
use serde_json::{Map, Value};

/// Check required parameters in declaration order. Returns the outcome for
/// the first one missing, or `None` when the call may proceed.
pub fn check_required(def: &ToolDefinition, args: &Map<String, Value>) -> Option<ToolOutcome> {
    for param in def.required_params() {
        let missing = match args.get(&param.name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            return Some(ToolOutcome::MissingParameter {
                tool: def.name.clone(),
                parameter: param.name.clone(),
            });
        }
    }
    None
}

fn invalid(tool: &str, name: &str, message: String) -> ToolOutcome {
    ToolOutcome::InvalidParameter {
        tool: tool.to_string(),
        parameter: name.to_string(),
        message,
    }
}

/// Integer argument, accepting `28`, `28.0`, and `"28"`.
pub fn int_arg(
    tool: &str,
    args: &Map<String, Value>,
    name: &str,
) -> Result<Option<i64>, ToolOutcome> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                Ok(Some(f as i64))
            } else {
                Err(invalid(tool, name, format!("expected an integer, got {n}")))
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            invalid(tool, name, format!("expected an integer, got \"{s}\""))
        }),
        Some(other) => Err(invalid(
            tool,
            name,
            format!("expected an integer, got {other}"),
        )),
    }
}

/// Boolean argument, accepting JSON booleans and `"true"` / `"false"`.
pub fn bool_arg(
    tool: &str,
    args: &Map<String, Value>,
    name: &str,
) -> Result<Option<bool>, ToolOutcome> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(invalid(
                tool,
                name,
                format!("expected true or false, got \"{s}\""),
            )),
        },
        Some(other) => Err(invalid(
            tool,
            name,
            format!("expected true or false, got {other}"),
        )),
    }
}

/// String argument. Bare numbers are accepted and rendered as text so the
/// LLM can pass a community area as `25` or `"25"` interchangeably.
pub fn str_arg(
    tool: &str,
    args: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, ToolOutcome> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(invalid(tool, name, format!("expected a string, got {other}"))),
    }
}

/// Positive-count argument (`top_n`, `limit`), clamped below by 1.
pub fn count_arg(
    tool: &str,
    args: &Map<String, Value>,
    name: &str,
    default: usize,
) -> Result<usize, ToolOutcome> {
    match int_arg(tool, args, name)? {
        None => Ok(default),
        Some(n) if n >= 1 => Ok(n as usize),
        Some(n) => Err(invalid(tool, name, format!("expected a positive count, got {n}"))),
    }
}

/// List-of-strings argument. A bare string is treated as a one-element
/// list since the LLM frequently sends `"compare_areas": "Austin"`.
pub fn str_list_arg(
    tool: &str,
    args: &Map<String, Value>,
    name: &str,
) -> Result<Option<Vec<String>>, ToolOutcome> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(vec![trimmed.to_string()]))
            }
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                    Value::Number(n) => out.push(n.to_string()),
                    Value::String(_) => {}
                    other => {
                        return Err(invalid(
                            tool,
                            name,
                            format!("expected strings in the list, got {other}"),
                        ))
                    }
                }
            }
            Ok(Some(out))
        }
        Some(other) => Err(invalid(tool, name, format!("expected a list, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civiqa_models::{ParamType, ToolParam};
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn def_with_required_location() -> ToolDefinition {
        ToolDefinition::new(
            "search_by_location",
            "Search records by location text",
            vec![
                ToolParam::required("location", ParamType::String, "Street or place to match"),
                ToolParam::optional("limit", ParamType::Integer, "Max sample records"),
            ],
        )
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let def = def_with_required_location();
        let outcome = check_required(&def, &args(json!({"limit": 5}))).unwrap();
        match outcome {
            ToolOutcome::MissingParameter { tool, parameter } => {
                assert_eq!(tool, "search_by_location");
                assert_eq!(parameter, "location");
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let def = def_with_required_location();
        assert!(check_required(&def, &args(json!({"location": "  "}))).is_some());
        assert!(check_required(&def, &args(json!({"location": "STATE ST"}))).is_none());
    }

    #[test]
    fn int_arg_coerces_string_form() {
        let a = args(json!({"ward": "28", "year": 2023, "bad": "twenty"}));
        assert_eq!(int_arg("q", &a, "ward").unwrap(), Some(28));
        assert_eq!(int_arg("q", &a, "year").unwrap(), Some(2023));
        assert_eq!(int_arg("q", &a, "absent").unwrap(), None);
        assert!(int_arg("q", &a, "bad").is_err());
    }

    #[test]
    fn bool_arg_coerces_string_form() {
        let a = args(json!({"arrest_status": "True", "domestic": false, "bad": "yes"}));
        assert_eq!(bool_arg("q", &a, "arrest_status").unwrap(), Some(true));
        assert_eq!(bool_arg("q", &a, "domestic").unwrap(), Some(false));
        assert!(bool_arg("q", &a, "bad").is_err());
    }

    #[test]
    fn str_arg_accepts_bare_numbers() {
        let a = args(json!({"community_area": 25}));
        assert_eq!(str_arg("q", &a, "community_area").unwrap().as_deref(), Some("25"));
    }

    #[test]
    fn count_arg_rejects_non_positive() {
        let a = args(json!({"top_n": 0}));
        assert!(count_arg("q", &a, "top_n", 10).is_err());
        assert_eq!(count_arg("q", &args(json!({})), "top_n", 10).unwrap(), 10);
    }

    #[test]
    fn str_list_accepts_single_string() {
        let a = args(json!({"compare_areas": "Austin"}));
        assert_eq!(
            str_list_arg("q", &a, "compare_areas").unwrap(),
            Some(vec!["Austin".to_string()])
        );
        let b = args(json!({"compare_areas": ["Austin", 68]}));
        assert_eq!(
            str_list_arg("q", &b, "compare_areas").unwrap(),
            Some(vec!["Austin".to_string(), "68".to_string()])
        );
    }
}
