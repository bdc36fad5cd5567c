// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The "Lua-like" action registry: free-form text in, validated
//! `MotorOutput` calls out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parsed and validated (or rejected) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorOutput {
    pub action: String,
    pub params: Vec<Value>,
    pub valid: bool,
    pub error: Option<String>,
}

/// Sequence-wide limits.
pub const MAX_SAY_PER_SEQUENCE: usize = 1;
pub const MAX_CALLS_PER_SEQUENCE: usize = 10;

/// Clamp bound for dispatch/patrol coordinates, map half-extent in meters.
const COORD_CLAMP_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    Text,
    Number,
    Json,
}

struct ActionSpec {
    name: &'static str,
    args: &'static [ArgKind],
}

const CORE_ACTIONS: &[ActionSpec] = &[
    ActionSpec { name: "think", args: &[ArgKind::Text] },
    ActionSpec { name: "say", args: &[ArgKind::Text] },
    ActionSpec { name: "dispatch", args: &[ArgKind::Text, ArgKind::Number, ArgKind::Number] },
    ActionSpec { name: "alert", args: &[ArgKind::Text, ArgKind::Text] },
    ActionSpec { name: "patrol", args: &[ArgKind::Text, ArgKind::Json] },
    ActionSpec { name: "escalate", args: &[ArgKind::Text, ArgKind::Text] },
    ActionSpec { name: "battle_cry", args: &[ArgKind::Text] },
    ActionSpec { name: "wedge", args: &[] },
    ActionSpec { name: "line", args: &[] },
    ActionSpec { name: "column", args: &[] },
    ActionSpec { name: "circle", args: &[] },
    ActionSpec { name: "rally", args: &[] },
    ActionSpec { name: "scatter", args: &[] },
];

fn spec_for(name: &str) -> Option<&'static ActionSpec> {
    CORE_ACTIONS.iter().find(|a| a.name == name)
}

/// A single raw call, as extracted from free-form text before validation.
struct RawCall {
    name: String,
    args: Vec<String>,
}

/// Extract top-level `name(arg, arg, ...)` calls from free-form LLM text,
/// tolerant of fenced code blocks and `//`/`#` line comments.
fn extract_calls(text: &str) -> Vec<RawCall> {
    let mut calls = Vec::new();
    for raw_line in text.lines() {
        let line = strip_fence_marker(raw_line);
        let line = strip_line_comment(line);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(open) = line.find('(') else { continue };
        let Some(close) = line.rfind(')') else { continue };
        if close < open {
            continue;
        }
        let name = line[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        let body = &line[open + 1..close];
        let args = split_args(body);
        calls.push(RawCall { name: name.to_string(), args });
    }
    calls
}

fn strip_fence_marker(line: &str) -> &str {
    let trimmed = line.trim();
    if trimmed.starts_with("```") {
        ""
    } else {
        line
    }
}

fn strip_line_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'/' if !in_quotes && i + 1 < bytes.len() && bytes[i + 1] == b'/' => return &line[..i],
            b'#' if !in_quotes => return &line[..i],
            _ => {}
        }
        i += 1;
    }
    line
}

fn split_args(body: &str) -> Vec<String> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '[' | '{' if !in_quotes => {
                depth += 1;
                current.push(ch);
            }
            ']' | '}' if !in_quotes => {
                depth -= 1;
                current.push(ch);
            }
            ',' if !in_quotes && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

fn coerce(kind: ArgKind, raw: &str) -> Result<Value, String> {
    match kind {
        ArgKind::Text => Ok(Value::String(unquote(raw))),
        ArgKind::Number => raw
            .parse::<f64>()
            .map(|n| Value::from(n.clamp(-COORD_CLAMP_M, COORD_CLAMP_M)))
            .map_err(|_| format!("expected number, got {raw}")),
        ArgKind::Json => serde_json::from_str(raw).map_err(|e| format!("invalid json arg: {e}")),
    }
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse and validate a free-form text response into a bounded sequence of
/// `MotorOutput`s. Unknown calls are marked invalid but do not abort the
/// sequence; the sequence itself is truncated at `MAX_CALLS_PER_SEQUENCE`
/// and after the first `say` beyond `MAX_SAY_PER_SEQUENCE`.
#[must_use]
pub fn parse_sequence(text: &str) -> Vec<MotorOutput> {
    let mut outputs = Vec::new();
    let mut say_count = 0usize;

    for raw in extract_calls(text) {
        if outputs.len() >= MAX_CALLS_PER_SEQUENCE {
            break;
        }

        let Some(spec) = spec_for(&raw.name) else {
            outputs.push(MotorOutput {
                action: raw.name,
                params: Vec::new(),
                valid: false,
                error: Some("unknown action".to_string()),
            });
            continue;
        };

        if spec.name == "say" {
            say_count += 1;
            if say_count > MAX_SAY_PER_SEQUENCE {
                outputs.push(MotorOutput {
                    action: raw.name,
                    params: Vec::new(),
                    valid: false,
                    error: Some("say limit exceeded for sequence".to_string()),
                });
                continue;
            }
        }

        if raw.args.len() != spec.args.len() {
            outputs.push(MotorOutput {
                action: raw.name,
                params: Vec::new(),
                valid: false,
                error: Some(format!("expected {} args, got {}", spec.args.len(), raw.args.len())),
            });
            continue;
        }

        let mut params = Vec::with_capacity(raw.args.len());
        let mut error = None;
        for (kind, arg) in spec.args.iter().zip(raw.args.iter()) {
            match coerce(*kind, arg) {
                Ok(v) => params.push(v),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        outputs.push(MotorOutput {
            action: raw.name,
            params,
            valid: error.is_none(),
            error,
        });
    }

    outputs
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_and_commented_calls() {
        let text = "```\ndispatch(\"u1\", 10, 20) // move up\nsay(\"contact\")\n```";
        let out = parse_sequence(text);
        assert_eq!(out.len(), 2);
        assert!(out[0].valid);
        assert_eq!(out[0].action, "dispatch");
        assert!(out[1].valid);
    }

    #[test]
    fn unknown_call_marked_invalid_without_aborting_sequence() {
        let text = "foo(1)\nsay(\"hi\")";
        let out = parse_sequence(text);
        assert_eq!(out.len(), 2);
        assert!(!out[0].valid);
        assert!(out[1].valid);
    }

    #[test]
    fn second_say_in_sequence_is_rejected() {
        let text = "say(\"a\")\nsay(\"b\")";
        let out = parse_sequence(text);
        assert!(out[0].valid);
        assert!(!out[1].valid);
    }

    #[test]
    fn dispatch_coords_are_clamped() {
        let text = "dispatch(\"u1\", 999999, -999999)";
        let out = parse_sequence(text);
        assert!(out[0].valid);
        assert_eq!(out[0].params[1], Value::from(1000.0));
        assert_eq!(out[0].params[2], Value::from(-1000.0));
    }

    #[test]
    fn sequence_truncates_at_ten_calls() {
        let text = (0..20).map(|_| "wedge()\n").collect::<String>();
        let out = parse_sequence(&text);
        assert_eq!(out.len(), MAX_CALLS_PER_SEQUENCE);
    }
}
