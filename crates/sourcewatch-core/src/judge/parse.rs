//! Validation of untrusted judge output.
//!
//! Judge text is expected to be one JSON array (per-run) or one JSON object
//! (meta), but arrives wrapped in code fences, prose, or odd whitespace often
//! enough that every consumer goes through [`parse_judge_entries`] or
//! [`parse_meta_scores`], which never panic and never return `Err`: malformed
//! output is a [`Parsed::Malformed`] value the caller must handle.

use crate::model::{DroppedEntry, JudgeEntry, MetaScores};
use serde_json::Value;

/// Upper bound on candidate openings tried before giving up.
const MAX_CANDIDATES: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Ok(T),
    Malformed { reason: String, raw: String },
}

impl<T> Parsed<T> {
    fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Parsed::Malformed {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Parsed::Ok(_))
    }
}

/// Entries accepted from a per-run judge response plus elements that were
/// structurally present but unusable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JudgeVerdicts {
    pub entries: Vec<JudgeEntry>,
    pub rejected: Vec<DroppedEntry>,
}

/// Removes markdown code fences and collapses whitespace runs to one space.
///
/// The collapse also applies inside string values, so repeated spaces or tabs
/// in explanations and summaries come out as a single space. Raw newlines in
/// strings (invalid JSON) are repaired the same way.
pub fn clean_judge_text(raw: &str) -> String {
    let mut s = raw.replace("```json", " ").replace("```JSON", " ");
    s = s.replace("```", " ");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the balanced `open ... close` substring starting at byte `start`,
/// honoring JSON string literals and escapes.
fn balanced_from(text: &str, start: usize, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

/// First balanced `open ... close` region that parses as JSON and satisfies
/// `accept`.
///
/// Candidates are tried in order so stray brackets in leading prose, such as
/// "a [0, 100] scale", do not hide the real payload.
pub fn extract_json(
    text: &str,
    open: u8,
    close: u8,
    accept: impl Fn(&Value) -> bool,
) -> Option<Value> {
    text.bytes()
        .enumerate()
        .filter(|(_, b)| *b == open)
        .take(MAX_CANDIDATES)
        .filter_map(|(i, _)| balanced_from(text, i, open, close))
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find(|v| accept(v))
}

/// An array carrying at least one object element.
fn is_entry_array(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|items| items.iter().any(Value::is_object))
}

/// Accepts a finite number or a numeric string ("87", "87/100").
fn number_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    let v = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let head = s.trim().split('/').next().unwrap_or("").trim();
            head.parse::<f64>().ok()
        }
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn parse_judge_entries(raw: &str) -> Parsed<JudgeVerdicts> {
    let cleaned = clean_judge_text(raw);
    if cleaned.is_empty() {
        return Parsed::malformed("empty judge output", raw);
    }

    let Some(value) = extract_json(&cleaned, b'[', b']', is_entry_array) else {
        return Parsed::malformed("no JSON array of entries found in judge output", raw);
    };
    let Value::Array(items) = value else {
        return Parsed::malformed("judge output is not a JSON array", raw);
    };

    let mut verdicts = JudgeVerdicts::default();
    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            verdicts.rejected.push(DroppedEntry {
                label: format!("#{}", i + 1),
                reason: "entry is not a JSON object".into(),
            });
            continue;
        };
        let Some(source) = string_field(obj, "source").filter(|s| !s.trim().is_empty()) else {
            verdicts.rejected.push(DroppedEntry {
                label: format!("#{}", i + 1),
                reason: "entry has no source label".into(),
            });
            continue;
        };
        let Some(score) = number_field(obj, "score") else {
            verdicts.rejected.push(DroppedEntry {
                label: source,
                reason: "entry has no numeric score".into(),
            });
            continue;
        };
        verdicts.entries.push(JudgeEntry {
            source,
            score,
            explanation: string_field(obj, "explanation").unwrap_or_default(),
        });
    }

    if verdicts.entries.is_empty() {
        return Parsed::malformed("judge output contained no usable entries", raw);
    }
    Parsed::Ok(verdicts)
}

pub fn parse_meta_scores(raw: &str) -> Parsed<MetaScores> {
    let cleaned = clean_judge_text(raw);
    let Some(value) = extract_json(&cleaned, b'{', b'}', Value::is_object) else {
        return Parsed::malformed("no JSON object found in judge output", raw);
    };
    let Some(obj) = value.as_object() else {
        return Parsed::malformed("judge output is not a JSON object", raw);
    };

    let mut missing = Vec::new();
    let mut num = |key: &'static str| {
        let v = number_field(obj, key);
        if v.is_none() {
            missing.push(key);
        }
        v.unwrap_or_default()
    };
    let accuracy = num("accuracy");
    let completeness = num("completeness");
    let clarity = num("clarity");
    let consistency = num("consistency");
    let overall = num("overall");

    let summary = string_field(obj, "summary").filter(|s| !s.trim().is_empty());
    if summary.is_none() {
        missing.push("summary");
    }
    if !missing.is_empty() {
        return Parsed::malformed(
            format!("judge output missing fields: {}", missing.join(", ")),
            raw,
        );
    }

    Parsed::Ok(MetaScores {
        source: string_field(obj, "source"),
        accuracy,
        completeness,
        clarity,
        consistency,
        overall,
        summary: summary.unwrap_or_default(),
    })
}
