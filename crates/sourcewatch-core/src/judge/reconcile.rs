use crate::model::{DroppedEntry, JudgeEntry, SourceResponse};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Wrapper shapes judges put around a source label, tried in order.
///
/// Each pattern exposes the bare identifier as the `id` group.
fn wrapper_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Response 2 (Source: Galileo)
            r"(?i)^response\s*#?\s*\d+\s*\(\s*source\s*[:\-–]\s*(?P<id>.+?)\s*\)$",
            // Response 2 (Galileo)
            r"(?i)^response\s*#?\s*\d+\s*\(\s*(?P<id>.+?)\s*\)$",
            // Response 2: Galileo / Response 2 - Source: Galileo
            r"(?i)^response\s*#?\s*\d+\s*[:\-–]\s*(?:source\s*[:\-–]\s*)?(?P<id>.+)$",
            // Source: Galileo / (Source: Galileo)
            r"(?i)^\(?\s*source\s*[:\-–]\s*(?P<id>.+?)\s*\)?$",
            // Galileo (Response 2)
            r"(?i)^(?P<id>.+?)\s*\(\s*response\s*#?\s*\d+\s*\)$",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn strip_decoration(s: &str) -> &str {
    s.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*' | '_'))
        .trim()
}

/// Recovers the bare source identifier from a judge-supplied label.
///
/// Labels without a recognised wrapper come back trimmed but otherwise
/// unchanged, so an already-correct label is a fixed point.
pub fn normalize_label(label: &str) -> String {
    let bare = strip_decoration(label);
    for re in wrapper_patterns() {
        if let Some(id) = re.captures(bare).and_then(|c| c.name("id")) {
            let id = strip_decoration(id.as_str());
            if !id.is_empty() {
                return id.to_string();
            }
        }
    }
    bare.to_string()
}

/// A judge entry paired with the response it scores.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEntry {
    pub source: String,
    pub response_text: String,
    pub score: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub matched: Vec<MatchedEntry>,
    pub dropped: Vec<DroppedEntry>,
}

/// Maps judge entries back to the responses that were dispatched.
///
/// Matching is exact string equality on the normalized label. Entries that
/// match nothing, and repeat entries for an already-matched source, are
/// dropped with a diagnostic instead of failing the run.
pub fn reconcile(entries: &[JudgeEntry], dispatched: &[SourceResponse]) -> Reconciled {
    let mut out = Reconciled::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for entry in entries {
        let raw = entry.source.trim();
        let matched = dispatched
            .iter()
            .find(|r| r.source == raw)
            .or_else(|| {
                let normalized = normalize_label(raw);
                dispatched.iter().find(|r| r.source == normalized)
            });

        let Some(resp) = matched else {
            let reason = match closest(raw, dispatched) {
                Some(c) => format!("no dispatched source matches (closest: '{}')", c),
                None => "no dispatched source matches".to_string(),
            };
            tracing::warn!(
                event = "sourcewatch.reconcile.mismatch",
                label = %entry.source,
                normalized = %normalize_label(raw),
                available = ?dispatched.iter().map(|r| r.source.as_str()).collect::<Vec<_>>(),
                "dropping judge entry: {}",
                reason
            );
            out.dropped.push(DroppedEntry {
                label: entry.source.clone(),
                reason,
            });
            continue;
        };

        if !seen.insert(resp.source.as_str()) {
            tracing::warn!(
                event = "sourcewatch.reconcile.duplicate",
                source = %resp.source,
                "dropping repeated judge entry"
            );
            out.dropped.push(DroppedEntry {
                label: entry.source.clone(),
                reason: format!("duplicate entry for source '{}'", resp.source),
            });
            continue;
        }

        out.matched.push(MatchedEntry {
            source: resp.source.clone(),
            response_text: resp.content.clone(),
            score: entry.score,
            explanation: entry.explanation.clone(),
        });
    }
    out
}

fn closest<'a>(label: &str, dispatched: &'a [SourceResponse]) -> Option<&'a str> {
    let target = normalize_label(label).to_lowercase();
    dispatched
        .iter()
        .map(|r| {
            (
                strsim::normalized_levenshtein(&target, &r.source.to_lowercase()),
                r.source.as_str(),
            )
        })
        .filter(|(sim, _)| *sim >= 0.5)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, s)| s)
}
