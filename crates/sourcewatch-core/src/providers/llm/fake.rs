//! Deterministic offline judge.
//!
//! Reads the prompts produced by [`crate::judge::prompt`] and scores each
//! candidate by how many key terms of the golden truth it repeats. Used for
//! replay runs, CI, and tests where the live model is not wanted.

use super::JudgeClient;
use crate::errors::JudgeUnavailableError;
use crate::judge::prompt::{
    GOLDEN_TRUTH_HEADER, META_RECORDS_HEADER, META_SECTIONS, META_SOURCE_PREFIX,
    RESPONSES_HEADER,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::OnceLock;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "its", "of",
    "on", "or", "that", "the", "this", "to", "was", "were", "with",
];

pub struct FakeJudge {
    model: String,
}

impl FakeJudge {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for FakeJudge {
    fn default() -> Self {
        Self::new("fake")
    }
}

fn key_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Share of the golden truth's key terms present in `candidate`, scaled to 0..=100.
pub fn overlap_score(golden_truth: &str, candidate: &str) -> (f64, usize, usize) {
    let golden = key_terms(golden_truth);
    if golden.is_empty() {
        return (0.0, 0, 0);
    }
    let found = key_terms(candidate);
    let hits = golden.intersection(&found).count();
    let score = (hits as f64 / golden.len() as f64 * 100.0).round();
    (score, hits, golden.len())
}

fn response_header() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Response \d+ \(Source: (?P<id>.+)\):$").ok())
        .as_ref()
}

fn judge_run(prompt: &str) -> Option<String> {
    let golden_start = prompt.find(GOLDEN_TRUTH_HEADER)? + GOLDEN_TRUTH_HEADER.len();
    let marker = format!("\n{}\n", RESPONSES_HEADER);
    let responses_at = golden_start + prompt[golden_start..].find(&marker)?;
    let golden = prompt[golden_start..responses_at].trim();
    let body = &prompt[responses_at + marker.len()..];

    let header = response_header()?;
    let mut blocks: Vec<(String, String)> = Vec::new();
    for line in body.lines() {
        if let Some(c) = header.captures(line) {
            blocks.push((c["id"].to_string(), String::new()));
        } else if let Some((_, content)) = blocks.last_mut() {
            content.push_str(line);
            content.push('\n');
        }
    }

    let entries: Vec<_> = blocks
        .iter()
        .map(|(source, content)| {
            let (score, hits, total) = overlap_score(golden, content);
            json!({
                "source": source,
                "score": score,
                "explanation": format!(
                    "Repeats {} of {} key terms from the golden truth.",
                    hits, total
                ),
            })
        })
        .collect();
    Some(serde_json::Value::Array(entries).to_string())
}

fn judge_meta(prompt: &str) -> Option<String> {
    let source = prompt
        .lines()
        .find_map(|l| l.strip_prefix(META_SOURCE_PREFIX))?
        .trim()
        .to_string();
    let records = &prompt[prompt.find(META_RECORDS_HEADER)?..];
    let scores: Vec<f64> = records
        .lines()
        .filter_map(|l| l.strip_prefix("Score: "))
        .filter_map(|s| s.trim().parse::<f64>().ok())
        .collect();
    if scores.is_empty() {
        return None;
    }

    let mean = (scores.iter().sum::<f64>() / scores.len() as f64).round();
    let spread = scores.iter().cloned().fold(f64::MIN, f64::max)
        - scores.iter().cloned().fold(f64::MAX, f64::min);
    let consistency = (100.0 - spread).clamp(0.0, 100.0);

    let summary = META_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "**{}. {}**\n{} records reviewed, mean score {}.",
                i + 1,
                s,
                scores.len(),
                mean
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(
        json!({
            "source": source,
            "accuracy": mean,
            "completeness": mean,
            "clarity": mean,
            "consistency": consistency,
            "overall": mean,
            "summary": summary,
        })
        .to_string(),
    )
}

#[async_trait]
impl JudgeClient for FakeJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgeUnavailableError> {
        let out = if prompt.contains(META_RECORDS_HEADER) {
            judge_meta(prompt)
        } else {
            judge_run(prompt)
        };
        out.ok_or_else(|| JudgeUnavailableError::new("fake judge: unrecognised prompt"))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
