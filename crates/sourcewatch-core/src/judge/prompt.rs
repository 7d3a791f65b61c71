//! Judge prompt construction.
//!
//! Two rubrics: the per-run rubric compares every source's answer to one
//! question against the golden truth in a single prompt, and the meta rubric
//! digests one source's whole scored history.

use crate::model::{HistoryRecord, SourceResponse};
use std::fmt::Write as _;

pub const GOLDEN_TRUTH_HEADER: &str = "Golden Truth:";
pub const RESPONSES_HEADER: &str = "Responses:";
pub const META_SOURCE_PREFIX: &str = "Source under review:";
pub const META_RECORDS_HEADER: &str = "Evaluation Records:";

/// Score bands shared by both rubrics, highest first.
pub const SCORE_BANDS: [(u32, u32, &str); 5] = [
    (
        90,
        100,
        "fully accurate and complete, clearly worded, covers every key point of the golden truth with no factual errors",
    ),
    (
        75,
        89,
        "mostly accurate and well written, but misses one minor detail or is slightly ambiguous",
    ),
    (
        50,
        74,
        "partially correct; misses one or more important points or adds distracting information",
    ),
    (
        25,
        49,
        "limited correctness, lacks critical information or contains factual errors",
    ),
    (0, 24, "mostly or completely incorrect, misleading, or irrelevant"),
];

/// Label attached to the n-th (1-based) candidate response.
pub fn response_label(n: usize, source: &str) -> String {
    format!("Response {} (Source: {})", n, source)
}

pub fn build_run_prompt(golden_truth: &str, responses: &[SourceResponse]) -> String {
    let mut p = String::new();

    p.push_str(
        "You are an impartial judge. Score each AI response below against the golden truth \
         for accuracy, relevance and completeness. Responses must contain the key points of the \
         golden truth, be factually correct and avoid misleading content. Extra detail is \
         acceptable only when it is accurate and does not distract from the answer. Omitting an \
         important fact lowers the score even if everything stated is correct.\n\n",
    );

    p.push_str("Scoring rubric (score out of 100):\n");
    for (lo, hi, text) in SCORE_BANDS {
        let _ = writeln!(p, "- {} to {}: {}", lo, hi, text);
    }

    let example = responses
        .first()
        .map(|r| r.source.as_str())
        .unwrap_or("SourceName");
    let _ = write!(
        p,
        "\nThe \"source\" value of every entry must repeat the source name exactly as written \
         after \"Source:\" in its label (for example \"{example}\"). Never answer with a \
         generic label such as \"Response 1\" or \"{wrapped}\".\n\n",
        example = example,
        wrapped = response_label(1, example),
    );

    p.push_str(
        "Return ONLY a JSON array, one entry per response, in this shape:\n\
         [\n  {\n    \"source\": \"<exact source name>\",\n    \"score\": <number 0-100>,\n    \
         \"explanation\": \"<why this score>\"\n  }\n]\n\
         Do not wrap the JSON in markdown and do not add any text before or after it.\n\n",
    );

    let _ = writeln!(p, "{}", GOLDEN_TRUTH_HEADER);
    let _ = writeln!(p, "{}\n", golden_truth.trim());

    let _ = writeln!(p, "{}", RESPONSES_HEADER);
    for (i, r) in responses.iter().enumerate() {
        if i > 0 {
            p.push('\n');
        }
        let _ = writeln!(p, "{}:", response_label(i + 1, &r.source));
        let _ = writeln!(p, "{}", r.content.trim());
    }
    p
}

/// Human-readable timestamp cited in the meta rubric, e.g. "March 24, 2025 14:05 UTC".
pub fn format_record_date(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%B %-d, %Y %H:%M UTC").to_string()
}

pub fn format_history(records: &[HistoryRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "({}) [{}]", i + 1, format_record_date(&r.created_at));
        let _ = writeln!(out, "Question ID: {}", r.question_id);
        let _ = writeln!(out, "Question: {}", r.question_text.trim());
        let _ = writeln!(out, "Score: {}", r.score);
        let _ = writeln!(out, "Explanation: {}", r.explanation.trim());
    }
    out
}

pub const META_SECTIONS: [&str; 5] = [
    "General Evaluation",
    "Improvement Over Time",
    "Areas for Improvement",
    "Common Error Patterns",
    "Final Recommendation",
];

pub fn build_meta_prompt(source: &str, records: &[HistoryRecord]) -> String {
    let mut p = String::new();

    p.push_str(
        "You are an unbiased expert reviewing how one AI source has performed across many \
         scored test runs. Each record below has a timestamp, the question, the score a judge \
         gave and that judge's explanation. Records are in chronological order.\n\n",
    );

    p.push_str("Score the source from 0 to 100 in each category:\n");
    p.push_str("- accuracy: factual correctness across answers\n");
    p.push_str("- completeness: coverage of the key points\n");
    p.push_str("- clarity: clear, understandable wording\n");
    p.push_str("- consistency: how stable quality is across questions and over time\n");
    p.push_str("and give an overall score from 0 to 100.\n\n");

    p.push_str("Bands for every category and the overall score:\n");
    let meta_bands = [
        "excellent, consistently strong",
        "good, minor flaws",
        "mixed, inconsistent or incomplete",
        "poor, frequent errors or omissions",
        "very poor, mostly wrong or irrelevant",
    ];
    for ((lo, hi, _), label) in SCORE_BANDS.iter().zip(meta_bands) {
        let _ = writeln!(p, "- {} to {}: {}", lo, hi, label);
    }

    p.push_str(
        "\nWrite a Markdown summary with exactly five sections, each starting with a bold \
         numbered heading and each about eight sentences long:\n",
    );
    for (i, s) in META_SECTIONS.iter().enumerate() {
        let _ = writeln!(p, "**{}. {}**", i + 1, s);
    }
    p.push_str(
        "\nSections 1 to 4 must each cite between 6 and 10 concrete examples from the records. \
         Every example must state the literal date and the literal score it refers to, e.g. \
         \"On **March 24, 2025** the source scored **87** when ...\". Section 2 must compare \
         earlier and later scores and say what improved, how, and why it matters. Section 3 \
         covers recurring failures, section 4 groups mistakes into patterns. Section 5 gives a \
         final recommendation on trustworthiness and suitability and needs no examples. If \
         there are fewer records than the example counts ask for, cite every record.\n\n",
    );

    p.push_str(
        "Return ONLY this JSON object, with no markdown fences or commentary around it:\n\
         {\n  \"source\": \"<source name>\",\n  \"accuracy\": <int>,\n  \"completeness\": <int>,\n  \
         \"clarity\": <int>,\n  \"consistency\": <int>,\n  \"overall\": <int>,\n  \
         \"summary\": \"<the five-section Markdown text>\"\n}\n\n",
    );

    let _ = writeln!(p, "{} {}\n", META_SOURCE_PREFIX, source);
    let _ = writeln!(p, "{}", META_RECORDS_HEADER);
    p.push_str(&format_history(records));
    p
}
