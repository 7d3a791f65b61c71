use crate::model::{MetaEvaluation, QuestionRunReport, RunOutcome, SourceTrend, TestResult, TrendPoint};
use std::fmt::Write;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn truncate(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        format!("{}...", flat.chars().take(max).collect::<String>())
    } else {
        flat
    }
}

pub fn render_outcome(o: &RunOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Question #{}", o.question_id);
    for r in &o.results {
        let _ = writeln!(
            out,
            "✅ {:<20} {:>6.1}  {}",
            r.source,
            r.score,
            truncate(&r.explanation, 80)
        );
    }
    for f in &o.failed_sources {
        let _ = writeln!(out, "💥 {:<20} FAILED: {}", f.source, f.error);
    }
    for d in &o.dropped {
        let _ = writeln!(out, "⚠️  {:<20} DROPPED: {}", d.label, d.reason);
    }
    if o.judge_output_malformed {
        let _ = writeln!(
            out,
            "⚠️  judge output could not be parsed; zero scores recorded"
        );
    }
    out
}

pub fn render_run_reports(reports: &[QuestionRunReport]) -> String {
    let mut out = String::new();
    let mut clean = 0;
    let mut degraded = 0;
    let mut errors = 0;

    for r in reports {
        match (&r.outcome, &r.error) {
            (Some(o), _) => {
                if o.is_clean() {
                    clean += 1;
                } else {
                    degraded += 1;
                }
                out.push_str(&render_outcome(o));
            }
            (None, Some(e)) => {
                errors += 1;
                let _ = writeln!(out, "💥 Question #{} ERROR: {}", r.question_id, e);
            }
            (None, None) => {}
        }
    }

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(
        out,
        "Summary: {} questions, {} clean, {} with issues, {} error",
        reports.len(),
        clean,
        degraded,
        errors
    );
    out
}

pub fn render_results(results: &[TestResult]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }
    let mut out = String::new();
    for r in results {
        let _ = writeln!(
            out,
            "{}  #{:<5} {:<20} {:>6.1}",
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.id,
            r.source,
            r.score
        );
        let _ = writeln!(out, "    Response: {}", truncate(&r.ai_response, 100));
        let _ = writeln!(out, "    Explanation: {}", truncate(&r.explanation, 100));
    }
    out
}

pub fn render_meta(evals: &[MetaEvaluation], full_summary: bool) -> String {
    if evals.is_empty() {
        return "No meta evaluations.\n".to_string();
    }
    let mut out = String::new();
    for m in evals {
        let _ = writeln!(
            out,
            "{}  {:<20} overall {:>5.1}  (accuracy {:.1}, completeness {:.1}, clarity {:.1}, consistency {:.1})",
            m.created_at.format("%Y-%m-%d %H:%M"),
            m.source,
            m.overall,
            m.accuracy,
            m.completeness,
            m.clarity,
            m.consistency
        );
        if full_summary {
            let _ = writeln!(out, "\n{}\n", m.summary.trim());
        }
    }
    out
}

fn render_points(out: &mut String, points: &[TrendPoint]) {
    for p in points {
        let _ = writeln!(
            out,
            "  {}  {:>6.1}  (n={})",
            p.date, p.mean_score, p.count
        );
    }
}

pub fn render_trend(trends: &[SourceTrend], overall: &[TrendPoint]) -> String {
    if trends.is_empty() {
        return "No results.\n".to_string();
    }
    let mut out = String::new();
    for t in trends {
        let _ = writeln!(out, "{}", t.source);
        render_points(&mut out, &t.points);
    }
    if !overall.is_empty() {
        let _ = writeln!(out, "Overall");
        render_points(&mut out, overall);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DroppedEntry, SourceFailure};
    use chrono::Utc;

    #[test]
    fn outcome_lists_failures_and_drops() {
        let o = RunOutcome {
            question_id: 7,
            results: vec![TestResult {
                id: 1,
                question_id: 7,
                source: "Galileo".into(),
                ai_response: "Paris".into(),
                score: 95.0,
                explanation: "Correct".into(),
                created_at: Utc::now(),
            }],
            failed_sources: vec![SourceFailure {
                source: "Gradio".into(),
                error: "timed out after 5s".into(),
            }],
            dropped: vec![DroppedEntry {
                label: "Respnse 9".into(),
                reason: "no dispatched source matches".into(),
            }],
            judge_output_malformed: false,
        };
        let s = render_outcome(&o);
        assert!(s.contains("Question #7"));
        assert!(s.contains("Galileo"));
        assert!(s.contains("95.0"));
        assert!(s.contains("FAILED: timed out after 5s"));
        assert!(s.contains("DROPPED"));
    }

    #[test]
    fn truncate_flattens_and_shortens() {
        assert_eq!(truncate("a\n  b", 10), "a b");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
