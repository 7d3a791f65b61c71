use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(
        dir.path().join("sourcewatch.yaml"),
        r#"
version: 1
db: data/sw.db
judge:
  provider: fake
sources:
  - id: Galileo
    kind: replay
    file: answers.jsonl
  - id: Gradio
    kind: replay
    file: answers.jsonl
"#,
    )
    .unwrap();

    fs::write(
        dir.path().join("answers.jsonl"),
        r#"{"source":"Galileo","question":"What is the capital of France?","response":"Paris is the capital of France."}
{"source":"Gradio","question":"What is the capital of France?","response":"Lyon"}
{"source":"Galileo","question":"Who wrote Hamlet?","response":"William Shakespeare."}
"#,
    )
    .unwrap();

    fs::write(
        dir.path().join("questions.yaml"),
        r#"
- question: What is the capital of France?
  golden_truth: Paris is the capital of France
- question: Who wrote Hamlet?
  golden_truth: William Shakespeare wrote Hamlet
"#,
    )
    .unwrap();

    sourcewatch(dir.path())
        .args(["questions", "import", "questions.yaml"])
        .assert()
        .success()
        .stdout(contains("Imported 2 questions"));
    dir
}

fn sourcewatch(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sourcewatch").unwrap();
    cmd.current_dir(dir)
        .env("SOURCEWATCH_LOG", "error")
        .env_remove("SOURCEWATCH_DB")
        .env_remove("SOURCEWATCH_JUDGE_MODEL");
    cmd
}

#[test]
fn test_run_single_question_scores_every_source() {
    let dir = setup();

    sourcewatch(dir.path())
        .args(["run", "--question", "1"])
        .assert()
        .code(0)
        .stdout(contains("Galileo"))
        .stdout(contains("100.0"))
        .stdout(contains("Gradio"));

    let out = sourcewatch(dir.path())
        .args(["results", "--question", "1", "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let gradio = rows.iter().find(|r| r["source"] == "Gradio").unwrap();
    assert_eq!(gradio["score"], 0.0);
    assert_eq!(gradio["ai_response"], "Lyon");
}

#[test]
fn test_run_all_reports_failed_sources() {
    let dir = setup();

    // Gradio has no recorded answer for the second question.
    sourcewatch(dir.path())
        .args(["run", "--all"])
        .assert()
        .code(1)
        .stdout(contains("FAILED"))
        .stdout(contains("Summary: 2 questions, 1 clean, 1 with issues, 0 error"));
}

#[test]
fn test_not_found_exit_code() {
    let dir = setup();

    sourcewatch(dir.path())
        .args(["run", "--question", "99"])
        .assert()
        .code(3)
        .stderr(contains("question 99 not found"));

    sourcewatch(dir.path())
        .args(["meta", "run", "--source", "Galileo"])
        .assert()
        .code(3)
        .stderr(contains("no results for source: Galileo"));
}

#[test]
fn test_meta_and_trend_after_runs() {
    let dir = setup();
    sourcewatch(dir.path())
        .args(["run", "--question", "1"])
        .assert()
        .success();

    sourcewatch(dir.path())
        .args(["meta", "run", "--source", "Galileo"])
        .assert()
        .success()
        .stdout(contains("Galileo"))
        .stdout(contains("General Evaluation"));

    sourcewatch(dir.path())
        .args(["meta", "list", "--source", "Galileo"])
        .assert()
        .success()
        .stdout(contains("overall 100.0"));

    sourcewatch(dir.path())
        .args(["trend"])
        .assert()
        .success()
        .stdout(contains("Galileo"))
        .stdout(contains("Overall"));

    let out = sourcewatch(dir.path())
        .args(["trend", "--source", "Gradio", "--format", "json"])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["sources"].as_array().unwrap().len(), 1);
    assert_eq!(v["sources"][0]["points"][0]["mean_score"], 0.0);
}

#[test]
fn test_score_provided_response() {
    let dir = setup();

    sourcewatch(dir.path())
        .args([
            "score",
            "--question",
            "2",
            "--source",
            "FinAI",
            "--response",
            "William Shakespeare wrote Hamlet.",
        ])
        .assert()
        .success()
        .stdout(contains("FinAI"))
        .stdout(contains("100.0"));

    sourcewatch(dir.path())
        .args(["results", "--question", "2"])
        .assert()
        .success()
        .stdout(contains("FinAI"));
}

#[test]
fn test_questions_list() {
    let dir = setup();
    sourcewatch(dir.path())
        .args(["questions", "list"])
        .assert()
        .success()
        .stdout(contains("#1"))
        .stdout(contains("Who wrote Hamlet?"));
}
