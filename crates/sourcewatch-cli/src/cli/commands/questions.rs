use super::{exit_codes, load_app, print_json};
use crate::cli::args::{QuestionsArgs, QuestionsImportArgs, QuestionsListArgs, QuestionsSub};
use anyhow::{Context, Result};
use sourcewatch_core::model::NewQuestion;
use sourcewatch_core::storage::QuestionBank;

pub fn cmd_questions(args: QuestionsArgs) -> Result<i32> {
    match args.cmd {
        QuestionsSub::Import(a) => cmd_import(a),
        QuestionsSub::List(a) => cmd_list(a),
    }
}

/// Accepts a bare list or a `questions:` wrapper; JSON parses as YAML.
fn parse_question_file(text: &str) -> Result<Vec<NewQuestion>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum QuestionFile {
        List(Vec<NewQuestion>),
        Wrapped { questions: Vec<NewQuestion> },
    }

    let parsed: QuestionFile =
        serde_yaml::from_str(text).context("expected a list of {question, golden_truth}")?;
    Ok(match parsed {
        QuestionFile::List(q) => q,
        QuestionFile::Wrapped { questions } => questions,
    })
}

fn cmd_import(args: QuestionsImportArgs) -> Result<i32> {
    let app = load_app(&args.cfg, false)?;
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let questions = parse_question_file(&text)?;

    let mut imported = 0;
    let mut skipped = 0;
    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() || q.golden_truth.trim().is_empty() {
            tracing::warn!(
                event = "sourcewatch.questions.skipped",
                index = i + 1,
                "question or golden truth is empty"
            );
            skipped += 1;
            continue;
        }
        app.store.insert_question(q, None)?;
        imported += 1;
    }

    println!("✅ Imported {} questions ({} skipped).", imported, skipped);
    Ok(if skipped > 0 {
        exit_codes::FAILURES
    } else {
        exit_codes::OK
    })
}

fn cmd_list(args: QuestionsListArgs) -> Result<i32> {
    let app = load_app(&args.cfg, false)?;
    let questions = app.store.list_questions()?;

    if args.format == "json" {
        print_json(&questions)?;
        return Ok(exit_codes::OK);
    }
    if questions.is_empty() {
        println!("No questions.");
    }
    for q in &questions {
        println!("#{:<5} {}", q.id, q.text);
        println!("       Golden truth: {}", q.golden_truth);
    }
    Ok(exit_codes::OK)
}
