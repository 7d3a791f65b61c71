use super::{exit_codes, load_app, print_json};
use crate::cli::args::ResultsArgs;
use anyhow::Result;
use sourcewatch_core::report::console;
use sourcewatch_core::storage::{QuestionBank, ResultStore};

pub fn cmd_results(args: ResultsArgs) -> Result<i32> {
    let app = load_app(&args.cfg, false)?;
    let Some(question) = app.store.get_question(args.question)? else {
        eprintln!("❌ question {} not found", args.question);
        return Ok(exit_codes::NOT_FOUND);
    };
    let results = app.store.list_by_question(question.id)?;

    if args.format == "json" {
        print_json(&results)?;
    } else {
        println!("#{} {}", question.id, question.text);
        println!("Golden truth: {}\n", question.golden_truth);
        print!("{}", console::render_results(&results));
    }
    Ok(exit_codes::OK)
}
