use super::{exit_codes, load_app, print_json};
use crate::cli::args::TrendArgs;
use anyhow::Result;
use sourcewatch_core::report::console;
use sourcewatch_core::storage::ResultStore;
use sourcewatch_core::trend::{aggregate_by_source, aggregate_overall};

pub fn cmd_trend(args: TrendArgs) -> Result<i32> {
    let app = load_app(&args.cfg, false)?;
    let results: Vec<_> = app
        .store
        .list_all()?
        .into_iter()
        .filter(|r| args.source.as_deref().map_or(true, |s| r.source == s))
        .filter(|r| args.question.map_or(true, |q| r.question_id == q))
        .collect();

    let by_source = aggregate_by_source(&results);
    let overall = aggregate_overall(&results);

    if args.format == "json" {
        print_json(&serde_json::json!({
            "sources": by_source,
            "overall": overall,
        }))?;
    } else {
        print!("{}", console::render_trend(&by_source, &overall));
    }
    Ok(exit_codes::OK)
}
