use super::{build_meta_evaluator, exit_codes, load_app, print_json, report_eval_error};
use crate::cli::args::{MetaArgs, MetaListArgs, MetaRunArgs, MetaSub};
use anyhow::Result;
use sourcewatch_core::report::console;
use sourcewatch_core::storage::MetaStore;
use sourcewatch_core::RunGuard;

pub async fn cmd_meta(args: MetaArgs) -> Result<i32> {
    match args.cmd {
        MetaSub::Run(a) => cmd_meta_run(a).await,
        MetaSub::List(a) => cmd_meta_list(a),
    }
}

async fn cmd_meta_run(args: MetaRunArgs) -> Result<i32> {
    let app = load_app(&args.cfg, true)?;
    let evaluator = build_meta_evaluator(&app, &RunGuard::new())?;

    if let Some(source) = &args.source {
        let row = match evaluator.run_meta_eval(source).await {
            Ok(r) => r,
            Err(e) => return Ok(report_eval_error(&e)),
        };
        if args.format == "json" {
            print_json(&row)?;
        } else {
            print!("{}", console::render_meta(std::slice::from_ref(&row), true));
        }
        return Ok(exit_codes::OK);
    }

    let sources = app.cfg.source_ids();
    if sources.is_empty() {
        eprintln!("❌ no sources configured");
        return Ok(exit_codes::CONFIG_ERROR);
    }
    let outcomes = match evaluator.run_meta_eval_all(&sources).await {
        Ok(o) => o,
        Err(e) => return Ok(report_eval_error(&e)),
    };

    let mut rows = Vec::new();
    let mut failed = 0;
    for (source, res) in outcomes {
        match res {
            Ok(row) => rows.push(row),
            Err(e) => {
                failed += 1;
                eprintln!("⚠️  {}: {}", source, e);
            }
        }
    }
    if args.format == "json" {
        print_json(&rows)?;
    } else {
        print!("{}", console::render_meta(&rows, false));
    }
    Ok(if failed > 0 {
        exit_codes::FAILURES
    } else {
        exit_codes::OK
    })
}

fn cmd_meta_list(args: MetaListArgs) -> Result<i32> {
    let app = load_app(&args.cfg, false)?;
    // Listing reads the store directly and needs no judge credentials.
    let rows = app.store.list_meta(args.source.as_deref())?;

    if args.format == "json" {
        print_json(&rows)?;
    } else {
        print!("{}", console::render_meta(&rows, args.full));
    }
    Ok(exit_codes::OK)
}
