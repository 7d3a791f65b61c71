use super::{build_evaluator, exit_codes, load_app, print_json, report_eval_error};
use crate::cli::args::RunArgs;
use anyhow::Result;
use sourcewatch_core::report::console;
use sourcewatch_core::RunGuard;

pub async fn cmd_run(args: RunArgs) -> Result<i32> {
    let app = load_app(&args.cfg, true)?;
    let evaluator = build_evaluator(&app, &RunGuard::new())?;

    if args.all {
        let reports = match evaluator.run_all_tests().await {
            Ok(r) => r,
            Err(e) => return Ok(report_eval_error(&e)),
        };
        if args.format == "json" {
            print_json(&reports)?;
        } else {
            print!("{}", console::render_run_reports(&reports));
        }
        let clean = reports
            .iter()
            .all(|r| r.outcome.as_ref().is_some_and(|o| o.is_clean()));
        return Ok(if clean {
            exit_codes::OK
        } else {
            exit_codes::FAILURES
        });
    }

    let Some(question_id) = args.question else {
        anyhow::bail!("either --question or --all is required");
    };
    let outcome = match evaluator.run_test(question_id).await {
        Ok(o) => o,
        Err(e) => return Ok(report_eval_error(&e)),
    };
    if args.format == "json" {
        print_json(&outcome)?;
    } else {
        print!("{}", console::render_outcome(&outcome));
    }
    Ok(if outcome.is_clean() {
        exit_codes::OK
    } else {
        exit_codes::FAILURES
    })
}
