use super::{build_evaluator, exit_codes, load_app, print_json, report_eval_error};
use crate::cli::args::ScoreArgs;
use anyhow::{Context, Result};
use sourcewatch_core::report::console;
use sourcewatch_core::RunGuard;
use tokio::io::AsyncReadExt;

async fn read_response(args: &ScoreArgs) -> Result<String> {
    if let Some(text) = &args.response {
        return Ok(text.clone());
    }
    let Some(path) = &args.response_file else {
        anyhow::bail!("either --response or --response-file is required");
    };
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read response from stdin")?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

pub async fn cmd_score(args: ScoreArgs) -> Result<i32> {
    let response = read_response(&args).await?;
    if response.trim().is_empty() {
        anyhow::bail!("response is empty");
    }

    let app = load_app(&args.cfg, true)?;
    let evaluator = build_evaluator(&app, &RunGuard::new())?;
    let outcome = match evaluator
        .evaluate_provided(args.question, args.source.trim(), &response)
        .await
    {
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
