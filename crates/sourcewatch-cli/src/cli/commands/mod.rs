pub mod init;
pub mod meta;
pub mod questions;
pub mod results;
pub mod run;
pub mod score;
pub mod trend;

use crate::cli::args::{Cli, Command, ConfigArgs};
use anyhow::Context;
use sourcewatch_core::config::{load_config, parse_config, AppConfig};
use sourcewatch_core::providers::llm::{build_judge, JudgeRole};
use sourcewatch_core::storage::Store;
use sourcewatch_core::{EvalError, Evaluator, MetaEvaluator, RunGuard, RunPolicy};
use std::sync::Arc;
use std::time::Duration;

pub mod exit_codes {
    pub const OK: i32 = 0;
    /// Run completed, but some sources failed, entries were dropped or questions errored.
    pub const FAILURES: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Init(args) => init::cmd_init(args),
        Command::Questions(args) => questions::cmd_questions(args),
        Command::Run(args) => run::cmd_run(args).await,
        Command::Score(args) => score::cmd_score(args).await,
        Command::Results(args) => results::cmd_results(args),
        Command::Meta(args) => meta::cmd_meta(args).await,
        Command::Trend(args) => trend::cmd_trend(args),
        Command::Version => {
            println!("sourcewatch {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

pub(crate) struct App {
    pub cfg: AppConfig,
    pub store: Store,
}

/// Loads config and opens the store. Read-only commands may run without a
/// config file, in which case defaults apply.
pub(crate) fn load_app(args: &ConfigArgs, require_config: bool) -> anyhow::Result<App> {
    let mut cfg = if args.config.exists() {
        load_config(&args.config, args.strict_config)?
    } else if require_config {
        anyhow::bail!(
            "config error: {} not found (run `sourcewatch init` first)",
            args.config.display()
        );
    } else {
        let mut cfg = parse_config("version: 1\n", false)?;
        if let Ok(db) = std::env::var("SOURCEWATCH_DB") {
            cfg.db = Some(db);
        }
        cfg
    };
    if let Some(db) = &args.db {
        cfg.db = Some(db.to_string_lossy().to_string());
    }

    let store = open_store(&cfg)?;
    Ok(App { cfg, store })
}

pub(crate) fn open_store(cfg: &AppConfig) -> anyhow::Result<Store> {
    let path = cfg.db_path();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = Store::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    store.init_schema()?;
    Ok(store)
}

fn judge_timeout(cfg: &AppConfig) -> Option<Duration> {
    cfg.settings.timeout_seconds.map(Duration::from_secs)
}

pub(crate) fn build_evaluator(app: &App, guard: &RunGuard) -> anyhow::Result<Evaluator> {
    let adapters = sourcewatch_sources::build_adapters(&app.cfg)?;
    let judge = build_judge(&app.cfg.judge, JudgeRole::PerRun, judge_timeout(&app.cfg))?;
    let store = Arc::new(app.store.clone());
    Ok(Evaluator::new(
        store.clone(),
        store,
        adapters,
        judge,
        RunPolicy::from_settings(&app.cfg.settings),
    )
    .with_guard(guard.clone()))
}

pub(crate) fn build_meta_evaluator(app: &App, guard: &RunGuard) -> anyhow::Result<MetaEvaluator> {
    let judge = build_judge(&app.cfg.judge, JudgeRole::Meta, judge_timeout(&app.cfg))?;
    let store = Arc::new(app.store.clone());
    Ok(
        MetaEvaluator::new(store.clone(), store.clone(), store, judge)
            .with_guard(guard.clone()),
    )
}

/// Prints a pipeline error and picks the exit code for it.
pub(crate) fn report_eval_error(e: &EvalError) -> i32 {
    eprintln!("❌ {}", e);
    match e {
        e if e.is_not_found() => exit_codes::NOT_FOUND,
        EvalError::NoResponses { .. }
        | EvalError::JudgeUnavailable(_)
        | EvalError::JudgeOutput(_) => exit_codes::FAILURES,
        _ => exit_codes::CONFIG_ERROR,
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
