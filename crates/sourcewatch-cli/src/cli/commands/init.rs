use super::exit_codes;
use crate::cli::args::InitArgs;
use anyhow::Result;
use sourcewatch_core::config::{load_config, write_sample_config};

pub fn cmd_init(args: InitArgs) -> Result<i32> {
    if args.config.exists() && !args.force {
        println!(
            "⚠️  {} already exists, skipping (use --force to overwrite).",
            args.config.display()
        );
    } else {
        write_sample_config(&args.config)?;
        println!("✅ Wrote {}", args.config.display());
    }

    let cfg = load_config(&args.config, false)?;
    let stats = super::open_store(&cfg)?.stats()?;
    println!(
        "✅ Database ready at {} ({} questions, {} results, {} meta evaluations)",
        cfg.db_path().display(),
        stats.questions,
        stats.results,
        stats.meta_evaluations
    );
    println!("Next: set the env vars named in the config, then `sourcewatch questions import <file>`.");
    Ok(exit_codes::OK)
}
