use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sourcewatch",
    version,
    about = "Monitor the answer quality of several AI sources against golden truths"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config and create the database
    Init(InitArgs),
    Questions(QuestionsArgs),
    /// Ask every source, judge the answers and store the scores
    Run(RunArgs),
    /// Judge and store a response obtained outside the configured sources
    Score(ScoreArgs),
    /// Stored results for one question, newest first
    Results(ResultsArgs),
    Meta(MetaArgs),
    /// Per-day average score per source
    Trend(TrendArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long, default_value = "sourcewatch.yaml")]
    pub config: PathBuf,

    /// Overrides the config's `db` (and SOURCEWATCH_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Fail on unknown config keys instead of warning
    #[arg(long)]
    pub strict_config: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "sourcewatch.yaml")]
    pub config: PathBuf,

    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Clone)]
pub struct QuestionsArgs {
    #[command(subcommand)]
    pub cmd: QuestionsSub,
}

#[derive(Subcommand, Clone)]
pub enum QuestionsSub {
    /// Load question/golden-truth pairs from a YAML or JSON list
    Import(QuestionsImportArgs),
    List(QuestionsListArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct QuestionsImportArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    pub file: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct QuestionsListArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["question", "all"])))]
pub struct RunArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub question: Option<i64>,

    /// Every question in the bank, one after another
    #[arg(long)]
    pub all: bool,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(ArgGroup::new("input").required(true).args(["response", "response_file"])))]
pub struct ScoreArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub question: i64,

    /// Label stored with the result
    #[arg(long)]
    pub source: String,

    #[arg(long)]
    pub response: Option<String>,

    /// Read the response from a file, or stdin with "-"
    #[arg(long)]
    pub response_file: Option<PathBuf>,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
pub struct ResultsArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub question: i64,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(Parser, Clone)]
pub struct MetaArgs {
    #[command(subcommand)]
    pub cmd: MetaSub,
}

#[derive(Subcommand, Clone)]
pub enum MetaSub {
    /// Digest a source's whole history into a new snapshot
    Run(MetaRunArgs),
    /// Stored snapshots, newest first
    List(MetaListArgs),
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["source", "all"])))]
pub struct MetaRunArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub source: Option<String>,

    /// Every configured source, one after another
    #[arg(long)]
    pub all: bool,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
pub struct MetaListArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub source: Option<String>,

    /// Print the narrative summary too
    #[arg(long)]
    pub full: bool,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}

#[derive(clap::Args, Debug, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub cfg: ConfigArgs,

    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub question: Option<i64>,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json
}
