use crate::errors::ConfigError;
use crate::score_policy::ScorePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_DB_PATH: &str = ".sourcewatch/sourcewatch.db";
pub const DEFAULT_PARALLEL: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, alias = "configVersion")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl AppConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(self.db.as_deref().unwrap_or(DEFAULT_DB_PATH))
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Max adapter calls in flight within one run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub score_policy: ScorePolicy,
}

impl Settings {
    pub fn parallel(&self) -> usize {
        self.parallel.unwrap_or(DEFAULT_PARALLEL).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeConfig {
    /// "openai" or "fake"
    #[serde(default = "default_judge_provider")]
    pub provider: String,
    #[serde(default = "default_judge_model")]
    pub model: String,
    /// Model used for meta-evaluations; falls back to `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: default_judge_provider(),
            model: default_judge_model(),
            meta_model: None,
            temperature: None,
            max_tokens: None,
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl JudgeConfig {
    pub fn meta_model(&self) -> &str {
        self.meta_model.as_deref().unwrap_or(&self.model)
    }
}

fn default_judge_provider() -> String {
    "openai".into()
}

fn default_judge_model() -> String {
    "gpt-4o-mini".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Stable label; persisted verbatim as `test_results.source`.
    pub id: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceKind {
    /// POST `{ <query_field>: question, ..extra }`, answer at `response_pointer`.
    HttpJson {
        url: String,
        #[serde(default = "default_query_field")]
        query_field: String,
        response_pointer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra: Option<serde_json::Value>,
    },
    /// Client-credentials token exchange followed by a chat-completions call.
    OauthChat {
        token_url: String,
        chat_url: String,
        #[serde(default = "default_client_id_env")]
        client_id_env: String,
        #[serde(default = "default_client_secret_env")]
        client_secret_env: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app_key_env: Option<String>,
        #[serde(default = "default_system_prompt")]
        system_prompt: String,
    },
    /// Gradio app exposing a chat endpoint over the HTTP call API.
    Gradio {
        url: String,
        #[serde(default = "default_gradio_endpoint")]
        endpoint: String,
    },
    /// Recorded answers (JSONL) keyed by question text.
    Replay { file: String },
}

fn default_query_field() -> String {
    "query".into()
}

fn default_client_id_env() -> String {
    "CLIENT_ID".into()
}

fn default_client_secret_env() -> String {
    "CLIENT_SECRET".into()
}

fn default_system_prompt() -> String {
    "You are a chatbot".into()
}

fn default_gradio_endpoint() -> String {
    "chat".into()
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e, path.display())))?;

    normalize_paths(&mut cfg, path);
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parses and validates config text without touching the filesystem.
pub fn parse_config(raw: &str, strict: bool) -> Result<AppConfig, ConfigError> {
    let mut ignored_keys = HashSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .cloned()
        .collect();
    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown config fields: {:?}",
                meaningful
            )));
        }
        tracing::warn!(
            event = "sourcewatch.config.unknown_fields",
            fields = ?meaningful,
            "ignored unknown config fields"
        );
    }

    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    match cfg.judge.provider.as_str() {
        "openai" | "fake" => {}
        other => {
            return Err(ConfigError(format!(
                "unknown judge provider '{}' (expected openai|fake)",
                other
            )))
        }
    }

    let mut seen = HashSet::new();
    for s in &cfg.sources {
        if s.id.trim().is_empty() {
            return Err(ConfigError("source id must not be empty".into()));
        }
        if s.id != s.id.trim() {
            return Err(ConfigError(format!(
                "source id '{}' has surrounding whitespace",
                s.id
            )));
        }
        if !seen.insert(s.id.as_str()) {
            return Err(ConfigError(format!("duplicate source id '{}'", s.id)));
        }
    }

    if cfg.settings.parallel == Some(0) {
        return Err(ConfigError("settings.parallel must be at least 1".into()));
    }
    Ok(())
}

fn normalize_paths(cfg: &mut AppConfig, config_path: &Path) {
    let base = config_path.parent().unwrap_or(Path::new("."));

    if let Some(db) = cfg.db.as_mut() {
        *db = resolve_relative(base, db);
    }
    for s in &mut cfg.sources {
        if let SourceKind::Replay { file } = &mut s.kind {
            *file = resolve_relative(base, file);
        }
    }
}

fn resolve_relative(base: &Path, p: &str) -> String {
    if p.trim().is_empty() || p == ":memory:" {
        return p.to_string();
    }
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        return p.to_string();
    }

    let mut out = PathBuf::new();
    for c in base.join(pb).components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().to_string()
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("SOURCEWATCH_DB") {
        if !v.trim().is_empty() {
            cfg.db = Some(v);
        }
    }
    if let Ok(v) = std::env::var("SOURCEWATCH_JUDGE_MODEL") {
        if !v.trim().is_empty() {
            cfg.judge.model = v;
        }
    }
}

pub const SAMPLE_CONFIG: &str = r#"version: 1
db: .sourcewatch/sourcewatch.db
settings:
  parallel: 4
  timeout_seconds: 60
  score_policy: verbatim
judge:
  provider: openai
  model: gpt-4o-mini
  meta_model: gpt-4o
  api_key_env: OPENAI_API_KEY
sources:
  - id: Galileo
    kind: http_json
    url: https://example.invalid/api/4o-mini-search-openai
    query_field: query
    response_pointer: /summary
  - id: TeamInstance
    kind: http_json
    url: https://example.invalid/api/unified-search-ai
    query_field: query
    response_pointer: /aiResponse
    extra:
      resultsLimit: 5
      useVectorSearch: true
      conversation:
        - role: user
          content: "{{question}}"
  - id: BridgeIT
    kind: oauth_chat
    token_url: https://example.invalid/oauth2/token
    chat_url: https://example.invalid/openai/deployments/gpt-4o-mini/chat/completions
    client_id_env: CLIENT_ID
    client_secret_env: CLIENT_SECRET
    app_key_env: APP_KEY
  - id: Gradio
    kind: gradio
    url: https://example.invalid
    endpoint: chat
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
