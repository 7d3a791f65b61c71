//! Concrete [`SourceAdapter`] implementations and their construction from
//! configuration.

use anyhow::Context;
use sourcewatch_core::config::{AppConfig, SourceConfig, SourceKind};
use sourcewatch_core::errors::TransportError;
use sourcewatch_core::providers::source::SourceAdapter;
use std::sync::Arc;
use std::time::Duration;

pub mod gradio;
pub mod http_json;
pub mod oauth_chat;
pub mod replay;

pub use gradio::GradioSource;
pub use http_json::HttpJsonSource;
pub use oauth_chat::OauthChatSource;
pub use replay::ReplaySource;

pub fn build_adapters(cfg: &AppConfig) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let client = http_client(cfg.settings.timeout_seconds)?;
    cfg.sources
        .iter()
        .map(|s| {
            build_adapter(s, &client).with_context(|| format!("failed to set up source '{}'", s.id))
        })
        .collect()
}

pub fn build_adapter(
    cfg: &SourceConfig,
    client: &reqwest::Client,
) -> anyhow::Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match &cfg.kind {
        SourceKind::HttpJson {
            url,
            query_field,
            response_pointer,
            extra,
        } => Arc::new(HttpJsonSource {
            id: cfg.id.clone(),
            url: url.clone(),
            query_field: query_field.clone(),
            response_pointer: response_pointer.clone(),
            extra: extra.clone(),
            client: client.clone(),
        }),
        SourceKind::OauthChat {
            token_url,
            chat_url,
            client_id_env,
            client_secret_env,
            app_key_env,
            system_prompt,
        } => Arc::new(OauthChatSource {
            id: cfg.id.clone(),
            token_url: token_url.clone(),
            chat_url: chat_url.clone(),
            client_id: require_env(client_id_env)?,
            client_secret: require_env(client_secret_env)?,
            app_key: app_key_env.as_deref().map(require_env).transpose()?,
            system_prompt: system_prompt.clone(),
            client: client.clone(),
        }),
        SourceKind::Gradio { url, endpoint } => Arc::new(GradioSource {
            id: cfg.id.clone(),
            base_url: url.trim_end_matches('/').to_string(),
            endpoint: endpoint.trim_matches('/').to_string(),
            client: client.clone(),
        }),
        SourceKind::Replay { file } => Arc::new(ReplaySource::from_path(&cfg.id, file)?),
    };
    Ok(adapter)
}

pub fn http_client(timeout_seconds: Option<u64>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("config error: env var {} is not set", name))
}

/// Passes 2xx responses through; anything else becomes `TransportError::Status`.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status,
        body: body.chars().take(500).collect(),
    })
}

/// Reads the string at `pointer`. Non-string scalars are rendered as JSON.
pub(crate) fn text_at(body: &serde_json::Value, pointer: &str) -> Result<String, TransportError> {
    match body.pointer(pointer) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Null) | None => Err(TransportError::Format(format!(
            "no answer at '{}'",
            pointer
        ))),
        Some(other) => Ok(other.to_string()),
    }
}
