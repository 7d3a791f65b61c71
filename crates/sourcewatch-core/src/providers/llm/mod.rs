use crate::config::JudgeConfig;
use crate::errors::JudgeUnavailableError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Sends a fully built prompt to the judge model and returns its raw text.
///
/// Implementations do no interpretation of the output.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, JudgeUnavailableError>;
    fn provider_name(&self) -> &'static str;
    fn model(&self) -> &str;
}

pub mod fake;
pub mod openai;

/// Which rubric a client will be used for; selects `model` vs `meta_model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeRole {
    PerRun,
    Meta,
}

pub fn build_judge(
    cfg: &JudgeConfig,
    role: JudgeRole,
    timeout: Option<Duration>,
) -> anyhow::Result<Arc<dyn JudgeClient>> {
    let model = match role {
        JudgeRole::PerRun => cfg.model.clone(),
        JudgeRole::Meta => cfg.meta_model().to_string(),
    };

    match cfg.provider.as_str() {
        "fake" => Ok(Arc::new(fake::FakeJudge::new(model))),
        "openai" => {
            let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
                anyhow::anyhow!(
                    "config error: judge provider 'openai' requires env var {}",
                    cfg.api_key_env
                )
            })?;
            let mut client = openai::OpenAIClient::new(model, api_key, timeout)?;
            if let Some(url) = &cfg.base_url {
                client = client.with_base_url(url);
            }
            client.temperature = cfg.temperature;
            client.max_tokens = cfg.max_tokens;
            Ok(Arc::new(client))
        }
        other => anyhow::bail!("config error: unknown judge provider '{}'", other),
    }
}
