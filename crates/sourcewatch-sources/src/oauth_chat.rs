use crate::{check_status, text_at};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use sourcewatch_core::errors::TransportError;
use sourcewatch_core::providers::source::SourceAdapter;

const STOP_SEQUENCE: &str = "<|im_end|>";

/// Chat-completions deployment behind a client-credentials token exchange.
///
/// A fresh token is requested for every question.
pub struct OauthChatSource {
    pub id: String,
    pub token_url: String,
    pub chat_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub app_key: Option<String>,
    pub system_prompt: String,
    pub client: reqwest::Client,
}

impl OauthChatSource {
    async fn access_token(&self) -> Result<String, TransportError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let resp = check_status(resp).await.map_err(|e| match e {
            TransportError::Status { status, body } => {
                TransportError::Auth(format!("token endpoint returned {}: {}", status, body))
            }
            other => other,
        })?;
        let body: Value = resp.json().await?;
        body.get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| TransportError::Auth("token response has no access_token".into()))
    }

    pub fn chat_body(&self, question: &str) -> Value {
        let mut body = json!({
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": question },
            ],
            "stop": [STOP_SEQUENCE],
        });
        if let Some(key) = &self.app_key {
            body["user"] = Value::String(json!({ "appkey": key }).to_string());
        }
        body
    }
}

#[async_trait]
impl SourceAdapter for OauthChatSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn answer(&self, question: &str) -> Result<String, TransportError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(&self.chat_url)
            .header(ACCEPT, "application/json")
            .header("api-key", token)
            .json(&self.chat_body(question))
            .send()
            .await?;
        let body: Value = check_status(resp).await?.json().await?;
        text_at(&body, "/choices/0/message/content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_shape() {
        let s = OauthChatSource {
            id: "BridgeIT".into(),
            token_url: String::new(),
            chat_url: String::new(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            app_key: Some("k-123".into()),
            system_prompt: "You are a chatbot".into(),
            client: reqwest::Client::new(),
        };
        let body = s.chat_body("What is ACI?");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is ACI?");
        assert_eq!(body["stop"][0], STOP_SEQUENCE);
        assert_eq!(body["user"], r#"{"appkey":"k-123"}"#);
    }
}
