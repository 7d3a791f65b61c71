use crate::{check_status, text_at};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sourcewatch_core::errors::TransportError;
use sourcewatch_core::providers::source::SourceAdapter;

/// JSON-over-HTTP search endpoint: POST the question, read the answer at a
/// JSON pointer.
pub struct HttpJsonSource {
    pub id: String,
    pub url: String,
    pub query_field: String,
    pub response_pointer: String,
    /// Static fields merged into every request body.
    pub extra: Option<Value>,
    pub client: reqwest::Client,
}

impl HttpJsonSource {
    pub fn request_body(&self, question: &str) -> Value {
        let mut body = match &self.extra {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        };
        // Templated conversation turns carry the question too.
        for v in body.values_mut() {
            substitute_question(v, question);
        }
        body.insert(self.query_field.clone(), Value::String(question.to_string()));
        Value::Object(body)
    }
}

const QUESTION_PLACEHOLDER: &str = "{{question}}";

fn substitute_question(v: &mut Value, question: &str) {
    match v {
        Value::String(s) if s.contains(QUESTION_PLACEHOLDER) => {
            *s = s.replace(QUESTION_PLACEHOLDER, question);
        }
        Value::Array(items) => items.iter_mut().for_each(|i| substitute_question(i, question)),
        Value::Object(m) => m.values_mut().for_each(|i| substitute_question(i, question)),
        _ => {}
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn answer(&self, question: &str) -> Result<String, TransportError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&self.request_body(question))
            .send()
            .await?;
        let body: Value = check_status(resp).await?.json().await?;
        text_at(&body, &self.response_pointer)
    }
}
