use async_trait::async_trait;
use serde::Deserialize;
use sourcewatch_core::errors::TransportError;
use sourcewatch_core::providers::source::SourceAdapter;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ReplayLine {
    source: String,
    question: String,
    #[serde(alias = "answer", alias = "text")]
    response: String,
}

/// Answers recorded earlier (JSONL), keyed by question text.
///
/// Only lines whose `source` equals this adapter's id are loaded; a later
/// line for the same question wins.
#[derive(Clone)]
pub struct ReplaySource {
    id: String,
    answers: Arc<HashMap<String, String>>,
}

impl ReplaySource {
    pub fn from_path<P: AsRef<Path>>(id: &str, path: P) -> anyhow::Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "failed to open replay file '{}': {}",
                path.as_ref().display(),
                e
            )
        })?;
        let reader = std::io::BufReader::new(file);

        let mut answers = HashMap::new();
        for (i, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ReplayLine = serde_json::from_str(&line)
                .map_err(|e| anyhow::anyhow!("line {}: parse error: {}", i + 1, e))?;
            if entry.source == id {
                answers.insert(entry.question.trim().to_string(), entry.response);
            }
        }

        if answers.is_empty() {
            tracing::warn!(
                event = "sourcewatch.replay.empty",
                source = %id,
                path = %path.as_ref().display(),
                "replay file has no answers for this source"
            );
        }

        Ok(Self {
            id: id.to_string(),
            answers: Arc::new(answers),
        })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
impl SourceAdapter for ReplaySource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn answer(&self, question: &str) -> Result<String, TransportError> {
        self.answers
            .get(question.trim())
            .cloned()
            .ok_or(TransportError::ReplayMiss)
    }
}
