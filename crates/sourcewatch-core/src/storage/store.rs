use crate::errors::StoreError;
use crate::model::{MetaEvaluation, MetaScores, NewQuestion, Question, TestResult};
use crate::storage::{MetaStore, QuestionBank, ResultStore};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub questions: u64,
    pub results: u64,
    pub meta_evaluations: u64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<u64, StoreError> {
            let n: i64 =
                conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as u64)
        };
        Ok(StoreStats {
            questions: count("questions")?,
            results: count("test_results")?,
            meta_evaluations: count("meta_source_evals")?,
        })
    }

    // questions

    pub fn insert_question(
        &self,
        q: &NewQuestion,
        embedding: Option<&[f32]>,
    ) -> Result<Question, StoreError> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO questions(question, golden_truth, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                q.question,
                q.golden_truth,
                embedding.map(encode_vec_f32),
                format_ts(&created_at)
            ],
        )?;
        Ok(Question {
            id: conn.last_insert_rowid(),
            text: q.question.clone(),
            golden_truth: q.golden_truth.clone(),
            embedding: embedding.map(|v| v.to_vec()),
            created_at: parse_ts(&format_ts(&created_at))?,
        })
    }

    // results

    /// Inserts with an explicit timestamp; used by imports of historical runs.
    pub fn insert_result_at(
        &self,
        question_id: i64,
        source: &str,
        ai_response: &str,
        score: f64,
        explanation: &str,
        created_at: DateTime<Utc>,
    ) -> Result<TestResult, StoreError> {
        let ts = format_ts(&created_at);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO test_results(question_id, source, ai_response, score, explanation, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![question_id, source, ai_response, score, explanation, ts],
        )?;
        Ok(TestResult {
            id: conn.last_insert_rowid(),
            question_id,
            source: source.to_string(),
            ai_response: ai_response.to_string(),
            score,
            explanation: explanation.to_string(),
            created_at: parse_ts(&ts)?,
        })
    }

    fn query_results(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<TestResult>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                TestResult {
                    id: row.get(0)?,
                    question_id: row.get(1)?,
                    source: row.get(2)?,
                    ai_response: row.get(3)?,
                    score: row.get(4)?,
                    explanation: row.get(5)?,
                    created_at: DateTime::<Utc>::MIN_UTC,
                },
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (mut result, ts) = r?;
            result.created_at = parse_ts(&ts)?;
            out.push(result);
        }
        Ok(out)
    }

    // meta

    fn query_meta(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<MetaEvaluation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                MetaEvaluation {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    accuracy: row.get(2)?,
                    completeness: row.get(3)?,
                    clarity: row.get(4)?,
                    consistency: row.get(5)?,
                    overall: row.get(6)?,
                    summary: row.get(7)?,
                    created_at: DateTime::<Utc>::MIN_UTC,
                },
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (mut meta, ts) = r?;
            meta.created_at = parse_ts(&ts)?;
            out.push(meta);
        }
        Ok(out)
    }
}

const RESULT_COLUMNS: &str =
    "id, question_id, source, ai_response, score, explanation, created_at";
const META_COLUMNS: &str =
    "id, source, accuracy, completeness, clarity, consistency, overall, summary, created_at";

impl QuestionBank for Store {
    fn get_question(&self, id: i64) -> Result<Option<Question>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, question, golden_truth, embedding, created_at FROM questions WHERE id = ?1",
                params![id],
                raw_question,
            )
            .optional()?;
        raw.map(RawQuestion::into_question).transpose()
    }

    fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, question, golden_truth, embedding, created_at FROM questions ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], raw_question)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?.into_question()?);
        }
        Ok(out)
    }
}

impl ResultStore for Store {
    fn insert_result(
        &self,
        question_id: i64,
        source: &str,
        ai_response: &str,
        score: f64,
        explanation: &str,
    ) -> Result<TestResult, StoreError> {
        self.insert_result_at(
            question_id,
            source,
            ai_response,
            score,
            explanation,
            Utc::now(),
        )
    }

    fn list_by_question(&self, question_id: i64) -> Result<Vec<TestResult>, StoreError> {
        self.query_results(
            &format!(
                "SELECT {} FROM test_results WHERE question_id = ?1 ORDER BY created_at DESC, id DESC",
                RESULT_COLUMNS
            ),
            params![question_id],
        )
    }

    fn list_by_source(&self, source: &str) -> Result<Vec<TestResult>, StoreError> {
        self.query_results(
            &format!(
                "SELECT {} FROM test_results WHERE source = ?1 ORDER BY created_at ASC, id ASC",
                RESULT_COLUMNS
            ),
            params![source],
        )
    }

    fn list_all(&self) -> Result<Vec<TestResult>, StoreError> {
        self.query_results(
            &format!(
                "SELECT {} FROM test_results ORDER BY created_at ASC, id ASC",
                RESULT_COLUMNS
            ),
            [],
        )
    }
}

impl MetaStore for Store {
    fn insert_meta(&self, source: &str, s: &MetaScores) -> Result<MetaEvaluation, StoreError> {
        let ts = format_ts(&Utc::now());
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meta_source_evals
               (source, accuracy, completeness, clarity, consistency, overall, summary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                source,
                s.accuracy,
                s.completeness,
                s.clarity,
                s.consistency,
                s.overall,
                s.summary,
                ts
            ],
        )?;
        Ok(MetaEvaluation {
            id: conn.last_insert_rowid(),
            source: source.to_string(),
            accuracy: s.accuracy,
            completeness: s.completeness,
            clarity: s.clarity,
            consistency: s.consistency,
            overall: s.overall,
            summary: s.summary.clone(),
            created_at: parse_ts(&ts)?,
        })
    }

    fn list_meta(&self, source: Option<&str>) -> Result<Vec<MetaEvaluation>, StoreError> {
        match source {
            Some(s) => self.query_meta(
                &format!(
                    "SELECT {} FROM meta_source_evals WHERE source = ?1 ORDER BY created_at DESC, id DESC",
                    META_COLUMNS
                ),
                params![s],
            ),
            None => self.query_meta(
                &format!(
                    "SELECT {} FROM meta_source_evals ORDER BY created_at DESC, id DESC",
                    META_COLUMNS
                ),
                [],
            ),
        }
    }
}

struct RawQuestion {
    id: i64,
    text: String,
    golden_truth: String,
    embedding: Option<Vec<u8>>,
    created_at: String,
}

fn raw_question(row: &Row<'_>) -> rusqlite::Result<RawQuestion> {
    Ok(RawQuestion {
        id: row.get(0)?,
        text: row.get(1)?,
        golden_truth: row.get(2)?,
        embedding: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl RawQuestion {
    fn into_question(self) -> Result<Question, StoreError> {
        // A malformed embedding is not fatal: the core never reads it.
        let embedding = self.embedding.and_then(|b| decode_vec_f32(&b));
        Ok(Question {
            id: self.id,
            text: self.text,
            golden_truth: self.golden_truth,
            embedding,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so lexical order in SQL equals chronological order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(s.to_string()))
}

fn encode_vec_f32(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vec_f32(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
