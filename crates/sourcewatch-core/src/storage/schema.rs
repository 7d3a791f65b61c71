pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  question TEXT NOT NULL,
  golden_truth TEXT NOT NULL,
  embedding BLOB,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  question_id INTEGER NOT NULL REFERENCES questions(id),
  source TEXT NOT NULL,
  ai_response TEXT NOT NULL,
  score REAL NOT NULL,
  explanation TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_test_results_question ON test_results(question_id, created_at);
CREATE INDEX IF NOT EXISTS idx_test_results_source ON test_results(source, created_at);

CREATE TABLE IF NOT EXISTS meta_source_evals (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  source TEXT NOT NULL,
  accuracy REAL NOT NULL,
  completeness REAL NOT NULL,
  clarity REAL NOT NULL,
  consistency REAL NOT NULL,
  overall REAL NOT NULL,
  summary TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_meta_source ON meta_source_evals(source, created_at);

CREATE TRIGGER IF NOT EXISTS test_results_append_only
BEFORE UPDATE ON test_results
BEGIN
  SELECT RAISE(ABORT, 'test_results is append-only');
END;

CREATE TRIGGER IF NOT EXISTS meta_source_evals_append_only
BEFORE UPDATE ON meta_source_evals
BEGIN
  SELECT RAISE(ABORT, 'meta_source_evals is append-only');
END;

CREATE TRIGGER IF NOT EXISTS meta_source_evals_no_delete
BEFORE DELETE ON meta_source_evals
BEGIN
  SELECT RAISE(ABORT, 'meta_source_evals is append-only');
END;
"#;
