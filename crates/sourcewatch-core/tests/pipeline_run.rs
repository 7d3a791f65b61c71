mod common;

use async_trait::async_trait;
use common::{seed, store, FlakyResults, ScriptedJudge, StubAdapter};
use sourcewatch_core::errors::{EvalError, JudgeUnavailableError};
use sourcewatch_core::judge::PARSE_FAILURE_EXPLANATION;
use sourcewatch_core::providers::llm::fake::FakeJudge;
use sourcewatch_core::providers::llm::JudgeClient;
use sourcewatch_core::score_policy::ScorePolicy;
use sourcewatch_core::storage::{ResultStore, Store};
use sourcewatch_core::{Evaluator, RunGuard, RunPolicy};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

fn evaluator(
    store: &Store,
    adapters: Vec<Arc<dyn sourcewatch_core::providers::source::SourceAdapter>>,
    judge: Arc<dyn JudgeClient>,
) -> Evaluator {
    Evaluator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        adapters,
        judge,
        RunPolicy::default(),
    )
}

fn three_sources() -> Vec<Arc<dyn sourcewatch_core::providers::source::SourceAdapter>> {
    vec![
        StubAdapter::answering("Galileo", "Paris."),
        StubAdapter::answering("BridgeIT", "It is Paris."),
        StubAdapter::answering("Gradio", "Marseille"),
    ]
}

#[tokio::test]
async fn one_row_per_source_for_well_formed_output() {
    let s = store();
    let q = seed(&s, "Capital of France?", "Paris is the capital of France");
    let judge = ScriptedJudge::replying(
        r#"```json
        [
          {"source": "Galileo", "score": 92, "explanation": "Correct."},
          {"source": "BridgeIT", "score": 88, "explanation": "Correct, terse."},
          {"source": "Gradio", "score": 5, "explanation": "Wrong city."}
        ]
        ```"#,
    );

    let outcome = evaluator(&s, three_sources(), judge.clone())
        .run_test(q.id)
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.results.len(), 3);
    let rows = s.list_by_question(q.id).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.question_id == q.id));

    let mut sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
    sources.sort();
    assert_eq!(sources, vec!["BridgeIT", "Galileo", "Gradio"]);

    let gradio = rows.iter().find(|r| r.source == "Gradio").unwrap();
    assert_eq!(gradio.ai_response, "Marseille");
    assert_eq!(gradio.score, 5.0);

    let prompt = judge.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Response 1 (Source: Galileo)"));
    assert!(prompt.contains("Response 3 (Source: Gradio)"));
}

#[tokio::test]
async fn unparsable_output_records_zero_placeholders() {
    let s = store();
    let q = seed(&s, "Capital of France?", "Paris");
    let judge = ScriptedJudge::replying("I'm sorry, I cannot grade these responses.");

    let outcome = evaluator(&s, three_sources(), judge)
        .run_test(q.id)
        .await
        .unwrap();

    assert!(outcome.judge_output_malformed);
    let rows = s.list_by_question(q.id).unwrap();
    assert_eq!(rows.len(), 3);
    for r in rows {
        assert_eq!(r.score, 0.0);
        assert!(r.explanation.contains(PARSE_FAILURE_EXPLANATION));
    }
}

#[tokio::test]
async fn wrapped_labels_are_normalized_and_strays_dropped() {
    let s = store();
    let q = seed(&s, "Capital of France?", "Paris");
    let judge = ScriptedJudge::replying(
        r#"[
          {"source": "Response 1 (Source: Galileo)", "score": 90, "explanation": "ok"},
          {"source": "Response 9", "score": 70, "explanation": "?"},
          {"source": "**BridgeIT**", "score": 80, "explanation": "ok"}
        ]"#,
    );
    let adapters = vec![
        StubAdapter::answering("Galileo", "Paris"),
        StubAdapter::answering("BridgeIT", "Paris"),
    ];

    let outcome = evaluator(&s, adapters, judge).run_test(q.id).await.unwrap();

    let mut stored: Vec<&str> = outcome.results.iter().map(|r| r.source.as_str()).collect();
    stored.sort();
    assert_eq!(stored, vec!["BridgeIT", "Galileo"]);
    assert_eq!(outcome.dropped.len(), 1);
    assert_eq!(outcome.dropped[0].label, "Response 9");
    assert_eq!(s.list_by_question(q.id).unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_judge_entries_keep_the_first() {
    let s = store();
    let q = seed(&s, "Q", "A");
    let judge = ScriptedJudge::replying(
        r#"[{"source":"Galileo","score":10,"explanation":"first"},
            {"source":"Galileo","score":99,"explanation":"second"}]"#,
    );
    let outcome = evaluator(&s, vec![StubAdapter::answering("Galileo", "A")], judge)
        .run_test(q.id)
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].score, 10.0);
    assert_eq!(outcome.dropped.len(), 1);
}

#[tokio::test]
async fn fake_judge_ranks_the_correct_answer_higher() {
    let s = store();
    let q = seed(
        &s,
        "What is the capital of France?",
        "Paris is the capital of France",
    );
    let adapters = vec![
        StubAdapter::answering("A", "Paris"),
        StubAdapter::answering("B", "Lyon"),
    ];

    let outcome = evaluator(&s, adapters, Arc::new(FakeJudge::default()))
        .run_test(q.id)
        .await
        .unwrap();

    let score = |src: &str| {
        outcome
            .results
            .iter()
            .find(|r| r.source == src)
            .map(|r| r.score)
            .unwrap()
    };
    assert!(score("A") > score("B"));
    assert!(outcome.results.iter().all(|r| r.question_id == q.id));
}

#[tokio::test]
async fn failed_sources_are_reported_and_the_rest_stored() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let judge = ScriptedJudge::replying(r#"[{"source":"Galileo","score":90,"explanation":"ok"}]"#);
    let adapters = vec![
        StubAdapter::answering("Galileo", "Paris"),
        StubAdapter::failing("Gradio"),
    ];

    let outcome = evaluator(&s, adapters, judge.clone())
        .run_test(q.id)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failed_sources.len(), 1);
    assert_eq!(outcome.failed_sources[0].source, "Gradio");
    assert!(outcome.failed_sources[0].error.contains("503"));
    let prompt = judge.prompts.lock().unwrap()[0].clone();
    assert!(!prompt.contains("Gradio"));
}

#[tokio::test]
async fn fan_out_keeps_adapter_order_and_attribution() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let judge = ScriptedJudge::replying(
        r#"[{"source":"Gradio","score":40},{"source":"Galileo","score":90}]"#,
    );
    let adapters = vec![
        StubAdapter::answering("Galileo", "Paris"),
        StubAdapter::failing("BridgeIT"),
        StubAdapter::answering("Gradio", "Lyon"),
    ];
    let mut ev = evaluator(&s, adapters, judge.clone());
    ev.policy.parallel = 1;

    let outcome = ev.run_test(q.id).await.unwrap();

    let failed: Vec<_> = outcome.failed_sources.iter().map(|f| f.source.as_str()).collect();
    assert_eq!(failed, vec!["BridgeIT"]);
    let prompt = judge.prompts.lock().unwrap()[0].clone();
    let galileo = prompt.find("(Source: Galileo)").unwrap();
    let gradio = prompt.find("(Source: Gradio)").unwrap();
    assert!(galileo < gradio);

    let rows = s.list_by_question(q.id).unwrap();
    assert_eq!(rows.len(), 2);
    let lyon = rows.iter().find(|r| r.source == "Gradio").unwrap();
    assert_eq!(lyon.ai_response, "Lyon");
    assert_eq!(lyon.score, 40.0);
}

#[tokio::test]
async fn every_source_failing_skips_judge_and_store() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let judge = ScriptedJudge::replying("[]");
    let adapters = vec![StubAdapter::failing("A"), StubAdapter::failing("B")];

    let err = evaluator(&s, adapters, judge.clone())
        .run_test(q.id)
        .await
        .unwrap_err();

    assert!(matches!(err, EvalError::NoResponses { question_id } if question_id == q.id));
    assert_eq!(judge.calls(), 0);
    assert!(s.list_by_question(q.id).unwrap().is_empty());
}

#[tokio::test]
async fn judge_unavailable_writes_nothing() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let err = evaluator(&s, three_sources(), ScriptedJudge::unavailable())
        .run_test(q.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::JudgeUnavailable(_)));
    assert!(s.list_by_question(q.id).unwrap().is_empty());
}

#[tokio::test]
async fn store_failure_keeps_earlier_inserts() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let flaky = Arc::new(FlakyResults {
        inner: s.clone(),
        fail_on: 2,
        inserts: AtomicUsize::new(0),
    });
    let judge = ScriptedJudge::replying(
        r#"[{"source":"Galileo","score":90},{"source":"BridgeIT","score":80},{"source":"Gradio","score":70}]"#,
    );
    let ev = Evaluator::new(
        flaky.clone(),
        flaky,
        three_sources(),
        judge,
        RunPolicy::default(),
    );

    let err = ev.run_test(q.id).await.unwrap_err();
    assert!(matches!(err, EvalError::Store(_)));
    let rows = s.list_by_question(q.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, "Galileo");
}

#[tokio::test]
async fn slow_source_times_out() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let judge = ScriptedJudge::replying(r#"[{"source":"Galileo","score":90}]"#);
    let mut ev = evaluator(
        &s,
        vec![
            StubAdapter::answering("Galileo", "Paris"),
            StubAdapter::hanging("Gradio"),
        ],
        judge,
    );
    ev.policy.timeout_seconds = Some(1);

    let outcome = ev.run_test(q.id).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failed_sources[0].source, "Gradio");
    assert!(outcome.failed_sources[0].error.contains("timed out after 1s"));
}

#[tokio::test]
async fn out_of_range_scores_follow_policy() {
    let reply = r#"[{"source":"A","score":140},{"source":"B","score":-3}]"#;
    let adapters = || {
        vec![
            StubAdapter::answering("A", "x"),
            StubAdapter::answering("B", "y"),
        ]
    };

    let s = store();
    let q = seed(&s, "Q", "G");
    let outcome = evaluator(&s, adapters(), ScriptedJudge::replying(reply))
        .run_test(q.id)
        .await
        .unwrap();
    let mut scores: Vec<f64> = outcome.results.iter().map(|r| r.score).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(scores, vec![-3.0, 140.0]);

    let mut ev = evaluator(&s, adapters(), ScriptedJudge::replying(reply));
    ev.policy.score_policy = ScorePolicy::Clamp;
    let outcome = ev.run_test(q.id).await.unwrap();
    let mut scores: Vec<f64> = outcome.results.iter().map(|r| r.score).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(scores, vec![0.0, 100.0]);

    let mut ev = evaluator(&s, adapters(), ScriptedJudge::replying(reply));
    ev.policy.score_policy = ScorePolicy::Reject;
    let outcome = ev.run_test(q.id).await.unwrap();
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.dropped.len(), 2);
}

#[tokio::test]
async fn unknown_question_is_not_found() {
    let s = store();
    let err = evaluator(&s, three_sources(), ScriptedJudge::replying("[]"))
        .run_test(404)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn no_sources_configured() {
    let s = store();
    let q = seed(&s, "Q", "A");
    let err = evaluator(&s, vec![], ScriptedJudge::replying("[]"))
        .run_test(q.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::NoSources));
}

#[tokio::test]
async fn run_is_rejected_while_another_is_outstanding() {
    let s = store();
    let q = seed(&s, "Q", "Paris");
    let guard = RunGuard::new();
    let ev = evaluator(&s, three_sources(), Arc::new(FakeJudge::default()))
        .with_guard(guard.clone());

    let held = guard.try_acquire().unwrap();
    assert!(matches!(
        ev.run_test(q.id).await,
        Err(EvalError::RunInProgress)
    ));
    assert!(matches!(
        ev.run_all_tests().await,
        Err(EvalError::RunInProgress)
    ));
    drop(held);

    assert!(ev.run_test(q.id).await.is_ok());
    assert!(!guard.is_busy());
}

#[tokio::test]
async fn provided_response_is_judged_and_stored() {
    let s = store();
    let q = seed(&s, "Capital?", "Paris is the capital of France");
    let ev = evaluator(&s, vec![], Arc::new(FakeJudge::default()));

    let outcome = ev
        .evaluate_provided(q.id, "FinAI", "The capital of France is Paris.")
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].source, "FinAI");
    assert_eq!(outcome.results[0].score, 100.0);
    assert_eq!(ev.list_results(q.id).unwrap().len(), 1);
}

/// Fails whenever the golden truth mentions "unjudgeable".
struct SelectiveJudge;

#[async_trait]
impl JudgeClient for SelectiveJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgeUnavailableError> {
        if prompt.contains("unjudgeable") {
            return Err(JudgeUnavailableError::new("rate limited"));
        }
        FakeJudge::default().complete(prompt).await
    }

    fn provider_name(&self) -> &'static str {
        "selective"
    }

    fn model(&self) -> &str {
        "selective"
    }
}

#[tokio::test]
async fn run_all_continues_past_a_failing_question() {
    let s = store();
    let q1 = seed(&s, "Q1", "unjudgeable truth");
    let q2 = seed(&s, "Q2", "Paris");

    let reports = evaluator(&s, three_sources(), Arc::new(SelectiveJudge))
        .run_all_tests()
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].question_id, q1.id);
    assert!(reports[0].error.as_deref().unwrap().contains("rate limited"));
    assert_eq!(reports[1].question_id, q2.id);
    assert_eq!(reports[1].outcome.as_ref().unwrap().results.len(), 3);
    assert!(s.list_by_question(q1.id).unwrap().is_empty());
}
