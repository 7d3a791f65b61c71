pub mod config;
pub mod engine;
pub mod errors;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
pub mod score_policy;
pub mod storage;
pub mod trend;

pub use engine::{Evaluator, MetaEvaluator, RunGuard, RunPolicy};
pub use errors::EvalError;
