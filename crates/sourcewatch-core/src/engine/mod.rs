pub mod guard;
pub mod meta;
pub mod runner;

pub use guard::{RunGuard, RunPermit};
pub use meta::MetaEvaluator;
pub use runner::{Evaluator, RunPolicy};
