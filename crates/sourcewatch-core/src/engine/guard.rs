use crate::errors::EvalError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Allows at most one evaluation run (single test, all tests, provided
/// response, or meta) to be outstanding. Clones share the same flag, so an
/// `Evaluator` and a `MetaEvaluator` built from one guard exclude each other.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a run; releases the guard on drop.
#[derive(Debug)]
pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<RunPermit, EvalError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EvalError::RunInProgress)?;
        Ok(RunPermit {
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
