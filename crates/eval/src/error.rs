use thiserror::Error;

/// Errors raised while running a puzzle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The program raised, misused an operator, or produced a value the
    /// operator cannot accept.
    #[error("evaluation failed: {reason}")]
    Evaluation { reason: String },

    /// The running cost crossed the caller-supplied ceiling.
    #[error("cost limit exceeded: {cost} > {max_cost}")]
    CostExceeded { cost: u64, max_cost: u64 },
}

impl EvalError {
    pub fn evaluation(reason: impl Into<String>) -> Self {
        EvalError::Evaluation {
            reason: reason.into(),
        }
    }
}
