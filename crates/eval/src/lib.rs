//! Deterministic CLVM evaluator with chain-equivalent cost accounting.
//!
//! The evaluator is a pure function of (puzzle, solution, max_cost). It
//! never touches a clock, randomness, or I/O; the cost ceiling is the only
//! resource bound.

pub mod conditions;
pub mod cost;
pub mod error;
mod machine;
mod ops;

pub use conditions::{condition_cost, decode_conditions, opcode_name, Condition};
pub use error::EvalError;
pub use machine::{evaluate, run_program, Evaluation};
