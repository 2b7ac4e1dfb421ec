//! Puzzle-layer recognition.
//!
//! Wrapper puzzles (CAT, singleton, NFT layers, the standard p2 puzzle,
//! settlement) are identified outermost-in by module hash against a
//! template registry, with curried parameters extracted and the solution
//! sliced in lock-step. Recognition never guesses: ambiguity and parse
//! failures are reported with reduced confidence, not resolved.

mod layers;
pub mod registry;
pub mod report;
mod recognize;

pub use recognize::{recognize, recognize_with, MAX_LAYER_DEPTH};
pub use registry::{LayerContext, LayerOutcome, MatchRule, Registry, WrapperTemplate};
pub use report::{Candidate, NodeSummary, Recognition, WrapperRecord};
