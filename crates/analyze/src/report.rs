//! Serializable recognition records.

use serde::Serialize;

/// Confidence of a recognized layer whose solution also parsed.
pub const CONFIDENCE_FULL: f64 = 1.0;
/// Confidence of a recognized layer whose solution failed to parse.
pub const CONFIDENCE_PARTIAL: f64 = 0.8;
/// Confidence assigned to every candidate when templates are ambiguous.
pub const CONFIDENCE_AMBIGUOUS: f64 = 0.5;

/// The full outcome of recognizing one puzzle/solution pair.
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    pub recognized: bool,
    /// Wrapper layers outermost first.
    pub wrappers: Vec<WrapperRecord>,
    /// Populated only when multiple templates matched one node.
    pub candidates: Vec<Candidate>,
    /// The first unrecognized (or terminal) puzzle node.
    pub innermost: NodeSummary,
    /// Whatever solution material was left after the last recognized layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_solution: Option<NodeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrapperRecord {
    pub name: String,
    pub mod_hash: String,
    /// Tree hash of the curried argument chain, absent for bare modules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curried_args_tree_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_puzzle_hash: Option<String>,
    pub params: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<serde_json::Value>,
    pub confidence: f64,
    /// "ok", "parse_error", or "missing_solution".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub name: String,
    pub confidence: f64,
}

/// A compact view of an arbitrary value: its tree hash plus canonical text.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub tree_hash: String,
    pub text: String,
}
