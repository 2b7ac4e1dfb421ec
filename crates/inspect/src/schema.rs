//! The report document. Field layout is versioned: anything that breaks
//! a consumer bumps `SCHEMA_VERSION`.

use std::collections::BTreeMap;

use serde::Serialize;
use spendlens_analyze::Recognition;

use crate::input::InputSource;

pub const SCHEMA_VERSION: &str = "spendlens.report.v1";

#[derive(Debug, Serialize)]
pub struct Report {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub input: InputInfo,
    pub summary: Summary,
    pub spends: Vec<SpendRecord>,
    pub aggregated_signature: String,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct InputInfo {
    pub source: InputSource,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    /// "ok", "partial", or "error".
    pub status: String,
    pub spend_count: usize,
    pub total_removed_amount: u128,
    pub total_created_amount: u128,
    pub fee: i128,
    /// Signed amount movement per puzzle hash across the whole bundle.
    pub net_delta_by_puzzle_hash: BTreeMap<String, i128>,
    /// Every AGG_SIG_ME demand across the bundle, sorted by pubkey then
    /// message. Values are the rendered condition arguments.
    pub agg_sig_me: Vec<AggSigView>,
    pub agg_sig_unsafe: Vec<AggSigView>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggSigView {
    pub pubkey: String,
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SpendRecord {
    pub index: usize,
    pub coin: CoinView,
    pub puzzle: PuzzleView,
    /// "ok", "partial", or "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<Recognition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinView {
    pub parent_coin_info: String,
    pub puzzle_hash: String,
    pub amount: u64,
    pub coin_id: String,
}

#[derive(Debug, Serialize)]
pub struct PuzzleView {
    pub declared_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_matches: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationView {
    pub execution_cost: u64,
    pub condition_cost: u64,
    pub total_cost: u64,
    pub conditions: Vec<ConditionView>,
    pub created_coins: Vec<CoinView>,
}

#[derive(Debug, Serialize)]
pub struct ConditionView {
    pub opcode: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FailureView {
    pub kind: String,
    pub message: String,
}
