//! Per-spend analysis and bundle-level aggregation.
//!
//! Each spend is pure and independent, so the fan-out runs on the rayon
//! pool; results are collected positionally so report order always
//! matches input order. Evaluation and recognition run independently per
//! spend: a failed evaluation never suppresses recognition, and vice
//! versa.

use std::collections::BTreeMap;
use std::rc::Rc;

use rayon::prelude::*;
use tracing::debug;

use spendlens_analyze::recognize;
use spendlens_core::number::atom_to_u64;
use spendlens_core::{decode, tree_hash, Coin, CoinSpend, CoreError, SpendBundle, Value};
use spendlens_eval::conditions::{AGG_SIG_ME, AGG_SIG_UNSAFE, CREATE_COIN};
use spendlens_eval::{condition_cost, evaluate, opcode_name, EvalError, Evaluation};

use crate::input::InputSource;
use crate::schema::{
    AggSigView, CoinView, ConditionView, Diagnostic, EvaluationView, FailureView, InputInfo,
    PuzzleView, Report, SpendRecord, Summary, ToolInfo, SCHEMA_VERSION,
};

/// Default cost ceiling, the chain's per-block budget.
pub const DEFAULT_MAX_COST: u64 = 11_000_000_000;

pub fn inspect_bundle(
    source: InputSource,
    bundle: SpendBundle,
    notes: Vec<String>,
    max_cost: u64,
) -> Report {
    let spends: Vec<SpendRecord> = bundle
        .coin_spends
        .par_iter()
        .enumerate()
        .map(|(index, spend)| analyze_spend(index, spend, max_cost))
        .collect();
    debug!(spend_count = spends.len(), "bundle analyzed");

    let summary = summarize(&spends);
    Report {
        schema_version: SCHEMA_VERSION.to_string(),
        tool: ToolInfo {
            name: "spendlens".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo { source, notes },
        summary,
        spends,
        aggregated_signature: hex::encode(&bundle.aggregated_signature),
    }
}

fn analyze_spend(index: usize, spend: &CoinSpend, max_cost: u64) -> SpendRecord {
    let coin_view = coin_view(&spend.coin);
    let declared_hash = hex::encode(spend.coin.puzzle_hash);
    let mut warnings = Vec::new();

    let puzzle = match decode(&spend.puzzle_reveal) {
        Ok(puzzle) => puzzle,
        Err(e) => {
            return SpendRecord {
                index,
                coin: coin_view,
                puzzle: PuzzleView {
                    declared_hash,
                    computed_hash: None,
                    hash_matches: None,
                },
                status: "error".to_string(),
                evaluation: None,
                recognition: None,
                failure: Some(core_failure("puzzle_reveal", &e)),
                warnings,
            };
        }
    };

    let computed_hash = tree_hash(&puzzle);
    let hash_matches = computed_hash == spend.coin.puzzle_hash;
    if !hash_matches {
        warnings.push("puzzle reveal does not hash to the declared puzzle hash".to_string());
    }
    let puzzle_view = PuzzleView {
        declared_hash,
        computed_hash: Some(hex::encode(computed_hash)),
        hash_matches: Some(hash_matches),
    };

    let solution = match decode(&spend.solution) {
        Ok(solution) => solution,
        Err(e) => {
            // The puzzle alone is still worth recognizing.
            let recognition = recognize(&puzzle, None);
            return SpendRecord {
                index,
                coin: coin_view,
                puzzle: puzzle_view,
                status: "error".to_string(),
                evaluation: None,
                recognition: Some(recognition),
                failure: Some(core_failure("solution", &e)),
                warnings,
            };
        }
    };

    let recognition = recognize(&puzzle, Some(&solution));
    let (evaluation, failure) = match evaluate(&puzzle, &solution, max_cost) {
        Ok(evaluation) => {
            let view = evaluation_view(&evaluation, &spend.coin, &mut warnings);
            (Some(view), None)
        }
        Err(e) => (None, Some(eval_failure(&e))),
    };

    let recognition_partial = !recognition.candidates.is_empty()
        || recognition
            .wrappers
            .iter()
            .any(|wrapper| wrapper.parse_error.is_some());
    let status = if failure.is_some() {
        "error"
    } else if !warnings.is_empty() || recognition_partial {
        "partial"
    } else {
        "ok"
    };

    SpendRecord {
        index,
        coin: coin_view,
        puzzle: puzzle_view,
        status: status.to_string(),
        evaluation,
        recognition: Some(recognition),
        failure,
        warnings,
    }
}

fn evaluation_view(
    evaluation: &Evaluation,
    coin: &Coin,
    warnings: &mut Vec<String>,
) -> EvaluationView {
    let parent_id = coin.coin_id();
    let mut created_coins = Vec::new();
    let mut total_condition_cost = 0u64;
    let mut conditions = Vec::new();

    for condition in &evaluation.conditions {
        total_condition_cost += condition_cost(condition.opcode);
        if condition.opcode == CREATE_COIN {
            match created_coin(&parent_id, &condition.args) {
                Ok(coin) => created_coins.push(coin_view(&coin)),
                Err(reason) => warnings.push(format!("invalid CREATE_COIN: {reason}")),
            }
        }
        conditions.push(ConditionView {
            opcode: condition.opcode,
            name: opcode_name(condition.opcode).map(str::to_string),
            args: condition.args.iter().map(|arg| arg_view(arg)).collect(),
        });
    }

    EvaluationView {
        execution_cost: evaluation.cost,
        condition_cost: total_condition_cost,
        total_cost: evaluation.cost + total_condition_cost,
        conditions,
        created_coins,
    }
}

fn created_coin(parent_id: &[u8; 32], args: &[Rc<Value>]) -> Result<Coin, String> {
    if args.len() < 2 {
        return Err(format!("{} argument(s), expected at least 2", args.len()));
    }
    let puzzle_hash: [u8; 32] = args[0]
        .as_atom()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or("puzzle hash is not a 32-byte atom")?;
    let amount = args[1]
        .as_atom()
        .and_then(atom_to_u64)
        .ok_or("amount is not a u64 atom")?;
    Ok(Coin::new(*parent_id, puzzle_hash, amount))
}

fn arg_view(arg: &Rc<Value>) -> String {
    spendlens_core::text::unparse(arg)
}

fn coin_view(coin: &Coin) -> CoinView {
    CoinView {
        parent_coin_info: hex::encode(coin.parent_coin_info),
        puzzle_hash: hex::encode(coin.puzzle_hash),
        amount: coin.amount,
        coin_id: hex::encode(coin.coin_id()),
    }
}

fn core_failure(field: &str, error: &CoreError) -> FailureView {
    FailureView {
        kind: "malformed_encoding".to_string(),
        message: format!("{field}: {error}"),
    }
}

fn eval_failure(error: &EvalError) -> FailureView {
    let kind = match error {
        EvalError::Evaluation { .. } => "evaluation_error",
        EvalError::CostExceeded { .. } => "cost_exceeded",
    };
    FailureView {
        kind: kind.to_string(),
        message: error.to_string(),
    }
}

fn summarize(spends: &[SpendRecord]) -> Summary {
    let mut total_removed: u128 = 0;
    let mut total_created: u128 = 0;
    let mut net_delta: BTreeMap<String, i128> = BTreeMap::new();
    let mut agg_sig_me = Vec::new();
    let mut agg_sig_unsafe = Vec::new();
    let mut diagnostics = Vec::new();
    let mut failed_spends = 0usize;

    for spend in spends {
        if spend.status == "error" {
            failed_spends += 1;
        }
        total_removed += spend.coin.amount as u128;
        *net_delta.entry(spend.coin.puzzle_hash.clone()).or_default() -=
            spend.coin.amount as i128;
        if let Some(evaluation) = &spend.evaluation {
            for created in &evaluation.created_coins {
                total_created += created.amount as u128;
                *net_delta.entry(created.puzzle_hash.clone()).or_default() +=
                    created.amount as i128;
            }
            for condition in &evaluation.conditions {
                let bucket = match condition.opcode {
                    AGG_SIG_ME => &mut agg_sig_me,
                    AGG_SIG_UNSAFE => &mut agg_sig_unsafe,
                    _ => continue,
                };
                if let [pubkey, msg, ..] = condition.args.as_slice() {
                    bucket.push(AggSigView {
                        pubkey: pubkey.clone(),
                        msg: msg.clone(),
                    });
                }
            }
        }
    }
    let by_pubkey_then_msg =
        |a: &AggSigView, b: &AggSigView| (&a.pubkey, &a.msg).cmp(&(&b.pubkey, &b.msg));
    agg_sig_me.sort_by(by_pubkey_then_msg);
    agg_sig_unsafe.sort_by(by_pubkey_then_msg);

    let fee = total_removed as i128 - total_created as i128;
    if fee < 0 {
        diagnostics.push(Diagnostic {
            kind: "negative_fee".to_string(),
            message: format!("bundle creates {fee} more than it removes", fee = -fee),
        });
    }
    if failed_spends > 0 {
        diagnostics.push(Diagnostic {
            kind: "imbalanced_bundle".to_string(),
            message: format!(
                "totals exclude {failed_spends} spend(s) that failed analysis"
            ),
        });
    }

    let status = if !spends.is_empty() && failed_spends == spends.len() {
        "error"
    } else if spends.iter().any(|s| s.status != "ok") || !diagnostics.is_empty() {
        "partial"
    } else {
        "ok"
    };

    Summary {
        status: status.to_string(),
        spend_count: spends.len(),
        total_removed_amount: total_removed,
        total_created_amount: total_created,
        fee,
        net_delta_by_puzzle_hash: net_delta,
        agg_sig_me,
        agg_sig_unsafe,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendlens_core::text::parse;
    use spendlens_core::{encode, Value};

    fn spend_with(puzzle_text: &str, solution_text: &str, amount: u64) -> CoinSpend {
        let puzzle = parse(puzzle_text).unwrap();
        let puzzle_hash = tree_hash(&puzzle);
        CoinSpend {
            coin: Coin::new([0x42; 32], puzzle_hash, amount),
            puzzle_reveal: encode(&puzzle),
            solution: encode(&parse(solution_text).unwrap()),
        }
    }

    fn inspect(spends: Vec<CoinSpend>) -> Report {
        inspect_bundle(
            InputSource::MempoolItem,
            SpendBundle::new(spends, vec![0u8; 96]),
            Vec::new(),
            DEFAULT_MAX_COST,
        )
    }

    #[test]
    fn trivial_quoted_puzzle_is_ok_with_fixed_cost() {
        let report = inspect(vec![spend_with("(q . 1)", "()", 100)]);
        assert_eq!(report.summary.status, "ok");
        let spend = &report.spends[0];
        assert_eq!(spend.status, "ok");
        let evaluation = spend.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.execution_cost, 20);
        assert_eq!(evaluation.condition_cost, 0);
        assert!(evaluation.conditions.is_empty());
        assert_eq!(report.summary.fee, 100);
    }

    #[test]
    fn create_coin_flows_into_additions_fee_and_net_delta() {
        let target_hash = "ab".repeat(32);
        let puzzle = format!("(q (51 0x{target_hash} 300))");
        let report = inspect(vec![spend_with(&puzzle, "()", 1000)]);
        let spend = &report.spends[0];
        assert_eq!(spend.status, "ok");
        let evaluation = spend.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.created_coins.len(), 1);
        assert_eq!(evaluation.created_coins[0].amount, 300);
        assert_eq!(evaluation.condition_cost, 1_800_000);
        assert_eq!(evaluation.total_cost, evaluation.execution_cost + 1_800_000);

        assert_eq!(report.summary.total_removed_amount, 1000);
        assert_eq!(report.summary.total_created_amount, 300);
        assert_eq!(report.summary.fee, 700);
        assert_eq!(report.summary.net_delta_by_puzzle_hash[&target_hash], 300);
        let source_hash = &report.spends[0].coin.puzzle_hash;
        assert_eq!(report.summary.net_delta_by_puzzle_hash[source_hash], -1000);
    }

    #[test]
    fn created_coin_parent_is_the_spent_coin_id() {
        let target_hash = "ab".repeat(32);
        let puzzle = format!("(q (51 0x{target_hash} 300))");
        let spend = spend_with(&puzzle, "()", 1000);
        let expected_parent = hex::encode(spend.coin.coin_id());
        let report = inspect(vec![spend]);
        let created = &report.spends[0].evaluation.as_ref().unwrap().created_coins[0];
        assert_eq!(created.parent_coin_info, expected_parent);
    }

    #[test]
    fn negative_fee_is_diagnosed_not_fatal() {
        let target_hash = "ab".repeat(32);
        let puzzle = format!("(q (51 0x{target_hash} 500))");
        let report = inspect(vec![spend_with(&puzzle, "()", 100)]);
        assert_eq!(report.summary.fee, -400);
        assert!(report
            .summary
            .diagnostics
            .iter()
            .any(|d| d.kind == "negative_fee"));
        assert_eq!(report.summary.status, "partial");
        assert_eq!(report.spends[0].status, "ok");
    }

    #[test]
    fn malformed_puzzle_fails_only_its_own_spend() {
        let good = spend_with("(q . 1)", "()", 50);
        let bad = CoinSpend {
            coin: Coin::new([0x01; 32], [0x02; 32], 10),
            puzzle_reveal: vec![0xff, 0x01],
            solution: vec![0x80],
        };
        let report = inspect(vec![bad, good]);
        assert_eq!(report.spends[0].status, "error");
        assert_eq!(
            report.spends[0].failure.as_ref().unwrap().kind,
            "malformed_encoding"
        );
        assert_eq!(report.spends[1].status, "ok");
        assert!(report
            .summary
            .diagnostics
            .iter()
            .any(|d| d.kind == "imbalanced_bundle"));
        assert_eq!(report.summary.status, "partial");
    }

    #[test]
    fn all_spends_failing_makes_the_bundle_an_error() {
        let bad = CoinSpend {
            coin: Coin::new([0x01; 32], [0x02; 32], 10),
            puzzle_reveal: vec![0xff],
            solution: vec![0x80],
        };
        let report = inspect(vec![bad]);
        assert_eq!(report.summary.status, "error");
    }

    #[test]
    fn cost_ceiling_failure_is_reported_verbatim() {
        let report = inspect_bundle(
            InputSource::CoinSpend,
            SpendBundle::new(vec![spend_with("(+ (q . 1) (q . 2))", "()", 1)], vec![0u8; 96]),
            Vec::new(),
            10,
        );
        let failure = report.spends[0].failure.as_ref().unwrap();
        assert_eq!(failure.kind, "cost_exceeded");
        assert!(failure.message.contains("10"));
    }

    #[test]
    fn puzzle_hash_mismatch_degrades_to_partial() {
        let puzzle = parse("(q . 1)").unwrap();
        let spend = CoinSpend {
            coin: Coin::new([0x42; 32], [0x99; 32], 5),
            puzzle_reveal: encode(&puzzle),
            solution: encode(&Value::nil()),
        };
        let report = inspect(vec![spend]);
        let record = &report.spends[0];
        assert_eq!(record.status, "partial");
        assert_eq!(record.puzzle.hash_matches, Some(false));
        assert!(!record.warnings.is_empty());
    }

    #[test]
    fn report_order_matches_input_order() {
        let spends: Vec<CoinSpend> = (0..16u64)
            .map(|i| spend_with("(q . 1)", "()", i))
            .collect();
        let report = inspect(spends);
        for (index, record) in report.spends.iter().enumerate() {
            assert_eq!(record.index, index);
            assert_eq!(record.coin.amount, index as u64);
        }
    }

    #[test]
    fn agg_sig_conditions_are_summarized() {
        let pk = "a1".repeat(48);
        let puzzle = format!("(q (50 0x{pk} 0xdead) (49 0x{pk} 0xbeef))");
        let report = inspect(vec![spend_with(&puzzle, "()", 100)]);
        let summary = &report.summary;
        assert_eq!(summary.agg_sig_me.len(), 1);
        assert_eq!(summary.agg_sig_me[0].pubkey, format!("0x{pk}"));
        assert_eq!(summary.agg_sig_me[0].msg, "0xdead");
        assert_eq!(summary.agg_sig_unsafe.len(), 1);
        assert_eq!(summary.agg_sig_unsafe[0].msg, "0xbeef");
        let evaluation = report.spends[0].evaluation.as_ref().unwrap();
        assert_eq!(evaluation.condition_cost, 2_400_000);
    }

    #[test]
    fn identical_bundles_produce_identical_reports() {
        let target_hash = "cd".repeat(32);
        let puzzle = format!("(q (51 0x{target_hash} 10) (52 1))");
        let build = || inspect(vec![spend_with(&puzzle, "()", 100)]);
        let a = serde_json::to_string(&build()).unwrap();
        let b = serde_json::to_string(&build()).unwrap();
        assert_eq!(a, b);
    }
}
