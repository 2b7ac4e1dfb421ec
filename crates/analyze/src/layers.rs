//! Per-template parameter extraction and solution slicing.
//!
//! Each extractor receives the curried arguments and the solution slice
//! aligned with its layer, and reports the inner puzzle/solution for the
//! next descent step. A malformed solution is a parse error on the layer,
//! never a hard failure.

use std::rc::Rc;

use serde_json::json;
use spendlens_core::number::atom_to_int;
use spendlens_core::text::unparse;
use spendlens_core::{tree_hash, Value};

use crate::registry::{LayerContext, LayerOutcome};

fn hash_hex(value: &Rc<Value>) -> String {
    hex::encode(tree_hash(value))
}

fn atom_hex(name: &str, value: &Rc<Value>) -> Result<String, String> {
    value
        .as_atom()
        .map(hex::encode)
        .ok_or_else(|| format!("{name} is not an atom"))
}

fn solution_items(
    context: &LayerContext,
    layer: &str,
    expected_min: usize,
) -> Result<Option<Vec<Rc<Value>>>, String> {
    let Some(solution) = context.solution else {
        return Ok(None);
    };
    let items = solution
        .proper_list()
        .ok_or_else(|| format!("{layer} solution is not a proper list"))?;
    if items.len() < expected_min {
        return Err(format!(
            "{layer} solution has {} element(s), expected at least {expected_min}",
            items.len()
        ));
    }
    Ok(Some(items))
}

// ── CAT v2 ──
// Curried: (MOD_HASH TAIL_PROGRAM_HASH INNER_PUZZLE)
// Solution: (inner_solution lineage_proof prev_coin_id this_coin_info
//            next_coin_proof prev_subtotal extra_delta)
pub fn extract_cat(context: &LayerContext) -> LayerOutcome {
    let [_, tail_hash, inner_puzzle] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "cat layer curries {} argument(s), expected 3",
            context.curried_args.len()
        ));
    };
    let tail_hash = match atom_hex("tail program hash", tail_hash) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let params = json!({ "tail_program_hash": tail_hash });

    match solution_items(context, "cat", 7) {
        Ok(Some(items)) => LayerOutcome {
            params,
            solution_view: Some(json!({
                "lineage_proof": unparse(&items[1]),
                "prev_coin_id": unparse(&items[2]),
                "prev_subtotal": unparse(&items[5]),
                "extra_delta": unparse(&items[6]),
            })),
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: Some(Rc::clone(&items[0])),
            parse_error: None,
        },
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

// ── Singleton top layer v1.1 ──
// Curried: (SINGLETON_STRUCT INNER_PUZZLE) where SINGLETON_STRUCT is
// (MOD_HASH . (LAUNCHER_ID . LAUNCHER_PUZZLE_HASH))
// Solution: (lineage_proof my_amount inner_solution)
pub fn extract_singleton(context: &LayerContext) -> LayerOutcome {
    let [singleton_struct, inner_puzzle] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "singleton layer curries {} argument(s), expected 2",
            context.curried_args.len()
        ));
    };
    let params = match singleton_params(singleton_struct) {
        Ok(params) => params,
        Err(e) => return LayerOutcome::failed(e),
    };

    match solution_items(context, "singleton", 3) {
        Ok(Some(items)) => LayerOutcome {
            params,
            solution_view: Some(json!({
                "lineage_proof": unparse(&items[0]),
                "my_amount": unparse(&items[1]),
            })),
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: Some(Rc::clone(&items[2])),
            parse_error: None,
        },
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

fn singleton_params(singleton_struct: &Rc<Value>) -> Result<serde_json::Value, String> {
    let (mod_hash, rest) = singleton_struct
        .as_pair()
        .ok_or("singleton struct is not a pair")?;
    let (launcher_id, launcher_puzzle_hash) =
        rest.as_pair().ok_or("singleton struct tail is not a pair")?;
    Ok(json!({
        "singleton_mod_hash": atom_hex("singleton mod hash", mod_hash)?,
        "launcher_id": atom_hex("launcher id", launcher_id)?,
        "launcher_puzzle_hash": atom_hex("launcher puzzle hash", launcher_puzzle_hash)?,
    }))
}

// ── DID inner puzzle ──
// Curried: (INNER_PUZZLE RECOVERY_DID_LIST_HASH NUM_VERIFICATIONS_REQUIRED
//           SINGLETON_STRUCT METADATA)
// Solution: (mode inner_solution ...)
pub fn extract_did(context: &LayerContext) -> LayerOutcome {
    let [inner_puzzle, recovery_list_hash, num_verifications, _singleton_struct, metadata] =
        context.curried_args
    else {
        return LayerOutcome::failed(format!(
            "did layer curries {} argument(s), expected 5",
            context.curried_args.len()
        ));
    };
    let recovery = match atom_hex("recovery list hash", recovery_list_hash) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let verifications = num_verifications
        .as_atom()
        .and_then(|bytes| atom_to_int(bytes).ok());
    let params = json!({
        "recovery_did_list_hash": recovery,
        "num_verifications_required": verifications,
        "metadata": unparse(metadata),
    });

    match solution_items(context, "did", 2) {
        Ok(Some(items)) => LayerOutcome {
            params,
            solution_view: Some(json!({ "mode": unparse(&items[0]) })),
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: Some(Rc::clone(&items[1])),
            parse_error: None,
        },
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

// ── NFT state layer ──
// Curried: (MOD_HASH METADATA METADATA_UPDATER_PUZZLE_HASH INNER_PUZZLE)
// Solution: (inner_solution)
pub fn extract_nft_state(context: &LayerContext) -> LayerOutcome {
    let [_, metadata, updater_hash, inner_puzzle] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "nft state layer curries {} argument(s), expected 4",
            context.curried_args.len()
        ));
    };
    let updater = match atom_hex("metadata updater hash", updater_hash) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let params = json!({
        "metadata": unparse(metadata),
        "metadata_updater_puzzle_hash": updater,
    });
    descend_single_solution(context, "nft state", params, inner_puzzle)
}

// ── NFT ownership layer ──
// Curried: (MOD_HASH CURRENT_OWNER TRANSFER_PROGRAM INNER_PUZZLE)
// Solution: (inner_solution)
pub fn extract_nft_ownership(context: &LayerContext) -> LayerOutcome {
    let [_, current_owner, transfer_program, inner_puzzle] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "nft ownership layer curries {} argument(s), expected 4",
            context.curried_args.len()
        ));
    };
    let params = json!({
        "current_owner": unparse(current_owner),
        "transfer_program_hash": hash_hex(transfer_program),
    });
    descend_single_solution(context, "nft ownership", params, inner_puzzle)
}

// Terminal layers share one shape: params plus an optional parsed view of
// the whole remaining solution.
fn terminal(
    params: serde_json::Value,
    view: Result<Option<serde_json::Value>, String>,
) -> LayerOutcome {
    match view {
        Ok(solution_view) => LayerOutcome {
            params,
            solution_view,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

fn descend_single_solution(
    context: &LayerContext,
    layer: &str,
    params: serde_json::Value,
    inner_puzzle: &Rc<Value>,
) -> LayerOutcome {
    match solution_items(context, layer, 1) {
        Ok(Some(items)) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: Some(Rc::clone(&items[0])),
            parse_error: None,
        },
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: Some(Rc::clone(inner_puzzle)),
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

// ── Standard p2 puzzle (delegated or hidden) ──
// Curried: (SYNTHETIC_PUBLIC_KEY)
// Solution: (original_public_key delegated_puzzle delegated_solution)
// Terminal layer: the delegated puzzle is data in the solution, not a
// wrapper slot, so recognition stops here.
pub fn extract_standard(context: &LayerContext) -> LayerOutcome {
    let [synthetic_key] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "standard layer curries {} argument(s), expected 1",
            context.curried_args.len()
        ));
    };
    let key = match atom_hex("synthetic public key", synthetic_key) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let params = json!({ "synthetic_public_key": key });

    match solution_items(context, "standard", 3) {
        Ok(Some(items)) => LayerOutcome {
            params,
            solution_view: Some(json!({
                "original_public_key": unparse(&items[0]),
                "delegated_puzzle_hash": hash_hex(&items[1]),
                "delegated_solution": unparse(&items[2]),
            })),
            inner_puzzle: None,
            inner_solution: None,
            parse_error: None,
        },
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

// ── NFT royalty transfer program ──
// Curried: (SINGLETON_STRUCT ROYALTY_ADDRESS TRADE_PRICE_PERCENTAGE)
// Runs inside offer settlement, so it carries no spendable solution of
// its own.
pub fn extract_royalty_transfer(context: &LayerContext) -> LayerOutcome {
    let [singleton_struct, royalty_address, trade_price_percentage] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "royalty transfer layer curries {} argument(s), expected 3",
            context.curried_args.len()
        ));
    };
    let Some(launcher_id) = singleton_struct
        .as_pair()
        .and_then(|(_, rest)| rest.as_pair().map(|(launcher, _)| Rc::clone(launcher)))
    else {
        return LayerOutcome::failed("royalty transfer singleton struct is malformed");
    };
    let launcher_id = match atom_hex("launcher id", &launcher_id) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let royalty_hash = match atom_hex("royalty puzzle hash", royalty_address) {
        Ok(hex) => hex,
        Err(e) => return LayerOutcome::failed(e),
    };
    let basis_points = trade_price_percentage
        .as_atom()
        .and_then(|bytes| atom_to_int(bytes).ok());
    terminal(
        json!({
            "launcher_id": launcher_id,
            "royalty_puzzle_hash": royalty_hash,
            "royalty_basis_points": basis_points,
        }),
        Ok(None),
    )
}

// ── Augmented condition ──
// Curried: (CONDITION INNER_PUZZLE)
// Solution: (inner_solution)
pub fn extract_augmented_condition(context: &LayerContext) -> LayerOutcome {
    let [condition, inner_puzzle] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "augmented condition layer curries {} argument(s), expected 2",
            context.curried_args.len()
        ));
    };
    let params = json!({ "condition": unparse(condition) });
    descend_single_solution(context, "augmented condition", params, inner_puzzle)
}

// ── Revocation layer ──
// Curried: (MOD_HASH HIDDEN_PUZZLE_HASH INNER_PUZZLE_HASH)
// Solution: (hidden puzzle solution); the spent puzzle is revealed in the
// solution rather than curried, so there is nothing to descend into.
pub fn extract_revocation(context: &LayerContext) -> LayerOutcome {
    let [_, hidden_hash, inner_hash] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "revocation layer curries {} argument(s), expected 3",
            context.curried_args.len()
        ));
    };
    let params = match (
        atom_hex("hidden puzzle hash", hidden_hash),
        atom_hex("inner puzzle hash", inner_hash),
    ) {
        (Ok(hidden), Ok(inner)) => json!({
            "hidden_puzzle_hash": hidden,
            "inner_puzzle_hash": inner,
        }),
        (Err(e), _) | (_, Err(e)) => return LayerOutcome::failed(e),
    };
    let view = solution_items(context, "revocation", 3).map(|items| {
        items.map(|items| {
            json!({
                "hidden": !items[0].is_nil(),
                "puzzle_tree_hash": hash_hex(&items[1]),
                "solution_tree_hash": hash_hex(&items[2]),
            })
        })
    });
    terminal(params, view)
}

// ── Pay-to-singleton ──
// Curried: (SINGLETON_MOD_HASH LAUNCHER_ID LAUNCHER_PUZZLE_HASH)
// Solution: (singleton_inner_puzzle_hash my_id)
pub fn extract_p2_singleton(context: &LayerContext) -> LayerOutcome {
    let [_, launcher_id, _] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "p2 singleton layer curries {} argument(s), expected 3",
            context.curried_args.len()
        ));
    };
    let params = match atom_hex("launcher id", launcher_id) {
        Ok(hex) => json!({ "launcher_id": hex }),
        Err(e) => return LayerOutcome::failed(e),
    };
    let view = match solution_items(context, "p2 singleton", 2) {
        Ok(Some(items)) => match (
            atom_hex("singleton inner puzzle hash", &items[0]),
            atom_hex("coin id", &items[1]),
        ) {
            (Ok(inner), Ok(my_id)) => Ok(Some(json!({
                "singleton_inner_puzzle_hash": inner,
                "my_id": my_id,
            }))),
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    terminal(params, view)
}

// ── Pay-to-curried-puzzle-hash ──
// Curried: (PUZZLE_HASH)
// Solution: (puzzle solution)
pub fn extract_p2_curried(context: &LayerContext) -> LayerOutcome {
    let [puzzle_hash] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "p2 curried layer curries {} argument(s), expected 1",
            context.curried_args.len()
        ));
    };
    let params = match atom_hex("puzzle hash", puzzle_hash) {
        Ok(hex) => json!({ "puzzle_hash": hex }),
        Err(e) => return LayerOutcome::failed(e),
    };
    let view = solution_items(context, "p2 curried", 2).map(|items| {
        items.map(|items| {
            json!({
                "puzzle_tree_hash": hash_hex(&items[0]),
                "solution_tree_hash": hash_hex(&items[1]),
            })
        })
    });
    terminal(params, view)
}

// ── Pay-to-one-of-many ──
// Curried: (MERKLE_ROOT)
// Solution: (merkle_proof puzzle solution)
pub fn extract_p2_one_of_many(context: &LayerContext) -> LayerOutcome {
    let [merkle_root] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "p2 one-of-many layer curries {} argument(s), expected 1",
            context.curried_args.len()
        ));
    };
    let params = match atom_hex("merkle root", merkle_root) {
        Ok(hex) => json!({ "merkle_root": hex }),
        Err(e) => return LayerOutcome::failed(e),
    };
    let view = solution_items(context, "p2 one-of-many", 3).map(|items| {
        items.map(|items| {
            json!({
                "merkle_proof": unparse(&items[0]),
                "puzzle_tree_hash": hash_hex(&items[1]),
                "solution_tree_hash": hash_hex(&items[2]),
            })
        })
    });
    terminal(params, view)
}

// ── Pay-to-delegated-conditions ──
// Curried: (PUBLIC_KEY)
// Solution: (conditions)
pub fn extract_p2_delegated_conditions(context: &LayerContext) -> LayerOutcome {
    let [public_key] = context.curried_args else {
        return LayerOutcome::failed(format!(
            "p2 delegated conditions layer curries {} argument(s), expected 1",
            context.curried_args.len()
        ));
    };
    let params = match atom_hex("public key", public_key) {
        Ok(hex) => json!({ "public_key": hex }),
        Err(e) => return LayerOutcome::failed(e),
    };
    let view = match solution_items(context, "p2 delegated conditions", 1) {
        Ok(Some(items)) => match items[0].proper_list() {
            Some(conditions) => Ok(Some(json!({
                "conditions_len": conditions.len(),
                "conditions": unparse(&items[0]),
            }))),
            None => Err("delegated conditions are not a proper list".to_string()),
        },
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    terminal(params, view)
}

// ── Settlement payments ──
// Bare module, nothing curried.
// Solution: ((nonce (puzzle_hash amount ...memos) ...) ...)
pub fn extract_settlement(context: &LayerContext) -> LayerOutcome {
    let params = json!({});
    match solution_items(context, "settlement", 0) {
        Ok(Some(items)) => {
            let mut payments = Vec::new();
            for group in &items {
                match notarized_group(group) {
                    Ok(view) => payments.push(view),
                    Err(e) => {
                        return LayerOutcome {
                            params,
                            solution_view: None,
                            inner_puzzle: None,
                            inner_solution: None,
                            parse_error: Some(e),
                        }
                    }
                }
            }
            LayerOutcome {
                params,
                solution_view: Some(json!({ "notarized_payments": payments })),
                inner_puzzle: None,
                inner_solution: None,
                parse_error: None,
            }
        }
        Ok(None) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: None,
        },
        Err(e) => LayerOutcome {
            params,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: Some(e),
        },
    }
}

fn notarized_group(group: &Rc<Value>) -> Result<serde_json::Value, String> {
    let items = group
        .proper_list()
        .ok_or("notarized payment group is not a proper list")?;
    let (nonce, payments) = items
        .split_first()
        .ok_or("notarized payment group is empty")?;
    let mut views = Vec::new();
    for payment in payments {
        let fields = payment
            .proper_list()
            .ok_or("payment is not a proper list")?;
        if fields.len() < 2 {
            return Err("payment needs a puzzle hash and an amount".to_string());
        }
        views.push(json!({
            "puzzle_hash": atom_hex("payment puzzle hash", &fields[0])?,
            "amount": unparse(&fields[1]),
        }));
    }
    Ok(json!({ "nonce": unparse(nonce), "payments": views }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendlens_core::text::parse;

    fn context<'a>(
        puzzle: &'a Rc<Value>,
        curried_args: &'a [Rc<Value>],
        solution: Option<&'a Rc<Value>>,
    ) -> LayerContext<'a> {
        LayerContext {
            puzzle,
            curried_args,
            solution,
        }
    }

    #[test]
    fn royalty_transfer_reports_launcher_and_rate() {
        let puzzle = parse("(q . 1)").unwrap();
        let singleton_struct = parse(&format!(
            "(0x{} . (0x{} . 0x{}))",
            "11".repeat(32),
            "22".repeat(32),
            "33".repeat(32)
        ))
        .unwrap();
        let args = vec![
            singleton_struct,
            Value::atom(vec![0x44; 32]),
            parse("300").unwrap(),
        ];
        let outcome = extract_royalty_transfer(&context(&puzzle, &args, None));
        assert!(outcome.parse_error.is_none());
        assert!(outcome.inner_puzzle.is_none());
        assert_eq!(outcome.params["launcher_id"], "22".repeat(32));
        assert_eq!(outcome.params["royalty_puzzle_hash"], "44".repeat(32));
        assert_eq!(outcome.params["royalty_basis_points"], 300);
    }

    #[test]
    fn revocation_reveals_hidden_flag_and_puzzle_hashes() {
        let puzzle = parse("(q . 1)").unwrap();
        let args = vec![
            Value::atom(vec![0u8; 32]),
            Value::atom(vec![1; 32]),
            Value::atom(vec![2; 32]),
        ];
        let revealed = parse("(q . 7)").unwrap();
        let solution = Value::list(vec![Value::nil(), Rc::clone(&revealed), Value::nil()]);
        let outcome = extract_revocation(&context(&puzzle, &args, Some(&solution)));
        assert!(outcome.parse_error.is_none());
        let view = outcome.solution_view.unwrap();
        assert_eq!(view["hidden"], false);
        assert_eq!(view["puzzle_tree_hash"], hex::encode(tree_hash(&revealed)));
    }

    #[test]
    fn augmented_condition_descends_into_its_inner_puzzle() {
        let puzzle = parse("(q . 1)").unwrap();
        let inner = parse("(q . 2)").unwrap();
        let args = vec![parse("(80 100)").unwrap(), Rc::clone(&inner)];
        let solution = parse("((5 6))").unwrap();
        let outcome = extract_augmented_condition(&context(&puzzle, &args, Some(&solution)));
        assert!(outcome.parse_error.is_none());
        assert_eq!(outcome.params["condition"], "(80 100)");
        assert_eq!(outcome.inner_puzzle, Some(inner));
        assert_eq!(outcome.inner_solution, Some(parse("(5 6)").unwrap()));
    }

    #[test]
    fn p2_one_of_many_summarizes_the_revealed_puzzle() {
        let puzzle = parse("(q . 1)").unwrap();
        let args = vec![Value::atom(vec![0xaa; 32])];
        let revealed = parse("(q . 9)").unwrap();
        let solution = Value::list(vec![
            parse("(0xab 0xcd)").unwrap(),
            Rc::clone(&revealed),
            Value::nil(),
        ]);
        let outcome = extract_p2_one_of_many(&context(&puzzle, &args, Some(&solution)));
        assert!(outcome.parse_error.is_none());
        assert_eq!(outcome.params["merkle_root"], "aa".repeat(32));
        let view = outcome.solution_view.unwrap();
        assert_eq!(view["puzzle_tree_hash"], hex::encode(tree_hash(&revealed)));
    }

    #[test]
    fn p2_delegated_conditions_flags_a_truncated_solution() {
        let puzzle = parse("(q . 1)").unwrap();
        let args = vec![Value::atom(vec![0xbb; 48])];
        let empty = parse("()").unwrap();
        let outcome = extract_p2_delegated_conditions(&context(&puzzle, &args, Some(&empty)));
        assert!(outcome.parse_error.is_some());
        assert!(outcome.solution_view.is_none());

        let solution = parse("(((80 100) (52 1)))").unwrap();
        let outcome = extract_p2_delegated_conditions(&context(&puzzle, &args, Some(&solution)));
        assert!(outcome.parse_error.is_none());
        assert_eq!(outcome.solution_view.unwrap()["conditions_len"], 2);
    }
}
