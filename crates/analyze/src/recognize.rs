//! The outermost-in recognition loop.

use std::rc::Rc;

use tracing::debug;

use spendlens_core::text::unparse;
use spendlens_core::{tree_hash, uncurry, Value};

use crate::registry::{LayerContext, MatchRule, Registry, WrapperTemplate};
use crate::report::{
    Candidate, NodeSummary, Recognition, WrapperRecord, CONFIDENCE_AMBIGUOUS, CONFIDENCE_FULL,
    CONFIDENCE_PARTIAL,
};

/// Descent ceiling. Real spends stack a handful of wrappers; anything
/// deeper is either adversarial or a recognizer bug.
pub const MAX_LAYER_DEPTH: usize = 32;

/// Recognize against the built-in mainnet registry.
pub fn recognize(puzzle: &Rc<Value>, solution: Option<&Rc<Value>>) -> Recognition {
    recognize_with(Registry::standard(), puzzle, solution)
}

/// Recognize against an explicit registry.
pub fn recognize_with(
    registry: &Registry,
    puzzle: &Rc<Value>,
    solution: Option<&Rc<Value>>,
) -> Recognition {
    let mut wrappers = Vec::new();
    let mut candidates = Vec::new();
    let mut current = Rc::clone(puzzle);
    let mut current_solution = solution.map(Rc::clone);

    for _ in 0..MAX_LAYER_DEPTH {
        let uncurried = uncurry(&current);
        let matched: Vec<&WrapperTemplate> = registry
            .templates()
            .iter()
            .filter(|template| rule_matches(&template.rule, &current, uncurried.as_ref()))
            .collect();

        match matched.as_slice() {
            [] => break,
            [template] => {
                let empty = Vec::new();
                let curried_args = uncurried.as_ref().map_or(&empty, |(_, args)| args);
                let context = LayerContext {
                    puzzle: &current,
                    curried_args,
                    solution: current_solution.as_ref(),
                };
                let outcome = (template.extract)(&context);
                debug!(layer = template.name, "wrapper layer recognized");

                let solution_parsed = outcome.solution_view.is_some();
                let missing_solution = current_solution.is_none();
                let (confidence, status) = if outcome.parse_error.is_some() {
                    (CONFIDENCE_PARTIAL, "parse_error")
                } else if missing_solution {
                    (CONFIDENCE_FULL, "missing_solution")
                } else {
                    (CONFIDENCE_FULL, "ok")
                };
                wrappers.push(WrapperRecord {
                    name: template.name.to_string(),
                    mod_hash: hex::encode(rule_hash(&template.rule)),
                    curried_args_tree_hash: uncurried
                        .as_ref()
                        .and_then(|_| curried_args_node(&current))
                        .map(|args| hex::encode(tree_hash(&args))),
                    inner_puzzle_hash: outcome
                        .inner_puzzle
                        .as_ref()
                        .map(|inner| hex::encode(tree_hash(inner))),
                    params: outcome.params,
                    solution: outcome.solution_view,
                    confidence,
                    status: status.to_string(),
                    parse_error: outcome.parse_error,
                });

                match outcome.inner_puzzle {
                    Some(inner) => {
                        current = inner;
                        current_solution = outcome.inner_solution;
                    }
                    None => {
                        // Terminal layer. A parsed solution view means the
                        // layer consumed its slice; otherwise the slice is
                        // left over and reported as the remaining tail.
                        if solution_parsed {
                            current_solution = outcome.inner_solution;
                        }
                        break;
                    }
                }
            }
            several => {
                // Ambiguity is reported, never guessed through.
                candidates = several
                    .iter()
                    .map(|template| Candidate {
                        name: template.name.to_string(),
                        confidence: CONFIDENCE_AMBIGUOUS,
                    })
                    .collect();
                break;
            }
        }
    }

    Recognition {
        recognized: !wrappers.is_empty() || !candidates.is_empty(),
        wrappers,
        candidates,
        innermost: summarize(&current),
        remaining_solution: current_solution.as_ref().map(summarize),
    }
}

fn rule_matches(
    rule: &MatchRule,
    node: &Rc<Value>,
    uncurried: Option<&(Rc<Value>, Vec<Rc<Value>>)>,
) -> bool {
    match rule {
        MatchRule::CurriedMod(hash) => {
            uncurried.is_some_and(|(module, _)| tree_hash(module) == *hash)
        }
        MatchRule::BareMod(hash) => tree_hash(node) == *hash,
    }
}

fn rule_hash(rule: &MatchRule) -> [u8; 32] {
    match rule {
        MatchRule::CurriedMod(hash) | MatchRule::BareMod(hash) => *hash,
    }
}

/// The raw argument chain of a curried program `(a (q . MOD) ARGS)`.
fn curried_args_node(node: &Rc<Value>) -> Option<Rc<Value>> {
    let (_, rest) = node.as_pair()?;
    let (_, rest) = rest.as_pair()?;
    let (args, _) = rest.as_pair()?;
    Some(Rc::clone(args))
}

fn summarize(value: &Rc<Value>) -> NodeSummary {
    NodeSummary {
        tree_hash: hex::encode(tree_hash(value)),
        text: unparse(value),
    }
}
