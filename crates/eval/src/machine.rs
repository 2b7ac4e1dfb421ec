//! The evaluation loop: environment-path addressing, operand evaluation,
//! apply, and the running cost meter.

use std::rc::Rc;

use spendlens_core::Value;
use tracing::trace;

use crate::conditions::{decode_conditions, Condition};
use crate::cost;
use crate::error::EvalError;
use crate::ops;

/// Recursion ceiling for the tree-walk. Real puzzles nest far below this;
/// the cap exists so adversarial input cannot exhaust the thread stack.
const MAX_EVAL_DEPTH: usize = 1024;

/// The outcome of running a puzzle against its solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub result: Rc<Value>,
    pub conditions: Vec<Condition>,
    pub cost: u64,
}

/// Run `puzzle` with `solution` as its environment and decode the result
/// as an ordered condition list.
pub fn evaluate(
    puzzle: &Rc<Value>,
    solution: &Rc<Value>,
    max_cost: u64,
) -> Result<Evaluation, EvalError> {
    let (result, cost) = run_program(puzzle, solution, max_cost)?;
    let conditions = decode_conditions(&result)?;
    trace!(cost, conditions = conditions.len(), "puzzle evaluated");
    Ok(Evaluation {
        result,
        conditions,
        cost,
    })
}

/// Run an arbitrary program against an environment, returning the result
/// value and the total cost charged.
pub fn run_program(
    program: &Rc<Value>,
    env: &Rc<Value>,
    max_cost: u64,
) -> Result<(Rc<Value>, u64), EvalError> {
    let mut machine = Machine { cost: 0, max_cost };
    let result = machine.eval(program, env, 0)?;
    Ok((result, machine.cost))
}

struct Machine {
    cost: u64,
    max_cost: u64,
}

impl Machine {
    fn charge(&mut self, amount: u64) -> Result<(), EvalError> {
        self.cost = self.cost.saturating_add(amount);
        if self.cost > self.max_cost {
            return Err(EvalError::CostExceeded {
                cost: self.cost,
                max_cost: self.max_cost,
            });
        }
        Ok(())
    }

    fn eval(
        &mut self,
        program: &Rc<Value>,
        env: &Rc<Value>,
        depth: usize,
    ) -> Result<Rc<Value>, EvalError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(EvalError::evaluation("program nesting too deep"));
        }
        let (operator, operands) = match program.as_ref() {
            Value::Atom(path) => return self.path_lookup(path, env),
            Value::Pair(operator, operands) => (operator, operands),
        };
        let op_bytes = operator
            .as_atom()
            .ok_or_else(|| EvalError::evaluation("operator is not an atom"))?;

        // q takes its operand verbatim, before any evaluation.
        if op_bytes == [ops::OP_QUOTE] {
            self.charge(cost::QUOTE_COST)?;
            return Ok(Rc::clone(operands));
        }

        let operand_list = operands
            .proper_list()
            .ok_or_else(|| EvalError::evaluation("operand list is not a proper list"))?;
        let mut evaluated = Vec::with_capacity(operand_list.len());
        for operand in &operand_list {
            evaluated.push(self.eval(operand, env, depth + 1)?);
        }

        if op_bytes == [ops::OP_APPLY] {
            self.charge(cost::APPLY_COST)?;
            if evaluated.len() != 2 {
                return Err(EvalError::evaluation(format!(
                    "a expects 2 operands, got {}",
                    evaluated.len()
                )));
            }
            let new_env = evaluated.remove(1);
            let new_program = evaluated.remove(0);
            return self.eval(&new_program, &new_env, depth + 1);
        }

        // Signature-group operators are recognized but unavailable in an
        // offline analyzer; they charge their base cost and fail typed.
        if op_bytes == [ops::OP_POINT_ADD] {
            self.charge(cost::POINT_ADD_BASE_COST)?;
            return Err(EvalError::evaluation(
                "point_add is unavailable in offline analysis",
            ));
        }
        if op_bytes == [ops::OP_PUBKEY_FOR_EXP] {
            self.charge(cost::PUBKEY_BASE_COST)?;
            return Err(EvalError::evaluation(
                "pubkey_for_exp is unavailable in offline analysis",
            ));
        }

        let (result, op_cost) = ops::apply(op_bytes, &evaluated)?;
        self.charge(op_cost)?;
        Ok(result)
    }

    /// An atom in program position addresses into the environment: bits
    /// below the sentinel bit are read least-significant first, 0 taking
    /// the first and 1 the rest. Path 0 is nil, path 1 the whole
    /// environment.
    fn path_lookup(&mut self, path: &[u8], env: &Rc<Value>) -> Result<Rc<Value>, EvalError> {
        let mut lookup_cost = cost::PATH_LOOKUP_BASE_COST;
        let mut first_nonzero = 0usize;
        while first_nonzero < path.len() && path[first_nonzero] == 0 {
            lookup_cost += cost::PATH_LOOKUP_COST_PER_ZERO_BYTE;
            first_nonzero += 1;
        }
        if first_nonzero == path.len() {
            self.charge(lookup_cost)?;
            return Ok(Value::nil());
        }

        let significant = &path[first_nonzero..];
        let sentinel = (significant.len() * 8 - 1) - significant[0].leading_zeros() as usize;
        let mut node = Rc::clone(env);
        for bit_index in 0..sentinel {
            lookup_cost += cost::PATH_LOOKUP_COST_PER_LEG;
            let byte = significant[significant.len() - 1 - bit_index / 8];
            let take_rest = (byte >> (bit_index % 8)) & 1 == 1;
            let (first, rest) = node
                .as_pair()
                .ok_or_else(|| EvalError::evaluation("path into atom"))?;
            node = Rc::clone(if take_rest { rest } else { first });
        }
        self.charge(lookup_cost)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendlens_core::text::parse;

    const BUDGET: u64 = 11_000_000_000;

    fn run(program: &str, env: &str) -> Result<(Rc<Value>, u64), EvalError> {
        run_program(&parse(program).unwrap(), &parse(env).unwrap(), BUDGET)
    }

    fn run_ok(program: &str, env: &str) -> Rc<Value> {
        run(program, env).unwrap().0
    }

    #[test]
    fn quoted_one_costs_exactly_quote() {
        let (result, cost) = run("(q . 1)", "()").unwrap();
        assert_eq!(result.as_atom(), Some(&[1u8][..]));
        assert_eq!(cost, cost::QUOTE_COST);
    }

    #[test]
    fn path_addressing() {
        // Env is (1 2 . 3) seen as the tree ((1 . (2 . 3))).
        assert_eq!(run_ok("1", "(1 2 . 3)"), parse("(1 2 . 3)").unwrap());
        assert_eq!(run_ok("2", "(1 2 . 3)").as_atom(), Some(&[1u8][..]));
        assert_eq!(run_ok("5", "(1 2 . 3)").as_atom(), Some(&[2u8][..]));
        assert_eq!(run_ok("7", "(1 2 . 3)").as_atom(), Some(&[3u8][..]));
        assert!(run_ok("0", "(1 2 . 3)").is_nil());
    }

    #[test]
    fn path_into_atom_fails() {
        assert!(matches!(
            run("4", "(1 . 2)"),
            Err(EvalError::Evaluation { .. })
        ));
    }

    #[test]
    fn apply_runs_inner_program() {
        // (a (q . (+ 2 5)) (q . (3 4))) -> 7
        let result = run_ok("(a (q + 2 5) (q 3 4))", "()");
        assert_eq!(result.as_atom(), Some(&[7u8][..]));
    }

    #[test]
    fn if_selects_by_nilness_of_condition() {
        assert_eq!(run_ok("(i (q . 1) (q . 2) (q . 3))", "()").as_atom(), Some(&[2u8][..]));
        assert_eq!(run_ok("(i (q . ()) (q . 2) (q . 3))", "()").as_atom(), Some(&[3u8][..]));
    }

    #[test]
    fn raise_carries_operands() {
        let err = run("(x (q . \"boom\"))", "()").unwrap_err();
        match err {
            EvalError::Evaluation { reason } => assert!(reason.contains("raise")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn raising_the_budget_leaves_a_successful_run_unchanged() {
        let program = parse("(+ (q . 1000) (q . 2000))").unwrap();
        let tight = run_program(&program, &Value::nil(), 10_000).unwrap();
        let roomy = run_program(&program, &Value::nil(), BUDGET).unwrap();
        assert_eq!(tight, roomy);
        // The charged cost itself is a sufficient budget.
        let exact = run_program(&program, &Value::nil(), tight.1).unwrap();
        assert_eq!(exact, tight);
    }

    #[test]
    fn cost_ceiling_is_enforced() {
        let err = run_program(
            &parse("(+ (q . 1) (q . 2))").unwrap(),
            &Value::nil(),
            50,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::CostExceeded { max_cost: 50, .. }));
    }

    #[test]
    fn identical_runs_charge_identical_cost() {
        let a = run("(+ (q . 100) (q . 200) (q . 300))", "()").unwrap();
        let b = run("(+ (q . 100) (q . 200) (q . 300))", "()").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cost_grows_with_extra_work() {
        let (_, small) = run("(+ (q . 1) (q . 2))", "()").unwrap();
        let (_, large) = run("(+ (q . 1) (q . 2) (q . 3))", "()").unwrap();
        assert!(large > small);
    }

    #[test]
    fn evaluate_decodes_conditions() {
        // Puzzle quotes a single CREATE_COIN-shaped condition.
        let puzzle = parse("(q (51 0xababababababababababababababababababababababababababababababab 1000))").unwrap();
        let evaluation = evaluate(&puzzle, &Value::nil(), BUDGET).unwrap();
        assert_eq!(evaluation.conditions.len(), 1);
        assert_eq!(evaluation.conditions[0].opcode, 51);
        assert_eq!(evaluation.conditions[0].args.len(), 2);
    }

    #[test]
    fn quoted_non_list_result_yields_no_conditions() {
        let puzzle = parse("(q . 1)").unwrap();
        let evaluation = evaluate(&puzzle, &Value::nil(), BUDGET).unwrap();
        assert!(evaluation.conditions.is_empty());
        assert_eq!(evaluation.cost, cost::QUOTE_COST);
    }

    #[test]
    fn operator_must_be_an_atom() {
        assert!(matches!(
            run("((q . 1) (q . 2))", "()"),
            Err(EvalError::Evaluation { .. })
        ));
    }
}
