//! Condition decoding and the condition opcode table.
//!
//! The evaluator's result is walked as a list of `(opcode . args)` pairs
//! in evaluation order. Any atom tail terminates the walk, so a puzzle
//! returning a bare value yields an empty condition list.

use std::rc::Rc;

use spendlens_core::number::atom_to_u64;
use spendlens_core::Value;

use crate::error::EvalError;

/// One condition emitted by a puzzle, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub opcode: u64,
    pub args: Vec<Rc<Value>>,
}

pub fn decode_conditions(result: &Rc<Value>) -> Result<Vec<Condition>, EvalError> {
    let (items, _tail) = result.list_prefix();
    let mut conditions = Vec::with_capacity(items.len());
    for item in items {
        let (opcode_atom, rest) = item
            .as_pair()
            .ok_or_else(|| EvalError::evaluation("condition is not a pair"))?;
        let opcode_bytes = opcode_atom
            .as_atom()
            .ok_or_else(|| EvalError::evaluation("condition opcode is not an atom"))?;
        let opcode = atom_to_u64(opcode_bytes).ok_or_else(|| {
            EvalError::evaluation(format!(
                "condition opcode 0x{} out of range",
                hex::encode(opcode_bytes)
            ))
        })?;
        let (args, _tail) = rest.list_prefix();
        conditions.push(Condition { opcode, args });
    }
    Ok(conditions)
}

pub const AGG_SIG_UNSAFE: u64 = 49;
pub const AGG_SIG_ME: u64 = 50;
pub const CREATE_COIN: u64 = 51;
pub const RESERVE_FEE: u64 = 52;

/// Display name for a known condition opcode.
pub fn opcode_name(opcode: u64) -> Option<&'static str> {
    Some(match opcode {
        1 => "REMARK",
        43 => "AGG_SIG_PARENT",
        44 => "AGG_SIG_PUZZLE",
        45 => "AGG_SIG_AMOUNT",
        46 => "AGG_SIG_PUZZLE_AMOUNT",
        47 => "AGG_SIG_PARENT_AMOUNT",
        48 => "AGG_SIG_PARENT_PUZZLE",
        49 => "AGG_SIG_UNSAFE",
        50 => "AGG_SIG_ME",
        51 => "CREATE_COIN",
        52 => "RESERVE_FEE",
        60 => "CREATE_COIN_ANNOUNCEMENT",
        61 => "ASSERT_COIN_ANNOUNCEMENT",
        62 => "CREATE_PUZZLE_ANNOUNCEMENT",
        63 => "ASSERT_PUZZLE_ANNOUNCEMENT",
        64 => "ASSERT_CONCURRENT_SPEND",
        65 => "ASSERT_CONCURRENT_PUZZLE",
        66 => "SEND_MESSAGE",
        67 => "RECEIVE_MESSAGE",
        70 => "ASSERT_MY_COIN_ID",
        71 => "ASSERT_MY_PARENT_ID",
        72 => "ASSERT_MY_PUZZLEHASH",
        73 => "ASSERT_MY_AMOUNT",
        74 => "ASSERT_MY_BIRTH_SECONDS",
        75 => "ASSERT_MY_BIRTH_HEIGHT",
        76 => "ASSERT_EPHEMERAL",
        80 => "ASSERT_SECONDS_RELATIVE",
        81 => "ASSERT_SECONDS_ABSOLUTE",
        82 => "ASSERT_HEIGHT_RELATIVE",
        83 => "ASSERT_HEIGHT_ABSOLUTE",
        84 => "ASSERT_BEFORE_SECONDS_RELATIVE",
        85 => "ASSERT_BEFORE_SECONDS_ABSOLUTE",
        86 => "ASSERT_BEFORE_HEIGHT_RELATIVE",
        87 => "ASSERT_BEFORE_HEIGHT_ABSOLUTE",
        _ => return None,
    })
}

/// Validator surcharge for a condition, on top of execution cost.
/// Only coin creation and signature checks carry one.
pub fn condition_cost(opcode: u64) -> u64 {
    match opcode {
        CREATE_COIN => 1_800_000,
        43..=50 => 1_200_000,
        _ => 0,
    }
}
