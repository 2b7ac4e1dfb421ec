//! Operator handlers. Each returns the result value together with the
//! full cost of the application, malloc charges included.

use std::rc::Rc;

use sha2::{Digest, Sha256};
use spendlens_core::number::{atom_to_int, int_to_atom};
use spendlens_core::text::unparse;
use spendlens_core::Value;

use crate::cost::*;
use crate::error::EvalError;

pub const OP_QUOTE: u8 = 1;
pub const OP_APPLY: u8 = 2;
pub const OP_POINT_ADD: u8 = 29;
pub const OP_PUBKEY_FOR_EXP: u8 = 30;

type OpResult = Result<(Rc<Value>, u64), EvalError>;

pub fn apply(op_bytes: &[u8], args: &[Rc<Value>]) -> OpResult {
    let [opcode] = op_bytes else {
        return Err(EvalError::evaluation(format!(
            "unknown operator 0x{}",
            hex::encode(op_bytes)
        )));
    };
    match opcode {
        3 => op_if(args),
        4 => op_cons(args),
        5 => op_first(args),
        6 => op_rest(args),
        7 => op_listp(args),
        8 => op_raise(args),
        9 => op_eq(args),
        10 => op_gr_bytes(args),
        11 => op_sha256(args),
        12 => op_substr(args),
        13 => op_strlen(args),
        14 => op_concat(args),
        16 => op_add(args),
        17 => op_subtract(args),
        18 => op_multiply(args),
        19 => op_divide(args),
        20 => op_divmod(args),
        21 => op_gr(args),
        22 => op_ash(args),
        23 => op_lsh(args),
        24 => op_logand(args),
        25 => op_logior(args),
        26 => op_logxor(args),
        27 => op_lognot(args),
        32 => op_not(args),
        33 => op_any(args),
        34 => op_all(args),
        other => Err(EvalError::evaluation(format!("unknown operator {other}"))),
    }
}

// ── Argument helpers ──

fn exactly<'a, const N: usize>(name: &str, args: &'a [Rc<Value>]) -> Result<&'a [Rc<Value>; N], EvalError> {
    args.try_into().map_err(|_| {
        EvalError::evaluation(format!("{name} expects {N} operand(s), got {}", args.len()))
    })
}

fn atom<'a>(name: &str, value: &'a Rc<Value>) -> Result<&'a [u8], EvalError> {
    value
        .as_atom()
        .ok_or_else(|| EvalError::evaluation(format!("{name} requires an atom operand")))
}

fn number(name: &str, value: &Rc<Value>) -> Result<i128, EvalError> {
    let bytes = atom(name, value)?;
    atom_to_int(bytes).map_err(|e| EvalError::evaluation(format!("{name}: {e}")))
}

fn bool_atom(truth: bool) -> Rc<Value> {
    if truth {
        Value::atom(vec![1])
    } else {
        Value::nil()
    }
}

fn number_result(value: i128, base: u64) -> (Rc<Value>, u64) {
    let bytes = int_to_atom(value);
    let malloc = bytes.len() as u64 * MALLOC_COST_PER_BYTE;
    (Value::atom(bytes), base + malloc)
}

fn byte_total(name: &str, args: &[Rc<Value>]) -> Result<u64, EvalError> {
    let mut total = 0u64;
    for arg in args {
        total += atom(name, arg)?.len() as u64;
    }
    Ok(total)
}

// ── Control and structure ──

fn op_if(args: &[Rc<Value>]) -> OpResult {
    let [condition, then_branch, else_branch] = exactly::<3>("i", args)?;
    let chosen = if condition.is_nil() { else_branch } else { then_branch };
    Ok((Rc::clone(chosen), IF_COST))
}

fn op_cons(args: &[Rc<Value>]) -> OpResult {
    let [first, rest] = exactly::<2>("c", args)?;
    Ok((Value::pair(Rc::clone(first), Rc::clone(rest)), CONS_COST))
}

fn op_first(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("f", args)?;
    let (first, _) = value
        .as_pair()
        .ok_or_else(|| EvalError::evaluation("f requires a pair operand"))?;
    Ok((Rc::clone(first), FIRST_COST))
}

fn op_rest(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("r", args)?;
    let (_, rest) = value
        .as_pair()
        .ok_or_else(|| EvalError::evaluation("r requires a pair operand"))?;
    Ok((Rc::clone(rest), REST_COST))
}

fn op_listp(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("l", args)?;
    Ok((bool_atom(value.as_pair().is_some()), LISTP_COST))
}

fn op_raise(args: &[Rc<Value>]) -> OpResult {
    let detail = args.iter().map(unparse).collect::<Vec<_>>().join(" ");
    Err(EvalError::evaluation(format!("clvm raise: {detail}")))
}

// ── Comparison ──

fn op_eq(args: &[Rc<Value>]) -> OpResult {
    let [a, b] = exactly::<2>("=", args)?;
    let a = atom("=", a)?;
    let b = atom("=", b)?;
    let op_cost = EQ_BASE_COST + (a.len() + b.len()) as u64 * EQ_COST_PER_BYTE;
    Ok((bool_atom(a == b), op_cost))
}

fn op_gr_bytes(args: &[Rc<Value>]) -> OpResult {
    let [a, b] = exactly::<2>(">s", args)?;
    let a = atom(">s", a)?;
    let b = atom(">s", b)?;
    let op_cost = GRS_BASE_COST + (a.len() + b.len()) as u64 * GRS_COST_PER_BYTE;
    Ok((bool_atom(a > b), op_cost))
}

fn op_gr(args: &[Rc<Value>]) -> OpResult {
    let [a, b] = exactly::<2>(">", args)?;
    let byte_count = byte_total(">", args)?;
    let a = number(">", a)?;
    let b = number(">", b)?;
    let op_cost = GR_BASE_COST + byte_count * GR_COST_PER_BYTE;
    Ok((bool_atom(a > b), op_cost))
}

// ── Byte strings ──

fn op_sha256(args: &[Rc<Value>]) -> OpResult {
    let mut chunks = Vec::with_capacity(args.len());
    for arg in args {
        chunks.push(atom("sha256", arg)?);
    }
    let byte_count: u64 = chunks.iter().map(|c| c.len() as u64).sum();
    let mut hasher = Sha256::new();
    for chunk in &chunks {
        hasher.update(chunk);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    let op_cost = SHA256_BASE_COST
        + args.len() as u64 * SHA256_COST_PER_ARG
        + byte_count * SHA256_COST_PER_BYTE
        + 32 * MALLOC_COST_PER_BYTE;
    Ok((Value::atom(digest.to_vec()), op_cost))
}

fn op_substr(args: &[Rc<Value>]) -> OpResult {
    if args.len() != 2 && args.len() != 3 {
        return Err(EvalError::evaluation(format!(
            "substr expects 2 or 3 operands, got {}",
            args.len()
        )));
    }
    let source = atom("substr", &args[0])?;
    let start = number("substr", &args[1])?;
    let end = if args.len() == 3 {
        number("substr", &args[2])?
    } else {
        source.len() as i128
    };
    if start < 0 || end < start || end > source.len() as i128 {
        return Err(EvalError::evaluation(format!(
            "substr range {start}..{end} out of bounds for {} byte(s)",
            source.len()
        )));
    }
    let slice = source[start as usize..end as usize].to_vec();
    Ok((Value::atom(slice), SUBSTR_COST))
}

fn op_strlen(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("strlen", args)?;
    let bytes = atom("strlen", value)?;
    let encoded = int_to_atom(bytes.len() as i128);
    let op_cost = STRLEN_BASE_COST
        + bytes.len() as u64 * STRLEN_COST_PER_BYTE
        + encoded.len() as u64 * MALLOC_COST_PER_BYTE;
    Ok((Value::atom(encoded), op_cost))
}

fn op_concat(args: &[Rc<Value>]) -> OpResult {
    let mut joined = Vec::new();
    for arg in args {
        joined.extend_from_slice(atom("concat", arg)?);
    }
    let op_cost = CONCAT_BASE_COST
        + args.len() as u64 * CONCAT_COST_PER_ARG
        + joined.len() as u64 * CONCAT_COST_PER_BYTE
        + joined.len() as u64 * MALLOC_COST_PER_BYTE;
    Ok((Value::atom(joined), op_cost))
}

// ── Arithmetic ──

fn checked(name: &str, value: Option<i128>) -> Result<i128, EvalError> {
    value.ok_or_else(|| EvalError::evaluation(format!("{name}: integer overflow")))
}

fn op_add(args: &[Rc<Value>]) -> OpResult {
    let byte_count = byte_total("+", args)?;
    let mut total = 0i128;
    for arg in args {
        total = checked("+", total.checked_add(number("+", arg)?))?;
    }
    let base = ARITH_BASE_COST + args.len() as u64 * ARITH_COST_PER_ARG + byte_count * ARITH_COST_PER_BYTE;
    Ok(number_result(total, base))
}

fn op_subtract(args: &[Rc<Value>]) -> OpResult {
    let byte_count = byte_total("-", args)?;
    let mut total = 0i128;
    for (index, arg) in args.iter().enumerate() {
        let value = number("-", arg)?;
        total = if index == 0 {
            value
        } else {
            checked("-", total.checked_sub(value))?
        };
    }
    let base = ARITH_BASE_COST + args.len() as u64 * ARITH_COST_PER_ARG + byte_count * ARITH_COST_PER_BYTE;
    Ok(number_result(total, base))
}

fn op_multiply(args: &[Rc<Value>]) -> OpResult {
    let mut product = 1i128;
    for arg in args {
        product = checked("*", product.checked_mul(number("*", arg)?))?;
    }
    let pairwise = args.len().saturating_sub(1) as u64;
    let base = MUL_BASE_COST + pairwise * MUL_COST_PER_OP;
    Ok(number_result(product, base))
}

fn floor_div(a: i128, b: i128) -> Result<i128, EvalError> {
    if b == 0 {
        return Err(EvalError::evaluation("division by zero"));
    }
    let quotient = checked("/", a.checked_div(b))?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn op_divide(args: &[Rc<Value>]) -> OpResult {
    let [a, b] = exactly::<2>("/", args)?;
    let byte_count = byte_total("/", args)?;
    let quotient = floor_div(number("/", a)?, number("/", b)?)?;
    let base = DIV_BASE_COST + byte_count * DIV_COST_PER_BYTE;
    Ok(number_result(quotient, base))
}

fn op_divmod(args: &[Rc<Value>]) -> OpResult {
    let [a, b] = exactly::<2>("divmod", args)?;
    let byte_count = byte_total("divmod", args)?;
    let a = number("divmod", a)?;
    let b = number("divmod", b)?;
    let quotient = floor_div(a, b)?;
    let remainder = a - quotient * b;
    let q_bytes = int_to_atom(quotient);
    let r_bytes = int_to_atom(remainder);
    let malloc = (q_bytes.len() + r_bytes.len()) as u64 * MALLOC_COST_PER_BYTE;
    let op_cost = DIVMOD_BASE_COST + byte_count * DIVMOD_COST_PER_BYTE + malloc;
    Ok((Value::pair(Value::atom(q_bytes), Value::atom(r_bytes)), op_cost))
}

// ── Shifts and bitwise logic ──

fn op_ash(args: &[Rc<Value>]) -> OpResult {
    let [value, count] = exactly::<2>("ash", args)?;
    let byte_count = byte_total("ash", args)?;
    let value = number("ash", value)?;
    let count = number("ash", count)?;
    let shifted = if count >= 0 {
        if count >= 128 {
            return Err(EvalError::evaluation("ash: shift count too large"));
        }
        let shifted = checked("ash", value.checked_shl(count as u32))?;
        if shifted >> (count as u32) != value {
            return Err(EvalError::evaluation("ash: integer overflow"));
        }
        shifted
    } else {
        let count = (-count).min(127) as u32;
        value >> count
    };
    let base = ASH_BASE_COST + byte_count * ASH_COST_PER_BYTE;
    Ok(number_result(shifted, base))
}

fn op_lsh(args: &[Rc<Value>]) -> OpResult {
    let [value, count] = exactly::<2>("lsh", args)?;
    let byte_count = byte_total("lsh", args)?;
    let raw = atom("lsh", value)?;
    if raw.len() > 16 {
        return Err(EvalError::evaluation("lsh: operand too wide"));
    }
    // Logical shift treats the operand as an unsigned byte string.
    let mut unsigned = 0u128;
    for &byte in raw {
        unsigned = (unsigned << 8) | byte as u128;
    }
    let count = number("lsh", count)?;
    let shifted = if count >= 0 {
        if count >= 128 {
            return Err(EvalError::evaluation("lsh: shift count too large"));
        }
        let shifted = unsigned.checked_shl(count as u32).unwrap_or(0);
        if shifted >> (count as u32) != unsigned {
            return Err(EvalError::evaluation("lsh: integer overflow"));
        }
        shifted
    } else {
        let count = (-count).min(127) as u32;
        unsigned >> count
    };
    let signed = i128::try_from(shifted)
        .map_err(|_| EvalError::evaluation("lsh: result out of range"))?;
    let base = LSH_BASE_COST + byte_count * LSH_COST_PER_BYTE;
    Ok(number_result(signed, base))
}

fn fold_logic(
    name: &str,
    args: &[Rc<Value>],
    identity: i128,
    combine: fn(i128, i128) -> i128,
) -> OpResult {
    let byte_count = byte_total(name, args)?;
    let mut folded = identity;
    for arg in args {
        folded = combine(folded, number(name, arg)?);
    }
    let base = LOG_BASE_COST + args.len() as u64 * LOG_COST_PER_ARG + byte_count * LOG_COST_PER_BYTE;
    Ok(number_result(folded, base))
}

fn op_logand(args: &[Rc<Value>]) -> OpResult {
    fold_logic("logand", args, -1, |a, b| a & b)
}

fn op_logior(args: &[Rc<Value>]) -> OpResult {
    fold_logic("logior", args, 0, |a, b| a | b)
}

fn op_logxor(args: &[Rc<Value>]) -> OpResult {
    fold_logic("logxor", args, 0, |a, b| a ^ b)
}

fn op_lognot(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("lognot", args)?;
    let bytes = atom("lognot", value)?;
    let result = !number("lognot", value)?;
    let base = LOGNOT_BASE_COST + bytes.len() as u64 * LOGNOT_COST_PER_BYTE;
    Ok(number_result(result, base))
}

// ── Boolean folds ──

fn op_not(args: &[Rc<Value>]) -> OpResult {
    let [value] = exactly::<1>("not", args)?;
    let op_cost = BOOL_BASE_COST + BOOL_COST_PER_ARG;
    Ok((bool_atom(value.is_nil()), op_cost))
}

fn op_any(args: &[Rc<Value>]) -> OpResult {
    let truth = args.iter().any(|arg| !arg.is_nil());
    let op_cost = BOOL_BASE_COST + args.len() as u64 * BOOL_COST_PER_ARG;
    Ok((bool_atom(truth), op_cost))
}

fn op_all(args: &[Rc<Value>]) -> OpResult {
    let truth = args.iter().all(|arg| !arg.is_nil());
    let op_cost = BOOL_BASE_COST + args.len() as u64 * BOOL_COST_PER_ARG;
    Ok((bool_atom(truth), op_cost))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendlens_core::text::parse;

    fn args(text: &str) -> Vec<Rc<Value>> {
        parse(text).unwrap().proper_list().unwrap()
    }

    fn result_int(op: u8, operands: &str) -> i128 {
        let (value, _) = apply(&[op], &args(operands)).unwrap();
        atom_to_int(value.as_atom().unwrap()).unwrap()
    }

    #[test]
    fn eq_is_byte_equality() {
        // 0x00 and () differ as bytes even though both read as zero.
        let (value, _) = apply(&[9], &[Value::atom(vec![0x00]), Value::nil()]).unwrap();
        assert!(value.is_nil());
        let (value, _) = apply(&[9], &[Value::nil(), Value::nil()]).unwrap();
        assert_eq!(value.as_atom(), Some(&[1u8][..]));
    }

    #[test]
    fn numeric_and_byte_comparison_disagree_on_sign() {
        // -1 numerically below 1, but 0xff lexicographically above 0x01.
        assert_eq!(result_int(21, "(-1 1)"), 0);
        let (value, _) = apply(&[10], &args("(-1 1)")).unwrap();
        assert_eq!(value.as_atom(), Some(&[1u8][..]));
    }

    #[test]
    fn arithmetic_folds() {
        assert_eq!(result_int(16, "(1 2 3)"), 6);
        assert_eq!(result_int(17, "(10 3 2)"), 5);
        assert_eq!(result_int(17, "(5)"), 5);
        assert_eq!(result_int(18, "(3 4 5)"), 60);
        assert_eq!(result_int(16, "()"), 0);
    }

    #[test]
    fn division_floors_toward_negative_infinity() {
        assert_eq!(result_int(19, "(7 2)"), 3);
        assert_eq!(result_int(19, "(-7 2)"), -4);
        assert_eq!(result_int(19, "(7 -2)"), -4);
        assert_eq!(result_int(19, "(-7 -2)"), 3);
    }

    #[test]
    fn divmod_returns_floor_pair() {
        let (value, _) = apply(&[20], &args("(-7 2)")).unwrap();
        let (q, r) = value.as_pair().unwrap();
        assert_eq!(atom_to_int(q.as_atom().unwrap()).unwrap(), -4);
        assert_eq!(atom_to_int(r.as_atom().unwrap()).unwrap(), 1);
    }

    #[test]
    fn division_by_zero_fails() {
        assert!(apply(&[19], &args("(1 0)")).is_err());
        assert!(apply(&[20], &args("(1 0)")).is_err());
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        let big = Value::atom(int_to_atom(i128::MAX));
        assert!(apply(&[16], &[Rc::clone(&big), Value::atom(vec![1])]).is_err());
        assert!(apply(&[18], &[Rc::clone(&big), Value::atom(vec![2])]).is_err());
    }

    #[test]
    fn shifts() {
        assert_eq!(result_int(22, "(1 8)"), 256);
        assert_eq!(result_int(22, "(-256 -8)"), -1);
        assert_eq!(result_int(23, "(1 8)"), 256);
        // Logical right shift of a sign-bit byte reads it unsigned.
        assert_eq!(result_int(23, "(-1 -4)"), 0x0f);
        assert!(apply(&[22], &args("(1 200)")).is_err());
    }

    #[test]
    fn bitwise_logic() {
        assert_eq!(result_int(24, "(12 10)"), 8);
        assert_eq!(result_int(25, "(12 10)"), 14);
        assert_eq!(result_int(26, "(12 10)"), 6);
        assert_eq!(result_int(27, "(0)"), -1);
        assert_eq!(result_int(24, "()"), -1);
        assert_eq!(result_int(25, "()"), 0);
    }

    #[test]
    fn string_operators() {
        let (value, _) = apply(&[14], &args("(\"ab\" \"cd\")")).unwrap();
        assert_eq!(value.as_atom(), Some(&b"abcd"[..]));

        let (value, _) = apply(&[12], &args("(\"abcdef\" 1 4)")).unwrap();
        assert_eq!(value.as_atom(), Some(&b"bcd"[..]));
        assert!(apply(&[12], &args("(\"abc\" 2 9)")).is_err());
        assert!(apply(&[12], &args("(\"abc\" -1)")).is_err());

        assert_eq!(result_int(13, "(\"abcd\")"), 4);
    }

    #[test]
    fn sha256_matches_library_digest() {
        let (value, _) = apply(&[11], &args("(\"foo\" \"bar\")")).unwrap();
        let expected: [u8; 32] = Sha256::digest(b"foobar").into();
        assert_eq!(value.as_atom(), Some(&expected[..]));
    }

    #[test]
    fn boolean_folds() {
        let (value, _) = apply(&[32], &args("(())")).unwrap();
        assert_eq!(value.as_atom(), Some(&[1u8][..]));
        let (value, _) = apply(&[33], &args("(() () 1)")).unwrap();
        assert_eq!(value.as_atom(), Some(&[1u8][..]));
        let (value, _) = apply(&[34], &args("(1 () 1)")).unwrap();
        assert!(value.is_nil());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert!(apply(&[99], &[]).is_err());
        assert!(apply(&[1, 2], &[]).is_err());
    }
}
