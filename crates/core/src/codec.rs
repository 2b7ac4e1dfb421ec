//! Binary serialization of the value tree.
//!
//! The encoding is self-delimiting. `0xff` introduces a pair, `0x80` is the
//! empty atom, bytes up to `0x7f` are one-byte atoms, and longer atoms carry
//! their length in the introducer: `0x80..=0xbf` one size byte total,
//! `0xc0..=0xdf` two, `0xe0..=0xef` three, `0xf0..=0xf7` four, `0xf8..=0xfb`
//! five. `0xfc..=0xfe` are invalid.

use std::rc::Rc;

use crate::error::CoreError;
use crate::value::Value;

const PAIR_MARKER: u8 = 0xff;
const NIL_MARKER: u8 = 0x80;

/// Decode a complete serialized program. Trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Rc<Value>, CoreError> {
    let (value, consumed) = decode_prefix(bytes)?;
    if consumed != bytes.len() {
        return Err(CoreError::malformed(
            consumed,
            format!("{} trailing byte(s) after program", bytes.len() - consumed),
        ));
    }
    Ok(value)
}

/// Decode one serialized program from the front of `bytes`, returning the
/// value and the number of bytes consumed. Used where programs are embedded
/// back to back, as in the binary spend-bundle form.
pub fn decode_prefix(bytes: &[u8]) -> Result<(Rc<Value>, usize), CoreError> {
    let mut pos = 0usize;
    let value = decode_at(bytes, &mut pos)?;
    Ok((value, pos))
}

enum DecodeOp {
    Value,
    Pair,
}

// Pair depth is attacker-controlled, so decoding runs on an explicit work
// stack instead of recursing.
fn decode_at(bytes: &[u8], pos: &mut usize) -> Result<Rc<Value>, CoreError> {
    let mut ops = vec![DecodeOp::Value];
    let mut values: Vec<Rc<Value>> = Vec::new();
    while let Some(op) = ops.pop() {
        match op {
            DecodeOp::Value => {
                let introducer = next_byte(bytes, pos)?;
                match introducer {
                    PAIR_MARKER => {
                        ops.push(DecodeOp::Pair);
                        ops.push(DecodeOp::Value);
                        ops.push(DecodeOp::Value);
                    }
                    NIL_MARKER => values.push(Value::nil()),
                    b if b <= 0x7f => values.push(Value::atom(vec![b])),
                    b => {
                        let length = decode_length(b, bytes, pos)?;
                        let start = *pos;
                        let end = start
                            .checked_add(length)
                            .ok_or_else(|| CoreError::malformed(start, "atom length overflows"))?;
                        if end > bytes.len() {
                            return Err(CoreError::malformed(
                                start,
                                format!("atom of {length} byte(s) truncated"),
                            ));
                        }
                        *pos = end;
                        values.push(Value::atom(bytes[start..end].to_vec()));
                    }
                }
            }
            DecodeOp::Pair => {
                let rest = values.pop();
                let first = values.pop();
                match (first, rest) {
                    (Some(first), Some(rest)) => values.push(Value::pair(first, rest)),
                    _ => return Err(CoreError::malformed(*pos, "decoder stack underflow")),
                }
            }
        }
    }
    values
        .pop()
        .ok_or_else(|| CoreError::malformed(*pos, "decoder produced no value"))
}

fn decode_length(introducer: u8, bytes: &[u8], pos: &mut usize) -> Result<usize, CoreError> {
    let (size_bits, extra_bytes) = match introducer {
        0x80..=0xbf => (introducer as usize & 0x3f, 0usize),
        0xc0..=0xdf => (introducer as usize & 0x1f, 1),
        0xe0..=0xef => (introducer as usize & 0x0f, 2),
        0xf0..=0xf7 => (introducer as usize & 0x07, 3),
        0xf8..=0xfb => (introducer as usize & 0x03, 4),
        _ => {
            return Err(CoreError::malformed(
                *pos - 1,
                format!("invalid length introducer 0x{introducer:02x}"),
            ))
        }
    };
    let mut length = size_bits as u64;
    for _ in 0..extra_bytes {
        length = (length << 8) | next_byte(bytes, pos)? as u64;
    }
    usize::try_from(length)
        .map_err(|_| CoreError::malformed(*pos, "atom length exceeds platform limits"))
}

fn next_byte(bytes: &[u8], pos: &mut usize) -> Result<u8, CoreError> {
    let byte = bytes
        .get(*pos)
        .copied()
        .ok_or_else(|| CoreError::malformed(*pos, "unexpected end of input"))?;
    *pos += 1;
    Ok(byte)
}

/// Serialize a value in the minimal encoding.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    let mut stack = vec![value];
    while let Some(node) = stack.pop() {
        match node {
            Value::Pair(first, rest) => {
                out.push(PAIR_MARKER);
                stack.push(rest);
                stack.push(first);
            }
            Value::Atom(bytes) => encode_atom(bytes, out),
        }
    }
}

fn encode_atom(bytes: &[u8], out: &mut Vec<u8>) {
    let len = bytes.len();
    if len == 0 {
        out.push(NIL_MARKER);
        return;
    }
    if len == 1 && bytes[0] <= 0x7f {
        out.push(bytes[0]);
        return;
    }
    if len <= 0x3f {
        out.push(0x80 | len as u8);
    } else if len <= 0x1fff {
        out.push(0xc0 | (len >> 8) as u8);
        out.push(len as u8);
    } else if len <= 0xf_ffff {
        out.push(0xe0 | (len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else if len <= 0x7ff_ffff {
        out.push(0xf0 | (len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else {
        out.push(0xf8 | (len >> 32) as u8);
        out.push((len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(bytes);
}
