//! Text form of the value tree.
//!
//! `parse` accepts the human-written form: nested lists, dotted pairs,
//! decimal and 0x-hex literals, double-quoted strings, and operator
//! keywords. `unparse` emits a canonical subset (decimal, hex, lists) so
//! that `parse(unparse(v)) == v` for every value.

use std::rc::Rc;

use crate::error::CoreError;
use crate::hex_util::decode_hex;
use crate::number::{atom_to_int, int_to_atom};
use crate::value::Value;

/// Operator keywords accepted by the parser, by opcode byte.
const KEYWORDS: &[(&str, u8)] = &[
    ("q", 1),
    ("a", 2),
    ("i", 3),
    ("c", 4),
    ("f", 5),
    ("r", 6),
    ("l", 7),
    ("x", 8),
    ("=", 9),
    (">s", 10),
    ("sha256", 11),
    ("substr", 12),
    ("strlen", 13),
    ("concat", 14),
    ("+", 16),
    ("-", 17),
    ("*", 18),
    ("/", 19),
    ("divmod", 20),
    (">", 21),
    ("ash", 22),
    ("lsh", 23),
    ("logand", 24),
    ("logior", 25),
    ("logxor", 26),
    ("lognot", 27),
    ("point_add", 29),
    ("pubkey_for_exp", 30),
    ("not", 32),
    ("any", 33),
    ("all", 34),
];

pub fn parse(text: &str) -> Result<Rc<Value>, CoreError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;
    skip_space(&chars, &mut pos);
    let value = parse_value(&chars, &mut pos)?;
    skip_space(&chars, &mut pos);
    if pos != chars.len() {
        return Err(parse_err(pos, "trailing input after expression"));
    }
    Ok(value)
}

fn parse_value(chars: &[char], pos: &mut usize) -> Result<Rc<Value>, CoreError> {
    match chars.get(*pos) {
        None => Err(parse_err(*pos, "unexpected end of input")),
        Some('(') => {
            *pos += 1;
            parse_list_body(chars, pos)
        }
        Some(')') => Err(parse_err(*pos, "unexpected ')'")),
        Some('"') => parse_string(chars, pos),
        Some(_) => parse_token(chars, pos),
    }
}

fn parse_list_body(chars: &[char], pos: &mut usize) -> Result<Rc<Value>, CoreError> {
    skip_space(chars, pos);
    match chars.get(*pos) {
        None => Err(parse_err(*pos, "unterminated list")),
        Some(')') => {
            *pos += 1;
            Ok(Value::nil())
        }
        Some('.') if is_lone_dot(chars, *pos) => {
            *pos += 1;
            skip_space(chars, pos);
            let tail = parse_value(chars, pos)?;
            skip_space(chars, pos);
            match chars.get(*pos) {
                Some(')') => {
                    *pos += 1;
                    Ok(tail)
                }
                _ => Err(parse_err(*pos, "expected ')' after dotted tail")),
            }
        }
        Some(_) => {
            let first = parse_value(chars, pos)?;
            let rest = parse_list_body(chars, pos)?;
            Ok(Value::pair(first, rest))
        }
    }
}

fn is_lone_dot(chars: &[char], pos: usize) -> bool {
    chars[pos] == '.'
        && chars
            .get(pos + 1)
            .map_or(true, |c| c.is_whitespace() || *c == '(' || *c == ')')
}

fn parse_string(chars: &[char], pos: &mut usize) -> Result<Rc<Value>, CoreError> {
    let start = *pos;
    *pos += 1;
    let mut bytes = Vec::new();
    loop {
        match chars.get(*pos) {
            None => return Err(parse_err(start, "unterminated string")),
            Some('"') => {
                *pos += 1;
                return Ok(Value::atom(bytes));
            }
            Some(&c) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                *pos += 1;
            }
        }
    }
}

fn parse_token(chars: &[char], pos: &mut usize) -> Result<Rc<Value>, CoreError> {
    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if c.is_whitespace() || c == '(' || c == ')' {
            break;
        }
        *pos += 1;
    }
    let token: String = chars[start..*pos].iter().collect();
    token_to_atom(&token, start)
}

fn token_to_atom(token: &str, position: usize) -> Result<Rc<Value>, CoreError> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        let bytes = decode_hex(hex)
            .map_err(|e| parse_err(position, format!("bad hex literal: {e}")))?;
        return Ok(Value::atom(bytes));
    }
    if is_decimal(token) {
        let value: i128 = token
            .parse()
            .map_err(|_| parse_err(position, format!("integer literal out of range: {token}")))?;
        return Ok(Value::atom(int_to_atom(value)));
    }
    for (name, opcode) in KEYWORDS {
        if *name == token {
            return Ok(Value::atom(vec![*opcode]));
        }
    }
    Err(parse_err(position, format!("unknown token '{token}'")))
}

fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn skip_space(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
}

fn parse_err(position: usize, reason: impl Into<String>) -> CoreError {
    CoreError::TextParse {
        position,
        reason: reason.into(),
    }
}

/// Render a value in canonical text form.
pub fn unparse(value: &Rc<Value>) -> String {
    let mut out = String::new();
    unparse_into(value, &mut out);
    out
}

enum Render<'a> {
    Node(&'a Value),
    Tail(&'a Value),
}

// Rendering runs on an explicit stack; value trees can be arbitrarily deep.
fn unparse_into(value: &Value, out: &mut String) {
    let mut steps = vec![Render::Node(value)];
    while let Some(step) = steps.pop() {
        match step {
            Render::Node(Value::Atom(bytes)) => out.push_str(&atom_text(bytes)),
            Render::Node(Value::Pair(first, rest)) => {
                out.push('(');
                steps.push(Render::Tail(rest));
                steps.push(Render::Node(first));
            }
            Render::Tail(Value::Atom(bytes)) if bytes.is_empty() => out.push(')'),
            Render::Tail(Value::Atom(bytes)) => {
                out.push_str(" . ");
                out.push_str(&atom_text(bytes));
                out.push(')');
            }
            Render::Tail(Value::Pair(first, rest)) => {
                out.push(' ');
                steps.push(Render::Tail(rest));
                steps.push(Render::Node(first));
            }
        }
    }
}

fn atom_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "()".to_string();
    }
    // Decimal only for minimally-encoded non-negative numbers; sign-bit
    // atoms display as hex so the text round-trips byte for byte.
    if bytes.len() <= 8 && bytes[0] & 0x80 == 0 {
        if let Ok(value) = atom_to_int(bytes) {
            if int_to_atom(value) == bytes {
                return value.to_string();
            }
        }
    }
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_round_trip(value: &Rc<Value>) {
        let text = unparse(value);
        let reparsed = parse(&text).unwrap();
        assert_eq!(&reparsed, value, "text was {text}");
    }

    #[test]
    fn parses_nil_and_numbers() {
        assert!(parse("()").unwrap().is_nil());
        assert_eq!(parse("100").unwrap().as_atom(), Some(&[0x64u8][..]));
        assert_eq!(parse("-1").unwrap().as_atom(), Some(&[0xffu8][..]));
        assert_eq!(parse("128").unwrap().as_atom(), Some(&[0x00u8, 0x80][..]));
    }

    #[test]
    fn parses_hex_and_strings() {
        assert_eq!(
            parse("0xdeadbeef").unwrap().as_atom(),
            Some(&[0xdeu8, 0xad, 0xbe, 0xef][..])
        );
        assert_eq!(parse("\"hi\"").unwrap().as_atom(), Some(&b"hi"[..]));
    }

    #[test]
    fn keywords_assemble_to_opcodes() {
        let program = parse("(q . 1)").unwrap();
        let (op, tail) = program.as_pair().unwrap();
        assert_eq!(op.as_atom(), Some(&[1u8][..]));
        assert_eq!(tail.as_atom(), Some(&[1u8][..]));

        let plus = parse("(+ (q . 1) (q . 2))").unwrap();
        let items = plus.proper_list().unwrap();
        assert_eq!(items[0].as_atom(), Some(&[16u8][..]));
    }

    #[test]
    fn dotted_pairs_and_lists_round_trip() {
        text_round_trip(&Value::pair(Value::atom(vec![1]), Value::atom(vec![2])));
        text_round_trip(&Value::list(vec![
            Value::atom(vec![51]),
            Value::atom(vec![0xab; 32]),
            Value::atom(int_to_atom(1000)),
        ]));
        text_round_trip(&Value::nil());
        text_round_trip(&Value::atom(vec![0x00, 0x01]));
    }

    #[test]
    fn unparse_is_canonical() {
        let value = Value::list(vec![Value::atom(vec![1]), Value::atom(vec![0xab, 0xcd])]);
        assert_eq!(unparse(&value), "(1 0xabcd)");
        let dotted = Value::pair(Value::atom(vec![3]), Value::atom(vec![4]));
        assert_eq!(unparse(&dotted), "(3 . 4)");
    }

    #[test]
    fn sign_bit_atoms_render_as_hex() {
        assert_eq!(unparse(&Value::atom(vec![0xff])), "0xff");
        assert_eq!(unparse(&Value::atom(vec![0xab, 0xcd])), "0xabcd");
        // Still parseable back to the same bytes.
        text_round_trip(&Value::atom(vec![0xff]));
        text_round_trip(&parse("-1").unwrap());
    }

    #[test]
    fn deep_list_unparses_without_overflow() {
        let mut node = Value::nil();
        for _ in 0..300_000 {
            node = Value::pair(Value::atom(vec![1]), node);
        }
        let text = unparse(&node);
        assert!(text.starts_with("(1 1 1"));
        assert!(text.ends_with("1)"));
    }

    #[test]
    fn unknown_token_is_an_error() {
        assert!(matches!(parse("(bogus)"), Err(CoreError::TextParse { .. })));
    }

    #[test]
    fn trailing_input_is_an_error() {
        assert!(matches!(parse("1 2"), Err(CoreError::TextParse { .. })));
    }
}
