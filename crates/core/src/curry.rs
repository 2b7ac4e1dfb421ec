//! Currying binds arguments into a module ahead of execution.
//!
//! The bound form is `(a (q . MOD) (c (q . A1) (c (q . A2) ... 1)))`.
//! `uncurry` recognizes exactly that shape, which is how wrapper puzzles
//! are identified by module hash.

use std::rc::Rc;

use crate::value::Value;

const OP_QUOTE: u8 = 1;
const OP_APPLY: u8 = 2;
const OP_CONS: u8 = 4;

fn quoted(value: Rc<Value>) -> Rc<Value> {
    Value::pair(Value::atom(vec![OP_QUOTE]), value)
}

/// Bind `args` into `module`, producing the curried program.
pub fn curry(module: Rc<Value>, args: &[Rc<Value>]) -> Rc<Value> {
    // The environment chain ends in 1, the whole-environment path, so
    // runtime arguments are appended after the bound ones.
    let mut chain = Value::atom(vec![1]);
    for arg in args.iter().rev() {
        chain = Value::list(vec![
            Value::atom(vec![OP_CONS]),
            quoted(Rc::clone(arg)),
            chain,
        ]);
    }
    Value::list(vec![Value::atom(vec![OP_APPLY]), quoted(module), chain])
}

/// Recover the module and bound arguments from a curried program.
/// Returns `None` for any program not in the canonical curried shape.
pub fn uncurry(program: &Rc<Value>) -> Option<(Rc<Value>, Vec<Rc<Value>>)> {
    let items = program.proper_list()?;
    if items.len() != 3 || items[0].as_atom() != Some(&[OP_APPLY]) {
        return None;
    }
    let module = unquote(&items[1])?;

    let mut args = Vec::new();
    let mut chain = Rc::clone(&items[2]);
    loop {
        if chain.as_atom() == Some(&[1u8][..]) {
            return Some((module, args));
        }
        let link = chain.proper_list()?;
        if link.len() != 3 || link[0].as_atom() != Some(&[OP_CONS]) {
            return None;
        }
        args.push(unquote(&link[1])?);
        chain = Rc::clone(&link[2]);
    }
}

fn unquote(value: &Rc<Value>) -> Option<Rc<Value>> {
    let (op, body) = value.as_pair()?;
    if op.as_atom() == Some(&[OP_QUOTE]) {
        Some(Rc::clone(body))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curry_then_uncurry_recovers_module_and_args() {
        let module = Value::list(vec![Value::atom(vec![16]), Value::atom(vec![2]), Value::atom(vec![5])]);
        let args = vec![Value::atom(vec![0xaa; 32]), Value::atom(vec![0x01, 0x02])];
        let curried = curry(Rc::clone(&module), &args);
        let (found_module, found_args) = uncurry(&curried).unwrap();
        assert_eq!(found_module, module);
        assert_eq!(found_args, args);
    }

    #[test]
    fn curry_with_no_args_still_uncurries() {
        let module = Value::atom(vec![1]);
        let curried = curry(Rc::clone(&module), &[]);
        let (found_module, found_args) = uncurry(&curried).unwrap();
        assert_eq!(found_module, module);
        assert!(found_args.is_empty());
    }

    #[test]
    fn non_curried_shapes_are_rejected() {
        assert!(uncurry(&Value::atom(vec![1])).is_none());
        assert!(uncurry(&Value::pair(Value::atom(vec![1]), Value::atom(vec![1]))).is_none());
        // Right shape but wrong operator.
        let bogus = Value::list(vec![
            Value::atom(vec![3]),
            Value::pair(Value::atom(vec![1]), Value::nil()),
            Value::atom(vec![1]),
        ]);
        assert!(uncurry(&bogus).is_none());
    }

    #[test]
    fn curried_shape_matches_wire_layout() {
        // (a (q . 2) (c (q . 5) 1))
        let curried = curry(Value::atom(vec![2]), &[Value::atom(vec![5])]);
        let expected = crate::text::parse("(a (q . 2) (c (q . 5) 1))").unwrap();
        assert_eq!(curried, expected);
    }
}
