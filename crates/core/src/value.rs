//! The CLVM value tree: atoms of bytes and pairs of values.
//!
//! Values are reference-counted so that currying, environment threading,
//! and recognizer descent never deep-copy subtrees.

use std::rc::Rc;

/// A node in a CLVM program or value tree. Nil is the empty atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Atom(Vec<u8>),
    Pair(Rc<Value>, Rc<Value>),
}

impl Value {
    pub fn nil() -> Rc<Value> {
        Rc::new(Value::Atom(Vec::new()))
    }

    pub fn atom(bytes: impl Into<Vec<u8>>) -> Rc<Value> {
        Rc::new(Value::Atom(bytes.into()))
    }

    pub fn pair(first: Rc<Value>, rest: Rc<Value>) -> Rc<Value> {
        Rc::new(Value::Pair(first, rest))
    }

    /// Build a nil-terminated proper list from the given items.
    pub fn list<I>(items: I) -> Rc<Value>
    where
        I: IntoIterator<Item = Rc<Value>>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut tail = Value::nil();
        for item in items.into_iter().rev() {
            tail = Value::pair(item, tail);
        }
        tail
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Atom(bytes) if bytes.is_empty())
    }

    pub fn as_atom(&self) -> Option<&[u8]> {
        match self {
            Value::Atom(bytes) => Some(bytes),
            Value::Pair(..) => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&Rc<Value>, &Rc<Value>)> {
        match self {
            Value::Atom(_) => None,
            Value::Pair(first, rest) => Some((first, rest)),
        }
    }

    /// Collect a nil-terminated proper list. Returns `None` if any tail
    /// along the spine is a non-nil atom.
    pub fn proper_list(self: &Rc<Value>) -> Option<Vec<Rc<Value>>> {
        let mut items = Vec::new();
        let mut node = Rc::clone(self);
        loop {
            match node.as_ref() {
                Value::Atom(bytes) if bytes.is_empty() => return Some(items),
                Value::Atom(_) => return None,
                Value::Pair(first, rest) => {
                    items.push(Rc::clone(first));
                    node = Rc::clone(rest);
                }
            }
        }
    }

    /// Collect list elements up to the first atom tail, returning the
    /// elements together with that tail. Tolerates improper lists.
    pub fn list_prefix(self: &Rc<Value>) -> (Vec<Rc<Value>>, Rc<Value>) {
        let mut items = Vec::new();
        let mut node = Rc::clone(self);
        loop {
            match node.as_ref() {
                Value::Atom(_) => return (items, node),
                Value::Pair(first, rest) => {
                    items.push(Rc::clone(first));
                    node = Rc::clone(rest);
                }
            }
        }
    }
}

// A derived drop would recurse down the pair spine and overflow the stack
// on adversarially deep trees, so teardown detaches children onto an
// explicit stack. Shared subtrees are left to their other owners.
impl Drop for Value {
    fn drop(&mut self) {
        let Value::Pair(first, rest) = self else {
            return;
        };
        if first.as_pair().is_none() && rest.as_pair().is_none() {
            return;
        }
        let mut stack = vec![
            std::mem::replace(first, Value::nil()),
            std::mem::replace(rest, Value::nil()),
        ];
        while let Some(node) = stack.pop() {
            if let Ok(mut unshared) = Rc::try_unwrap(node) {
                if let Value::Pair(first, rest) = &mut unshared {
                    if first.as_pair().is_some() {
                        stack.push(std::mem::replace(first, Value::nil()));
                    }
                    if rest.as_pair().is_some() {
                        stack.push(std::mem::replace(rest, Value::nil()));
                    }
                }
            }
        }
    }
}
