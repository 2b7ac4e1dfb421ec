//! Standard tree hash over the value tree.
//!
//! Atoms hash as sha256(0x01 || bytes), pairs as sha256(0x02 || h(first)
//! || h(rest)). Puzzle hashes and curried-argument hashes are tree hashes.

use sha2::{Digest, Sha256};

use crate::value::Value;

const ATOM_TAG: u8 = 0x01;
const PAIR_TAG: u8 = 0x02;

enum Step<'a> {
    Visit(&'a Value),
    Combine,
}

// Walks the tree post-order on an explicit stack; recursion would overflow
// on adversarially deep pair spines.
pub fn tree_hash(value: &Value) -> [u8; 32] {
    let mut steps = vec![Step::Visit(value)];
    let mut hashes: Vec<[u8; 32]> = Vec::new();
    while let Some(step) = steps.pop() {
        match step {
            Step::Visit(Value::Atom(bytes)) => {
                let mut hasher = Sha256::new();
                hasher.update([ATOM_TAG]);
                hasher.update(bytes);
                hashes.push(hasher.finalize().into());
            }
            Step::Visit(Value::Pair(first, rest)) => {
                steps.push(Step::Combine);
                steps.push(Step::Visit(rest));
                steps.push(Step::Visit(first));
            }
            Step::Combine => {
                // Every Combine is pushed with two Visit steps, so two
                // child hashes are always on the stack here.
                let rest_hash = hashes.pop().expect("hash for rest child");
                let first_hash = hashes.pop().expect("hash for first child");
                let mut hasher = Sha256::new();
                hasher.update([PAIR_TAG]);
                hasher.update(first_hash);
                hasher.update(rest_hash);
                hashes.push(hasher.finalize().into());
            }
        }
    }
    hashes.pop().expect("hash for the root")
}
