//! Core data model for spend-bundle analysis: the CLVM value tree, the
//! binary and text codecs, tree hashing, currying, and the coin model.
//!
//! Everything in this crate is pure and deterministic. No I/O, no clocks,
//! no global state.

pub mod codec;
pub mod coin;
pub mod curry;
pub mod error;
pub mod hash;
pub mod hex_util;
pub mod number;
pub mod text;
pub mod value;

pub use codec::{decode, decode_prefix, encode};
pub use coin::{Coin, CoinSpend, SpendBundle};
pub use curry::{curry, uncurry};
pub use error::CoreError;
pub use hash::tree_hash;
pub use value::Value;
