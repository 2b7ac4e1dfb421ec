//! Input normalization and report assembly.
//!
//! This crate turns the JSON shapes emitted by node RPCs and wallet
//! tooling into a [`spendlens_core::SpendBundle`], fans the per-spend
//! analysis out across a thread pool, and assembles the versioned report
//! document.

pub mod assemble;
pub mod input;
pub mod schema;

pub use assemble::{inspect_bundle, DEFAULT_MAX_COST};
pub use input::{load_block_input, load_coin_input, load_mempool_input, InputError, InputSource};
pub use schema::{Report, SCHEMA_VERSION};
