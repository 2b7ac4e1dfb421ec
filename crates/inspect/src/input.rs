//! JSON input normalization.
//!
//! Node RPCs and wallet tooling wrap the same payload several ways: a
//! `spend_bundle` object, a bare `coin_spends` array, hex
//! `spend_bundle_bytes`, a `mempool_item` envelope, or a single coin
//! spend. Every loader walks the same fallback chain and records each
//! normalization decision as a note for the report.

use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

use spendlens_core::hex_util::{decode_hex, decode_hex32};
use spendlens_core::{Coin, CoinSpend, SpendBundle};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input is not valid JSON: {0}")]
    Json(String),

    #[error("missing required field(s): {}", keys.join(", "))]
    MissingField { keys: Vec<String> },

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl InputError {
    fn invalid(field: &str, reason: impl ToString) -> Self {
        InputError::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    fn missing(keys: &[&str]) -> Self {
        InputError::MissingField {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    MempoolItem,
    BlockSpends,
    CoinSpend,
}

type Loaded = (InputSource, SpendBundle, Vec<String>);

/// Load a mempool payload: a `mempool_item` envelope or any of the bundle
/// shapes it can carry.
pub fn load_mempool_input(text: &str) -> Result<Loaded, InputError> {
    let mut notes = Vec::new();
    let mut doc = parse_json(text)?;
    if let Some(item) = doc.get("mempool_item") {
        notes.push("unwrapped mempool_item envelope".to_string());
        doc = item.clone();
    }
    let bundle = bundle_from_document(&doc, &mut notes)?;
    Ok((InputSource::MempoolItem, bundle, notes))
}

/// Load block spend data: a `coin_spends`/`block_spends` object or a bare
/// array of coin spends.
pub fn load_block_input(text: &str) -> Result<Loaded, InputError> {
    let mut notes = Vec::new();
    let doc = parse_json(text)?;
    if let Some(spends) = doc.as_array() {
        notes.push("treated bare array as coin spend list".to_string());
        let bundle = bundle_from_spend_list(spends, None, &mut notes)?;
        return Ok((InputSource::BlockSpends, bundle, notes));
    }
    let spends = doc
        .get("coin_spends")
        .or_else(|| {
            let aliased = doc.get("block_spends");
            if aliased.is_some() {
                notes.push("read spends from block_spends alias".to_string());
            }
            aliased
        })
        .and_then(Json::as_array)
        .ok_or_else(|| InputError::missing(&["spend_bundle", "coin_spends"]))?;
    let bundle = bundle_from_spend_list(spends, doc.get("aggregated_signature"), &mut notes)?;
    Ok((InputSource::BlockSpends, bundle, notes))
}

/// Load a single coin spend, bare or under a `coin_spend` key.
pub fn load_coin_input(text: &str) -> Result<Loaded, InputError> {
    let mut notes = Vec::new();
    let doc = parse_json(text)?;
    let spend_doc = match doc.get("coin_spend") {
        Some(inner) => {
            notes.push("unwrapped coin_spend envelope".to_string());
            inner
        }
        None => &doc,
    };
    let spend = coin_spend_from_json(spend_doc, "coin_spend")?;
    notes.push("single coin spend; aggregated signature zero-filled".to_string());
    let bundle = SpendBundle::new(vec![spend], vec![0u8; 96]);
    Ok((InputSource::CoinSpend, bundle, notes))
}

fn parse_json(text: &str) -> Result<Json, InputError> {
    serde_json::from_str(text).map_err(|e| InputError::Json(e.to_string()))
}

/// The shared fallback chain: `spend_bundle` object, `spend_bundle_bytes`
/// hex, then a bare `coin_spends` array.
fn bundle_from_document(doc: &Json, notes: &mut Vec<String>) -> Result<SpendBundle, InputError> {
    if let Some(bundle) = doc.get("spend_bundle") {
        return bundle_from_json(bundle, notes);
    }
    if let Some(bytes_hex) = doc.get("spend_bundle_bytes") {
        notes.push("decoded spend_bundle_bytes binary form".to_string());
        let raw = bytes_hex
            .as_str()
            .ok_or_else(|| InputError::invalid("spend_bundle_bytes", "expected a hex string"))
            .and_then(|s| {
                decode_hex(s).map_err(|e| InputError::invalid("spend_bundle_bytes", e))
            })?;
        return SpendBundle::from_bytes(&raw)
            .map_err(|e| InputError::invalid("spend_bundle_bytes", e));
    }
    if let Some(spends) = doc.get("coin_spends").and_then(Json::as_array) {
        notes.push("built bundle from bare coin_spends".to_string());
        return bundle_from_spend_list(spends, doc.get("aggregated_signature"), notes);
    }
    Err(InputError::missing(&["spend_bundle", "coin_spends"]))
}

fn bundle_from_json(bundle: &Json, notes: &mut Vec<String>) -> Result<SpendBundle, InputError> {
    let spends = bundle
        .get("coin_spends")
        .and_then(Json::as_array)
        .ok_or_else(|| InputError::missing(&["coin_spends"]))?;
    bundle_from_spend_list(spends, bundle.get("aggregated_signature"), notes)
}

fn bundle_from_spend_list(
    spends: &[Json],
    signature: Option<&Json>,
    notes: &mut Vec<String>,
) -> Result<SpendBundle, InputError> {
    let mut coin_spends = Vec::with_capacity(spends.len());
    for (index, spend) in spends.iter().enumerate() {
        coin_spends.push(coin_spend_from_json(
            spend,
            &format!("coin_spends[{index}]"),
        )?);
    }
    let aggregated_signature = match signature.and_then(Json::as_str) {
        Some(hex) => {
            let bytes = decode_hex(hex)
                .map_err(|e| InputError::invalid("aggregated_signature", e))?;
            if bytes.len() != 96 {
                return Err(InputError::invalid(
                    "aggregated_signature",
                    format!("expected 96 bytes, got {}", bytes.len()),
                ));
            }
            bytes
        }
        None => {
            notes.push("aggregated signature absent; zero-filled".to_string());
            vec![0u8; 96]
        }
    };
    Ok(SpendBundle::new(coin_spends, aggregated_signature))
}

fn coin_spend_from_json(spend: &Json, field: &str) -> Result<CoinSpend, InputError> {
    let coin = spend
        .get("coin")
        .ok_or_else(|| InputError::missing(&["coin"]))?;
    let parent_coin_info = hex32_field(coin, field, "parent_coin_info")?;
    let puzzle_hash = hex32_field(coin, field, "puzzle_hash")?;
    let amount = amount_field(coin, field)?;
    let puzzle_reveal = hex_field(spend, field, "puzzle_reveal")?;
    let solution = hex_field(spend, field, "solution")?;
    Ok(CoinSpend {
        coin: Coin::new(parent_coin_info, puzzle_hash, amount),
        puzzle_reveal,
        solution,
    })
}

fn hex_field(obj: &Json, parent: &str, key: &str) -> Result<Vec<u8>, InputError> {
    let text = obj
        .get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| InputError::missing(&[key]))?;
    decode_hex(text).map_err(|e| InputError::invalid(&format!("{parent}.{key}"), e))
}

fn hex32_field(obj: &Json, parent: &str, key: &str) -> Result<[u8; 32], InputError> {
    let text = obj
        .get(key)
        .and_then(Json::as_str)
        .ok_or_else(|| InputError::missing(&[key]))?;
    decode_hex32(text).map_err(|e| InputError::invalid(&format!("{parent}.{key}"), e))
}

fn amount_field(coin: &Json, parent: &str) -> Result<u64, InputError> {
    let amount = coin
        .get("amount")
        .ok_or_else(|| InputError::missing(&["amount"]))?;
    if let Some(value) = amount.as_u64() {
        return Ok(value);
    }
    if let Some(text) = amount.as_str() {
        return text
            .parse::<u64>()
            .map_err(|e| InputError::invalid(&format!("{parent}.coin.amount"), e));
    }
    Err(InputError::invalid(
        &format!("{parent}.coin.amount"),
        "expected an unsigned integer or decimal string",
    ))
}
