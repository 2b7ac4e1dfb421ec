//! The wrapper-template registry.
//!
//! A template is a match rule plus an extraction function. Adding support
//! for a new wrapper puzzle means registering one more template; nothing
//! else in the recognizer changes.

use std::rc::Rc;

use once_cell::sync::Lazy;
use spendlens_core::Value;

use crate::layers;

/// How a template claims a puzzle node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// The node uncurries and the uncurried module's tree hash matches.
    CurriedMod([u8; 32]),
    /// The whole node's tree hash matches (uncurried wrappers, e.g.
    /// settlement).
    BareMod([u8; 32]),
}

/// What a matched template sees: the node, its curried arguments (empty
/// for bare matches), and the solution slice aligned with this layer.
pub struct LayerContext<'a> {
    pub puzzle: &'a Rc<Value>,
    pub curried_args: &'a [Rc<Value>],
    pub solution: Option<&'a Rc<Value>>,
}

/// What a template extracts from its layer.
pub struct LayerOutcome {
    pub params: serde_json::Value,
    pub solution_view: Option<serde_json::Value>,
    pub inner_puzzle: Option<Rc<Value>>,
    pub inner_solution: Option<Rc<Value>>,
    pub parse_error: Option<String>,
}

impl LayerOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        LayerOutcome {
            params: serde_json::Value::Null,
            solution_view: None,
            inner_puzzle: None,
            inner_solution: None,
            parse_error: Some(reason.into()),
        }
    }
}

pub struct WrapperTemplate {
    pub name: &'static str,
    pub rule: MatchRule,
    pub extract: fn(&LayerContext) -> LayerOutcome,
}

pub struct Registry {
    templates: Vec<WrapperTemplate>,
}

impl Registry {
    pub fn new(templates: Vec<WrapperTemplate>) -> Self {
        Registry { templates }
    }

    pub fn templates(&self) -> &[WrapperTemplate] {
        &self.templates
    }

    pub fn into_templates(self) -> Vec<WrapperTemplate> {
        self.templates
    }

    /// The built-in mainnet registry.
    pub fn standard() -> &'static Registry {
        static STANDARD: Lazy<Registry> = Lazy::new(|| {
            Registry::new(vec![
                WrapperTemplate {
                    name: "cat_layer",
                    rule: MatchRule::CurriedMod(CAT_MOD_HASH),
                    extract: layers::extract_cat,
                },
                WrapperTemplate {
                    name: "singleton_layer",
                    rule: MatchRule::CurriedMod(SINGLETON_MOD_HASH),
                    extract: layers::extract_singleton,
                },
                WrapperTemplate {
                    name: "did_layer",
                    rule: MatchRule::CurriedMod(DID_MOD_HASH),
                    extract: layers::extract_did,
                },
                WrapperTemplate {
                    name: "nft_state_layer",
                    rule: MatchRule::CurriedMod(NFT_STATE_MOD_HASH),
                    extract: layers::extract_nft_state,
                },
                WrapperTemplate {
                    name: "nft_ownership_layer",
                    rule: MatchRule::CurriedMod(NFT_OWNERSHIP_MOD_HASH),
                    extract: layers::extract_nft_ownership,
                },
                WrapperTemplate {
                    name: "royalty_transfer_layer",
                    rule: MatchRule::CurriedMod(ROYALTY_TRANSFER_MOD_HASH),
                    extract: layers::extract_royalty_transfer,
                },
                WrapperTemplate {
                    name: "augmented_condition_layer",
                    rule: MatchRule::CurriedMod(AUGMENTED_CONDITION_MOD_HASH),
                    extract: layers::extract_augmented_condition,
                },
                WrapperTemplate {
                    name: "revocation_layer",
                    rule: MatchRule::CurriedMod(REVOCATION_MOD_HASH),
                    extract: layers::extract_revocation,
                },
                WrapperTemplate {
                    name: "p2_singleton_layer",
                    rule: MatchRule::CurriedMod(P2_SINGLETON_MOD_HASH),
                    extract: layers::extract_p2_singleton,
                },
                WrapperTemplate {
                    name: "p2_curried_layer",
                    rule: MatchRule::CurriedMod(P2_CURRIED_MOD_HASH),
                    extract: layers::extract_p2_curried,
                },
                WrapperTemplate {
                    name: "p2_one_of_many_layer",
                    rule: MatchRule::CurriedMod(P2_ONE_OF_MANY_MOD_HASH),
                    extract: layers::extract_p2_one_of_many,
                },
                WrapperTemplate {
                    name: "p2_delegated_conditions_layer",
                    rule: MatchRule::CurriedMod(P2_DELEGATED_CONDITIONS_MOD_HASH),
                    extract: layers::extract_p2_delegated_conditions,
                },
                WrapperTemplate {
                    name: "settlement_layer",
                    rule: MatchRule::BareMod(SETTLEMENT_MOD_HASH),
                    extract: layers::extract_settlement,
                },
                WrapperTemplate {
                    name: "standard_layer",
                    rule: MatchRule::CurriedMod(STANDARD_MOD_HASH),
                    extract: layers::extract_standard,
                },
            ])
        });
        &STANDARD
    }
}

// ── Mainnet module hashes ──

pub const STANDARD_MOD_HASH: [u8; 32] =
    hash32("e9aaa49f45bad5c889b86ee3341550c155cfdd10c3a6757de618d20612fffd52");
pub const CAT_MOD_HASH: [u8; 32] =
    hash32("37bef360ee858133b69d595a906dc45d01af50379dad515eb9518abb7c1d2a7a");
pub const SINGLETON_MOD_HASH: [u8; 32] =
    hash32("7faa3253bfddd1e0decb0906b2dc6247bbc4cf608f58345d173adb63e8b47c9f");
pub const DID_MOD_HASH: [u8; 32] =
    hash32("33143d2bef64f14036742673afd158126b94284b4530a28c354fac202b0c910e");
pub const NFT_STATE_MOD_HASH: [u8; 32] =
    hash32("a04d9f57764f54a43e4030befb4d80026e870519aaa66334aef8304f5d0393c2");
pub const NFT_OWNERSHIP_MOD_HASH: [u8; 32] =
    hash32("c5abea79afaa001b5427dfa0c8cf42ca6f38f5841b78f9b3c252733eb2de2726");
pub const SETTLEMENT_MOD_HASH: [u8; 32] =
    hash32("bae24162efbd568f89bc7a340798a6118df0189eb9e3f8697bcea27af99f8f79");
pub const ROYALTY_TRANSFER_MOD_HASH: [u8; 32] =
    hash32("025dee0fb1e9fa110302a7e9bfb6e381ca09618e2778b0184fa5c6b275cfce1f");
pub const AUGMENTED_CONDITION_MOD_HASH: [u8; 32] =
    hash32("d303eafa617bedf0bc05850dd014e10fbddf622187dc07891a2aacba9d8a93f6");
pub const REVOCATION_MOD_HASH: [u8; 32] =
    hash32("00848115554ea674131f89f311707a959ad3f4647482648f3fe91ba289131f51");
pub const P2_SINGLETON_MOD_HASH: [u8; 32] =
    hash32("40f828d8dd55603f4ff9fbf6b73271e904e69406982f4fbefae2c8dcceaf9834");
pub const P2_CURRIED_MOD_HASH: [u8; 32] =
    hash32("13e29a62b42cd2ef72a79e4bacdc59733ca6310d65af83d349360d36ec622363");
pub const P2_ONE_OF_MANY_MOD_HASH: [u8; 32] =
    hash32("46b29fd87fbeb6737600c4543931222a6c1ed3db6fa5601a3ca284a9f4efe780");
pub const P2_DELEGATED_CONDITIONS_MOD_HASH: [u8; 32] =
    hash32("0ff94726f1a8dea5c3f70d3121945190778d3b2b3fcda3735a1f290977e98341");

const fn hash32(hex: &str) -> [u8; 32] {
    let bytes = hex.as_bytes();
    assert!(bytes.len() == 64, "module hash must be 64 hex characters");
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        out[i] = (hex_digit(bytes[2 * i]) << 4) | hex_digit(bytes[2 * i + 1]);
        i += 1;
    }
    out
}

const fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => panic!("invalid hex digit in module hash"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_hash_parsing() {
        assert_eq!(
            hex::encode(STANDARD_MOD_HASH),
            "e9aaa49f45bad5c889b86ee3341550c155cfdd10c3a6757de618d20612fffd52"
        );
    }

    #[test]
    fn standard_registry_has_all_layers() {
        let names: Vec<&str> = Registry::standard()
            .templates()
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "cat_layer",
                "singleton_layer",
                "did_layer",
                "nft_state_layer",
                "nft_ownership_layer",
                "royalty_transfer_layer",
                "augmented_condition_layer",
                "revocation_layer",
                "p2_singleton_layer",
                "p2_curried_layer",
                "p2_one_of_many_layer",
                "p2_delegated_conditions_layer",
                "settlement_layer",
                "standard_layer",
            ]
        );
    }
}
