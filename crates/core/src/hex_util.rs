//! Hex helpers shared across the workspace. All decoders tolerate an
//! optional 0x/0X prefix, since chain tooling emits both forms.

use crate::error::CoreError;

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, CoreError> {
    let raw = strip_0x(s).trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if raw.len() % 2 != 0 {
        return Err(CoreError::InvalidHex(format!(
            "odd-length hex string ({} characters)",
            raw.len()
        )));
    }
    hex::decode(raw).map_err(|e| CoreError::InvalidHex(e.to_string()))
}

pub fn decode_hex32(s: &str) -> Result<[u8; 32], CoreError> {
    let bytes = decode_hex(s)?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        CoreError::InvalidHex(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

pub fn encode_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
