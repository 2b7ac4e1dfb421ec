//! Coins, coin spends, and spend bundles.
//!
//! Puzzle reveals and solutions are carried as serialized program bytes
//! and decoded on demand, matching the wire form. The aggregated
//! signature is opaque here and is never verified.

use sha2::{Digest, Sha256};

use crate::codec::decode_prefix;
use crate::error::CoreError;
use crate::number::amount_to_bytes;

pub const AGGREGATED_SIGNATURE_BYTES: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub parent_coin_info: [u8; 32],
    pub puzzle_hash: [u8; 32],
    pub amount: u64,
}

impl Coin {
    pub fn new(parent_coin_info: [u8; 32], puzzle_hash: [u8; 32], amount: u64) -> Self {
        Coin {
            parent_coin_info,
            puzzle_hash,
            amount,
        }
    }

    /// sha256(parent || puzzle_hash || canonical amount bytes).
    pub fn coin_id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.parent_coin_info);
        hasher.update(self.puzzle_hash);
        hasher.update(amount_to_bytes(self.amount));
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSpend {
    pub coin: Coin,
    /// Serialized puzzle program.
    pub puzzle_reveal: Vec<u8>,
    /// Serialized solution program.
    pub solution: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendBundle {
    pub coin_spends: Vec<CoinSpend>,
    pub aggregated_signature: Vec<u8>,
}

impl SpendBundle {
    pub fn new(coin_spends: Vec<CoinSpend>, aggregated_signature: Vec<u8>) -> Self {
        SpendBundle {
            coin_spends,
            aggregated_signature,
        }
    }

    /// Decode the binary bundle form: u32 BE spend count, then per spend
    /// parent(32) || puzzle_hash(32) || amount u64 BE || puzzle || solution
    /// (both self-delimiting programs), then the 96-byte signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let mut pos = 0usize;
        let count = read_u32(bytes, &mut pos)?;
        let mut coin_spends = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let parent_coin_info = read_array::<32>(bytes, &mut pos)?;
            let puzzle_hash = read_array::<32>(bytes, &mut pos)?;
            let amount = read_u64(bytes, &mut pos)?;
            let puzzle_reveal = read_program(bytes, &mut pos)?;
            let solution = read_program(bytes, &mut pos)?;
            coin_spends.push(CoinSpend {
                coin: Coin::new(parent_coin_info, puzzle_hash, amount),
                puzzle_reveal,
                solution,
            });
        }
        let aggregated_signature = read_array::<AGGREGATED_SIGNATURE_BYTES>(bytes, &mut pos)?.to_vec();
        if pos != bytes.len() {
            return Err(CoreError::malformed(
                pos,
                format!("{} trailing byte(s) after bundle", bytes.len() - pos),
            ));
        }
        Ok(SpendBundle {
            coin_spends,
            aggregated_signature,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        if self.aggregated_signature.len() != AGGREGATED_SIGNATURE_BYTES {
            return Err(CoreError::malformed(
                0,
                format!(
                    "aggregated signature must be {AGGREGATED_SIGNATURE_BYTES} bytes, got {}",
                    self.aggregated_signature.len()
                ),
            ));
        }
        let mut out = Vec::new();
        out.extend_from_slice(&(self.coin_spends.len() as u32).to_be_bytes());
        for spend in &self.coin_spends {
            out.extend_from_slice(&spend.coin.parent_coin_info);
            out.extend_from_slice(&spend.coin.puzzle_hash);
            out.extend_from_slice(&spend.coin.amount.to_be_bytes());
            out.extend_from_slice(&spend.puzzle_reveal);
            out.extend_from_slice(&spend.solution);
        }
        out.extend_from_slice(&self.aggregated_signature);
        Ok(out)
    }
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, CoreError> {
    Ok(u32::from_be_bytes(read_array::<4>(bytes, pos)?))
}

fn read_u64(bytes: &[u8], pos: &mut usize) -> Result<u64, CoreError> {
    Ok(u64::from_be_bytes(read_array::<8>(bytes, pos)?))
}

fn read_array<const N: usize>(bytes: &[u8], pos: &mut usize) -> Result<[u8; N], CoreError> {
    let end = pos
        .checked_add(N)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| CoreError::malformed(*pos, format!("expected {N} more byte(s)")))?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*pos..end]);
    *pos = end;
    Ok(out)
}

fn read_program(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>, CoreError> {
    let (_, consumed) = decode_prefix(&bytes[*pos..]).map_err(|e| match e {
        CoreError::MalformedEncoding { offset, reason } => CoreError::MalformedEncoding {
            offset: *pos + offset,
            reason,
        },
        other => other,
    })?;
    let program = bytes[*pos..*pos + consumed].to_vec();
    *pos += consumed;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spend() -> CoinSpend {
        CoinSpend {
            coin: Coin::new([0x11; 32], [0x22; 32], 1000),
            // (q . 1) and nil
            puzzle_reveal: vec![0xff, 0x01, 0x01],
            solution: vec![0x80],
        }
    }

    #[test]
    fn coin_id_is_deterministic_over_amount_encoding() {
        let id_zero = Coin::new([0; 32], [0; 32], 0).coin_id();
        let id_one = Coin::new([0; 32], [0; 32], 1).coin_id();
        assert_ne!(id_zero, id_one);

        // The zero amount hashes as empty bytes.
        let mut hasher = Sha256::new();
        hasher.update([0u8; 32]);
        hasher.update([0u8; 32]);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(id_zero, expected);
    }

    #[test]
    fn coin_id_inserts_sign_byte_for_high_amounts() {
        let coin = Coin::new([1; 32], [2; 32], 0x80);
        let mut hasher = Sha256::new();
        hasher.update([1u8; 32]);
        hasher.update([2u8; 32]);
        hasher.update([0x00, 0x80]);
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(coin.coin_id(), expected);
    }

    #[test]
    fn bundle_bytes_round_trip() {
        let bundle = SpendBundle::new(vec![sample_spend(), sample_spend()], vec![0xcc; 96]);
        let bytes = bundle.to_bytes().unwrap();
        let decoded = SpendBundle::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, bundle);
    }

    #[test]
    fn truncated_bundle_is_rejected() {
        let bundle = SpendBundle::new(vec![sample_spend()], vec![0xcc; 96]);
        let bytes = bundle.to_bytes().unwrap();
        assert!(SpendBundle::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn wrong_signature_width_is_rejected() {
        let bundle = SpendBundle::new(vec![], vec![0xcc; 48]);
        assert!(bundle.to_bytes().is_err());
    }
}
