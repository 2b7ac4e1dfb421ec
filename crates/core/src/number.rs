//! Signed-number view of atoms.
//!
//! Atoms are two's-complement big-endian with a minimal canonical form
//! (no redundant leading 0x00 or 0xff byte). Arithmetic in the evaluator
//! goes through `i128`; atoms wider than 16 bytes are out of range.

use crate::error::CoreError;

pub const MAX_NUMBER_BYTES: usize = 16;

/// Interpret an atom as a signed number. The empty atom is zero.
pub fn atom_to_int(bytes: &[u8]) -> Result<i128, CoreError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > MAX_NUMBER_BYTES {
        return Err(CoreError::NumberRange(format!(
            "atom of {} bytes exceeds the {MAX_NUMBER_BYTES}-byte integer range",
            bytes.len()
        )));
    }
    let negative = bytes[0] & 0x80 != 0;
    let mut value: i128 = if negative { -1 } else { 0 };
    for &byte in bytes {
        value = (value << 8) | byte as i128;
    }
    Ok(value)
}

/// Encode a signed number as a minimal atom. Zero is the empty atom.
pub fn int_to_atom(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let raw = value.to_be_bytes();
    let mut start = 0usize;
    // Drop redundant sign-extension bytes, keeping the sign bit intact.
    while start < raw.len() - 1 {
        let byte = raw[start];
        let next = raw[start + 1];
        let redundant = (byte == 0x00 && next & 0x80 == 0) || (byte == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    raw[start..].to_vec()
}

/// Interpret an atom as an unsigned 64-bit amount. The empty atom is zero;
/// atoms with the sign bit set or wider than eight payload bytes do not fit.
pub fn atom_to_u64(bytes: &[u8]) -> Option<u64> {
    let value = atom_to_int(bytes).ok()?;
    u64::try_from(value).ok()
}

/// Canonical bytes of a coin amount as hashed into a coin id: big-endian,
/// leading zeros stripped, one 0x00 reinserted when the top bit would read
/// as a sign bit. Zero is empty.
pub fn amount_to_bytes(amount: u64) -> Vec<u8> {
    int_to_atom(amount as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_empty() {
        assert_eq!(atom_to_int(&[]).unwrap(), 0);
        assert_eq!(int_to_atom(0), Vec::<u8>::new());
    }

    #[test]
    fn positive_and_negative_round_trip() {
        for value in [1i128, 127, 128, 255, 256, -1, -128, -129, 0x7fff_ffff, i64::MAX as i128] {
            let atom = int_to_atom(value);
            assert_eq!(atom_to_int(&atom).unwrap(), value, "value {value}");
        }
    }

    #[test]
    fn sign_bit_forces_leading_zero() {
        assert_eq!(int_to_atom(128), vec![0x00, 0x80]);
        assert_eq!(int_to_atom(255), vec![0x00, 0xff]);
        assert_eq!(int_to_atom(-1), vec![0xff]);
        assert_eq!(int_to_atom(-128), vec![0x80]);
    }

    #[test]
    fn non_minimal_input_still_reads() {
        assert_eq!(atom_to_int(&[0x00, 0x01]).unwrap(), 1);
        assert_eq!(atom_to_int(&[0xff, 0xff]).unwrap(), -1);
    }

    #[test]
    fn oversized_atom_is_out_of_range() {
        assert!(atom_to_int(&[1u8; 17]).is_err());
        assert_eq!(atom_to_int(&[1u8; 16]).unwrap(), {
            let mut v = 0i128;
            for _ in 0..16 {
                v = (v << 8) | 1;
            }
            v
        });
    }

    #[test]
    fn amount_view() {
        assert_eq!(atom_to_u64(&[]), Some(0));
        assert_eq!(atom_to_u64(&[0x64]), Some(100));
        assert_eq!(atom_to_u64(&[0xff]), None);
        assert_eq!(atom_to_u64(&[1u8; 9]), None);
        assert_eq!(
            atom_to_u64(&int_to_atom(u64::MAX as i128)),
            Some(u64::MAX)
        );
    }

    #[test]
    fn amount_bytes_edge_cases() {
        assert_eq!(amount_to_bytes(0), Vec::<u8>::new());
        assert_eq!(amount_to_bytes(1), vec![0x01]);
        assert_eq!(amount_to_bytes(0x80), vec![0x00, 0x80]);
        assert_eq!(amount_to_bytes(u64::MAX), {
            let mut v = vec![0x00];
            v.extend_from_slice(&[0xff; 8]);
            v
        });
    }
}
