//! FNV-1a 64 — the commit hash function of the record format.
//!
//! The choice is part of the wire contract, so the function is spelled
//! out here rather than pulled from a hashing crate. Callers needing
//! collision resistance must layer a cryptographic hash on top.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte slice with 64-bit FNV-1a.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_offset_basis() {
        assert_eq!(fnv1a_64(&[]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn test_known_vectors() {
        // Reference values for FNV-1a 64.
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_deterministic() {
        let payload = b"[1, 2, 3]";
        assert_eq!(fnv1a_64(payload), fnv1a_64(payload));
    }

    #[test]
    fn test_sensitive_to_single_byte() {
        assert_ne!(fnv1a_64(b"abc"), fnv1a_64(b"abd"));
    }
}
