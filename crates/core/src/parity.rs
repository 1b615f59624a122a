//! Single-bit parity over a byte payload.
//!
//! The same function tags outgoing frames and validates incoming ones. Any
//! odd number of flipped bits changes the result; an even number does not,
//! so two flips inside one frame go unnoticed.

/// Parity of the total number of set bits: 1 if odd, 0 if even.
pub fn parity(data: &[u8]) -> u8 {
    let ones: u32 = data.iter().map(|b| b.count_ones()).sum();
    (ones % 2) as u8
}

/// Check `data` against a received parity byte.
pub fn verify(data: &[u8], expected: u8) -> bool {
    parity(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_even() {
        assert_eq!(parity(&[]), 0);
    }

    #[test]
    fn test_counts_across_bytes() {
        assert_eq!(parity(&[0b0000_0001]), 1);
        assert_eq!(parity(&[0b0000_0001, 0b1000_0000]), 0);
        assert_eq!(parity(&[0xFF, 0x01]), 1);
        assert_eq!(parity(b"~"), 0);
        assert_eq!(parity(&[!b'~']), 0);
    }

    #[test]
    fn test_single_flip_detected() {
        let data = b"hello!!!".to_vec();
        let tag = parity(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(!verify(&corrupted, tag), "flip at {byte}:{bit} went unnoticed");
            }
        }
    }

    #[test]
    fn test_double_flip_undetected() {
        let data = [0x41, 0x42];
        let tag = parity(&data);
        let corrupted = [0x41 ^ 0b11, 0x42];
        assert!(verify(&corrupted, tag));
    }
}
