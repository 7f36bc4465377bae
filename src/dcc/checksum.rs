//! XOR error detection byte for DCC packets

use super::types::ValidationResult;

/// Compute the error detection byte over the address and data bytes
pub fn compute_checksum(address: u8, data: &[u8]) -> u8 {
    data.iter().fold(address, |acc, b| acc ^ b)
}

/// Validate a received byte sequence whose last byte is the checksum.
/// The caller guarantees at least two bytes.
pub fn validate(bytes: &[u8]) -> ValidationResult {
    let Some((&received, covered)) = bytes.split_last() else {
        return ValidationResult::ChecksumMismatch;
    };
    let computed = covered.iter().fold(0u8, |acc, b| acc ^ b);
    if computed == received {
        ValidationResult::Valid
    } else {
        ValidationResult::ChecksumMismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum() {
        assert_eq!(compute_checksum(0x03, &[0x3F]), 0x3C);
        assert_eq!(compute_checksum(0xFF, &[0x00]), 0xFF);
        assert_eq!(compute_checksum(0x00, &[0x00]), 0x00);
    }

    #[test]
    fn test_validate_valid() {
        assert_eq!(validate(&[0x03, 0x3F, 0x3C]), ValidationResult::Valid);
        assert_eq!(validate(&[0xFF, 0x00, 0xFF]), ValidationResult::Valid);
    }

    #[test]
    fn test_validate_any_single_bit_flip() {
        for bit in 0..8 {
            let bytes = [0x03, 0x3F, 0x3C ^ (1 << bit)];
            assert_eq!(validate(&bytes), ValidationResult::ChecksumMismatch);
        }
    }

    #[test]
    fn test_validate_multi_byte() {
        let bytes = [0xC1, 0x23, 0x3F, 0x91];
        let check = bytes.iter().fold(0u8, |acc, b| acc ^ b);
        let mut framed = bytes.to_vec();
        framed.push(check);
        assert_eq!(validate(&framed), ValidationResult::Valid);
    }
}
