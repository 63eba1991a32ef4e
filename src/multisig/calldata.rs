//! Call-data encoding
//!
//! Payloads are a 4-byte selector derived from a function signature such as
//! `transfer(uint256,uint256)`, followed by each argument as a 32-byte
//! big-endian word. The selector is the first four bytes of SHA-256 over the
//! signature text.

use crate::crypto::sha256;
use thiserror::Error;

/// Size of the function selector
pub const SELECTOR_LEN: usize = 4;
/// Size of one encoded argument
pub const WORD_LEN: usize = 32;

/// Errors from decoding call data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallDataError {
    #[error("Call data too short: {0} bytes")]
    TooShort(usize),
    #[error("Arguments are not a whole number of words: {0} bytes")]
    Misaligned(usize),
    #[error("Argument {0} does not fit in 64 bits")]
    Overflow(usize),
}

/// Selector for a function signature
pub fn selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let hash = sha256(signature.as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&hash[..SELECTOR_LEN]);
    out
}

/// Encode a call to `signature` with the given arguments
pub fn encode_call(signature: &str, args: &[u64]) -> Vec<u8> {
    let mut data = Vec::with_capacity(SELECTOR_LEN + args.len() * WORD_LEN);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        let mut word = [0u8; WORD_LEN];
        word[WORD_LEN - 8..].copy_from_slice(&arg.to_be_bytes());
        data.extend_from_slice(&word);
    }
    data
}

/// Split call data into its selector and arguments
pub fn decode_call(data: &[u8]) -> Result<([u8; SELECTOR_LEN], Vec<u64>), CallDataError> {
    if data.len() < SELECTOR_LEN {
        return Err(CallDataError::TooShort(data.len()));
    }

    let (head, body) = data.split_at(SELECTOR_LEN);
    if body.len() % WORD_LEN != 0 {
        return Err(CallDataError::Misaligned(body.len()));
    }

    let mut sel = [0u8; SELECTOR_LEN];
    sel.copy_from_slice(head);

    let args = body
        .chunks_exact(WORD_LEN)
        .enumerate()
        .map(|(index, word)| {
            let (high, low) = word.split_at(WORD_LEN - 8);
            if high.iter().any(|b| *b != 0) {
                return Err(CallDataError::Overflow(index));
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(low);
            Ok(u64::from_be_bytes(bytes))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((sel, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let data = encode_call("callMe(uint256)", &[123]);

        assert_eq!(data.len(), SELECTOR_LEN + WORD_LEN);
        assert_eq!(&data[..SELECTOR_LEN], &selector("callMe(uint256)"));
        assert!(data[SELECTOR_LEN..data.len() - 1].iter().all(|b| *b == 0));
        assert_eq!(data[data.len() - 1], 123);
    }

    #[test]
    fn test_selector_depends_on_signature() {
        assert_ne!(selector("callMe(uint256)"), selector("callMe(uint128)"));
        assert_eq!(encode_call("ping()", &[]), selector("ping()").to_vec());
    }

    #[test]
    fn test_decode() {
        let data = encode_call("transfer(uint256,uint256)", &[7, u64::MAX]);
        let (sel, args) = decode_call(&data).unwrap();
        assert_eq!(sel, selector("transfer(uint256,uint256)"));
        assert_eq!(args, vec![7, u64::MAX]);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_call(&[1, 2]), Err(CallDataError::TooShort(2)));
        assert_eq!(
            decode_call(&[0u8; SELECTOR_LEN + 5]),
            Err(CallDataError::Misaligned(5))
        );

        let mut data = encode_call("f(uint256)", &[1]);
        data[SELECTOR_LEN] = 1;
        assert_eq!(decode_call(&data), Err(CallDataError::Overflow(0)));
    }
}
