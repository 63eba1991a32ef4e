//! Cryptographic utilities for the vault
//!
//! This module provides:
//! - SHA-256 and HASH160 hashing
//! - ECDSA key management (secp256k1)
//! - 20-byte account addresses

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use hash::{hash160, sha256, sha256_hex};
pub use keys::{public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair};
