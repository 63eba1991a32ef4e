//! Signer module for owner key management

pub mod signer;

pub use signer::{Signer, SignerError, SignerInfo, SignerStore};
