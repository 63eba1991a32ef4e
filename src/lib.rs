//! Multisig Vault: a multi-owner, quorum-gated transaction engine in Rust
//!
//! This crate provides a shared vault controlled by a fixed set of owners:
//! - Owner registry validated at construction (no empty, duplicate or zero owners)
//! - Append-only transaction log with per-owner approval tracking
//! - Execution once `quorum` approvals are collected, exactly once per transaction
//! - Rollback of failed forwards, including re-entrant state changes
//! - Sequenced event log that can be replayed to rebuild state
//! - secp256k1-signed owner actions bound to the vault's current state
//! - JSON persistence with rotating backups
//! - REST API and WebSocket event feed
//!
//! # Example
//!
//! ```rust
//! use multisig_vault::crypto::Address;
//! use multisig_vault::multisig::{MultisigConfig, Vault};
//! use multisig_vault::signer::Signer;
//!
//! // Two owner keys, either of them may act alone
//! let alice = Signer::new();
//! let bob = Signer::new();
//! let config = MultisigConfig::new(vec![alice.address(), bob.address()], 1, None).unwrap();
//! let mut vault = Vault::new(config).unwrap();
//!
//! // Fund the vault and send part of it onwards
//! let target = Address::from_bytes([7; 20]);
//! vault.wallet.deposit(target, 50).unwrap();
//! let tx_id = vault.wallet.submit(alice.address(), target, 20, vec![]).unwrap();
//! vault.wallet.approve(tx_id, bob.address()).unwrap();
//! vault.execute(tx_id).unwrap();
//!
//! assert_eq!(vault.wallet.balance(), 30);
//! assert_eq!(vault.received_by(&target), 20);
//! ```

pub mod api;
pub mod cli;
pub mod crypto;
pub mod multisig;
pub mod signer;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use crypto::{Address, KeyPair};
pub use multisig::{
    Executor, LedgerExecutor, MultisigConfig, MultisigError, MultisigWallet, Vault, WalletEvent,
};
pub use signer::{Signer, SignerStore};
pub use storage::Storage;
