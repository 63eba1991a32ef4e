//! Multi-owner wallet with quorum-gated execution
//!
//! A fixed set of owners controls a balance and the right to forward calls
//! to arbitrary targets. Owners submit transactions and approve or revoke
//! them; once a transaction has `quorum` approvals anyone may execute it,
//! exactly once.
//!
//! # Example
//!
//! ```rust
//! use multisig_vault::crypto::Address;
//! use multisig_vault::multisig::{LedgerExecutor, MultisigConfig, MultisigWallet};
//!
//! let a = Address::from_bytes([1; 20]);
//! let b = Address::from_bytes([2; 20]);
//! let c = Address::from_bytes([3; 20]);
//! let target = Address::from_bytes([9; 20]);
//!
//! // Create a 2-of-3 wallet and fund it
//! let config = MultisigConfig::new(vec![a, b, c], 2, None).unwrap();
//! let mut wallet = MultisigWallet::new(config).unwrap();
//! wallet.deposit(target, 100).unwrap();
//!
//! // Propose and collect approvals
//! let tx_id = wallet.submit(a, target, 40, vec![]).unwrap();
//! wallet.approve(tx_id, a).unwrap();
//! wallet.approve(tx_id, b).unwrap();
//!
//! // Forward the call
//! let mut ledger = LedgerExecutor::new();
//! wallet.execute(tx_id, &mut ledger).unwrap();
//! assert_eq!(ledger.balance_of(&target), 40);
//! assert_eq!(wallet.balance(), 60);
//! ```

pub mod approvals;
pub mod auth;
pub mod calldata;
pub mod error;
pub mod events;
pub mod executor;
pub mod guards;
pub mod owners;
pub mod transaction;
pub mod vault;
pub mod wallet;

pub use approvals::ApprovalLedger;
pub use auth::{authorize, Action, AuthError, Authorization};
pub use calldata::{decode_call, encode_call, selector, CallDataError};
pub use error::{ErrorKind, MultisigError};
pub use events::{replay, EventLog, EventRecord, ReplayError, ReplayedState, WalletEvent};
pub use executor::{CallReceipt, Executor, ExecutorError, ForwardedCall, LedgerExecutor};
pub use owners::OwnerRegistry;
pub use transaction::{Transaction, TransactionLog, TxStatus};
pub use vault::Vault;
pub use wallet::{MultisigConfig, MultisigWallet};
