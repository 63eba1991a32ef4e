//! Forwarded-call capability
//!
//! The wallet never interprets what executing a transaction means; it hands
//! the target, value and payload to an [`Executor`]. The executor receives
//! the wallet itself, which is the only way control can re-enter the engine
//! while an execution is in flight.

use crate::crypto::Address;
use crate::multisig::wallet::MultisigWallet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Failure reported by a forwarded call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Target {0} rejected the call")]
    Rejected(Address),
    #[error("Insufficient balance to forward {need}: have {have}")]
    InsufficientBalance { have: u64, need: u64 },
    #[error("Call reverted: {0}")]
    Reverted(String),
}

/// The operation being forwarded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardedCall {
    pub tx_id: u64,
    pub target: Address,
    pub value: u64,
    pub data: Vec<u8>,
}

/// Performs forwarded calls on behalf of the wallet
pub trait Executor {
    /// Forward `call`; `Ok` carries the call's return payload
    fn forward(
        &mut self,
        wallet: &mut MultisigWallet,
        call: &ForwardedCall,
    ) -> Result<Vec<u8>, ExecutorError>;
}

impl<F> Executor for F
where
    F: FnMut(&mut MultisigWallet, &ForwardedCall) -> Result<Vec<u8>, ExecutorError>,
{
    fn forward(
        &mut self,
        wallet: &mut MultisigWallet,
        call: &ForwardedCall,
    ) -> Result<Vec<u8>, ExecutorError> {
        self(wallet, call)
    }
}

/// Record of a forwarded call accepted by the [`LedgerExecutor`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallReceipt {
    pub tx_id: u64,
    pub target: Address,
    pub value: u64,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    pub forwarded_at: DateTime<Utc>,
}

/// Executor that books forwarded value into per-target accounts
///
/// Targets can be marked as rejecting, which makes every call to them fail.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerExecutor {
    accounts: BTreeMap<Address, u64>,
    receipts: Vec<CallReceipt>,
    rejecting: BTreeSet<Address>,
}

impl LedgerExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value received by `target` so far
    pub fn balance_of(&self, target: &Address) -> u64 {
        self.accounts.get(target).copied().unwrap_or(0)
    }

    pub fn accounts(&self) -> &BTreeMap<Address, u64> {
        &self.accounts
    }

    pub fn receipts(&self) -> &[CallReceipt] {
        &self.receipts
    }

    /// Make every future call to `target` fail
    pub fn reject(&mut self, target: Address) {
        self.rejecting.insert(target);
    }

    /// Undo [`reject`](Self::reject); returns whether the target was rejecting
    pub fn accept(&mut self, target: &Address) -> bool {
        self.rejecting.remove(target)
    }

    pub fn is_rejecting(&self, target: &Address) -> bool {
        self.rejecting.contains(target)
    }

    pub fn rejecting(&self) -> impl Iterator<Item = &Address> {
        self.rejecting.iter()
    }
}

impl Executor for LedgerExecutor {
    fn forward(
        &mut self,
        _wallet: &mut MultisigWallet,
        call: &ForwardedCall,
    ) -> Result<Vec<u8>, ExecutorError> {
        if self.rejecting.contains(&call.target) {
            return Err(ExecutorError::Rejected(call.target));
        }

        let credited = self
            .balance_of(&call.target)
            .checked_add(call.value)
            .ok_or_else(|| {
                ExecutorError::Reverted(format!("account overflow at {}", call.target))
            })?;

        self.accounts.insert(call.target, credited);
        self.receipts.push(CallReceipt {
            tx_id: call.tx_id,
            target: call.target,
            value: call.value,
            data: call.data.clone(),
            forwarded_at: Utc::now(),
        });

        log::debug!(
            "Forwarded {} to {} ({} bytes of data)",
            call.value,
            call.target.short(),
            call.data.len()
        );

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::MultisigConfig;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn test_wallet() -> MultisigWallet {
        let config = MultisigConfig::new(vec![addr(1)], 1, None).unwrap();
        MultisigWallet::new(config).unwrap()
    }

    fn call(target: Address, value: u64) -> ForwardedCall {
        ForwardedCall {
            tx_id: 0,
            target,
            value,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_ledger_credits_target() {
        let mut wallet = test_wallet();
        let mut ledger = LedgerExecutor::new();

        let returned = ledger.forward(&mut wallet, &call(addr(5), 40)).unwrap();
        assert!(returned.is_empty());
        ledger.forward(&mut wallet, &call(addr(5), 2)).unwrap();

        assert_eq!(ledger.balance_of(&addr(5)), 42);
        assert_eq!(ledger.balance_of(&addr(6)), 0);
        assert_eq!(ledger.receipts().len(), 2);
        assert_eq!(ledger.receipts()[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_rejecting_target() {
        let mut wallet = test_wallet();
        let mut ledger = LedgerExecutor::new();
        ledger.reject(addr(5));
        assert!(ledger.is_rejecting(&addr(5)));

        let result = ledger.forward(&mut wallet, &call(addr(5), 1));
        assert_eq!(result, Err(ExecutorError::Rejected(addr(5))));
        assert!(ledger.receipts().is_empty());

        assert!(ledger.accept(&addr(5)));
        assert!(ledger.forward(&mut wallet, &call(addr(5), 1)).is_ok());
    }

    #[test]
    fn test_account_overflow_reverts() {
        let mut wallet = test_wallet();
        let mut ledger = LedgerExecutor::new();
        ledger.forward(&mut wallet, &call(addr(5), u64::MAX)).unwrap();

        let result = ledger.forward(&mut wallet, &call(addr(5), 1));
        assert!(matches!(result, Err(ExecutorError::Reverted(_))));
        assert_eq!(ledger.balance_of(&addr(5)), u64::MAX);
    }

    #[test]
    fn test_closure_executor() {
        let mut wallet = test_wallet();
        let mut seen = Vec::new();
        let mut executor = |_: &mut MultisigWallet,
                            call: &ForwardedCall|
         -> Result<Vec<u8>, ExecutorError> {
            seen.push(call.value);
            Ok(b"done".to_vec())
        };

        let returned = executor.forward(&mut wallet, &call(addr(5), 9)).unwrap();
        assert_eq!(returned, b"done");
        assert_eq!(seen, vec![9]);
    }
}
