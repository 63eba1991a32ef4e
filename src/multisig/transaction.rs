//! Proposed transactions and the append-only log that holds them

use crate::crypto::Address;
use crate::multisig::error::MultisigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle position of a transaction
///
/// `Executable` is derived from the approval count; only `executed` is stored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxStatus {
    /// Waiting for more approvals
    Pending,
    /// Has reached quorum and may be executed by anyone
    Executable,
    /// Forwarded successfully; terminal
    Executed,
}

/// A proposed operation: forward `value` and `data` to `to`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
    to: Address,
    value: u64,
    #[serde(with = "hex::serde")]
    data: Vec<u8>,
    executed: bool,
    submitted_by: Address,
    submitted_at: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn new(
        id: u64,
        submitted_by: Address,
        to: Address,
        value: u64,
        data: Vec<u8>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            to,
            value,
            data,
            executed: false,
            submitted_by,
            submitted_at,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Call target
    pub fn to(&self) -> Address {
        self.to
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Opaque payload forwarded with the call
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub fn submitted_by(&self) -> Address {
        self.submitted_by
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Append-only store of transactions, indexed by sequential id
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TransactionLog {
    transactions: Vec<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new, unexecuted transaction and return its id
    pub(crate) fn append(
        &mut self,
        submitted_by: Address,
        to: Address,
        value: u64,
        data: Vec<u8>,
        submitted_at: DateTime<Utc>,
    ) -> u64 {
        let id = self.next_id();
        self.transactions.push(Transaction::new(
            id,
            submitted_by,
            to,
            value,
            data,
            submitted_at,
        ));
        id
    }

    /// Look up a transaction by id
    pub fn get(&self, tx_id: u64) -> Result<&Transaction, MultisigError> {
        usize::try_from(tx_id)
            .ok()
            .and_then(|index| self.transactions.get(index))
            .ok_or(MultisigError::TransactionNotFound(tx_id))
    }

    /// Flip the executed flag; fails if the transaction is missing or already executed
    pub(crate) fn mark_executed(&mut self, tx_id: u64) -> Result<(), MultisigError> {
        let tx = usize::try_from(tx_id)
            .ok()
            .and_then(|index| self.transactions.get_mut(index))
            .ok_or(MultisigError::TransactionNotFound(tx_id))?;

        if tx.executed {
            return Err(MultisigError::AlreadyExecuted(tx_id));
        }
        tx.executed = true;
        Ok(())
    }

    /// Id the next appended transaction will receive
    pub fn next_id(&self) -> u64 {
        self.transactions.len() as u64
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_sequential_ids() {
        let mut log = TransactionLog::new();
        let now = Utc::now();

        assert_eq!(log.append(addr(1), addr(9), 10, vec![], now), 0);
        assert_eq!(log.append(addr(2), addr(9), 20, vec![0xab], now), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.next_id(), 2);

        let tx = log.get(1).unwrap();
        assert_eq!(tx.id(), 1);
        assert_eq!(tx.submitted_by(), addr(2));
        assert_eq!(tx.to(), addr(9));
        assert_eq!(tx.value(), 20);
        assert_eq!(tx.data(), &[0xab]);
        assert!(!tx.is_executed());
    }

    #[test]
    fn test_get_out_of_range() {
        let log = TransactionLog::new();
        assert_eq!(log.get(0), Err(MultisigError::TransactionNotFound(0)));
        assert_eq!(
            log.get(u64::MAX),
            Err(MultisigError::TransactionNotFound(u64::MAX))
        );
    }

    #[test]
    fn test_mark_executed_once() {
        let mut log = TransactionLog::new();
        let id = log.append(addr(1), addr(2), 0, vec![], Utc::now());

        log.mark_executed(id).unwrap();
        assert!(log.get(id).unwrap().is_executed());
        assert_eq!(log.mark_executed(id), Err(MultisigError::AlreadyExecuted(id)));
        assert_eq!(log.mark_executed(7), Err(MultisigError::TransactionNotFound(7)));
    }

    #[test]
    fn test_payload_serialized_as_hex() {
        let mut log = TransactionLog::new();
        log.append(addr(1), addr(2), 5, vec![0xde, 0xad], Utc::now());

        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"dead\""));

        let back: TransactionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
