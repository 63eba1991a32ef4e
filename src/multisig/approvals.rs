//! Approval ledger
//!
//! Tracks which owners currently approve which transaction. The approval
//! count for a transaction is the size of its approver set, so it cannot
//! drift from the votes and has no setter.

use crate::crypto::Address;
use crate::multisig::error::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-transaction, per-owner approval votes
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApprovalLedger {
    votes: BTreeMap<u64, BTreeSet<Address>>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an approval and return the new count
    pub(crate) fn approve(&mut self, tx_id: u64, owner: Address) -> Result<usize, MultisigError> {
        let approvers = self.votes.entry(tx_id).or_default();
        if !approvers.insert(owner) {
            return Err(MultisigError::AlreadyApproved { tx_id, owner });
        }
        Ok(approvers.len())
    }

    /// Withdraw an approval and return the new count
    pub(crate) fn revoke(&mut self, tx_id: u64, owner: Address) -> Result<usize, MultisigError> {
        let approvers = self
            .votes
            .get_mut(&tx_id)
            .filter(|approvers| approvers.contains(&owner))
            .ok_or(MultisigError::NotYetApproved { tx_id, owner })?;

        approvers.remove(&owner);
        let remaining = approvers.len();
        if remaining == 0 {
            self.votes.remove(&tx_id);
        }
        Ok(remaining)
    }

    pub fn has_approved(&self, tx_id: u64, owner: &Address) -> bool {
        self.votes
            .get(&tx_id)
            .map(|approvers| approvers.contains(owner))
            .unwrap_or(false)
    }

    /// Number of owners currently approving `tx_id`
    pub fn count(&self, tx_id: u64) -> usize {
        self.votes.get(&tx_id).map(BTreeSet::len).unwrap_or(0)
    }

    /// Approving owners in address order
    pub fn approvers(&self, tx_id: u64) -> Vec<Address> {
        self.votes
            .get(&tx_id)
            .map(|approvers| approvers.iter().copied().collect())
            .unwrap_or_default()
    }
}
