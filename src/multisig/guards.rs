//! Precondition guards
//!
//! Each guard inspects state without changing it and returns the error the
//! operation must fail with. Operations run all their guards before the
//! first mutation.

use crate::crypto::Address;
use crate::multisig::error::MultisigError;
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::transaction::{Transaction, TransactionLog};

/// Caller must be a registered owner
pub fn only_owner(owners: &OwnerRegistry, caller: &Address) -> Result<(), MultisigError> {
    if owners.is_owner(caller) {
        Ok(())
    } else {
        Err(MultisigError::NotOwner(*caller))
    }
}

/// Transaction must exist and must not have been executed
pub fn pending_transaction(
    log: &TransactionLog,
    tx_id: u64,
) -> Result<&Transaction, MultisigError> {
    let tx = log.get(tx_id)?;
    if tx.is_executed() {
        return Err(MultisigError::AlreadyExecuted(tx_id));
    }
    Ok(tx)
}

/// No other execution may be forwarding a call
pub fn no_execution_in_flight(executing: Option<u64>) -> Result<(), MultisigError> {
    match executing {
        Some(active) => Err(MultisigError::ExecutionInProgress(active)),
        None => Ok(()),
    }
}

/// Approval count must have reached the quorum
pub fn quorum_reached(approvals: usize, quorum: usize) -> Result<(), MultisigError> {
    if approvals >= quorum {
        Ok(())
    } else {
        Err(MultisigError::InsufficientApprovals {
            have: approvals,
            need: quorum,
        })
    }
}
