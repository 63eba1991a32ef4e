//! Wallet event log
//!
//! One record per state transition, numbered from zero. The records carry
//! enough detail that [`replay`] can rebuild the balance, the transaction
//! log and the approval ledger without access to the wallet.

use crate::crypto::Address;
use crate::multisig::approvals::ApprovalLedger;
use crate::multisig::error::MultisigError;
use crate::multisig::transaction::TransactionLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A state transition of the wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    /// Value was credited to the wallet
    Deposit {
        from: Address,
        amount: u64,
        balance: u64,
    },
    /// An owner proposed a transaction
    Submit {
        owner: Address,
        tx_id: u64,
        to: Address,
        value: u64,
        #[serde(with = "hex::serde")]
        data: Vec<u8>,
    },
    Approve {
        owner: Address,
        tx_id: u64,
    },
    Revoke {
        owner: Address,
        tx_id: u64,
    },
    /// A transaction was forwarded successfully
    Executed {
        tx_id: u64,
    },
}

impl WalletEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::Deposit { .. } => "Deposit",
            WalletEvent::Submit { .. } => "Submit",
            WalletEvent::Approve { .. } => "Approve",
            WalletEvent::Revoke { .. } => "Revoke",
            WalletEvent::Executed { .. } => "Executed",
        }
    }
}

/// An event with its position in the log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: WalletEvent,
}

/// Ordered list of event records
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, event: WalletEvent, timestamp: DateTime<Utc>) -> u64 {
        let sequence = self.next_sequence();
        self.records.push(EventRecord {
            sequence,
            timestamp,
            event,
        });
        sequence
    }

    /// Drop every record from position `len` onwards
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    /// Sequence number the next record will get
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Records with a sequence number of at least `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors from replaying an event log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Event out of sequence: expected {expected}, found {found}")]
    OutOfSequence { expected: u64, found: u64 },
    #[error("Event {sequence} submits transaction {found}, expected id {expected}")]
    UnexpectedTransactionId {
        sequence: u64,
        expected: u64,
        found: u64,
    },
    #[error("Event {sequence} disagrees with the replayed balance")]
    BalanceMismatch { sequence: u64 },
    #[error("Event {sequence} is not valid in the replayed state: {source}")]
    Rejected {
        sequence: u64,
        #[source]
        source: MultisigError,
    },
}

/// State reconstructed from an event log
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayedState {
    pub balance: u64,
    pub transactions: TransactionLog,
    pub approvals: ApprovalLedger,
}

/// Rebuild observable wallet state from its event records
pub fn replay(records: &[EventRecord]) -> Result<ReplayedState, ReplayError> {
    let mut state = ReplayedState::default();

    for (expected, record) in (0u64..).zip(records) {
        let sequence = record.sequence;
        if sequence != expected {
            return Err(ReplayError::OutOfSequence {
                expected,
                found: sequence,
            });
        }
        let rejected = |source| ReplayError::Rejected { sequence, source };

        match &record.event {
            WalletEvent::Deposit {
                amount, balance, ..
            } => {
                state.balance = state
                    .balance
                    .checked_add(*amount)
                    .filter(|computed| computed == balance)
                    .ok_or(ReplayError::BalanceMismatch { sequence })?;
            }
            WalletEvent::Submit {
                owner,
                tx_id,
                to,
                value,
                data,
            } => {
                let id = state.transactions.append(
                    *owner,
                    *to,
                    *value,
                    data.clone(),
                    record.timestamp,
                );
                if id != *tx_id {
                    return Err(ReplayError::UnexpectedTransactionId {
                        sequence,
                        expected: id,
                        found: *tx_id,
                    });
                }
            }
            WalletEvent::Approve { owner, tx_id } => {
                state.transactions.get(*tx_id).map_err(rejected)?;
                state.approvals.approve(*tx_id, *owner).map_err(rejected)?;
            }
            WalletEvent::Revoke { owner, tx_id } => {
                state.transactions.get(*tx_id).map_err(rejected)?;
                state.approvals.revoke(*tx_id, *owner).map_err(rejected)?;
            }
            WalletEvent::Executed { tx_id } => {
                let value = state.transactions.get(*tx_id).map_err(rejected)?.value();
                state.transactions.mark_executed(*tx_id).map_err(rejected)?;
                state.balance = state
                    .balance
                    .checked_sub(value)
                    .ok_or(ReplayError::BalanceMismatch { sequence })?;
            }
        }
    }

    Ok(state)
}
