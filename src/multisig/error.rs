//! Errors raised by the multisig engine

use crate::crypto::Address;
use crate::multisig::executor::ExecutorError;
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Invalid configuration: owner list is empty")]
    NoOwners,
    #[error("Invalid configuration: zero address cannot be an owner")]
    ZeroOwner,
    #[error("Invalid configuration: duplicate owner {0}")]
    DuplicateOwner(Address),
    #[error("Invalid configuration: quorum {quorum} must be between 1 and {owners}")]
    InvalidQuorum { quorum: usize, owners: usize },
    #[error("Not an owner: {0}")]
    NotOwner(Address),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(u64),
    #[error("Owner {owner} already approved transaction {tx_id}")]
    AlreadyApproved { tx_id: u64, owner: Address },
    #[error("Owner {owner} has not approved transaction {tx_id}")]
    NotYetApproved { tx_id: u64, owner: Address },
    #[error("Insufficient approvals: have {have}, need {need}")]
    InsufficientApprovals { have: usize, need: usize },
    #[error("Transaction {0} is being executed; nested execution is not allowed")]
    ExecutionInProgress(u64),
    #[error("Deposit of {amount} would overflow balance {balance}")]
    BalanceOverflow { balance: u64, amount: u64 },
    #[error("Stored wallet is inconsistent: {0}")]
    InconsistentState(String),
    #[error("Execution of transaction {tx_id} failed: {source}")]
    ExecutionFailed {
        tx_id: u64,
        #[source]
        source: ExecutorError,
    },
}

/// The two failure classes callers distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any state was touched; fix the inputs and retry
    PreconditionViolation,
    /// The forwarded call failed and the attempt was rolled back
    ExecutionFailed,
}

impl MultisigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultisigError::ExecutionFailed { .. } => ErrorKind::ExecutionFailed,
            _ => ErrorKind::PreconditionViolation,
        }
    }

    /// True for errors raised while validating construction arguments
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            MultisigError::NoOwners
                | MultisigError::ZeroOwner
                | MultisigError::DuplicateOwner(_)
                | MultisigError::InvalidQuorum { .. }
        )
    }
}
