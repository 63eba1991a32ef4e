//! Multi-owner wallet and execution engine
//!
//! Owners submit transactions, approve or revoke them, and once a
//! transaction has collected `quorum` approvals anyone may execute it.
//! Execution marks the transaction executed *before* the call is forwarded,
//! so a re-entrant `execute` on the same transaction observes it as done.
//! Only one execution may be in flight at a time.

use crate::crypto::{hash160, Address};
use crate::multisig::approvals::ApprovalLedger;
use crate::multisig::error::MultisigError;
use crate::multisig::events::{replay, EventLog, EventRecord, ReplayError, WalletEvent};
use crate::multisig::executor::{Executor, ExecutorError, ForwardedCall};
use crate::multisig::guards;
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::transaction::{Transaction, TransactionLog, TxStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Construction parameters for a wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MultisigConfig {
    /// Authorized owners (N)
    pub owners: Vec<Address>,
    /// Approvals required to execute (M)
    pub quorum: usize,
    /// Optional human-readable label
    pub label: Option<String>,
}

impl MultisigConfig {
    /// Create a new configuration
    ///
    /// # Errors
    /// Returns error if the owner list is empty, has duplicates or the zero
    /// address, or if `quorum` is not within `1..=owners.len()`.
    pub fn new(
        owners: Vec<Address>,
        quorum: usize,
        label: Option<String>,
    ) -> Result<Self, MultisigError> {
        OwnerRegistry::new(owners.clone())?;
        check_quorum(quorum, owners.len())?;

        Ok(Self {
            owners,
            quorum,
            label,
        })
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.quorum, self.owners.len())
    }
}

fn check_quorum(quorum: usize, owners: usize) -> Result<(), MultisigError> {
    if quorum == 0 || quorum > owners {
        return Err(MultisigError::InvalidQuorum { quorum, owners });
    }
    Ok(())
}

/// Derive the wallet address: HASH160(quorum || sorted owners)
fn derive_address(owners: &OwnerRegistry, quorum: usize) -> Address {
    let mut sorted = owners.owners().to_vec();
    sorted.sort();

    let mut script = (quorum as u64).to_be_bytes().to_vec();
    for owner in &sorted {
        script.extend_from_slice(owner.as_bytes());
    }
    Address::from_bytes(hash160(&script))
}

/// State restored when a forwarded call fails
struct Checkpoint {
    transactions: TransactionLog,
    approvals: ApprovalLedger,
    balance: u64,
    events: usize,
}

/// A wallet controlled by a fixed set of owners
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "StoredWallet")]
pub struct MultisigWallet {
    address: Address,
    label: Option<String>,
    owners: OwnerRegistry,
    quorum: usize,
    transactions: TransactionLog,
    approvals: ApprovalLedger,
    balance: u64,
    events: EventLog,
    created_at: DateTime<Utc>,
    /// Transaction whose forward is currently running
    #[serde(skip)]
    executing: Option<u64>,
}

/// Serialized form; converted back through the same validation as `new`
#[derive(Deserialize)]
struct StoredWallet {
    label: Option<String>,
    owners: OwnerRegistry,
    quorum: usize,
    transactions: TransactionLog,
    approvals: ApprovalLedger,
    balance: u64,
    events: EventLog,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoredWallet> for MultisigWallet {
    type Error = MultisigError;

    fn try_from(stored: StoredWallet) -> Result<Self, Self::Error> {
        check_quorum(stored.quorum, stored.owners.len())?;

        let wallet = Self {
            address: derive_address(&stored.owners, stored.quorum),
            label: stored.label,
            owners: stored.owners,
            quorum: stored.quorum,
            transactions: stored.transactions,
            approvals: stored.approvals,
            balance: stored.balance,
            events: stored.events,
            created_at: stored.created_at,
            executing: None,
        };

        for tx in wallet.transactions.iter() {
            guards::only_owner(&wallet.owners, &tx.submitted_by())?;
            for approver in wallet.approvals.approvers(tx.id()) {
                guards::only_owner(&wallet.owners, &approver)?;
            }
        }

        match wallet.audit() {
            Ok(true) => Ok(wallet),
            Ok(false) => Err(MultisigError::InconsistentState(
                "event log does not reproduce the stored state".to_string(),
            )),
            Err(e) => Err(MultisigError::InconsistentState(e.to_string())),
        }
    }
}

impl MultisigWallet {
    /// Create a new wallet with an empty balance and no transactions
    pub fn new(config: MultisigConfig) -> Result<Self, MultisigError> {
        let owners = OwnerRegistry::new(config.owners)?;
        check_quorum(config.quorum, owners.len())?;

        Ok(Self {
            address: derive_address(&owners, config.quorum),
            label: config.label,
            owners,
            quorum: config.quorum,
            transactions: TransactionLog::new(),
            approvals: ApprovalLedger::new(),
            balance: 0,
            events: EventLog::new(),
            created_at: Utc::now(),
            executing: None,
        })
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Credit `amount` to the wallet. Open to any caller.
    ///
    /// Returns the new balance.
    pub fn deposit(&mut self, from: Address, amount: u64) -> Result<u64, MultisigError> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(MultisigError::BalanceOverflow {
                balance: self.balance,
                amount,
            })?;

        self.balance = balance;
        self.events.record(
            WalletEvent::Deposit {
                from,
                amount,
                balance,
            },
            Utc::now(),
        );

        log::info!("Deposit of {} from {}, balance {}", amount, from.short(), balance);
        Ok(balance)
    }

    /// Propose a transaction. Owner only.
    ///
    /// Returns the id of the new transaction.
    pub fn submit(
        &mut self,
        owner: Address,
        to: Address,
        value: u64,
        data: Vec<u8>,
    ) -> Result<u64, MultisigError> {
        guards::only_owner(&self.owners, &owner)?;

        let now = Utc::now();
        let tx_id = self.transactions.append(owner, to, value, data.clone(), now);
        self.events.record(
            WalletEvent::Submit {
                owner,
                tx_id,
                to,
                value,
                data,
            },
            now,
        );

        log::info!(
            "Transaction {} submitted by {}: {} to {}",
            tx_id,
            owner.short(),
            value,
            to.short()
        );
        Ok(tx_id)
    }

    /// Approve a pending transaction. Owner only.
    ///
    /// Returns the new approval count.
    pub fn approve(&mut self, tx_id: u64, owner: Address) -> Result<usize, MultisigError> {
        guards::only_owner(&self.owners, &owner)?;
        guards::pending_transaction(&self.transactions, tx_id)?;

        let count = self.approvals.approve(tx_id, owner)?;
        self.events
            .record(WalletEvent::Approve { owner, tx_id }, Utc::now());

        log::info!(
            "Transaction {} approved by {} ({}/{})",
            tx_id,
            owner.short(),
            count,
            self.quorum
        );
        Ok(count)
    }

    /// Withdraw an earlier approval of a pending transaction. Owner only.
    ///
    /// Returns the new approval count.
    pub fn revoke(&mut self, tx_id: u64, owner: Address) -> Result<usize, MultisigError> {
        guards::only_owner(&self.owners, &owner)?;
        guards::pending_transaction(&self.transactions, tx_id)?;

        let count = self.approvals.revoke(tx_id, owner)?;
        self.events
            .record(WalletEvent::Revoke { owner, tx_id }, Utc::now());

        log::info!(
            "Approval of transaction {} revoked by {} ({}/{})",
            tx_id,
            owner.short(),
            count,
            self.quorum
        );
        Ok(count)
    }

    /// Execute a transaction that has reached quorum. Open to any caller.
    ///
    /// The executed flag, the debit and the `Executed` event are committed
    /// before `executor` runs. If the forward fails, every change made during
    /// this call is rolled back, including changes made re-entrantly through
    /// the executor, and the transaction stays executable.
    ///
    /// The executor may not execute other transactions: a rollback could not
    /// undo a call that already left the wallet.
    pub fn execute(
        &mut self,
        tx_id: u64,
        executor: &mut dyn Executor,
    ) -> Result<Vec<u8>, MultisigError> {
        let call = {
            let tx = guards::pending_transaction(&self.transactions, tx_id)?;
            guards::no_execution_in_flight(self.executing)?;
            guards::quorum_reached(self.approvals.count(tx_id), self.quorum)?;
            ForwardedCall {
                tx_id,
                target: tx.to(),
                value: tx.value(),
                data: tx.data().to_vec(),
            }
        };

        let checkpoint = self.checkpoint();
        self.transactions.mark_executed(tx_id)?;
        self.executing = Some(tx_id);
        let result = self.forward(executor, &call);
        self.executing = None;

        match result {
            Ok(returned) => {
                log::info!(
                    "Transaction {} executed: {} forwarded to {}",
                    tx_id,
                    call.value,
                    call.target.short()
                );
                Ok(returned)
            }
            Err(source) => {
                self.restore(checkpoint);
                log::warn!("Transaction {} failed to execute: {}", tx_id, source);
                Err(MultisigError::ExecutionFailed { tx_id, source })
            }
        }
    }

    /// Debit the value and record the execution, then hand the call to `executor`
    fn forward(
        &mut self,
        executor: &mut dyn Executor,
        call: &ForwardedCall,
    ) -> Result<Vec<u8>, ExecutorError> {
        self.balance =
            self.balance
                .checked_sub(call.value)
                .ok_or(ExecutorError::InsufficientBalance {
                    have: self.balance,
                    need: call.value,
                })?;
        // Recorded ahead of the call so re-entrant deposits see the debit
        self.events
            .record(WalletEvent::Executed { tx_id: call.tx_id }, Utc::now());

        executor.forward(self, call)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            transactions: self.transactions.clone(),
            approvals: self.approvals.clone(),
            balance: self.balance,
            events: self.events.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.transactions = checkpoint.transactions;
        self.approvals = checkpoint.approvals;
        self.balance = checkpoint.balance;
        self.events.truncate(checkpoint.events);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.is_owner(address)
    }

    pub fn owners(&self) -> &[Address] {
        self.owners.owners()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn transaction(&self, tx_id: u64) -> Result<&Transaction, MultisigError> {
        self.transactions.get(tx_id)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Current approvals of `tx_id`; zero for unknown transactions
    pub fn approvals_count(&self, tx_id: u64) -> usize {
        self.approvals.count(tx_id)
    }

    pub fn has_approved(&self, tx_id: u64, owner: &Address) -> bool {
        self.approvals.has_approved(tx_id, owner)
    }

    pub fn approvers(&self, tx_id: u64) -> Vec<Address> {
        self.approvals.approvers(tx_id)
    }

    pub fn status(&self, tx_id: u64) -> Result<TxStatus, MultisigError> {
        let tx = self.transactions.get(tx_id)?;
        Ok(if tx.is_executed() {
            TxStatus::Executed
        } else if self.approvals.count(tx_id) >= self.quorum {
            TxStatus::Executable
        } else {
            TxStatus::Pending
        })
    }

    pub fn is_executable(&self, tx_id: u64) -> bool {
        matches!(self.status(tx_id), Ok(TxStatus::Executable))
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.events.since(sequence)
    }

    /// Sequence number of the next event; changes with every state transition
    pub fn sequence(&self) -> u64 {
        self.events.next_sequence()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.quorum, self.owners.len())
    }

    /// Replay the event log and check it reproduces the current state
    pub fn audit(&self) -> Result<bool, ReplayError> {
        let replayed = replay(self.events.records())?;
        Ok(replayed.balance == self.balance
            && replayed.transactions == self.transactions
            && replayed.approvals == self.approvals)
    }
}
