//! Vault: a wallet bundled with the executor that carries out its calls
//!
//! This is the unit the CLI and the API load, mutate and persist.

use crate::crypto::Address;
use crate::multisig::executor::LedgerExecutor;
use crate::multisig::wallet::{MultisigConfig, MultisigWallet};
use crate::multisig::MultisigError;
use serde::{Deserialize, Serialize};

/// Wallet state plus the ledger that receives forwarded value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    pub wallet: MultisigWallet,
    pub ledger: LedgerExecutor,
}

impl Vault {
    /// Create a vault around a fresh wallet
    pub fn new(config: MultisigConfig) -> Result<Self, MultisigError> {
        Ok(Self {
            wallet: MultisigWallet::new(config)?,
            ledger: LedgerExecutor::new(),
        })
    }

    /// Execute a transaction, forwarding through the vault's ledger
    pub fn execute(&mut self, tx_id: u64) -> Result<Vec<u8>, MultisigError> {
        self.wallet.execute(tx_id, &mut self.ledger)
    }

    /// Value a target has received through executed transactions
    pub fn received_by(&self, target: &Address) -> u64 {
        self.ledger.balance_of(target)
    }
}
