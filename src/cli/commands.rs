//! CLI commands for the vault
//!
//! Implements all command handlers for the CLI interface.

use crate::crypto::Address;
use crate::multisig::{authorize, Action, MultisigConfig, MultisigWallet, Vault};
use crate::signer::{Signer, SignerStore};
use crate::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

fn open_signers(data_dir: &Path) -> CliResult<SignerStore> {
    Ok(SignerStore::new(&data_dir.join("keys"))?)
}

/// Application state
pub struct AppState {
    pub vault: Vault,
    pub storage: Storage,
    pub signers: SignerStore,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the vault from the data directory
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;
        let signers = open_signers(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "No vault at {:?}. Create one with: vault init --owners <a,b,c> --quorum <n>",
                data_dir
            )
            .into());
        }
        let vault = storage.load()?;
        log::debug!("Loaded vault {}", vault.wallet.address());

        Ok(Self {
            vault,
            storage,
            signers,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.vault)?;
        Ok(())
    }

    /// Sign `action` with the stored key of `owner` and verify it against the wallet
    fn authorize_owner(&self, owner: &Address, action: &Action) -> CliResult<Address> {
        let signer = self.signers.load_signer(owner)?;
        let auth = signer.authorize(&self.vault.wallet, action)?;
        Ok(authorize(&self.vault.wallet, action, &auth)?)
    }
}

/// Create a new vault
pub fn cmd_init(
    data_dir: &Path,
    owners: Vec<Address>,
    quorum: usize,
    label: Option<String>,
    force: bool,
) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() && !force {
        println!("⚠️  Vault already exists at {:?}", data_dir);
        println!("   Use --force to reinitialize (this will delete existing data)");
        return Ok(());
    }

    let config = MultisigConfig::new(owners, quorum, label)?;
    let vault = Vault::new(config)?;
    storage.save(&vault)?;

    let wallet = &vault.wallet;
    println!("✅ Vault initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   📍 Address: {}", wallet.address());
    println!("   🔐 Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("   └─ Owner: {}", owner);
    }

    Ok(())
}

/// Create a new owner key
pub fn cmd_key_new(data_dir: &Path, label: Option<&str>) -> CliResult<()> {
    let signer = open_signers(data_dir)?.create_signer(label)?;

    println!("🔑 New key created!");
    println!("   📍 Address: {}", signer.address());
    println!("   🔑 Public Key: {}", signer.public_key());
    if let Some(l) = &signer.label {
        println!("   🏷️  Label: {}", l);
    }
    println!("\n   ⚠️  IMPORTANT: Your private key is stored in the keys directory.");
    println!("   Back up this directory to keep control of the vault!");

    Ok(())
}

/// Import an existing owner key
pub fn cmd_key_import(data_dir: &Path, private_key: &str, label: Option<String>) -> CliResult<()> {
    let mut signer = Signer::from_private_key(private_key.trim_start_matches("0x"))?;
    signer.label = label;
    open_signers(data_dir)?.import_signer(&signer)?;

    println!("📥 Key imported!");
    println!("   📍 Address: {}", signer.address());

    Ok(())
}

/// List all owner keys
pub fn cmd_key_list(data_dir: &Path) -> CliResult<()> {
    let signers = open_signers(data_dir)?.list_signers()?;

    if signers.is_empty() {
        println!("📭 No keys found. Create one with: vault key new");
        return Ok(());
    }

    // Mark keys that belong to owners of an existing vault
    let storage = open_storage(data_dir)?;
    let vault = if storage.exists() {
        Some(storage.load()?)
    } else {
        None
    };

    println!("📋 Keys:");
    for info in &signers {
        let label = info.label.as_deref().unwrap_or("-");
        let role = match &vault {
            Some(v) if v.wallet.is_owner(&info.address) => " [owner]",
            _ => "",
        };
        println!("   {} ({}){}", info.address, label, role);
    }

    Ok(())
}

/// Credit value to the vault
pub fn cmd_deposit(state: &mut AppState, from: Address, amount: u64) -> CliResult<()> {
    let balance = state.vault.wallet.deposit(from, amount)?;
    state.save()?;

    println!("💰 Deposited {} from {}", amount, from);
    println!("   New balance: {}", balance);

    Ok(())
}

/// Propose a transaction as `owner`
pub fn cmd_submit(
    state: &mut AppState,
    owner: Address,
    to: Address,
    value: u64,
    data: Vec<u8>,
) -> CliResult<()> {
    let action = Action::Submit {
        to,
        value,
        data: data.clone(),
    };
    let owner = state.authorize_owner(&owner, &action)?;
    let tx_id = state.vault.wallet.submit(owner, to, value, data)?;
    state.save()?;

    println!("📤 Transaction {} submitted", tx_id);
    println!("   To: {}", to);
    println!("   Value: {}", value);
    println!(
        "   Approvals: 0/{} (approve with: vault approve --owner <address> --tx {})",
        state.vault.wallet.quorum(),
        tx_id
    );

    Ok(())
}

/// Approve a transaction as `owner`
pub fn cmd_approve(state: &mut AppState, owner: Address, tx_id: u64) -> CliResult<()> {
    let owner = state.authorize_owner(&owner, &Action::Approve { tx_id })?;
    let count = state.vault.wallet.approve(tx_id, owner)?;
    state.save()?;

    let quorum = state.vault.wallet.quorum();
    println!("✍️  Transaction {} approved by {}", tx_id, owner);
    println!("   Approvals: {}/{}", count, quorum);
    if count >= quorum {
        println!("   ✅ Quorum reached. Execute with: vault execute --tx {}", tx_id);
    }

    Ok(())
}

/// Withdraw an approval as `owner`
pub fn cmd_revoke(state: &mut AppState, owner: Address, tx_id: u64) -> CliResult<()> {
    let owner = state.authorize_owner(&owner, &Action::Revoke { tx_id })?;
    let count = state.vault.wallet.revoke(tx_id, owner)?;
    state.save()?;

    println!("↩️  Approval of transaction {} revoked by {}", tx_id, owner);
    println!("   Approvals: {}/{}", count, state.vault.wallet.quorum());

    Ok(())
}

/// Execute a transaction that has reached quorum
pub fn cmd_execute(state: &mut AppState, tx_id: u64) -> CliResult<()> {
    match state.vault.execute(tx_id) {
        Ok(returned) => {
            state.save()?;
            let tx = state.vault.wallet.transaction(tx_id)?;
            println!("🚀 Transaction {} executed!", tx_id);
            println!("   Forwarded {} to {}", tx.value(), tx.to());
            if !returned.is_empty() {
                println!("   Returned: 0x{}", hex::encode(&returned));
            }
            println!("   Vault balance: {}", state.vault.wallet.balance());
            Ok(())
        }
        Err(e) => {
            println!("❌ Execution failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_transaction(wallet: &MultisigWallet, tx_id: u64) -> CliResult<()> {
    let tx = wallet.transaction(tx_id)?;
    let status = wallet.status(tx_id)?;

    println!("📄 Transaction {}", tx_id);
    println!("   ├─ Status: {:?}", status);
    println!("   ├─ To: {}", tx.to());
    println!("   ├─ Value: {}", tx.value());
    if tx.data().is_empty() {
        println!("   ├─ Data: (none)");
    } else {
        println!("   ├─ Data: 0x{}", hex::encode(tx.data()));
    }
    println!("   ├─ Submitted by: {}", tx.submitted_by());
    println!(
        "   ├─ Submitted at: {}",
        tx.submitted_at().format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "   └─ Approvals: {}/{}",
        wallet.approvals_count(tx_id),
        wallet.quorum()
    );
    for approver in wallet.approvers(tx_id) {
        println!("      └─ {}", approver);
    }

    Ok(())
}

/// Display vault info
pub fn cmd_show(state: &AppState) -> CliResult<()> {
    let wallet = &state.vault.wallet;
    let stats = state.storage.stats()?;

    println!("🏦 Vault Info");
    if let Some(label) = wallet.label() {
        println!("   ├─ Label: {}", label);
    }
    println!("   ├─ Address: {}", wallet.address());
    println!("   ├─ Policy: {}", wallet.description());
    println!("   ├─ Balance: {}", wallet.balance());
    println!("   ├─ Transactions: {}", wallet.transaction_count());
    println!("   ├─ Events: {}", wallet.sequence());
    println!(
        "   ├─ Created: {}",
        wallet.created_at().format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "   ├─ Storage: {} bytes, {} backup(s)",
        stats.file_size, stats.backup_count
    );
    println!("   └─ Owners:");
    for owner in wallet.owners() {
        println!("      └─ {}", owner);
    }

    Ok(())
}

/// Display one transaction
pub fn cmd_tx(state: &AppState, tx_id: u64) -> CliResult<()> {
    print_transaction(&state.vault.wallet, tx_id)
}

/// List all transactions
pub fn cmd_txs(state: &AppState) -> CliResult<()> {
    let wallet = &state.vault.wallet;

    if wallet.transaction_count() == 0 {
        println!("📭 No transactions yet.");
        return Ok(());
    }

    println!("📋 Transactions:");
    for tx in wallet.transactions() {
        println!(
            "   #{} | {:?} | {} to {} | {}/{} approvals",
            tx.id(),
            wallet.status(tx.id())?,
            tx.value(),
            tx.to().short(),
            wallet.approvals_count(tx.id()),
            wallet.quorum()
        );
    }

    Ok(())
}

/// Display the event log from `since` onwards
pub fn cmd_events(state: &AppState, since: u64) -> CliResult<()> {
    let records = state.vault.wallet.events_since(since);

    if records.is_empty() {
        println!("📭 No events from sequence {}.", since);
        return Ok(());
    }

    println!("📜 Events:");
    for record in records {
        println!(
            "   #{} | {} | {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            serde_json::to_string(&record.event)?
        );
    }

    Ok(())
}

/// Display value received by forwarded-call targets
pub fn cmd_ledger(state: &AppState) -> CliResult<()> {
    let ledger = &state.vault.ledger;

    println!("📒 Ledger");
    if ledger.accounts().is_empty() {
        println!("   No value forwarded yet.");
    }
    for (target, balance) in ledger.accounts() {
        println!("   {} = {}", target, balance);
    }
    for target in ledger.rejecting() {
        println!("   🚫 {} rejects calls", target);
    }
    println!("   Receipts: {}", ledger.receipts().len());

    Ok(())
}

/// Make calls to `target` fail
pub fn cmd_target_reject(state: &mut AppState, target: Address) -> CliResult<()> {
    state.vault.ledger.reject(target);
    state.save()?;
    println!("🚫 Calls to {} will now be rejected", target);
    Ok(())
}

/// Let calls to `target` through again
pub fn cmd_target_accept(state: &mut AppState, target: Address) -> CliResult<()> {
    if state.vault.ledger.accept(&target) {
        state.save()?;
        println!("✅ Calls to {} will now be accepted", target);
    } else {
        println!("ℹ️  {} was not rejecting calls", target);
    }
    Ok(())
}

/// Check that the event log reproduces the stored state
pub fn cmd_verify(state: &AppState) -> CliResult<()> {
    println!("🔍 Replaying {} events...", state.vault.wallet.sequence());

    if state.vault.wallet.audit()? {
        println!("✅ Event log matches vault state!");
    } else {
        println!("❌ Event log does NOT match vault state!");
        println!("   The vault file may have been edited by hand.");
    }

    Ok(())
}

/// Export the vault to a file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.vault, path)?;
    println!("📦 Vault exported to {:?}", path);
    Ok(())
}

/// Import a vault from a file, replacing the current one
pub fn cmd_import(data_dir: &Path, path: &Path) -> CliResult<()> {
    // Loading replays the event log and rejects a vault that disagrees with it
    let vault = crate::storage::load_from_file(path)?;

    open_storage(data_dir)?.save(&vault)?;

    println!("📥 Vault imported from {:?}", path);
    println!("   Address: {}", vault.wallet.address());

    Ok(())
}

/// Restore the vault from one of the rotating backups
pub fn cmd_restore(state: &mut AppState, index: usize) -> CliResult<()> {
    let backups = state.storage.list_backups();
    if !backups.contains(&index) {
        println!("❌ Backup {} not found. Available: {:?}", index, backups);
        return Ok(());
    }

    state.vault = state.storage.restore_backup(index)?;
    state.save()?;

    println!("⏪ Restored backup {}", index);
    println!("   Events: {}", state.vault.wallet.sequence());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::TxStatus;

    fn setup(keys: usize, quorum: usize) -> (tempfile::TempDir, Vec<Address>) {
        let dir = tempfile::tempdir().unwrap();
        let store = open_signers(dir.path()).unwrap();
        let owners: Vec<Address> = (0..keys)
            .map(|_| store.create_signer(None).unwrap().address())
            .collect();

        cmd_init(dir.path(), owners.clone(), quorum, None, false).unwrap();
        (dir, owners)
    }

    #[test]
    fn test_key_import() {
        let dir = tempfile::tempdir().unwrap();
        let signer = Signer::new();

        cmd_key_import(dir.path(), &signer.private_key(), Some("cold".to_string())).unwrap();

        let loaded = open_signers(dir.path())
            .unwrap()
            .load_signer(&signer.address())
            .unwrap();
        assert_eq!(loaded.label.as_deref(), Some("cold"));
    }

    #[test]
    fn test_state_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_init_rejects_bad_policy() {
        let dir = tempfile::tempdir().unwrap();
        let owners = vec![Address::from_bytes([1; 20])];
        assert!(cmd_init(dir.path(), owners, 2, None, false).is_err());
        assert!(!open_storage(dir.path()).unwrap().exists());
    }

    #[test]
    fn test_full_flow() {
        let (dir, owners) = setup(3, 2);
        let target = Address::from_bytes([9; 20]);

        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        cmd_deposit(&mut state, target, 10).unwrap();
        cmd_submit(&mut state, owners[0], target, 4, vec![]).unwrap();
        cmd_approve(&mut state, owners[0], 0).unwrap();
        cmd_approve(&mut state, owners[2], 0).unwrap();
        cmd_execute(&mut state, 0).unwrap();

        // Reload from disk
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.vault.wallet.balance(), 6);
        assert_eq!(state.vault.wallet.status(0).unwrap(), TxStatus::Executed);
        assert_eq!(state.vault.received_by(&target), 4);
        assert!(state.vault.wallet.audit().unwrap());
    }

    #[test]
    fn test_owner_needs_key() {
        let (dir, _) = setup(2, 1);
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();

        // An owner whose key is not in the store cannot act
        let stranger = Address::from_bytes([7; 20]);
        assert!(cmd_submit(&mut state, stranger, stranger, 0, vec![]).is_err());
        assert_eq!(state.vault.wallet.transaction_count(), 0);
    }

    #[test]
    fn test_rejected_target_then_retry() {
        let (dir, owners) = setup(1, 1);
        let target = Address::from_bytes([9; 20]);
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();

        cmd_target_reject(&mut state, target).unwrap();
        cmd_submit(&mut state, owners[0], target, 0, vec![]).unwrap();
        cmd_approve(&mut state, owners[0], 0).unwrap();
        assert!(cmd_execute(&mut state, 0).is_err());
        assert!(state.vault.wallet.is_executable(0));

        cmd_target_accept(&mut state, target).unwrap();
        cmd_execute(&mut state, 0).unwrap();
        assert!(cmd_execute(&mut state, 0).is_err());
    }

    #[test]
    fn test_export_import_restore() {
        let (dir, _) = setup(2, 2);
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        cmd_deposit(&mut state, Address::from_bytes([5; 20]), 3).unwrap();

        let export = dir.path().join("export.json");
        cmd_export(&state, &export).unwrap();

        cmd_deposit(&mut state, Address::from_bytes([5; 20]), 4).unwrap();
        assert_eq!(state.vault.wallet.balance(), 7);

        cmd_restore(&mut state, 0).unwrap();
        assert_eq!(state.vault.wallet.balance(), 3);

        cmd_import(dir.path(), &export).unwrap();
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.vault.wallet.balance(), 3);
    }

    #[test]
    fn test_import_rejects_edited_vault() {
        let (dir, _) = setup(2, 1);
        let mut state = AppState::new(dir.path().to_path_buf()).unwrap();
        cmd_deposit(&mut state, Address::from_bytes([5; 20]), 3).unwrap();

        let export = dir.path().join("export.json");
        cmd_export(&state, &export).unwrap();
        let mut edited: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
        edited["wallet"]["balance"] = serde_json::json!(1000);
        std::fs::write(&export, edited.to_string()).unwrap();

        assert!(cmd_import(dir.path(), &export).is_err());
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.vault.wallet.balance(), 3);
    }
}
