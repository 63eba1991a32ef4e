//! Owner signing keys
//!
//! A signer holds the secret key of one vault owner and produces the
//! authorizations that owner-gated actions require.

use crate::crypto::{Address, KeyPair};
use crate::multisig::{Action, AuthError, Authorization, MultisigWallet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Signer-related errors
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("No key stored for {0}")]
    NotFound(Address),
    #[error("Key file belongs to {found}, expected {expected}")]
    AddressMismatch { expected: Address, found: Address },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
    #[error("Authorization error: {0}")]
    AuthError(#[from] AuthError),
}

/// Serializable signer data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct SignerData {
    private_key_hex: String,
    address: Address,
    label: Option<String>,
}

/// An owner key able to authorize vault actions
pub struct Signer {
    key_pair: KeyPair,
    /// Optional label for the signer
    pub label: Option<String>,
}

impl Signer {
    /// Create a new signer with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: None,
        }
    }

    /// Create a signer with a label
    pub fn with_label(label: &str) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: Some(label.to_string()),
        }
    }

    /// Import a signer from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, SignerError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        Ok(Self {
            key_pair,
            label: None,
        })
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    /// Get the signer's public key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the signer's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Authorize `action` against the wallet's current state
    pub fn authorize(
        &self,
        wallet: &MultisigWallet,
        action: &Action,
    ) -> Result<Authorization, SignerError> {
        Ok(Authorization::sign(
            &self.key_pair,
            action,
            &wallet.address(),
            wallet.sequence(),
        )?)
    }

    /// Save signer to file
    pub fn save(&self, path: &Path) -> Result<(), SignerError> {
        let data = SignerData {
            private_key_hex: self.private_key(),
            address: self.address(),
            label: self.label.clone(),
        };

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load signer from file
    pub fn load(path: &Path) -> Result<Self, SignerError> {
        let json = fs::read_to_string(path)?;
        let data: SignerData = serde_json::from_str(&json)?;

        let mut signer = Self::from_private_key(&data.private_key_hex)?;
        if signer.address() != data.address {
            return Err(SignerError::AddressMismatch {
                expected: data.address,
                found: signer.address(),
            });
        }
        signer.label = data.label;
        Ok(signer)
    }

    /// Export signer info (without private key)
    pub fn export_public_info(&self) -> SignerInfo {
        SignerInfo {
            address: self.address(),
            public_key: self.public_key(),
            label: self.label.clone(),
        }
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

/// Public signer information (safe to share)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerInfo {
    pub address: Address,
    pub public_key: String,
    pub label: Option<String>,
}

/// Directory of signer key files, one `<address>.json` per key
pub struct SignerStore {
    keys_dir: PathBuf,
}

impl SignerStore {
    /// Open a signer store, creating the directory if needed
    pub fn new(keys_dir: &Path) -> Result<Self, SignerError> {
        fs::create_dir_all(keys_dir)?;
        Ok(Self {
            keys_dir: keys_dir.to_path_buf(),
        })
    }

    fn key_path(&self, address: &Address) -> PathBuf {
        self.keys_dir.join(format!("{}.json", address))
    }

    /// Create and save a new signer
    pub fn create_signer(&self, label: Option<&str>) -> Result<Signer, SignerError> {
        let signer = match label {
            Some(l) => Signer::with_label(l),
            None => Signer::new(),
        };

        signer.save(&self.key_path(&signer.address()))?;
        log::info!("Created signer {}", signer.address());
        Ok(signer)
    }

    /// Save an existing signer into the store
    pub fn import_signer(&self, signer: &Signer) -> Result<(), SignerError> {
        signer.save(&self.key_path(&signer.address()))
    }

    /// List all signers, sorted by address
    pub fn list_signers(&self) -> Result<Vec<SignerInfo>, SignerError> {
        let mut signers = Vec::new();

        for entry in fs::read_dir(&self.keys_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Signer::load(&path) {
                    Ok(signer) => signers.push(signer.export_public_info()),
                    Err(e) => log::warn!("Skipping key file {:?}: {}", path, e),
                }
            }
        }

        signers.sort_by_key(|info| info.address);
        Ok(signers)
    }

    /// Load a specific signer by address
    pub fn load_signer(&self, address: &Address) -> Result<Signer, SignerError> {
        let path = self.key_path(address);
        if !path.exists() {
            return Err(SignerError::NotFound(*address));
        }

        let signer = Signer::load(&path)?;
        if signer.address() != *address {
            return Err(SignerError::AddressMismatch {
                expected: *address,
                found: signer.address(),
            });
        }
        Ok(signer)
    }

    /// Delete a signer
    pub fn delete_signer(&self, address: &Address) -> Result<(), SignerError> {
        let path = self.key_path(address);
        if !path.exists() {
            return Err(SignerError::NotFound(*address));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::{authorize, MultisigConfig};

    #[test]
    fn test_signer_creation() {
        let signer = Signer::new();
        assert!(!signer.address().is_zero());
        assert_eq!(signer.public_key().len(), 66);
        assert_eq!(signer.private_key().len(), 64);
    }

    #[test]
    fn test_signer_import() {
        let signer1 = Signer::new();
        let private_key = signer1.private_key();

        let signer2 = Signer::from_private_key(&private_key).unwrap();
        assert_eq!(signer1.address(), signer2.address());
    }

    #[test]
    fn test_signer_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test_signer.json");

        let signer1 = Signer::with_label("Treasurer");
        signer1.save(&path).unwrap();

        let signer2 = Signer::load(&path).unwrap();
        assert_eq!(signer1.address(), signer2.address());
        assert_eq!(signer1.label, signer2.label);
    }

    #[test]
    fn test_store_create_list_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SignerStore::new(&temp_dir.path().join("keys")).unwrap();

        let a = store.create_signer(Some("alice")).unwrap();
        let b = store.create_signer(None).unwrap();

        let listed = store.list_signers().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.windows(2).all(|w| w[0].address < w[1].address));
        assert!(listed.iter().any(|info| info.address == a.address()));

        let loaded = store.load_signer(&b.address()).unwrap();
        assert_eq!(loaded.private_key(), b.private_key());

        store.delete_signer(&b.address()).unwrap();
        assert!(matches!(
            store.load_signer(&b.address()),
            Err(SignerError::NotFound(_))
        ));
    }

    #[test]
    fn test_signer_authorizes_owner_action() {
        let signer = Signer::new();
        let config = MultisigConfig::new(vec![signer.address()], 1, None).unwrap();
        let wallet = MultisigWallet::new(config).unwrap();
        let action = Action::Approve { tx_id: 0 };

        let auth = signer.authorize(&wallet, &action).unwrap();
        assert_eq!(authorize(&wallet, &action, &auth).unwrap(), signer.address());
    }
}
