//! Signed owner actions
//!
//! Remote callers prove they control an owner key by signing a digest of
//! the action bound to the wallet address and the wallet's current event
//! sequence. Any state transition moves the sequence on, so a signature
//! authorizes exactly one action against exactly one state.

use crate::crypto::{public_key_from_hex, sha256, verify_signature, Address, KeyError, KeyPair};
use crate::multisig::wallet::MultisigWallet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DOMAIN: &[u8] = b"multisig-vault/action/v1";

/// Authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Signature is not valid hex")]
    MalformedSignature,
    #[error("Signature does not match the action")]
    BadSignature,
    #[error("Key error: {0}")]
    KeyError(#[from] KeyError),
}

/// An owner-gated operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Submit {
        to: Address,
        value: u64,
        #[serde(with = "hex::serde")]
        data: Vec<u8>,
    },
    Approve {
        tx_id: u64,
    },
    Revoke {
        tx_id: u64,
    },
}

impl Action {
    /// Digest an owner signs to authorize this action
    pub fn digest(&self, wallet: &Address, sequence: u64) -> Vec<u8> {
        let mut buf = DOMAIN.to_vec();
        buf.extend_from_slice(wallet.as_bytes());

        match self {
            Action::Submit { to, value, data } => {
                buf.push(0);
                buf.extend_from_slice(to.as_bytes());
                buf.extend_from_slice(&value.to_be_bytes());
                buf.extend_from_slice(&(data.len() as u64).to_be_bytes());
                buf.extend_from_slice(data);
            }
            Action::Approve { tx_id } => {
                buf.push(1);
                buf.extend_from_slice(&tx_id.to_be_bytes());
            }
            Action::Revoke { tx_id } => {
                buf.push(2);
                buf.extend_from_slice(&tx_id.to_be_bytes());
            }
        }

        buf.extend_from_slice(&sequence.to_be_bytes());
        sha256(&buf)
    }
}

/// Public key and signature accompanying an action
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Authorization {
    /// Compressed public key (hex)
    pub public_key: String,
    /// Compact ECDSA signature (hex)
    pub signature: String,
}

impl Authorization {
    /// Sign `action` for the wallet's current state
    pub fn sign(
        key_pair: &KeyPair,
        action: &Action,
        wallet: &Address,
        sequence: u64,
    ) -> Result<Self, AuthError> {
        let signature = key_pair.sign(&action.digest(wallet, sequence))?;
        Ok(Self {
            public_key: key_pair.public_key_hex(),
            signature: hex::encode(signature),
        })
    }

    /// Check the signature and return the signer's address
    pub fn verify(
        &self,
        action: &Action,
        wallet: &Address,
        sequence: u64,
    ) -> Result<Address, AuthError> {
        let public_key = public_key_from_hex(&self.public_key)?;
        let signature = hex::decode(&self.signature).map_err(|_| AuthError::MalformedSignature)?;

        if !verify_signature(&public_key, &action.digest(wallet, sequence), &signature)? {
            return Err(AuthError::BadSignature);
        }
        Ok(Address::from_public_key(&public_key))
    }
}

/// Verify `auth` against the wallet as it is now
pub fn authorize(
    wallet: &MultisigWallet,
    action: &Action,
    auth: &Authorization,
) -> Result<Address, AuthError> {
    auth.verify(action, &wallet.address(), wallet.sequence())
}
