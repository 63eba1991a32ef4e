//! Owner registry
//!
//! The set of principals allowed to submit, approve and revoke. Fixed at
//! construction and validated again whenever it is deserialized.

use crate::crypto::Address;
use crate::multisig::error::MultisigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable set of wallet owners
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct OwnerRegistry {
    /// Owners in the order they were supplied
    owners: Vec<Address>,
    /// Membership index
    index: HashSet<Address>,
}

impl OwnerRegistry {
    /// Build a registry from a list of owners
    ///
    /// # Errors
    /// Fails if the list is empty, contains the zero address, or repeats an owner.
    pub fn new(owners: Vec<Address>) -> Result<Self, MultisigError> {
        if owners.is_empty() {
            return Err(MultisigError::NoOwners);
        }

        let mut index = HashSet::with_capacity(owners.len());
        for owner in &owners {
            if owner.is_zero() {
                return Err(MultisigError::ZeroOwner);
            }
            if !index.insert(*owner) {
                return Err(MultisigError::DuplicateOwner(*owner));
            }
        }

        Ok(Self { owners, index })
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.index.contains(address)
    }

    /// Owners in construction order
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl TryFrom<Vec<Address>> for OwnerRegistry {
    type Error = MultisigError;

    fn try_from(owners: Vec<Address>) -> Result<Self, Self::Error> {
        Self::new(owners)
    }
}

impl From<OwnerRegistry> for Vec<Address> {
    fn from(registry: OwnerRegistry) -> Self {
        registry.owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_membership() {
        let registry = OwnerRegistry::new(vec![addr(1), addr(2), addr(3)]).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.is_owner(&addr(1)));
        assert!(registry.is_owner(&addr(3)));
        assert!(!registry.is_owner(&addr(4)));
        assert!(!registry.is_owner(&Address::ZERO));
        assert_eq!(registry.owners(), &[addr(1), addr(2), addr(3)]);
    }

    #[test]
    fn test_validation() {
        assert_eq!(OwnerRegistry::new(vec![]), Err(MultisigError::NoOwners));
        assert_eq!(
            OwnerRegistry::new(vec![addr(1), Address::ZERO]),
            Err(MultisigError::ZeroOwner)
        );
        assert_eq!(
            OwnerRegistry::new(vec![addr(1), addr(2), addr(1)]),
            Err(MultisigError::DuplicateOwner(addr(1)))
        );
    }

    #[test]
    fn test_single_owner_allowed() {
        let registry = OwnerRegistry::new(vec![addr(9)]).unwrap();
        assert!(registry.is_owner(&addr(9)));
    }

    #[test]
    fn test_deserialize_revalidates() {
        let registry = OwnerRegistry::new(vec![addr(1), addr(2)]).unwrap();
        let json = serde_json::to_string(&registry).unwrap();
        let back: OwnerRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registry);

        let duplicated = format!("[\"{}\",\"{}\"]", addr(1), addr(1));
        assert!(serde_json::from_str::<OwnerRegistry>(&duplicated).is_err());
        assert!(serde_json::from_str::<OwnerRegistry>("[]").is_err());
    }
}
