use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A voter's signing identity: an ECDSA P-256 key pair kept in PKCS#8 form.
///
/// Ballot outputs are locked with `hash_pub_key(public_key)`, so the wallet
/// only ever hands out the key pair bytes and the raw public key.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        let public_key = crate::utils::ecdsa_p256_public_key(pkcs8.as_slice())?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    pub fn get_pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(self.public_key.as_slice())
    }
}

/// SHA-256 followed by RIPEMD-160, the hash outputs are locked with.
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = crate::utils::sha256_digest(pub_key);
    crate::utils::ripemd160_digest(pub_key_sha256.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_keys_are_distinct() {
        let a = Wallet::new().unwrap();
        let b = Wallet::new().unwrap();
        assert_ne!(a.get_public_key(), b.get_public_key());
        assert_ne!(a.get_pub_key_hash(), b.get_pub_key_hash());
    }

    #[test]
    fn test_pub_key_hash_is_stable() {
        let wallet = Wallet::new().unwrap();
        assert_eq!(wallet.get_pub_key_hash(), wallet.get_pub_key_hash());
        assert_eq!(wallet.get_pub_key_hash().len(), 20);
    }
}
