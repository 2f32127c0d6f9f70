// Ballot transactions over a UTXO model. A transaction carries the ballot
// payload, inputs that reference prior outputs, and outputs locked to a
// public-key hash. Signing follows the trimmed-copy discipline: every input
// is signed over a copy whose input credentials are replaced by the
// referenced output's public-key hash.

use crate::error::{ChainError, Result};
use crate::utils::{
    deserialize, ecdsa_p256_public_key, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, serialize, sha256_digest,
};
use crate::wallet::hash_pub_key;
use data_encoding::HEXLOWER;
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ballot a voter casts: who they are and who they vote for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Ballot {
    voter_name: String,
    voter_id: String,
    candidate: String,
}

impl Ballot {
    pub fn new(voter_name: &str, voter_id: &str, candidate: &str) -> Ballot {
        Ballot {
            voter_name: voter_name.to_string(),
            voter_id: voter_id.to_string(),
            candidate: candidate.to_string(),
        }
    }

    pub fn get_voter_name(&self) -> &str {
        self.voter_name.as_str()
    }

    pub fn get_voter_id(&self) -> &str {
        self.voter_id.as_str()
    }

    pub fn get_candidate(&self) -> &str {
        self.candidate.as_str()
    }
}

/// A reference to an output of a prior transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxInput {
    txid: Vec<u8>,
    vout: usize,
    signature: Vec<u8>,
    pub_key: Vec<u8>,
}

impl TxInput {
    pub fn new(txid: &[u8], vout: usize) -> TxInput {
        TxInput {
            txid: txid.to_vec(),
            vout,
            signature: vec![],
            pub_key: vec![],
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> usize {
        self.vout
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }
}

/// A spendable output locked to a public-key hash.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, pub_key_hash: &[u8]) -> TxOutput {
        TxOutput {
            value,
            pub_key_hash: pub_key_hash.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

/// A signed ballot transaction.
///
/// `id` is the content hash of the transaction with every signing field
/// zeroed, so it is the same before and after signing. The top-level
/// `(signature, pub_key)` pair is the authorship credential over `id`;
/// the per-input signatures prove ownership of the referenced outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    data: Ballot,
    vin: Vec<TxInput>,
    vout: Vec<TxOutput>,
    signature: Vec<u8>,
    pub_key: Vec<u8>,
}

impl Transaction {
    /// Build an unsigned ballot transaction and compute its id.
    pub fn new_ballot(data: Ballot, vin: Vec<TxInput>, vout: Vec<TxOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            data,
            vin,
            vout,
            signature: vec![],
            pub_key: vec![],
        };
        tx.id = tx.canonical_hash()?;
        Ok(tx)
    }

    // Copy with all input credentials stripped; the shape signatures are
    // computed over.
    fn trimmed_copy(&self) -> Transaction {
        let mut inputs = vec![];
        for input in &self.vin {
            inputs.push(TxInput::new(input.get_txid(), input.get_vout()));
        }
        Transaction {
            id: self.id.clone(),
            data: self.data.clone(),
            vin: inputs,
            vout: self.vout.clone(),
            signature: vec![],
            pub_key: vec![],
        }
    }

    // Hash of the serialized transaction with id and top-level credentials
    // cleared. Input fields are hashed as they currently stand.
    fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            data: self.data.clone(),
            vin: self.vin.clone(),
            vout: self.vout.clone(),
            signature: vec![],
            pub_key: vec![],
        };
        Ok(sha256_digest(tx_copy.serialize()?.as_slice()))
    }

    // The id every party can recompute: signing fields zeroed everywhere.
    fn canonical_hash(&self) -> Result<Vec<u8>> {
        self.trimmed_copy().hash()
    }

    /// Sign the transaction with a PKCS#8 key pair.
    ///
    /// `prev_txs` maps hex-encoded ids to the transactions whose outputs the
    /// inputs reference. A missing entry is a caller bug and fails hard.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &HashMap<String, Transaction>) -> Result<()> {
        let pub_key = ecdsa_p256_public_key(pkcs8)?;
        let mut tx_copy = self.trimmed_copy();

        for (idx, vin) in self.vin.iter_mut().enumerate() {
            let txid_hex = HEXLOWER.encode(vin.get_txid());
            let prev_tx = prev_txs.get(txid_hex.as_str()).ok_or_else(|| {
                ChainError::Transaction(format!("referenced transaction {txid_hex} not found"))
            })?;
            if vin.vout >= prev_tx.vout.len() {
                return Err(ChainError::Transaction(format!(
                    "referenced output {}:{} does not exist",
                    txid_hex, vin.vout
                )));
            }

            tx_copy.vin[idx].signature = vec![];
            tx_copy.vin[idx].pub_key = prev_tx.vout[vin.vout].pub_key_hash.clone();
            tx_copy.id = tx_copy.hash()?;
            tx_copy.vin[idx].pub_key = vec![];

            vin.signature = ecdsa_p256_sha256_sign_digest(pkcs8, tx_copy.id.as_slice())?;
            vin.pub_key = pub_key.clone();
        }

        // Authorship credential over the transaction id.
        self.id = self.canonical_hash()?;
        self.signature = ecdsa_p256_sha256_sign_digest(pkcs8, self.id.as_slice())?;
        self.pub_key = pub_key;
        Ok(())
    }

    /// Verify every input signature and the top-level credential.
    ///
    /// Returns false when any signature fails, when the id does not match
    /// the transaction contents, or when an input references a transaction
    /// absent from `prev_txs`.
    pub fn verify(&self, prev_txs: &HashMap<String, Transaction>) -> bool {
        let mut tx_copy = self.trimmed_copy();

        for (idx, vin) in self.vin.iter().enumerate() {
            let txid_hex = HEXLOWER.encode(vin.get_txid());
            let prev_tx = match prev_txs.get(txid_hex.as_str()) {
                Some(tx) => tx,
                None => {
                    error!("Referenced transaction {txid_hex} not found during verification");
                    return false;
                }
            };
            if vin.vout >= prev_tx.vout.len() {
                error!("Invalid output index during verification");
                return false;
            }

            // The input's key must actually own the referenced output.
            let locking_hash = hash_pub_key(vin.pub_key.as_slice());
            if !prev_tx.vout[vin.vout].is_locked_with_key(locking_hash.as_slice()) {
                return false;
            }

            tx_copy.vin[idx].signature = vec![];
            tx_copy.vin[idx].pub_key = prev_tx.vout[vin.vout].pub_key_hash.clone();
            tx_copy.id = match tx_copy.hash() {
                Ok(hash) => hash,
                Err(e) => {
                    error!("Unable to hash transaction during verification: {e}");
                    return false;
                }
            };
            tx_copy.vin[idx].pub_key = vec![];

            if !ecdsa_p256_sha256_sign_verify(
                vin.pub_key.as_slice(),
                vin.signature.as_slice(),
                tx_copy.id.as_slice(),
            ) {
                return false;
            }
        }

        // The id must still match the contents it claims to cover.
        let canonical = match self.canonical_hash() {
            Ok(hash) => hash,
            Err(e) => {
                error!("Unable to hash transaction during verification: {e}");
                return false;
            }
        };
        if canonical != self.id {
            return false;
        }

        ecdsa_p256_sha256_sign_verify(
            self.pub_key.as_slice(),
            self.signature.as_slice(),
            self.id.as_slice(),
        )
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_id_bytes(&self) -> Vec<u8> {
        self.id.clone()
    }

    pub fn get_data(&self) -> &Ballot {
        &self.data
    }

    pub fn get_vin(&self) -> &[TxInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TxOutput] {
        self.vout.as_slice()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    /// Rewrite the ballot payload (for testing only)
    #[cfg(test)]
    pub fn set_data_for_test(&mut self, data: Ballot) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{hash_pub_key, Wallet};

    fn ballot(name: &str, candidate: &str) -> Ballot {
        Ballot::new(name, "11112222", candidate)
    }

    // A transaction whose single output is locked to `wallet`, acting as a
    // voting token the next ballot can spend.
    fn token_tx(wallet: &Wallet) -> Transaction {
        let pkh = hash_pub_key(wallet.get_public_key());
        Transaction::new_ballot(
            ballot("registrar", "none"),
            vec![],
            vec![TxOutput::new(1, pkh.as_slice())],
        )
        .unwrap()
    }

    fn prev_map(txs: &[&Transaction]) -> HashMap<String, Transaction> {
        txs.iter()
            .map(|tx| (HEXLOWER.encode(tx.get_id()), (*tx).clone()))
            .collect()
    }

    #[test]
    fn test_id_is_stable_across_signing() {
        let wallet = Wallet::new().unwrap();
        let token = token_tx(&wallet);

        let mut tx = Transaction::new_ballot(
            ballot("alice", "candidate-a"),
            vec![TxInput::new(token.get_id(), 0)],
            vec![TxOutput::new(1, wallet.get_pub_key_hash().as_slice())],
        )
        .unwrap();
        let id_before = tx.get_id_bytes();

        tx.sign(wallet.get_pkcs8(), &prev_map(&[&token])).unwrap();
        assert_eq!(tx.get_id(), id_before.as_slice());
    }

    #[test]
    fn test_sign_then_verify() {
        let wallet = Wallet::new().unwrap();
        let token = token_tx(&wallet);
        let prev = prev_map(&[&token]);

        let mut tx = Transaction::new_ballot(
            ballot("alice", "candidate-a"),
            vec![TxInput::new(token.get_id(), 0)],
            vec![TxOutput::new(1, wallet.get_pub_key_hash().as_slice())],
        )
        .unwrap();
        tx.sign(wallet.get_pkcs8(), &prev).unwrap();

        assert!(tx.verify(&prev));
    }

    #[test]
    fn test_verify_rejects_tampered_ballot() {
        let wallet = Wallet::new().unwrap();
        let token = token_tx(&wallet);
        let prev = prev_map(&[&token]);

        let mut tx = Transaction::new_ballot(
            ballot("alice", "candidate-a"),
            vec![TxInput::new(token.get_id(), 0)],
            vec![TxOutput::new(1, wallet.get_pub_key_hash().as_slice())],
        )
        .unwrap();
        tx.sign(wallet.get_pkcs8(), &prev).unwrap();

        tx.set_data_for_test(ballot("alice", "candidate-b"));
        assert!(!tx.verify(&prev));
    }

    #[test]
    fn test_verify_rejects_missing_prev_tx() {
        let wallet = Wallet::new().unwrap();
        let token = token_tx(&wallet);
        let prev = prev_map(&[&token]);

        let mut tx = Transaction::new_ballot(
            ballot("alice", "candidate-a"),
            vec![TxInput::new(token.get_id(), 0)],
            vec![],
        )
        .unwrap();
        tx.sign(wallet.get_pkcs8(), &prev).unwrap();

        assert!(!tx.verify(&HashMap::new()));
    }

    #[test]
    fn test_sign_fails_on_missing_prev_tx() {
        let wallet = Wallet::new().unwrap();
        let mut tx = Transaction::new_ballot(
            ballot("alice", "candidate-a"),
            vec![TxInput::new(&[0xAA; 32], 0)],
            vec![],
        )
        .unwrap();

        assert!(tx.sign(wallet.get_pkcs8(), &HashMap::new()).is_err());
    }

    #[test]
    fn test_inputless_ballot_still_authenticated() {
        let wallet = Wallet::new().unwrap();
        let prev = HashMap::new();

        let mut tx =
            Transaction::new_ballot(ballot("bob", "candidate-b"), vec![], vec![]).unwrap();
        tx.sign(wallet.get_pkcs8(), &prev).unwrap();
        assert!(tx.verify(&prev));

        tx.set_data_for_test(ballot("bob", "candidate-a"));
        assert!(!tx.verify(&prev));
    }

    #[test]
    fn test_transaction_serialization_roundtrip() {
        let wallet = Wallet::new().unwrap();
        let mut tx =
            Transaction::new_ballot(ballot("carol", "candidate-c"), vec![], vec![]).unwrap();
        tx.sign(wallet.get_pkcs8(), &HashMap::new()).unwrap();

        let bytes = tx.serialize().unwrap();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded.get_id(), tx.get_id());
        assert_eq!(decoded.get_signature(), tx.get_signature());
        assert!(decoded.verify(&HashMap::new()));
    }
}
