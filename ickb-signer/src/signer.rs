use ckb_hash::{blake2b_256, new_blake2b};
use ckb_types::{
    bytes::Bytes,
    core::TransactionView,
    packed::{Script, WitnessArgs},
    prelude::*,
    H160, H256,
};
use ickb_sdk::{
    assembler::{UnsignedTransaction, SIGNATURE_PLACEHOLDER_LEN},
    config::ScriptConfig,
    TransactionSigner,
};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::error::Error;

pub fn blake160(message: &[u8]) -> H160 {
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&blake2b_256(message)[0..20]);
    H160(hash)
}

/// Sighash-all message of the group formed by `group` input indexes.
///
/// The lock of the first group witness is zeroed, then every witness of the
/// group and every witness without input is hashed length prefixed.
pub fn sighash_all_message(tx: &TransactionView, group: &[usize]) -> Result<H256, Error> {
    let first = *group.first().ok_or(Error::LockGroupNotFound)?;
    let witnesses = tx.witnesses();
    let witness_bytes = |index: usize| -> Result<Bytes, Error> {
        witnesses
            .get(index)
            .map(|witness| witness.raw_data())
            .ok_or_else(|| Error::InvalidWitness(format!("missing witness {}", index)))
    };

    let first_witness = WitnessArgs::from_slice(&witness_bytes(first)?)
        .map_err(|err| Error::InvalidWitness(err.to_string()))?;
    let zero_lock = Bytes::from(vec![0u8; SIGNATURE_PLACEHOLDER_LEN]);
    let first_witness = first_witness
        .as_builder()
        .lock(Some(zero_lock).pack())
        .build()
        .as_bytes();

    let mut blake2b = new_blake2b();
    blake2b.update(tx.hash().as_slice());
    blake2b.update(&(first_witness.len() as u64).to_le_bytes());
    blake2b.update(&first_witness);
    for index in group.iter().skip(1) {
        let witness = witness_bytes(*index)?;
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(&witness);
    }
    for index in tx.inputs().len()..witnesses.len() {
        let witness = witness_bytes(index)?;
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(&witness);
    }
    let mut message = [0u8; 32];
    blake2b.finalize(&mut message);
    Ok(H256(message))
}

/// Signs the secp256k1 blake160 lock of a single private key
pub struct PrivkeySigner {
    secp: Secp256k1<All>,
    privkey: SecretKey,
    pubkey_hash: H160,
}

impl PrivkeySigner {
    pub fn new(privkey: SecretKey) -> PrivkeySigner {
        let secp = Secp256k1::new();
        let pubkey = PublicKey::from_secret_key(&secp, &privkey);
        let pubkey_hash = blake160(&pubkey.serialize());
        PrivkeySigner {
            secp,
            privkey,
            pubkey_hash,
        }
    }

    /// Hex encoded key, with or without the `0x` prefix
    pub fn from_hex(input: &str) -> Result<PrivkeySigner, Error> {
        let input = input.trim();
        let input = input.strip_prefix("0x").unwrap_or(input);
        let mut data = [0u8; 32];
        if input.len() != data.len() * 2 {
            return Err(Error::InvalidSecpSecret(format!(
                "expected 64 hex chars, got {}",
                input.len()
            )));
        }
        faster_hex::hex_decode(input.as_bytes(), &mut data)
            .map_err(|err| Error::InvalidSecpSecret(err.to_string()))?;
        SecretKey::from_slice(&data)
            .map(PrivkeySigner::new)
            .map_err(|err| Error::InvalidSecpSecret(err.to_string()))
    }

    pub fn pubkey_hash(&self) -> &H160 {
        &self.pubkey_hash
    }

    pub fn lock_script(&self, config: &ScriptConfig) -> Script {
        config
            .secp256k1_blake160
            .script_id
            .to_script(Bytes::from(self.pubkey_hash.as_bytes().to_vec()))
    }

    fn sign_message(&self, message: &H256) -> Result<[u8; SIGNATURE_PLACEHOLDER_LEN], Error> {
        let message = Message::from_digest_slice(message.as_bytes())
            .map_err(|err| Error::Sign(err.to_string()))?;
        let signature = self.secp.sign_ecdsa_recoverable(&message, &self.privkey);
        let (recov_id, data) = signature.serialize_compact();
        let mut signature_bytes = [0u8; SIGNATURE_PLACEHOLDER_LEN];
        signature_bytes[0..64].copy_from_slice(&data[0..64]);
        signature_bytes[64] = recov_id.to_i32() as u8;
        Ok(signature_bytes)
    }

    pub fn sign_transaction(
        &self,
        tx: &UnsignedTransaction,
        lock: &Script,
    ) -> Result<TransactionView, Error> {
        if lock.args().raw_data().as_ref() != self.pubkey_hash.as_bytes() {
            return Err(Error::LockMismatch);
        }
        let group = tx
            .input_cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| &cell.lock() == lock)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let message = sighash_all_message(&tx.transaction, &group)?;
        let signature = self.sign_message(&message)?;
        log::debug!("Signed {} inputs of lock {:#x}", group.len(), self.pubkey_hash);

        let first = group[0];
        let mut witnesses = tx.transaction.witnesses().into_iter().collect::<Vec<_>>();
        let witness = WitnessArgs::from_slice(&witnesses[first].raw_data())
            .map_err(|err| Error::InvalidWitness(err.to_string()))?
            .as_builder()
            .lock(Some(Bytes::from(signature.to_vec())).pack())
            .build();
        witnesses[first] = witness.as_bytes().pack();
        Ok(tx
            .transaction
            .as_advanced_builder()
            .set_witnesses(witnesses)
            .build())
    }
}

impl TransactionSigner for PrivkeySigner {
    fn sign(
        &self,
        tx: &UnsignedTransaction,
        lock: &Script,
    ) -> Result<TransactionView, ickb_sdk::Error> {
        Ok(self.sign_transaction(tx, lock)?)
    }
}
