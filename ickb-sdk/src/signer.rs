use ckb_types::{core::TransactionView, packed::Script};

use crate::assembler::UnsignedTransaction;
use crate::error::Error;

/// The signing collaborator.
///
/// Fills the witness lock placeholders of the `lock` group, the signature
/// must keep the placeholder length.
pub trait TransactionSigner: Send + Sync {
    fn sign(&self, tx: &UnsignedTransaction, lock: &Script) -> Result<TransactionView, Error>;
}
