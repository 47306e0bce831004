mod error;
mod signer;

pub use error::Error;
pub use signer::{blake160, sighash_all_message, PrivkeySigner};
