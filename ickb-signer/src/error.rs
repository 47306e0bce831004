use thiserror::Error;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("Invalid secp256k1 secret key: {0}")]
    InvalidSecpSecret(String),

    #[error("Lock script args do not match the key")]
    LockMismatch,

    #[error("No input is locked by the signing lock")]
    LockGroupNotFound,

    #[error("Invalid witness: {0}")]
    InvalidWitness(String),

    #[error("Sign failed: {0}")]
    Sign(String),
}

impl From<Error> for ickb_sdk::Error {
    fn from(err: Error) -> ickb_sdk::Error {
        ickb_sdk::Error::Signer(err.to_string())
    }
}
