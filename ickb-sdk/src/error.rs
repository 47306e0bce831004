use ckb_types::H256;
use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("Input cell must have both block hash and block number populated: {0}")]
    MissingLocationMetadata(String),

    #[error("Input cell is queued twice: {0}")]
    DuplicateInput(String),

    #[error("Transaction {0} are already populated")]
    AlreadyPopulated(&'static str),

    #[error("Transaction {0} are not populated yet")]
    NotPopulated(&'static str),

    #[error("Comparing two undefined scripts")]
    UndefinedScripts,

    #[error("Not a NervosDAO deposit cell")]
    NotADeposit,

    #[error("Not a NervosDAO withdrawal request cell")]
    NotAWithdrawalRequest,

    #[error("Block hash {0:#x} not found in header deps")]
    HeaderDepNotFound(H256),

    #[error("Invalid cell data: {0}")]
    InvalidCellData(String),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("Deposit amount is {amount}, but should be at least {minimum}")]
    InsufficientDeposit { amount: u64, minimum: u64 },

    #[error("Not enough funds to execute the transaction, ckb delta: {ckb_delta}, ickb delta: {ickb_delta}")]
    InsufficientFunds { ckb_delta: i128, ickb_delta: i128 },

    #[error("Deposit not found")]
    DepositNotFound,

    #[error("Withdrawal request not found")]
    WithdrawalNotFound,

    #[error("Owner cell not found")]
    OwnerCellNotFound,

    #[error("Header not found from block hash {0:#x}")]
    HeaderNotFound(H256),

    #[error("Block hash not found from block number {0}")]
    BlockHashNotFound(u64),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected transaction state: {0}")]
    UnexpectedTxStatus(String),

    #[error("Transaction {tx_hash:#x} not committed after {attempts} attempts")]
    CommitTimeout { tx_hash: H256, attempts: u32 },

    #[error("Invalid cell query: {0}")]
    InvalidQuery(String),

    #[error("Signer error: {0}")]
    Signer(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Rpc(format!("invalid response: {}", err))
    }
}
