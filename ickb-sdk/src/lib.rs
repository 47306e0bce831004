//! Transaction construction for iCKB deposits and withdrawals on top of the
//! NervosDAO.

pub mod assembler;
pub mod builder;
pub mod cell;
pub mod codec;
pub mod collector;
pub mod config;
pub mod economics;
pub mod epoch;
pub mod error;
pub mod fee;
pub mod flows;
pub mod header_cache;
pub mod rpc;
pub mod send;
pub mod signer;

#[cfg(test)]
mod test_util;

pub use assembler::{InputHeaders, TransactionSkeleton, UnsignedTransaction};
pub use builder::{
    BuilderContext, BuiltTransaction, Position, SentTransaction, Source, TransactionBuilder,
};
pub use cell::{Cell, CellKind};
pub use collector::{CellCollector, CellQuery, IndexerCellCollector};
pub use config::{ScriptConfig, ScriptName};
pub use error::Error;
pub use fee::{calculate_fee, estimate_fee_rate, DEFAULT_FEE_RATE};
pub use header_cache::HeaderCache;
pub use rpc::{BatchTransport, ChainRpc, CkbRpcClient, HttpTransport, RpcBatcher};
pub use send::{send_and_confirm, ConfirmationPolicy};
pub use signer::TransactionSigner;
