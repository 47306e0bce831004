mod batcher;
mod client;
mod jsonrpc;
mod transport;
mod types;

pub use batcher::{RpcBatcher, DEFAULT_BATCH_WINDOW};
pub use client::{ChainRpc, CkbRpcClient};
pub use jsonrpc::{JsonrpcError, JsonrpcRequest, JsonrpcResponse};
pub use transport::{BatchTransport, HttpTransport};
pub use types::{FeeRateStatistics, IndexerCell, IndexerPage, TxStatus};
