use ckb_jsonrpc_types::{BlockNumber, CellOutput, JsonBytes, OutPoint, Uint32, Uint64};
use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Pending,
    Proposed,
    Committed,
    Other(String),
}

impl From<&str> for TxStatus {
    fn from(status: &str) -> TxStatus {
        match status {
            "pending" => TxStatus::Pending,
            "proposed" => TxStatus::Proposed,
            "committed" => TxStatus::Committed,
            other => TxStatus::Other(other.to_owned()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeeRateStatistics {
    pub mean: u64,
    pub median: u64,
}

#[derive(Deserialize)]
pub(crate) struct RawFeeRateStatistics {
    pub mean: Uint64,
    pub median: Uint64,
}

#[derive(Deserialize)]
pub(crate) struct RawTxStatus {
    pub status: String,
}

#[derive(Deserialize)]
pub(crate) struct RawTransactionWithStatus {
    pub tx_status: RawTxStatus,
}

/// One object of the indexer `get_cells` response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerCell {
    pub output: CellOutput,
    pub output_data: Option<JsonBytes>,
    pub out_point: OutPoint,
    pub block_number: BlockNumber,
    pub tx_index: Uint32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexerPage {
    pub objects: Vec<IndexerCell>,
    pub last_cursor: JsonBytes,
}
