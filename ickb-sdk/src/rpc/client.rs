use std::sync::Arc;
use std::time::Duration;

use ckb_jsonrpc_types as json_types;
use ckb_types::{
    bytes::Bytes,
    core::{HeaderView, TransactionView},
    packed::{CellOutput, OutPoint},
    H256,
};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::batcher::RpcBatcher;
use super::transport::BatchTransport;
use super::types::{
    FeeRateStatistics, IndexerPage, RawFeeRateStatistics, RawTransactionWithStatus, TxStatus,
};
use crate::error::Error;

/// The chain RPC collaborator
pub trait ChainRpc: Send + Sync {
    fn get_tip_header(&self) -> BoxFuture<'_, Result<HeaderView, Error>>;

    fn get_header(&self, hash: H256) -> BoxFuture<'_, Result<Option<HeaderView>, Error>>;

    fn get_block_hash(&self, number: u64) -> BoxFuture<'_, Result<Option<H256>, Error>>;

    fn get_transaction_status(&self, hash: H256) -> BoxFuture<'_, Result<TxStatus, Error>>;

    fn send_transaction(&self, tx: TransactionView) -> BoxFuture<'_, Result<H256, Error>>;

    fn get_fee_rate_statistics(
        &self,
        target: Option<u64>,
    ) -> BoxFuture<'_, Result<Option<FeeRateStatistics>, Error>>;

    /// Output and data of a live cell, `None` when it is not live
    fn get_live_cell(
        &self,
        out_point: OutPoint,
    ) -> BoxFuture<'_, Result<Option<(CellOutput, Bytes)>, Error>>;
}

/// CKB node client, every call goes through the batcher
#[derive(Clone)]
pub struct CkbRpcClient {
    batcher: RpcBatcher,
}

impl CkbRpcClient {
    pub fn new(transport: Arc<dyn BatchTransport>, batch_window: Duration) -> CkbRpcClient {
        CkbRpcClient {
            batcher: RpcBatcher::spawn(transport, batch_window),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, Error> {
        let value = self.batcher.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    // Indexer
    pub async fn get_cells(
        &self,
        search_key: Value,
        limit: u32,
        after: Option<json_types::JsonBytes>,
    ) -> Result<IndexerPage, Error> {
        let params = vec![
            search_key,
            json!("asc"),
            json!(json_types::Uint32::from(limit)),
            json!(after),
        ];
        self.request("get_cells", params).await
    }
}

impl ChainRpc for CkbRpcClient {
    fn get_tip_header(&self) -> BoxFuture<'_, Result<HeaderView, Error>> {
        async move {
            let header: json_types::HeaderView = self.request("get_tip_header", vec![]).await?;
            Ok(header.into())
        }
        .boxed()
    }

    fn get_header(&self, hash: H256) -> BoxFuture<'_, Result<Option<HeaderView>, Error>> {
        async move {
            let header: Option<json_types::HeaderView> =
                self.request("get_header", vec![json!(hash)]).await?;
            Ok(header.map(Into::into))
        }
        .boxed()
    }

    fn get_block_hash(&self, number: u64) -> BoxFuture<'_, Result<Option<H256>, Error>> {
        async move {
            let number = json_types::BlockNumber::from(number);
            self.request("get_block_hash", vec![json!(number)]).await
        }
        .boxed()
    }

    fn get_transaction_status(&self, hash: H256) -> BoxFuture<'_, Result<TxStatus, Error>> {
        async move {
            let tx: Option<RawTransactionWithStatus> =
                self.request("get_transaction", vec![json!(hash)]).await?;
            Ok(tx
                .map(|tx| TxStatus::from(tx.tx_status.status.as_str()))
                .unwrap_or_else(|| TxStatus::Other("unknown".to_owned())))
        }
        .boxed()
    }

    fn send_transaction(&self, tx: TransactionView) -> BoxFuture<'_, Result<H256, Error>> {
        async move {
            let tx = json_types::Transaction::from(tx.data());
            self.request("send_transaction", vec![json!(tx), json!("passthrough")])
                .await
        }
        .boxed()
    }

    fn get_fee_rate_statistics(
        &self,
        target: Option<u64>,
    ) -> BoxFuture<'_, Result<Option<FeeRateStatistics>, Error>> {
        async move {
            let target = target.map(json_types::Uint64::from);
            let statistics: Option<RawFeeRateStatistics> = self
                .request("get_fee_rate_statistics", vec![json!(target)])
                .await?;
            Ok(statistics.map(|statistics| FeeRateStatistics {
                mean: statistics.mean.value(),
                median: statistics.median.value(),
            }))
        }
        .boxed()
    }

    fn get_live_cell(
        &self,
        out_point: OutPoint,
    ) -> BoxFuture<'_, Result<Option<(CellOutput, Bytes)>, Error>> {
        async move {
            let out_point = json_types::OutPoint::from(out_point);
            let cell: json_types::CellWithStatus = self
                .request("get_live_cell", vec![json!(out_point), json!(true)])
                .await?;
            if cell.status != "live" {
                return Ok(None);
            }
            Ok(cell.cell.map(|info| {
                let data = info
                    .data
                    .map(|data| data.content.into_bytes())
                    .unwrap_or_default();
                (info.output.into(), data)
            }))
        }
        .boxed()
    }
}
