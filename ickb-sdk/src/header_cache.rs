//! Per-construction memo of block hashes and headers.
//!
//! Concurrent lookups of the same key wait on one in-flight fetch, failed
//! fetches are not cached. A cache is owned by exactly one builder, headers
//! of a possibly forked chain must not outlive a transaction construction.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use ckb_types::{core::HeaderView, H256};
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::cell::Cell;
use crate::error::Error;
use crate::rpc::ChainRpc;

struct Memo<K, V> {
    slots: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K: Eq + Hash, V> Default for Memo<K, V> {
    fn default() -> Self {
        Memo {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    // The map lock is released before awaiting
    fn slot(&self, key: K) -> Arc<OnceCell<V>> {
        Arc::clone(self.slots.lock().entry(key).or_default())
    }

    fn insert(&self, key: K, value: V) {
        let _ = self.slot(key).set(value);
    }
}

pub struct HeaderCache {
    rpc: Arc<dyn ChainRpc>,
    block_hashes: Memo<u64, H256>,
    headers: Memo<H256, HeaderView>,
}

impl HeaderCache {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> HeaderCache {
        HeaderCache {
            rpc,
            block_hashes: Memo::default(),
            headers: Memo::default(),
        }
    }

    /// Block hash already known from a cell location
    pub fn record_block_hash(&self, number: u64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }

    pub async fn block_hash(&self, number: u64) -> Result<H256, Error> {
        let slot = self.block_hashes.slot(number);
        let hash = slot
            .get_or_try_init(|| async {
                self.rpc
                    .get_block_hash(number)
                    .await?
                    .ok_or(Error::BlockHashNotFound(number))
            })
            .await?;
        Ok(hash.clone())
    }

    pub async fn header(&self, hash: &H256) -> Result<HeaderView, Error> {
        let slot = self.headers.slot(hash.clone());
        let header = slot
            .get_or_try_init(|| async {
                let header = self
                    .rpc
                    .get_header(hash.clone())
                    .await?
                    .ok_or_else(|| Error::HeaderNotFound(hash.clone()))?;
                self.record_block_hash(header.number(), hash.clone());
                Ok::<_, Error>(header)
            })
            .await?;
        Ok(header.clone())
    }

    pub async fn header_by_number(&self, number: u64) -> Result<HeaderView, Error> {
        let hash = self.block_hash(number).await?;
        self.header(&hash).await
    }

    /// Header of the block that created `cell`
    pub async fn cell_header(&self, cell: &Cell) -> Result<HeaderView, Error> {
        match (cell.block_hash.as_ref(), cell.block_number) {
            (Some(hash), Some(number)) => {
                self.record_block_hash(number, hash.clone());
                self.header(hash).await
            }
            _ => Err(Error::MissingLocationMetadata(cell.to_string())),
        }
    }
}
