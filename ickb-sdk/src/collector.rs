use std::ops::Range;

use ckb_jsonrpc_types as json_types;
use ckb_types::{
    packed::{self, Script},
    prelude::*,
    H256,
};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{json, Value};

use crate::cell::Cell;
use crate::error::Error;
use crate::rpc::{ChainRpc, CkbRpcClient, IndexerCell};

pub const PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeFilter {
    Any,
    /// Only cells without a type script
    Empty,
    Exact(Script),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataFilter {
    Any,
    Empty,
}

/// Exact match cell query, scripts are never prefix matched
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CellQuery {
    pub lock: Option<Script>,
    pub type_: TypeFilter,
    pub data: DataFilter,
    /// Half open range of block numbers
    pub block_range: Option<Range<u64>>,
}

impl CellQuery {
    pub fn by_lock(lock: Script) -> CellQuery {
        CellQuery {
            lock: Some(lock),
            type_: TypeFilter::Any,
            data: DataFilter::Any,
            block_range: None,
        }
    }

    pub fn by_type(type_: Script) -> CellQuery {
        CellQuery {
            lock: None,
            type_: TypeFilter::Exact(type_),
            data: DataFilter::Any,
            block_range: None,
        }
    }

    pub fn type_(mut self, type_: TypeFilter) -> CellQuery {
        self.type_ = type_;
        self
    }

    pub fn data(mut self, data: DataFilter) -> CellQuery {
        self.data = data;
        self
    }

    pub fn block_range(mut self, range: Range<u64>) -> CellQuery {
        self.block_range = Some(range);
        self
    }

    /// Client side re-check of an indexer result
    pub fn matches(&self, cell: &Cell) -> bool {
        if let Some(lock) = self.lock.as_ref() {
            if &cell.lock() != lock {
                return false;
            }
        }
        let type_ok = match (&self.type_, cell.type_()) {
            (TypeFilter::Any, _) => true,
            (TypeFilter::Empty, type_) => type_.is_none(),
            (TypeFilter::Exact(expected), Some(type_)) => expected == &type_,
            (TypeFilter::Exact(_), None) => false,
        };
        let data_ok = match self.data {
            DataFilter::Any => true,
            DataFilter::Empty => cell.data.is_empty(),
        };
        let range_ok = match (self.block_range.as_ref(), cell.block_number) {
            (Some(range), Some(number)) => range.contains(&number),
            (Some(_), None) => false,
            (None, _) => true,
        };
        type_ok && data_ok && range_ok
    }
}

/// The cell query collaborator
pub trait CellCollector: Send + Sync {
    fn collect<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<Cell>, Error>>;
}

/// Collects live cells through the node's built-in indexer
pub struct IndexerCellCollector {
    client: CkbRpcClient,
}

impl IndexerCellCollector {
    pub fn new(client: CkbRpcClient) -> IndexerCellCollector {
        IndexerCellCollector { client }
    }

    async fn collect_all(&self, query: &CellQuery) -> Result<Vec<Cell>, Error> {
        let search_key = search_key(query)?;
        let mut indexer_cells = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .client
                .get_cells(search_key.clone(), PAGE_SIZE, cursor)
                .await?;
            let page_len = page.objects.len();
            indexer_cells.extend(page.objects);
            if page_len < PAGE_SIZE as usize {
                break;
            }
            cursor = Some(page.last_cursor);
        }

        // Lookups of the same block share one batch slot
        let cells = try_join_all(
            indexer_cells
                .into_iter()
                .map(|indexer_cell| self.load_location(indexer_cell)),
        )
        .await?;
        let cells = cells
            .into_iter()
            .filter(|cell| query.matches(cell))
            .collect::<Vec<_>>();
        log::debug!("collected {} cells", cells.len());
        Ok(cells)
    }

    async fn load_location(&self, indexer_cell: IndexerCell) -> Result<Cell, Error> {
        let block_number = indexer_cell.block_number.value();
        let block_hash: H256 = self
            .client
            .get_block_hash(block_number)
            .await?
            .ok_or(Error::BlockHashNotFound(block_number))?;
        let data = indexer_cell
            .output_data
            .map(|data| data.into_bytes())
            .unwrap_or_default();
        Ok(Cell {
            output: indexer_cell.output.into(),
            data,
            out_point: Some(packed::OutPoint::from(indexer_cell.out_point)),
            block_hash: Some(block_hash),
            block_number: Some(block_number),
        })
    }
}

impl CellCollector for IndexerCellCollector {
    fn collect<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<Cell>, Error>> {
        self.collect_all(query).boxed()
    }
}

fn range_param(start: u64, end: u64) -> Value {
    json!([json_types::Uint64::from(start), json_types::Uint64::from(end)])
}

/// `get_cells` search key, searching by lock when present, by type otherwise
fn search_key(query: &CellQuery) -> Result<Value, Error> {
    let mut filter = serde_json::Map::new();
    let (script, script_type) = match (query.lock.as_ref(), &query.type_) {
        (Some(lock), type_filter) => {
            match type_filter {
                TypeFilter::Any => {}
                TypeFilter::Empty => {
                    filter.insert("script_len_range".to_owned(), range_param(0, 1));
                }
                TypeFilter::Exact(type_) => {
                    filter.insert(
                        "script".to_owned(),
                        json!(json_types::Script::from(type_.clone())),
                    );
                }
            }
            (lock.clone(), "lock")
        }
        (None, TypeFilter::Exact(type_)) => (type_.clone(), "type"),
        (None, _) => {
            return Err(Error::InvalidQuery(
                "either a lock or an exact type script is required".to_owned(),
            ))
        }
    };
    if query.data == DataFilter::Empty {
        filter.insert("output_data_len_range".to_owned(), range_param(0, 1));
    }
    if let Some(range) = query.block_range.as_ref() {
        filter.insert("block_range".to_owned(), range_param(range.start, range.end));
    }

    let mut search_key = json!({
        "script": json_types::Script::from(script),
        "script_type": script_type,
        "script_search_mode": "exact",
        "with_data": true,
    });
    if !filter.is_empty() {
        search_key["filter"] = Value::Object(filter);
    }
    Ok(search_key)
}
