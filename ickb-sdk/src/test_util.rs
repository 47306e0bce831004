//! In-memory collaborators and fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use ckb_jsonrpc_types as rpc_types;
use ckb_types::{
    bytes::Bytes,
    core::{EpochNumberWithFraction, HeaderBuilder, HeaderView, ScriptHashType, TransactionView},
    packed::{self, CellOutput, OutPoint, Script, WitnessArgs},
    prelude::*,
    H256,
};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::assembler::{UnsignedTransaction, SIGNATURE_PLACEHOLDER_LEN};
use crate::cell::Cell;
use crate::collector::{CellCollector, CellQuery};
use crate::config::{ScriptConfig, ScriptId, ScriptItem};
use crate::error::Error;
use crate::rpc::{ChainRpc, FeeRateStatistics, TxStatus};
use crate::signer::TransactionSigner;

fn script_item(code: u8, hash_type: ScriptHashType, dep_index: u32) -> ScriptItem {
    ScriptItem {
        script_id: ScriptId {
            code_hash: H256([code; 32]),
            hash_type: hash_type.into(),
        },
        cell_dep: packed::CellDep::new_builder()
            .out_point(OutPoint::new(H256([0x33; 32]).pack(), dep_index))
            .build()
            .into(),
    }
}

pub fn script_config() -> ScriptConfig {
    ScriptConfig {
        secp256k1_blake160: script_item(1, ScriptHashType::Type, 0),
        dao: script_item(2, ScriptHashType::Type, 1),
        sudt: script_item(3, ScriptHashType::Data1, 2),
        deposit_lock: script_item(4, ScriptHashType::Data1, 3),
        owner_lock: script_item(5, ScriptHashType::Data1, 4),
        receipt_type: script_item(6, ScriptHashType::Data1, 5),
        claim_lock: script_item(7, ScriptHashType::Data1, 6),
        domain_logic: script_item(8, ScriptHashType::Data1, 7),
        extra_cell_deps: Vec::<rpc_types::CellDep>::new(),
    }
}

pub fn account_lock() -> Script {
    script_config()
        .secp256k1_blake160
        .script_id
        .to_script(Bytes::from(vec![1u8; 20]))
}

pub fn epoch(number: u64, index: u64, length: u64) -> u64 {
    EpochNumberWithFraction::new(number, index, length).full_value()
}

pub fn header(number: u64, epoch: u64, ar: u64) -> HeaderView {
    let mut dao = [0u8; 32];
    dao[8..16].copy_from_slice(&ar.to_le_bytes());
    HeaderBuilder::default()
        .number(number.pack())
        .epoch(epoch.pack())
        .dao(H256(dao).pack())
        .build()
}

pub fn header_with_ar(number: u64, ar: u64) -> HeaderView {
    header(number, epoch(number / 1000, number % 1000, 1000), ar)
}

/// A committed cell of `header`'s block
pub fn live_cell(output: CellOutput, data: Bytes, header: &HeaderView, index: u32) -> Cell {
    let mut tx_hash = [0xeeu8; 32];
    tx_hash[0..8].copy_from_slice(&header.number().to_le_bytes());
    tx_hash[8..12].copy_from_slice(&index.to_le_bytes());
    Cell {
        output,
        data,
        out_point: Some(OutPoint::new(H256(tx_hash).pack(), index)),
        block_hash: Some(header.hash().unpack()),
        block_number: Some(header.number()),
    }
}

pub fn capacity_cell(lock: Script, capacity: u64, header: &HeaderView, index: u32) -> Cell {
    let output = CellOutput::new_builder()
        .capacity(capacity.pack())
        .lock(lock)
        .build();
    live_cell(output, Bytes::new(), header, index)
}

#[derive(Default)]
struct ChainState {
    tip: Option<HeaderView>,
    headers: HashMap<H256, HeaderView>,
    block_hashes: HashMap<u64, H256>,
    live_cells: HashMap<(H256, u32), (CellOutput, Bytes)>,
    statuses: VecDeque<TxStatus>,
    fee_rate_statistics: Option<FeeRateStatistics>,
    sent: Vec<TransactionView>,
    calls: HashMap<&'static str, usize>,
}

/// Chain RPC answering from memory, statuses default to committed
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn add_header(&self, header: HeaderView) {
        let mut state = self.state.lock();
        let hash: H256 = header.hash().unpack();
        state.block_hashes.insert(header.number(), hash.clone());
        state.headers.insert(hash, header);
    }

    pub fn set_tip(&self, header: HeaderView) {
        self.add_header(header.clone());
        self.state.lock().tip = Some(header);
    }

    pub fn add_live_cell(&self, out_point: &OutPoint, output: CellOutput, data: Bytes) {
        let key: (H256, u32) = (out_point.tx_hash().unpack(), out_point.index().unpack());
        self.state.lock().live_cells.insert(key, (output, data));
    }

    pub fn push_statuses(&self, statuses: Vec<TxStatus>) {
        self.state.lock().statuses.extend(statuses);
    }

    pub fn set_fee_rate_statistics(&self, statistics: FeeRateStatistics) {
        self.state.lock().fee_rate_statistics = Some(statistics);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).cloned().unwrap_or(0)
    }

    pub fn sent_transactions(&self) -> Vec<TransactionView> {
        self.state.lock().sent.clone()
    }

    fn record<T, F>(&self, method: &'static str, f: F) -> BoxFuture<'_, Result<T, Error>>
    where
        T: Send + 'static,
        F: FnOnce(&mut ChainState) -> Result<T, Error>,
    {
        let result = {
            let mut state = self.state.lock();
            *state.calls.entry(method).or_insert(0) += 1;
            f(&mut state)
        };
        async move { result }.boxed()
    }
}

impl ChainRpc for MockChain {
    fn get_tip_header(&self) -> BoxFuture<'_, Result<HeaderView, Error>> {
        self.record("get_tip_header", |state| {
            state
                .tip
                .clone()
                .ok_or_else(|| Error::Rpc("no tip header".to_owned()))
        })
    }

    fn get_header(&self, hash: H256) -> BoxFuture<'_, Result<Option<HeaderView>, Error>> {
        self.record("get_header", move |state| {
            Ok(state.headers.get(&hash).cloned())
        })
    }

    fn get_block_hash(&self, number: u64) -> BoxFuture<'_, Result<Option<H256>, Error>> {
        self.record("get_block_hash", move |state| {
            Ok(state.block_hashes.get(&number).cloned())
        })
    }

    fn get_transaction_status(&self, _hash: H256) -> BoxFuture<'_, Result<TxStatus, Error>> {
        self.record("get_transaction", |state| {
            Ok(state.statuses.pop_front().unwrap_or(TxStatus::Committed))
        })
    }

    fn send_transaction(&self, tx: TransactionView) -> BoxFuture<'_, Result<H256, Error>> {
        self.record("send_transaction", move |state| {
            let hash = tx.hash().unpack();
            state.sent.push(tx);
            Ok(hash)
        })
    }

    fn get_fee_rate_statistics(
        &self,
        _target: Option<u64>,
    ) -> BoxFuture<'_, Result<Option<FeeRateStatistics>, Error>> {
        self.record("get_fee_rate_statistics", |state| {
            Ok(state.fee_rate_statistics)
        })
    }

    fn get_live_cell(
        &self,
        out_point: OutPoint,
    ) -> BoxFuture<'_, Result<Option<(CellOutput, Bytes)>, Error>> {
        self.record("get_live_cell", move |state| {
            let key: (H256, u32) = (out_point.tx_hash().unpack(), out_point.index().unpack());
            Ok(state.live_cells.get(&key).cloned())
        })
    }
}

/// Returns the stored cells matching a query
#[derive(Default)]
pub struct MockCollector {
    cells: Mutex<Vec<Cell>>,
}

impl MockCollector {
    pub fn new(cells: Vec<Cell>) -> MockCollector {
        MockCollector {
            cells: Mutex::new(cells),
        }
    }

    pub fn push(&self, cell: Cell) {
        self.cells.lock().push(cell);
    }
}

impl CellCollector for MockCollector {
    fn collect<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<Cell>, Error>> {
        let cells = self
            .cells
            .lock()
            .iter()
            .filter(|cell| query.matches(cell))
            .cloned()
            .collect::<Vec<_>>();
        async move { Ok(cells) }.boxed()
    }
}

/// Writes a fixed fake signature in place of the lock group placeholder
#[derive(Default)]
pub struct MockSigner {
    calls: AtomicUsize,
}

impl MockSigner {
    pub const SIGNATURE: [u8; SIGNATURE_PLACEHOLDER_LEN] = [7u8; SIGNATURE_PLACEHOLDER_LEN];

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionSigner for MockSigner {
    fn sign(&self, tx: &UnsignedTransaction, lock: &Script) -> Result<TransactionView, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = tx
            .input_cells
            .iter()
            .position(|cell| &cell.lock() == lock)
            .ok_or_else(|| Error::Signer("lock group not found".to_owned()))?;
        let mut witnesses = tx.transaction.witnesses().into_iter().collect::<Vec<_>>();
        let witness = WitnessArgs::from_slice(&witnesses[index].raw_data())
            .map_err(|err| Error::Signer(err.to_string()))?
            .as_builder()
            .lock(Some(Bytes::from(Self::SIGNATURE.to_vec())).pack())
            .build();
        witnesses[index] = witness.as_bytes().pack();
        Ok(tx
            .transaction
            .as_advanced_builder()
            .set_witnesses(witnesses)
            .build())
    }
}
