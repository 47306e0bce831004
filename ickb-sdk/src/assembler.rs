//! Deterministic derivation of the dependency fields of a transaction.
//!
//! Each step fills one initially empty field and refuses to run twice, so
//! dependency indexes computed by a later step never refer to a stale list.

use std::collections::HashSet;

use ckb_types::{
    bytes::Bytes,
    core::{HeaderView, TransactionBuilder, TransactionView},
    packed::{self, CellInput, WitnessArgs},
    prelude::*,
    H256,
};

use crate::cell::{Cell, CellKind};
use crate::config::ScriptConfig;
use crate::epoch::{epoch_since, minimal_unlock_point};
use crate::error::Error;

/// Length of a recoverable secp256k1 signature
pub const SIGNATURE_PLACEHOLDER_LEN: usize = 65;

/// Headers needed by a DAO or receipt input
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InputHeaders {
    /// Header of the block that created the input
    pub header: HeaderView,
    /// Header of the original deposit, only for withdrawal requests
    pub deposit_header: Option<HeaderView>,
}

impl InputHeaders {
    pub fn new(header: HeaderView) -> InputHeaders {
        InputHeaders {
            header,
            deposit_header: None,
        }
    }

    pub fn with_deposit(header: HeaderView, deposit_header: HeaderView) -> InputHeaders {
        InputHeaders {
            header,
            deposit_header: Some(deposit_header),
        }
    }
}

/// An assembled transaction waiting for its signatures
#[derive(Clone, Debug)]
pub struct UnsignedTransaction {
    pub transaction: TransactionView,
    /// Cells spent by `transaction`, in input order
    pub input_cells: Vec<Cell>,
}

#[derive(Clone, Debug)]
pub struct TransactionSkeleton {
    inputs: Vec<Cell>,
    outputs: Vec<Cell>,
    cell_deps: Option<Vec<packed::CellDep>>,
    header_deps: Option<Vec<H256>>,
    input_sinces: Option<Vec<u64>>,
    witnesses: Option<Vec<Bytes>>,
}

impl TransactionSkeleton {
    pub fn new(inputs: Vec<Cell>, outputs: Vec<Cell>) -> TransactionSkeleton {
        TransactionSkeleton {
            inputs,
            outputs,
            cell_deps: None,
            header_deps: None,
            input_sinces: None,
            witnesses: None,
        }
    }

    pub fn inputs(&self) -> &[Cell] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Cell] {
        &self.outputs
    }

    pub fn header_deps(&self) -> Option<&[H256]> {
        self.header_deps.as_deref()
    }

    pub fn add_cell_deps(&mut self, config: &ScriptConfig) -> Result<(), Error> {
        if self.cell_deps.is_some() {
            return Err(Error::AlreadyPopulated("cell deps"));
        }
        self.cell_deps = Some(config.cell_deps());
        Ok(())
    }

    /// Own header of every DAO and receipt input, plus the deposit header of
    /// withdrawal requests. Deduplicated, in insertion order.
    pub fn add_header_deps(
        &mut self,
        config: &ScriptConfig,
        input_headers: &[Option<InputHeaders>],
    ) -> Result<(), Error> {
        if self.header_deps.is_some() {
            return Err(Error::AlreadyPopulated("header deps"));
        }
        let mut seen = HashSet::new();
        let mut header_deps = Vec::new();
        for (index, cell) in self.inputs.iter().enumerate() {
            let kind = config.classify(cell)?;
            let hashes = match kind {
                CellKind::Deposit | CellKind::Receipt(_) => {
                    vec![header_of(input_headers, index, cell)?.header.hash()]
                }
                CellKind::WithdrawalRequest(_) => {
                    let (header, deposit_header) = withdrawal_headers(input_headers, index, cell)?;
                    vec![header.hash(), deposit_header.hash()]
                }
                _ => continue,
            };
            for hash in hashes {
                let hash: H256 = hash.unpack();
                if seen.insert(hash.clone()) {
                    header_deps.push(hash);
                }
            }
        }
        self.header_deps = Some(header_deps);
        Ok(())
    }

    /// Withdrawal requests get their earliest unlock epoch, every other input 0
    pub fn add_input_sinces(
        &mut self,
        config: &ScriptConfig,
        input_headers: &[Option<InputHeaders>],
    ) -> Result<(), Error> {
        if self.input_sinces.is_some() {
            return Err(Error::AlreadyPopulated("input sinces"));
        }
        let mut sinces = Vec::with_capacity(self.inputs.len());
        for (index, cell) in self.inputs.iter().enumerate() {
            let since = match config.classify(cell)? {
                CellKind::WithdrawalRequest(_) => {
                    let (header, deposit_header) = withdrawal_headers(input_headers, index, cell)?;
                    epoch_since(&minimal_unlock_point(
                        &deposit_header.epoch(),
                        &header.epoch(),
                    )?)
                }
                _ => 0,
            };
            sinces.push(since);
        }
        self.input_sinces = Some(sinces);
        Ok(())
    }

    /// One `WitnessArgs` per input. The first input of each standard account
    /// lock gets a zero filled signature, withdrawal requests get the index
    /// of their deposit header as `input_type`.
    pub fn add_witness_placeholders(
        &mut self,
        config: &ScriptConfig,
        input_headers: &[Option<InputHeaders>],
    ) -> Result<(), Error> {
        if self.witnesses.is_some() {
            return Err(Error::AlreadyPopulated("witnesses"));
        }
        let header_deps = self
            .header_deps
            .as_ref()
            .ok_or(Error::NotPopulated("header deps"))?;
        let mut seen_locks = HashSet::new();
        let mut witnesses = Vec::with_capacity(self.inputs.len());
        for (index, cell) in self.inputs.iter().enumerate() {
            let mut witness = WitnessArgs::new_builder();

            let lock = cell.lock();
            if config.secp256k1_blake160.script_id.matches(&lock)
                && seen_locks.insert(lock.calc_script_hash())
            {
                let placeholder = Bytes::from(vec![0u8; SIGNATURE_PLACEHOLDER_LEN]);
                witness = witness.lock(Some(placeholder).pack());
            }

            if let CellKind::WithdrawalRequest(_) = config.classify(cell)? {
                let (_, deposit_header) = withdrawal_headers(input_headers, index, cell)?;
                let deposit_hash: H256 = deposit_header.hash().unpack();
                let header_dep_index = header_deps
                    .iter()
                    .position(|hash| hash == &deposit_hash)
                    .ok_or(Error::HeaderDepNotFound(deposit_hash))?
                    as u64;
                let input_type = Bytes::from(header_dep_index.to_le_bytes().to_vec());
                witness = witness.input_type(Some(input_type).pack());
            }

            witnesses.push(witness.build().as_bytes());
        }
        self.witnesses = Some(witnesses);
        Ok(())
    }

    pub fn build(self) -> Result<UnsignedTransaction, Error> {
        let cell_deps = self.cell_deps.ok_or(Error::NotPopulated("cell deps"))?;
        let header_deps = self.header_deps.ok_or(Error::NotPopulated("header deps"))?;
        let sinces = self.input_sinces.ok_or(Error::NotPopulated("input sinces"))?;
        let witnesses = self.witnesses.ok_or(Error::NotPopulated("witnesses"))?;

        let inputs = self
            .inputs
            .iter()
            .zip(sinces)
            .map(|(cell, since)| {
                cell.out_point
                    .clone()
                    .map(|out_point| CellInput::new(out_point, since))
                    .ok_or_else(|| Error::MissingLocationMetadata(cell.to_string()))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let transaction = TransactionBuilder::default()
            .cell_deps(cell_deps)
            .header_deps(header_deps.iter().map(|hash| hash.pack()))
            .inputs(inputs)
            .outputs(self.outputs.iter().map(|cell| cell.output.clone()))
            .outputs_data(self.outputs.iter().map(|cell| cell.data.pack()))
            .witnesses(witnesses.iter().map(|witness| witness.pack()))
            .build();
        Ok(UnsignedTransaction {
            transaction,
            input_cells: self.inputs,
        })
    }
}

/// Runs the four assembly steps in dependency order
pub fn assemble(
    config: &ScriptConfig,
    inputs: Vec<Cell>,
    outputs: Vec<Cell>,
    input_headers: &[Option<InputHeaders>],
) -> Result<UnsignedTransaction, Error> {
    let mut skeleton = TransactionSkeleton::new(inputs, outputs);
    skeleton.add_cell_deps(config)?;
    skeleton.add_header_deps(config, input_headers)?;
    skeleton.add_input_sinces(config, input_headers)?;
    skeleton.add_witness_placeholders(config, input_headers)?;
    skeleton.build()
}

fn header_of<'a>(
    input_headers: &'a [Option<InputHeaders>],
    index: usize,
    cell: &Cell,
) -> Result<&'a InputHeaders, Error> {
    input_headers
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| match cell.block_hash.clone() {
            Some(hash) => Error::HeaderNotFound(hash),
            None => Error::MissingLocationMetadata(cell.to_string()),
        })
}

fn withdrawal_headers<'a>(
    input_headers: &'a [Option<InputHeaders>],
    index: usize,
    cell: &Cell,
) -> Result<(&'a HeaderView, &'a HeaderView), Error> {
    let headers = header_of(input_headers, index, cell)?;
    let deposit_header = headers
        .deposit_header
        .as_ref()
        .ok_or(Error::NotPopulated("deposit header of withdrawal request"))?;
    Ok((&headers.header, deposit_header))
}
