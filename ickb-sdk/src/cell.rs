use std::fmt;

use ckb_types::{
    bytes::Bytes,
    core::Capacity,
    packed::{CellOutput, OutPoint, Script},
    prelude::*,
    H256,
};

use crate::codec::{unpack_dao_data, unpack_udt_amount, ReceiptData, DAO_DATA_LEN};
use crate::config::{ScriptConfig, ScriptName};
use crate::error::Error;

/// A live cell snapshot, with its location on chain when it is already committed
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cell {
    pub output: CellOutput,
    pub data: Bytes,
    pub out_point: Option<OutPoint>,
    pub block_hash: Option<H256>,
    pub block_number: Option<u64>,
}

impl Cell {
    /// A not yet created cell
    pub fn new_output(output: CellOutput, data: Bytes) -> Cell {
        Cell {
            output,
            data,
            out_point: None,
            block_hash: None,
            block_number: None,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.output.capacity().unpack()
    }

    pub fn lock(&self) -> Script {
        self.output.lock()
    }

    pub fn type_(&self) -> Option<Script> {
        self.output.type_().to_opt()
    }

    pub fn has_location(&self) -> bool {
        self.block_hash.is_some() && self.block_number.is_some()
    }

    pub fn occupied_capacity(&self) -> Result<u64, Error> {
        Capacity::bytes(self.data.len())
            .and_then(|data_capacity| self.output.occupied_capacity(data_capacity))
            .map(|capacity| capacity.as_u64())
            .map_err(|_| Error::Overflow("occupied capacity"))
    }

    /// Same output and data, stripped from its location
    pub fn to_output(&self) -> Cell {
        Cell::new_output(self.output.clone(), self.data.clone())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.out_point.as_ref() {
            Some(out_point) => {
                let tx_hash: H256 = out_point.tx_hash().unpack();
                let index: u32 = out_point.index().unpack();
                write!(f, "{:#x}-{}", tx_hash, index)
            }
            None => write!(f, "<output capacity: {}>", self.capacity()),
        }
    }
}

/// Exact script equality, `None` matches only `None`
pub fn script_eq(a: Option<&Script>, b: Option<&Script>) -> Result<bool, Error> {
    match (a, b) {
        (None, None) => Err(Error::UndefinedScripts),
        (Some(a), Some(b)) => Ok(a == b),
        _ => Ok(false),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CellKind {
    /// No type, no data
    Capacity,
    /// iCKB token
    Udt(u128),
    /// NervosDAO deposit, data is 8 zero bytes
    Deposit,
    /// NervosDAO withdrawal request, carrying the deposit block number
    WithdrawalRequest(u64),
    Receipt(ReceiptData),
    Other,
}

impl ScriptConfig {
    pub fn classify(&self, cell: &Cell) -> Result<CellKind, Error> {
        let type_ = match cell.type_() {
            Some(type_) => type_,
            None if cell.data.is_empty() => return Ok(CellKind::Capacity),
            None => return Ok(CellKind::Other),
        };
        if type_ == self.dao_type() {
            if cell.data.len() != DAO_DATA_LEN {
                return Err(Error::InvalidCellData(format!(
                    "NervosDAO cell data length is {}",
                    cell.data.len()
                )));
            }
            return match unpack_dao_data(&cell.data)? {
                0 => Ok(CellKind::Deposit),
                number => Ok(CellKind::WithdrawalRequest(number)),
            };
        }
        if type_ == self.ickb_udt_type() {
            return unpack_udt_amount(&cell.data).map(CellKind::Udt);
        }
        if type_ == self.script(ScriptName::ReceiptType) {
            return ReceiptData::unpack(&cell.data).map(CellKind::Receipt);
        }
        Ok(CellKind::Other)
    }

    /// Deposit owned by the iCKB protocol
    pub fn is_ickb_deposit(&self, cell: &Cell) -> Result<bool, Error> {
        Ok(self.classify(cell)? == CellKind::Deposit
            && cell.lock() == self.script(ScriptName::DepositLock))
    }
}
