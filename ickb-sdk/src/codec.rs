//! Fixed layout little endian packing of cell data.

use byteorder::{ByteOrder, LittleEndian};
use ckb_types::bytes::Bytes;

use crate::error::Error;

pub const DAO_DATA_LEN: usize = 8;
pub const DEPOSIT_DATA: [u8; DAO_DATA_LEN] = [0u8; DAO_DATA_LEN];
pub const UDT_AMOUNT_LEN: usize = 16;
pub const RECEIPT_DATA_LEN: usize = 8;
pub const MAX_RECEIPT_AMOUNT: u64 = (1 << 48) - 1;

pub fn pack_withdrawal_data(deposit_block_number: u64) -> Bytes {
    let mut data = [0u8; DAO_DATA_LEN];
    LittleEndian::write_u64(&mut data, deposit_block_number);
    Bytes::from(data.to_vec())
}

/// Zero for deposits, the deposit block number for withdrawal requests
pub fn unpack_dao_data(data: &[u8]) -> Result<u64, Error> {
    if data.len() != DAO_DATA_LEN {
        return Err(Error::InvalidCellData(format!(
            "expected {} bytes of NervosDAO data, got {}",
            DAO_DATA_LEN,
            data.len()
        )));
    }
    Ok(LittleEndian::read_u64(data))
}

pub fn pack_udt_amount(amount: u128) -> Bytes {
    let mut data = [0u8; UDT_AMOUNT_LEN];
    LittleEndian::write_u128(&mut data, amount);
    Bytes::from(data.to_vec())
}

pub fn unpack_udt_amount(data: &[u8]) -> Result<u128, Error> {
    if data.len() < UDT_AMOUNT_LEN {
        return Err(Error::InvalidCellData(format!(
            "expected at least {} bytes of UDT data, got {}",
            UDT_AMOUNT_LEN,
            data.len()
        )));
    }
    Ok(LittleEndian::read_u128(&data[..UDT_AMOUNT_LEN]))
}

/// Accounting data of a batch of equal deposits
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReceiptData {
    pub deposit_quantity: u16,
    /// Unoccupied capacity of each deposit, 48 bits
    pub deposit_amount: u64,
}

impl ReceiptData {
    pub fn new(deposit_quantity: u16, deposit_amount: u64) -> ReceiptData {
        ReceiptData {
            deposit_quantity,
            deposit_amount,
        }
    }

    pub fn pack(&self) -> Result<Bytes, Error> {
        if self.deposit_amount > MAX_RECEIPT_AMOUNT {
            return Err(Error::Overflow("receipt deposit amount"));
        }
        let mut data = [0u8; RECEIPT_DATA_LEN];
        LittleEndian::write_u16(&mut data[0..2], self.deposit_quantity);
        LittleEndian::write_uint(&mut data[2..8], self.deposit_amount, 6);
        Ok(Bytes::from(data.to_vec()))
    }

    pub fn unpack(data: &[u8]) -> Result<ReceiptData, Error> {
        if data.len() != RECEIPT_DATA_LEN {
            return Err(Error::InvalidCellData(format!(
                "expected {} bytes of receipt data, got {}",
                RECEIPT_DATA_LEN,
                data.len()
            )));
        }
        Ok(ReceiptData {
            deposit_quantity: LittleEndian::read_u16(&data[0..2]),
            deposit_amount: LittleEndian::read_uint(&data[2..8], 6),
        })
    }
}
