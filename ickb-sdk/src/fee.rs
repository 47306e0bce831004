use ckb_types::{packed, prelude::*};

use crate::error::Error;
use crate::rpc::ChainRpc;

pub const DEFAULT_FEE_RATE: u64 = 1000;
const KB: u64 = 1000;

/// Serialized size in block: packed length + 4 bytes of offset
pub fn tx_size(tx: &packed::Transaction) -> usize {
    tx.as_reader().serialized_size_in_block()
}

/// `ceil(size * fee_rate / 1000)`, fee_rate in shannons per KB
pub fn calculate_fee(tx_size: usize, fee_rate: u64) -> Result<u64, Error> {
    let base = (tx_size as u64)
        .checked_mul(fee_rate)
        .ok_or(Error::Overflow("transaction fee"))?;
    let fee = base / KB;
    if fee * KB < base {
        Ok(fee + 1)
    } else {
        Ok(fee)
    }
}

/// Median fee rate of recent blocks, never below the default
pub async fn estimate_fee_rate(rpc: &dyn ChainRpc) -> Result<u64, Error> {
    let fee_rate = match rpc.get_fee_rate_statistics(None).await? {
        Some(statistics) => statistics.median.max(DEFAULT_FEE_RATE),
        None => DEFAULT_FEE_RATE,
    };
    log::debug!("estimated fee rate: {} shannons/KB", fee_rate);
    Ok(fee_rate)
}
