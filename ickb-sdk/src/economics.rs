//! iCKB exchange rate and NervosDAO interest arithmetic.
//!
//! All divisions are integer (floor) divisions.

use std::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};
use ckb_sdk::constants::ONE_CKB;
use ckb_types::{core::HeaderView, prelude::*, H256};

use crate::error::Error;

/// Genesis accumulated rate
pub const AR_0: u128 = 10_000_000_000_000_000;
/// Above this value a deposit earns 10% less iCKB on the excess
pub const ICKB_SOFT_CAP_PER_DEPOSIT: u128 = 100_000 * ONE_CKB as u128;

/// Accumulated rate, stored at bytes 8..16 of the header dao field
pub fn accumulated_rate(header: &HeaderView) -> Result<u128, Error> {
    let dao = header.dao();
    let ar = LittleEndian::read_u64(&dao.as_slice()[8..16]);
    if ar == 0 {
        let hash: H256 = header.hash().unpack();
        return Err(Error::InvalidCellData(format!(
            "zero accumulated rate in header {:#x}",
            hash
        )));
    }
    Ok(u128::from(ar))
}

/// iCKB value of `unoccupied_capacity` shannons deposited at `header`
pub fn ickb_value(unoccupied_capacity: u64, header: &HeaderView) -> Result<u128, Error> {
    let ar = accumulated_rate(header)?;
    let amount = u128::from(unoccupied_capacity)
        .checked_mul(AR_0)
        .ok_or(Error::Overflow("ickb value"))?
        / ar;
    if amount > ICKB_SOFT_CAP_PER_DEPOSIT {
        Ok(amount - (amount - ICKB_SOFT_CAP_PER_DEPOSIT) / 10)
    } else {
        Ok(amount)
    }
}

pub fn receipt_ickb_value(
    deposit_quantity: u16,
    deposit_amount: u64,
    header: &HeaderView,
) -> Result<u128, Error> {
    ickb_value(deposit_amount, header)?
        .checked_mul(u128::from(deposit_quantity))
        .ok_or(Error::Overflow("receipt ickb value"))
}

/// The iCKB soft cap expressed in shannons at the `header` accumulated rate
pub fn ckb_soft_cap_per_deposit(header: &HeaderView) -> Result<u64, Error> {
    let ar = accumulated_rate(header)?;
    let capacity = ICKB_SOFT_CAP_PER_DEPOSIT
        .checked_mul(ar)
        .ok_or(Error::Overflow("ckb soft cap"))?
        / AR_0;
    u64::try_from(capacity).map_err(|_| Error::Overflow("ckb soft cap"))
}

/// Capacity a withdrawal request unlocks: the counted part grows with the accumulated rate
pub fn dao_maximum_withdraw(
    deposit_header: &HeaderView,
    withdraw_header: &HeaderView,
    capacity: u64,
    occupied_capacity: u64,
) -> Result<u64, Error> {
    let deposit_ar = accumulated_rate(deposit_header)?;
    let withdraw_ar = accumulated_rate(withdraw_header)?;
    let counted_capacity = capacity.checked_sub(occupied_capacity).ok_or_else(|| {
        Error::InvalidCellData(format!(
            "capacity {} is less than occupied capacity {}",
            capacity, occupied_capacity
        ))
    })?;
    let withdraw_counted_capacity = u128::from(counted_capacity)
        .checked_mul(withdraw_ar)
        .ok_or(Error::Overflow("maximum withdraw"))?
        / deposit_ar;
    u64::try_from(withdraw_counted_capacity)
        .ok()
        .and_then(|counted| counted.checked_add(occupied_capacity))
        .ok_or(Error::Overflow("maximum withdraw"))
}
