use std::cmp::Ordering;

use ckb_sdk::{Since, SinceType};
use ckb_types::core::{EpochNumber, EpochNumberWithFraction};

use crate::error::Error;

const LOCK_PERIOD_EPOCHES: EpochNumber = 180;

/// Orders by number, then by `index / length` cross-multiplied.
pub fn compare_epochs(a: &EpochNumberWithFraction, b: &EpochNumberWithFraction) -> Ordering {
    a.number().cmp(&b.number()).then_with(|| {
        let a_fraction = u128::from(a.index()) * u128::from(b.length());
        let b_fraction = u128::from(b.index()) * u128::from(a.length());
        a_fraction.cmp(&b_fraction)
    })
}

/// A withdrawal is mature once the tip epoch reached its unlock epoch
pub fn is_mature(tip: &EpochNumberWithFraction, unlock: &EpochNumberWithFraction) -> bool {
    compare_epochs(tip, unlock) != Ordering::Less
}

/// Earliest epoch a withdrawal request can be spent at.
///
/// A request made in an epoch before its deposit is invalid cell data.
// https://github.com/nervosnetwork/ckb-system-scripts/blob/master/c/dao.c#L182-L223
pub fn minimal_unlock_point(
    deposit_point: &EpochNumberWithFraction,
    prepare_point: &EpochNumberWithFraction,
) -> Result<EpochNumberWithFraction, Error> {
    let passed_epoch_cnt = prepare_point
        .number()
        .checked_sub(deposit_point.number())
        .ok_or_else(|| {
            Error::InvalidCellData(format!(
                "withdrawal request at epoch {} precedes its deposit at epoch {}",
                prepare_point, deposit_point
            ))
        })?;
    let prepare_fraction = prepare_point.index() * deposit_point.length();
    let deposit_fraction = deposit_point.index() * prepare_point.length();
    let passed_epoch_cnt = if prepare_fraction > deposit_fraction {
        passed_epoch_cnt + 1
    } else {
        passed_epoch_cnt
    };
    let rest_epoch_cnt =
        (passed_epoch_cnt + (LOCK_PERIOD_EPOCHES - 1)) / LOCK_PERIOD_EPOCHES * LOCK_PERIOD_EPOCHES;
    Ok(EpochNumberWithFraction::new(
        deposit_point.number() + rest_epoch_cnt,
        deposit_point.index(),
        deposit_point.length(),
    ))
}

/// Absolute epoch since value
pub fn epoch_since(point: &EpochNumberWithFraction) -> u64 {
    Since::new(SinceType::EpochNumberWithFraction, point.full_value(), false).value()
}
