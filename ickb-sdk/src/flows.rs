//! The three user level operations, each one builds and sends a transaction.

use ckb_types::packed::{OutPoint, Script};

use crate::builder::{BuilderContext, SentTransaction, TransactionBuilder};
use crate::cell::{Cell, CellKind};
use crate::collector::{CellQuery, TypeFilter};
use crate::config::ScriptName;
use crate::error::Error;
use crate::send::ConfirmationPolicy;

fn builder(
    context: &BuilderContext,
    account_lock: &Script,
    policy: ConfirmationPolicy,
) -> TransactionBuilder {
    TransactionBuilder::new(context.clone(), account_lock.clone()).with_confirmation_policy(policy)
}

pub async fn deposit(
    context: &BuilderContext,
    account_lock: &Script,
    amount: u64,
    fee_rate: u64,
    policy: ConfirmationPolicy,
) -> Result<SentTransaction, Error> {
    let mut builder = builder(context, account_lock, policy);
    builder.fund().await?.deposit(amount).await?;
    builder.build_and_send(fee_rate).await
}

/// Requests the withdrawal of the first deposit with a spendable receipt
pub async fn withdraw_request(
    context: &BuilderContext,
    account_lock: &Script,
    fee_rate: u64,
    policy: ConfirmationPolicy,
) -> Result<SentTransaction, Error> {
    let (deposit, receipt) = find_deposit(context, account_lock)
        .await?
        .ok_or(Error::DepositNotFound)?;
    log::info!("Requesting withdrawal of deposit {}", deposit);
    let mut builder = builder(context, account_lock, policy);
    builder.fund().await?.withdraw_from(deposit, receipt)?;
    builder.build_and_send(fee_rate).await
}

/// Completes every mature withdrawal request of the account
pub async fn withdraw(
    context: &BuilderContext,
    account_lock: &Script,
    fee_rate: u64,
    policy: ConfirmationPolicy,
) -> Result<SentTransaction, Error> {
    let mut builder = builder(context, account_lock, policy);
    builder.fund().await?;
    if !builder.has_withdrawal_phase2()? {
        return Err(Error::WithdrawalNotFound);
    }
    builder.build_and_send(fee_rate).await
}

// A deposit is the first output of the transaction creating its receipt
async fn find_deposit(
    context: &BuilderContext,
    account_lock: &Script,
) -> Result<Option<(Cell, Cell)>, Error> {
    let config = &context.config;
    let receipt_type = config.script(ScriptName::ReceiptType);
    let mut receipts = Vec::new();
    for lock in [account_lock.clone(), config.claim_lock(account_lock)] {
        let query = CellQuery::by_lock(lock).type_(TypeFilter::Exact(receipt_type.clone()));
        receipts.extend(context.collector.collect(&query).await?);
    }

    for receipt in receipts {
        if !matches!(config.classify(&receipt)?, CellKind::Receipt(_)) {
            continue;
        }
        let receipt_out_point = match receipt.out_point.as_ref() {
            Some(out_point) => out_point,
            None => continue,
        };
        let deposit_out_point = OutPoint::new(receipt_out_point.tx_hash(), 0);
        let (output, data) = match context.rpc.get_live_cell(deposit_out_point.clone()).await? {
            Some(cell) => cell,
            None => continue,
        };
        let deposit = Cell {
            output,
            data,
            out_point: Some(deposit_out_point),
            block_hash: receipt.block_hash.clone(),
            block_number: receipt.block_number,
        };
        if config.is_ickb_deposit(&deposit)? {
            return Ok(Some((deposit, receipt)));
        }
        log::debug!("Output 0 of the {} transaction is not a deposit", receipt);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ReceiptData, DEPOSIT_DATA};
    use crate::test_util::{
        account_lock, capacity_cell, epoch, header, live_cell, script_config, MockChain,
        MockCollector, MockSigner,
    };
    use ckb_sdk::constants::ONE_CKB;
    use ckb_types::{bytes::Bytes, core::HeaderView, packed::CellOutput, prelude::*};
    use std::sync::Arc;
    use std::time::Duration;

    const AR: u64 = 10_000_000_000_000_000;

    fn policy() -> ConfirmationPolicy {
        ConfirmationPolicy {
            max_attempts: 2,
            interval: Duration::from_millis(1),
        }
    }

    fn context(chain: &Arc<MockChain>, collector: &Arc<MockCollector>) -> BuilderContext {
        BuilderContext {
            config: Arc::new(script_config()),
            rpc: chain.clone(),
            collector: collector.clone(),
            signer: Arc::new(MockSigner::default()),
        }
    }

    fn chain() -> Arc<MockChain> {
        let chain = Arc::new(MockChain::default());
        chain.set_tip(header(50_000, epoch(500, 0, 1000), AR));
        chain
    }

    fn deposit_with_receipt(chain: &MockChain, deposit_header: &HeaderView) -> (Cell, Cell) {
        let config = script_config();
        let deposit_output = CellOutput::new_builder()
            .capacity((1082 * ONE_CKB).pack())
            .lock(config.script(ScriptName::DepositLock))
            .type_(Some(config.dao_type()).pack())
            .build();
        let deposit = live_cell(
            deposit_output,
            Bytes::from(DEPOSIT_DATA.to_vec()),
            deposit_header,
            0,
        );
        let receipt_output = CellOutput::new_builder()
            .capacity((114 * ONE_CKB).pack())
            .lock(config.claim_lock(&account_lock()))
            .type_(Some(config.script(ScriptName::ReceiptType)).pack())
            .build();
        // same transaction as the deposit
        let mut receipt = live_cell(
            receipt_output,
            ReceiptData::new(1, 1000 * ONE_CKB).pack().unwrap(),
            deposit_header,
            1,
        );
        let out_point = deposit.out_point.clone().unwrap();
        receipt.out_point = Some(OutPoint::new(out_point.tx_hash(), 1));
        chain.add_header(deposit_header.clone());
        chain.add_live_cell(&out_point, deposit.output.clone(), deposit.data.clone());
        (deposit, receipt)
    }

    #[tokio::test]
    async fn test_deposit_flow() {
        let chain = chain();
        let h = header(10, epoch(0, 10, 1000), AR);
        let owner_lock = script_config().script(ScriptName::OwnerLock);
        let owner = capacity_cell(owner_lock, 100 * ONE_CKB, &h, 9);
        let collector = Arc::new(MockCollector::new(vec![
            capacity_cell(account_lock(), 2000 * ONE_CKB, &h, 0),
            owner,
        ]));
        let context = context(&chain, &collector);
        let sent = deposit(&context, &account_lock(), 1000 * ONE_CKB, 1000, policy())
            .await
            .unwrap();
        assert_eq!(chain.sent_transactions(), vec![sent.signed_transaction]);
        assert_eq!(sent.transaction.transaction.outputs().len(), 4);
    }

    #[tokio::test]
    async fn test_withdraw_request_flow() {
        let chain = chain();
        let deposit_header = header(100, epoch(10, 5, 100), AR);
        let (deposit, receipt) = deposit_with_receipt(&chain, &deposit_header);
        let h = header(10, epoch(0, 10, 1000), AR);
        let collector = Arc::new(MockCollector::new(vec![
            capacity_cell(account_lock(), 1000 * ONE_CKB, &h, 0),
            receipt.clone(),
        ]));
        let context = context(&chain, &collector);

        let (found_deposit, found_receipt) = find_deposit(&context, &account_lock())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found_deposit, deposit);
        assert_eq!(found_receipt, receipt);

        let sent = withdraw_request(&context, &account_lock(), 1000, policy())
            .await
            .unwrap();
        let inputs = sent.transaction.input_cells;
        assert_eq!(inputs[0], deposit);
        assert_eq!(inputs[1], receipt);
    }

    #[tokio::test]
    async fn test_nothing_to_withdraw() {
        let chain = chain();
        let h = header(10, epoch(0, 10, 1000), AR);
        let collector = Arc::new(MockCollector::new(vec![capacity_cell(
            account_lock(),
            1000 * ONE_CKB,
            &h,
            0,
        )]));
        let context = context(&chain, &collector);

        let result = withdraw_request(&context, &account_lock(), 1000, policy()).await;
        assert_eq!(result.map(|_| ()), Err(Error::DepositNotFound));
        let result = withdraw(&context, &account_lock(), 1000, policy()).await;
        assert_eq!(result.map(|_| ()), Err(Error::WithdrawalNotFound));

        // receipts whose deposit is already spent are skipped
        let deposit_header = header(100, epoch(10, 5, 100), AR);
        let spent_chain = Arc::new(MockChain::default());
        let (_, receipt) = deposit_with_receipt(&spent_chain, &deposit_header);
        collector.push(receipt);
        let result = withdraw_request(&context, &account_lock(), 1000, policy()).await;
        assert_eq!(result.map(|_| ()), Err(Error::DepositNotFound));
        assert!(chain.sent_transactions().is_empty());
    }
}
