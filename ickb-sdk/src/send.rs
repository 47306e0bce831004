use std::time::Duration;

use ckb_types::{core::TransactionView, H256};

use crate::error::Error;
use crate::rpc::{ChainRpc, TxStatus};

/// Fixed retry budget of the commitment polling
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfirmationPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        ConfirmationPolicy {
            max_attempts: 120,
            interval: Duration::from_secs(1),
        }
    }
}

/// Sends `tx` and polls until it is committed. Only pending and proposed
/// statuses are retried.
pub async fn send_and_confirm(
    rpc: &dyn ChainRpc,
    tx: TransactionView,
    policy: ConfirmationPolicy,
) -> Result<H256, Error> {
    let tx_hash = rpc.send_transaction(tx).await?;
    log::info!("Transaction sent: {:#x}", tx_hash);

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        let status = rpc.get_transaction_status(tx_hash.clone()).await?;
        log::debug!(
            "Transaction {:#x} status: {:?} (attempt {})",
            tx_hash,
            status,
            attempt
        );
        match status {
            TxStatus::Committed => {
                log::info!("Transaction committed: {:#x}", tx_hash);
                return Ok(tx_hash);
            }
            TxStatus::Pending | TxStatus::Proposed => {}
            TxStatus::Other(status) => return Err(Error::UnexpectedTxStatus(status)),
        }
    }
    Err(Error::CommitTimeout {
        tx_hash,
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockChain;
    use ckb_types::prelude::*;

    fn policy(max_attempts: u32) -> ConfirmationPolicy {
        ConfirmationPolicy {
            max_attempts,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_committed_after_retries() {
        let chain = MockChain::default();
        chain.push_statuses(vec![TxStatus::Pending, TxStatus::Proposed, TxStatus::Committed]);
        let tx = TransactionView::new_advanced_builder().build();
        let tx_hash = send_and_confirm(&chain, tx.clone(), policy(5)).await.unwrap();
        let expected: H256 = tx.hash().unpack();
        assert_eq!(tx_hash, expected);
        assert_eq!(chain.calls("get_transaction"), 3);
        assert_eq!(chain.sent_transactions(), vec![tx]);
    }

    #[tokio::test]
    async fn test_fatal_status() {
        let chain = MockChain::default();
        chain.push_statuses(vec![TxStatus::Pending, TxStatus::Other("rejected".to_owned())]);
        let tx = TransactionView::new_advanced_builder().build();
        assert_eq!(
            send_and_confirm(&chain, tx, policy(5)).await,
            Err(Error::UnexpectedTxStatus("rejected".to_owned()))
        );
        assert_eq!(chain.calls("get_transaction"), 2);
    }

    #[tokio::test]
    async fn test_commit_timeout() {
        let chain = MockChain::default();
        chain.push_statuses(vec![TxStatus::Pending; 3]);
        let tx = TransactionView::new_advanced_builder().build();
        let tx_hash: H256 = tx.hash().unpack();
        assert_eq!(
            send_and_confirm(&chain, tx, policy(3)).await,
            Err(Error::CommitTimeout {
                tx_hash,
                attempts: 3
            })
        );
    }
}
