use std::convert::TryFrom;
use std::sync::Arc;

use ckb_sdk::{constants::ONE_CKB, HumanCapacity};
use ckb_types::{
    bytes::Bytes,
    core::TransactionView,
    packed::{CellOutput, Script},
    prelude::*,
    H256,
};
use futures::future::try_join_all;

use crate::assembler::{assemble, InputHeaders, UnsignedTransaction};
use crate::cell::{Cell, CellKind};
use crate::codec::{pack_udt_amount, pack_withdrawal_data, ReceiptData, DEPOSIT_DATA};
use crate::collector::{CellCollector, CellQuery, DataFilter, TypeFilter};
use crate::config::{ScriptConfig, ScriptName};
use crate::economics::{
    ckb_soft_cap_per_deposit, dao_maximum_withdraw, ickb_value, receipt_ickb_value,
};
use crate::epoch::{is_mature, minimal_unlock_point};
use crate::error::Error;
use crate::fee::{calculate_fee, tx_size};
use crate::header_cache::HeaderCache;
use crate::rpc::ChainRpc;
use crate::send::{send_and_confirm, ConfirmationPolicy};
use crate::signer::TransactionSigner;

/// Smallest plain change cell
pub const MIN_CHANGE_CAPACITY: u64 = 62 * ONE_CKB;
/// Smallest iCKB change cell
pub const MIN_UDT_CHANGE_CAPACITY: u64 = 142 * ONE_CKB;

/// The collaborators shared by the builders of one session
#[derive(Clone)]
pub struct BuilderContext {
    pub config: Arc<ScriptConfig>,
    pub rpc: Arc<dyn ChainRpc>,
    pub collector: Arc<dyn CellCollector>,
    pub signer: Arc<dyn TransactionSigner>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    Input,
    Output,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    Start,
    End,
}

/// Balanced and assembled, not signed yet
#[derive(Clone, Debug)]
pub struct BuiltTransaction {
    pub transaction: UnsignedTransaction,
    pub fee: u64,
    pub change: Option<Cell>,
}

#[derive(Clone, Debug)]
pub struct SentTransaction {
    pub transaction: UnsignedTransaction,
    pub fee: u64,
    pub signed_transaction: TransactionView,
    pub tx_hash: H256,
}

/// Accumulates the cells of one transaction.
///
/// The header cache lives and dies with the builder, a builder is meant to be
/// dropped after its transaction is sent.
///
/// Deposits being withdrawn occupy the first inputs, the deposit at input `i`
/// pairs with the withdrawal request at output `i`. Cells added at the start
/// after a withdrawal break that pairing.
pub struct TransactionBuilder {
    context: BuilderContext,
    account_lock: Script,
    headers: HeaderCache,
    confirmation: ConfirmationPolicy,
    inputs: Vec<Cell>,
    outputs: Vec<Cell>,
    // deposits queued for withdrawal, at the head of the inputs
    withdrawing: usize,
}

impl TransactionBuilder {
    pub fn new(context: BuilderContext, account_lock: Script) -> TransactionBuilder {
        let headers = HeaderCache::new(Arc::clone(&context.rpc));
        TransactionBuilder {
            context,
            account_lock,
            headers,
            confirmation: ConfirmationPolicy::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            withdrawing: 0,
        }
    }

    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> TransactionBuilder {
        self.confirmation = policy;
        self
    }

    pub fn account_lock(&self) -> &Script {
        &self.account_lock
    }

    pub fn inputs(&self) -> &[Cell] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Cell] {
        &self.outputs
    }

    fn config(&self) -> &ScriptConfig {
        &self.context.config
    }

    /// Queues `cells`, inputs must carry their location and be queued once.
    /// Nothing is queued when a cell is rejected.
    pub fn add(
        &mut self,
        source: Source,
        position: Position,
        cells: Vec<Cell>,
    ) -> Result<&mut Self, Error> {
        let at = match (position, source) {
            (Position::Start, _) => 0,
            (Position::End, Source::Input) => self.inputs.len(),
            (Position::End, Source::Output) => self.outputs.len(),
        };
        self.insert(source, at, cells)
    }

    fn insert(&mut self, source: Source, at: usize, cells: Vec<Cell>) -> Result<&mut Self, Error> {
        if source == Source::Input {
            for (index, cell) in cells.iter().enumerate() {
                if !cell.has_location() || cell.out_point.is_none() {
                    return Err(Error::MissingLocationMetadata(cell.to_string()));
                }
                let duplicated = self
                    .inputs
                    .iter()
                    .chain(cells[..index].iter())
                    .any(|queued| queued.out_point == cell.out_point);
                if duplicated {
                    return Err(Error::DuplicateInput(cell.to_string()));
                }
            }
        }
        let target = match source {
            Source::Input => &mut self.inputs,
            Source::Output => &mut self.outputs,
        };
        target.splice(at..at, cells);
        Ok(self)
    }

    fn is_queued(&self, cell: &Cell) -> bool {
        self.inputs
            .iter()
            .any(|queued| queued.out_point == cell.out_point)
    }

    /// Queues the spendable cells of the account: plain capacity, iCKB tokens
    /// and mature withdrawal requests.
    pub async fn fund(&mut self) -> Result<&mut Self, Error> {
        let config = Arc::clone(&self.context.config);
        let collector = Arc::clone(&self.context.collector);

        let capacity_query = CellQuery::by_lock(self.account_lock.clone())
            .type_(TypeFilter::Empty)
            .data(DataFilter::Empty);
        let udt_query = CellQuery::by_lock(self.account_lock.clone())
            .type_(TypeFilter::Exact(config.ickb_udt_type()));
        let dao_query = CellQuery::by_lock(self.account_lock.clone())
            .type_(TypeFilter::Exact(config.dao_type()));
        let (capacity_cells, udt_cells, dao_cells) = futures::try_join!(
            collector.collect(&capacity_query),
            collector.collect(&udt_query),
            collector.collect(&dao_query),
        )?;

        let tip = self.context.rpc.get_tip_header().await?;
        let mut withdrawals = Vec::new();
        for cell in dao_cells {
            if let CellKind::WithdrawalRequest(deposit_number) = config.classify(&cell)? {
                let request_header = self.headers.cell_header(&cell).await?;
                let deposit_header = self.headers.header_by_number(deposit_number).await?;
                let unlock =
                    minimal_unlock_point(&deposit_header.epoch(), &request_header.epoch())?;
                if is_mature(&tip.epoch(), &unlock) {
                    withdrawals.push(cell);
                } else {
                    log::debug!("Withdrawal request {} matures at epoch {}", cell, unlock);
                }
            }
        }

        let mut funding = Vec::new();
        for cell in capacity_cells.into_iter().chain(udt_cells).chain(withdrawals) {
            if !self.is_queued(&cell) {
                funding.push(cell);
            }
        }
        log::info!("Funding transaction with {} cells", funding.len());
        self.add(Source::Input, Position::End, funding)
    }

    /// Queues an iCKB deposit of `amount` shannons, its receipt and the
    /// re-created owner cell.
    pub async fn deposit(&mut self, amount: u64) -> Result<&mut Self, Error> {
        let config = Arc::clone(&self.context.config);
        let deposit_output = CellOutput::new_builder()
            .capacity(amount.pack())
            .lock(config.script(ScriptName::DepositLock))
            .type_(Some(config.dao_type()).pack())
            .build();
        let deposit = Cell::new_output(deposit_output, Bytes::from(DEPOSIT_DATA.to_vec()));
        let minimum = deposit.occupied_capacity()?;
        if amount < minimum {
            return Err(Error::InsufficientDeposit { amount, minimum });
        }
        let unoccupied = amount - minimum;

        let tip = self.context.rpc.get_tip_header().await?;
        let soft_cap = ckb_soft_cap_per_deposit(&tip)?;
        if unoccupied > soft_cap {
            log::warn!(
                "Deposit of {} exceeds the soft cap of {}, the excess earns 10% less iCKB",
                HumanCapacity(unoccupied),
                HumanCapacity(soft_cap)
            );
        }

        let receipt_output = CellOutput::new_builder()
            .lock(config.claim_lock(&self.account_lock))
            .type_(Some(config.script(ScriptName::ReceiptType)).pack())
            .build();
        let mut receipt = Cell::new_output(receipt_output, ReceiptData::new(1, unoccupied).pack()?);
        let receipt_capacity = receipt.occupied_capacity()?;
        receipt.output = receipt
            .output
            .as_builder()
            .capacity(receipt_capacity.pack())
            .build();

        let owner_query = CellQuery::by_lock(config.script(ScriptName::OwnerLock))
            .type_(TypeFilter::Empty)
            .data(DataFilter::Empty);
        let owner_cells = self.context.collector.collect(&owner_query).await?;
        let owner = owner_cells
            .into_iter()
            .next()
            .ok_or(Error::OwnerCellNotFound)?;

        log::info!("Queued deposit of {}", HumanCapacity(amount));
        self.add(Source::Output, Position::Start, vec![deposit, receipt])?;
        // One owner cell per transaction
        if !self.is_queued(&owner) {
            let cloned = owner.to_output();
            self.add(Source::Input, Position::End, vec![owner])?
                .add(Source::Output, Position::End, vec![cloned])?;
        }
        Ok(self)
    }

    /// Requests the withdrawal of `deposit`, redeeming `receipt`
    pub fn withdraw_from(&mut self, deposit: Cell, receipt: Cell) -> Result<&mut Self, Error> {
        match self.config().classify(&receipt)? {
            CellKind::Receipt(_) => {}
            _ => {
                return Err(Error::InvalidCellData(format!(
                    "{} is not a receipt",
                    receipt
                )))
            }
        }
        let request = self.withdrawal_request(&deposit)?;
        let at = self.withdrawing;
        self.insert(Source::Input, at, vec![deposit, receipt])?
            .insert(Source::Output, at, vec![request])?;
        self.withdrawing += 1;
        Ok(self)
    }

    /// Requests the withdrawal of `deposits`, paying them with iCKB tokens
    pub fn withdraw_from_deposits(&mut self, deposits: Vec<Cell>) -> Result<&mut Self, Error> {
        let requests = deposits
            .iter()
            .map(|deposit| self.withdrawal_request(deposit))
            .collect::<Result<Vec<_>, Error>>()?;
        let at = self.withdrawing;
        let count = deposits.len();
        self.insert(Source::Input, at, deposits)?
            .insert(Source::Output, at, requests)?;
        self.withdrawing += count;
        Ok(self)
    }

    fn withdrawal_request(&self, deposit: &Cell) -> Result<Cell, Error> {
        if !self.config().is_ickb_deposit(deposit)? {
            return Err(Error::NotADeposit);
        }
        let deposit_number = deposit
            .block_number
            .ok_or_else(|| Error::MissingLocationMetadata(deposit.to_string()))?;
        let output = CellOutput::new_builder()
            .capacity(deposit.capacity().pack())
            .lock(self.account_lock.clone())
            .type_(Some(self.config().dao_type()).pack())
            .build();
        Ok(Cell::new_output(output, pack_withdrawal_data(deposit_number)))
    }

    /// Whether an exit is being finalized
    pub fn has_withdrawal_phase2(&self) -> Result<bool, Error> {
        for cell in self.inputs.iter() {
            if let CellKind::WithdrawalRequest(_) = self.config().classify(cell)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn input_headers(&self) -> Result<Vec<Option<InputHeaders>>, Error> {
        try_join_all(self.inputs.iter().map(|cell| async move {
            let headers = match self.config().classify(cell)? {
                CellKind::Deposit | CellKind::Receipt(_) => {
                    Some(InputHeaders::new(self.headers.cell_header(cell).await?))
                }
                CellKind::WithdrawalRequest(deposit_number) => {
                    let (header, deposit_header) = futures::try_join!(
                        self.headers.cell_header(cell),
                        self.headers.header_by_number(deposit_number)
                    )?;
                    Some(InputHeaders::with_deposit(header, deposit_header))
                }
                _ => None,
            };
            Ok::<_, Error>(headers)
        }))
        .await
    }

    pub async fn ckb_delta(&self) -> Result<i128, Error> {
        let headers = self.input_headers().await?;
        self.ckb_delta_with(&headers)
    }

    pub async fn ickb_delta(&self) -> Result<i128, Error> {
        let headers = self.input_headers().await?;
        self.ickb_delta_with(&headers)
    }

    /// Inputs minus outputs, withdrawal requests count for their maximum withdrawable
    fn ckb_delta_with(&self, headers: &[Option<InputHeaders>]) -> Result<i128, Error> {
        let mut delta: i128 = 0;
        for (cell, cell_headers) in self.inputs.iter().zip(headers) {
            let value = match (self.config().classify(cell)?, cell_headers) {
                (
                    CellKind::WithdrawalRequest(_),
                    Some(InputHeaders {
                        header,
                        deposit_header: Some(deposit_header),
                    }),
                ) => dao_maximum_withdraw(
                    deposit_header,
                    header,
                    cell.capacity(),
                    cell.occupied_capacity()?,
                )?,
                _ => cell.capacity(),
            };
            delta = delta
                .checked_add(i128::from(value))
                .ok_or(Error::Overflow("ckb delta"))?;
        }
        for cell in &self.outputs {
            delta = delta
                .checked_sub(i128::from(cell.capacity()))
                .ok_or(Error::Overflow("ckb delta"))?;
        }
        Ok(delta)
    }

    fn ickb_delta_with(&self, headers: &[Option<InputHeaders>]) -> Result<i128, Error> {
        let config = self.config();
        let mut delta: i128 = 0;
        for (cell, cell_headers) in self.inputs.iter().zip(headers) {
            let header = cell_headers.as_ref().map(|headers| &headers.header);
            let value = match (config.classify(cell)?, header) {
                (CellKind::Udt(amount), _) => signed(amount)?,
                (CellKind::Receipt(receipt), Some(header)) => signed(receipt_ickb_value(
                    receipt.deposit_quantity,
                    receipt.deposit_amount,
                    header,
                )?)?,
                (CellKind::Deposit, Some(header)) => {
                    if config.is_ickb_deposit(cell)? {
                        let unoccupied = cell
                            .capacity()
                            .checked_sub(cell.occupied_capacity()?)
                            .ok_or_else(|| {
                                Error::InvalidCellData(format!("{} is underfunded", cell))
                            })?;
                        -signed(ickb_value(unoccupied, header)?)?
                    } else {
                        0
                    }
                }
                _ => 0,
            };
            delta = delta
                .checked_add(value)
                .ok_or(Error::Overflow("ickb delta"))?;
        }
        for cell in &self.outputs {
            if let CellKind::Udt(amount) = config.classify(cell)? {
                delta = delta
                    .checked_sub(signed(amount)?)
                    .ok_or(Error::Overflow("ickb delta"))?;
            }
        }
        Ok(delta)
    }

    /// The only legal change shapes: none, plain capacity, or iCKB tokens
    fn change_cell(&self, ckb_delta: i128, ickb_delta: i128) -> Result<Option<Cell>, Error> {
        let insufficient = Error::InsufficientFunds {
            ckb_delta,
            ickb_delta,
        };
        if ckb_delta == 0 && ickb_delta == 0 {
            return Ok(None);
        }
        let capacity = u64::try_from(ckb_delta).map_err(|_| insufficient.clone())?;
        let output = CellOutput::new_builder()
            .capacity(capacity.pack())
            .lock(self.account_lock.clone());
        if ickb_delta == 0 && capacity >= MIN_CHANGE_CAPACITY {
            return Ok(Some(Cell::new_output(output.build(), Bytes::new())));
        }
        if ickb_delta > 0 && capacity >= MIN_UDT_CHANGE_CAPACITY {
            let output = output
                .type_(Some(self.config().ickb_udt_type()).pack())
                .build();
            let amount = ickb_delta as u128;
            return Ok(Some(Cell::new_output(output, pack_udt_amount(amount))));
        }
        Err(insufficient)
    }

    fn assemble_with_change(
        &self,
        change: Option<Cell>,
        headers: &[Option<InputHeaders>],
    ) -> Result<UnsignedTransaction, Error> {
        let mut outputs = self.outputs.clone();
        outputs.extend(change);
        assemble(self.config(), self.inputs.clone(), outputs, headers)
    }

    /// Balances the transaction in two passes: the first one measures the
    /// size, the second one pays the fee out of the capacity change.
    pub async fn build(&self, fee_rate: u64) -> Result<BuiltTransaction, Error> {
        let headers = self.input_headers().await?;
        let ckb_delta = self.ckb_delta_with(&headers)?;
        let ickb_delta = self.ickb_delta_with(&headers)?;
        log::debug!("CKB delta: {}, iCKB delta: {}", ckb_delta, ickb_delta);

        let change = self.change_cell(ckb_delta, ickb_delta)?;
        let draft = self.assemble_with_change(change, &headers)?;
        let size = tx_size(&draft.transaction.data());
        let fee = calculate_fee(size, fee_rate)?;
        log::info!(
            "Transaction size: {} bytes, fee: {}",
            size,
            HumanCapacity(fee)
        );

        let change = self.change_cell(ckb_delta - i128::from(fee), ickb_delta)?;
        if let Some(change) = change.as_ref() {
            log::info!("Change: {}", HumanCapacity(change.capacity()));
        }
        let transaction = self.assemble_with_change(change.clone(), &headers)?;
        Ok(BuiltTransaction {
            transaction,
            fee,
            change,
        })
    }

    pub async fn build_and_send(self, fee_rate: u64) -> Result<SentTransaction, Error> {
        let BuiltTransaction {
            transaction, fee, ..
        } = self.build(fee_rate).await?;
        let signed_transaction = self.context.signer.sign(&transaction, &self.account_lock)?;
        let tx_hash = send_and_confirm(
            self.context.rpc.as_ref(),
            signed_transaction.clone(),
            self.confirmation,
        )
        .await?;
        Ok(SentTransaction {
            transaction,
            fee,
            signed_transaction,
            tx_hash,
        })
    }
}

fn signed(amount: u128) -> Result<i128, Error> {
    i128::try_from(amount).map_err(|_| Error::Overflow("ickb delta"))
}
