use std::time::Duration;

use ckb_sdk::HumanCapacity;
use clap::{App, Arg, ArgMatches};
use ickb_sdk::{estimate_fee_rate, flows, ConfirmationPolicy, SentTransaction};
use ickb_signer::PrivkeySigner;

use super::IckbSubCommand;
use crate::subcommands::{CliSubCommand, Output};
use crate::utils::{
    arg,
    arg_parser::{ArgParser, CapacityParser, DurationParser, FromStrParser, PrivkeyPathParser},
};

enum Flow {
    Deposit(u64),
    WithdrawRequest,
    Withdraw,
}

impl<'a> CliSubCommand for IckbSubCommand<'a> {
    fn process(&mut self, matches: &ArgMatches, debug: bool) -> Result<Output, String> {
        let (flow, m) = match matches.subcommand() {
            ("deposit", Some(m)) => {
                let amount: u64 = CapacityParser.from_matches(m, "amount")?;
                (Flow::Deposit(amount), m)
            }
            ("withdraw-request", Some(m)) => (Flow::WithdrawRequest, m),
            ("withdraw", Some(m)) => (Flow::Withdraw, m),
            _ => return Err(Self::subcommand().generate_usage()),
        };
        let args = TransactArgs::from_matches(m)?;
        let sent = self.runtime.block_on(self.send(flow, args))?;
        Ok(sent_output(&sent, debug))
    }
}

impl<'a> IckbSubCommand<'a> {
    pub fn subcommand() -> App<'static> {
        App::new("ickb")
            .about("Deposit CKB into iCKB / request the withdrawal of a deposit / withdraw mature requests")
            .subcommands(vec![
                App::new("deposit")
                    .about("Deposit capacity into NervosDAO through iCKB, receiving a receipt")
                    .args(&TransactArgs::args())
                    .arg(arg::amount().required(true)),
                App::new("withdraw-request")
                    .about("Turn the deposit of the first spendable receipt into a withdrawal request")
                    .args(&TransactArgs::args()),
                App::new("withdraw")
                    .about("Withdraw every mature withdrawal request of the account")
                    .args(&TransactArgs::args()),
            ])
    }

    async fn send(&self, flow: Flow, args: TransactArgs) -> Result<SentTransaction, String> {
        let (context, account_lock) = self.context(args.signer)?;
        let fee_rate = match args.fee_rate {
            Some(fee_rate) => fee_rate,
            None => estimate_fee_rate(context.rpc.as_ref())
                .await
                .map_err(|err| err.to_string())?,
        };
        let policy = args.policy;
        let result = match flow {
            Flow::Deposit(amount) => {
                flows::deposit(&context, &account_lock, amount, fee_rate, policy).await
            }
            Flow::WithdrawRequest => {
                flows::withdraw_request(&context, &account_lock, fee_rate, policy).await
            }
            Flow::Withdraw => flows::withdraw(&context, &account_lock, fee_rate, policy).await,
        };
        result.map_err(|err| err.to_string())
    }
}

fn sent_output(sent: &SentTransaction, debug: bool) -> Output {
    let mut resp = serde_json::json!({
        "tx_hash": format!("{:#x}", sent.tx_hash),
        "fee": HumanCapacity(sent.fee).to_string(),
    });
    if debug {
        let transaction: ckb_jsonrpc_types::TransactionView =
            sent.signed_transaction.clone().into();
        resp["transaction"] = serde_json::to_value(&transaction)
            .unwrap_or_else(|err| serde_json::Value::String(err.to_string()));
    }
    Output::new_output(resp)
}

struct TransactArgs {
    signer: PrivkeySigner,
    fee_rate: Option<u64>,
    policy: ConfirmationPolicy,
}

impl TransactArgs {
    fn from_matches(m: &ArgMatches) -> Result<Self, String> {
        let signer: PrivkeySigner = PrivkeyPathParser.from_matches(m, "privkey-path")?;
        let fee_rate: Option<u64> =
            FromStrParser::<u64>::default().from_matches_opt(m, "fee-rate", false)?;
        let interval: Duration = DurationParser.from_matches(m, "poll-interval")?;
        let max_attempts: u32 = FromStrParser::<u32>::default().from_matches(m, "poll-attempts")?;
        if max_attempts == 0 {
            return Err("<poll-attempts> must be greater than 0".to_string());
        }
        Ok(Self {
            signer,
            fee_rate,
            policy: ConfirmationPolicy {
                max_attempts,
                interval,
            },
        })
    }

    fn args<'a>() -> Vec<Arg<'a>> {
        vec![
            arg::privkey_path().required(true),
            arg::fee_rate(),
            arg::poll_interval(),
            arg::poll_attempts(),
        ]
    }
}
