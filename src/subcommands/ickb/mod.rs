mod command;

use std::sync::Arc;

use ckb_types::{packed::Script, prelude::*, H256};
use ickb_sdk::{
    rpc::DEFAULT_BATCH_WINDOW, BuilderContext, CkbRpcClient, HttpTransport, IndexerCellCollector,
};
use ickb_signer::PrivkeySigner;
use tokio::runtime::Runtime;

use crate::utils::config::GlobalConfig;

pub struct IckbSubCommand<'a> {
    runtime: &'a Runtime,
    config: &'a GlobalConfig,
}

impl<'a> IckbSubCommand<'a> {
    pub fn new(runtime: &'a Runtime, config: &'a GlobalConfig) -> IckbSubCommand<'a> {
        IckbSubCommand { runtime, config }
    }

    /// Wires the node client, the indexer collector and the signer together.
    ///
    /// Must run inside the runtime: the rpc batcher spawns its flush task.
    fn context(&self, signer: PrivkeySigner) -> Result<(BuilderContext, Script), String> {
        let scripts = self.config.load_script_config()?;
        let transport = HttpTransport::new(self.config.url()).map_err(|err| err.to_string())?;
        let client = CkbRpcClient::new(Arc::new(transport), DEFAULT_BATCH_WINDOW);
        let account_lock = signer.lock_script(&scripts);
        let lock_hash: H256 = account_lock.calc_script_hash().unpack();
        log::debug!("account lock hash: {:#x}", lock_hash);
        let context = BuilderContext {
            config: Arc::new(scripts),
            rpc: Arc::new(client.clone()),
            collector: Arc::new(IndexerCellCollector::new(client)),
            signer: Arc::new(signer),
        };
        Ok((context, account_lock))
    }
}
