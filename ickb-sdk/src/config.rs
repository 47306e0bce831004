use std::fmt;

use ckb_jsonrpc_types as rpc_types;
use ckb_types::{
    bytes::Bytes,
    core::ScriptHashType,
    packed::{self, Script},
    prelude::*,
    H256,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct ScriptId {
    pub code_hash: H256,
    pub hash_type: rpc_types::ScriptHashType,
}

impl ScriptId {
    pub fn to_script(&self, args: Bytes) -> Script {
        Script::new_builder()
            .code_hash(self.code_hash.pack())
            .hash_type(ScriptHashType::from(self.hash_type.clone()).into())
            .args(args.pack())
            .build()
    }

    /// Matches code hash and hash type, ignoring args
    pub fn matches(&self, script: &Script) -> bool {
        let hash_type: packed::Byte = ScriptHashType::from(self.hash_type.clone()).into();
        script.code_hash() == self.code_hash.pack() && script.hash_type() == hash_type
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptItem {
    #[serde(flatten)]
    pub script_id: ScriptId,
    pub cell_dep: rpc_types::CellDep,
}

#[derive(Clone, Copy, Hash, Debug, Eq, PartialEq)]
pub enum ScriptName {
    Secp256k1Blake160,
    Dao,
    Sudt,
    /// Lock of iCKB owned NervosDAO deposits
    DepositLock,
    /// Lock of the per-account owner marker cell
    OwnerLock,
    /// Type of the deposit receipts
    ReceiptType,
    /// Lock of receipts, args is the owner account lock hash
    ClaimLock,
    DomainLogic,
}

impl ScriptName {
    /// Cell deps are emitted following this order
    pub const ALL: [ScriptName; 8] = [
        ScriptName::Dao,
        ScriptName::Secp256k1Blake160,
        ScriptName::Sudt,
        ScriptName::DepositLock,
        ScriptName::OwnerLock,
        ScriptName::ReceiptType,
        ScriptName::ClaimLock,
        ScriptName::DomainLogic,
    ];
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let output = match self {
            ScriptName::Secp256k1Blake160 => "secp256k1_blake160",
            ScriptName::Dao => "dao",
            ScriptName::Sudt => "sudt",
            ScriptName::DepositLock => "deposit_lock",
            ScriptName::OwnerLock => "owner_lock",
            ScriptName::ReceiptType => "receipt_type",
            ScriptName::ClaimLock => "claim_lock",
            ScriptName::DomainLogic => "domain_logic",
        };
        write!(f, "{}", output)
    }
}

/// Read-only script registry, injected into every component that needs it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub secp256k1_blake160: ScriptItem,
    pub dao: ScriptItem,
    pub sudt: ScriptItem,
    pub deposit_lock: ScriptItem,
    pub owner_lock: ScriptItem,
    pub receipt_type: ScriptItem,
    pub claim_lock: ScriptItem,
    pub domain_logic: ScriptItem,
    #[serde(default)]
    pub extra_cell_deps: Vec<rpc_types::CellDep>,
}

impl ScriptConfig {
    pub fn item(&self, name: ScriptName) -> &ScriptItem {
        match name {
            ScriptName::Secp256k1Blake160 => &self.secp256k1_blake160,
            ScriptName::Dao => &self.dao,
            ScriptName::Sudt => &self.sudt,
            ScriptName::DepositLock => &self.deposit_lock,
            ScriptName::OwnerLock => &self.owner_lock,
            ScriptName::ReceiptType => &self.receipt_type,
            ScriptName::ClaimLock => &self.claim_lock,
            ScriptName::DomainLogic => &self.domain_logic,
        }
    }

    /// The named script with empty args
    pub fn script(&self, name: ScriptName) -> Script {
        self.item(name).script_id.to_script(Bytes::new())
    }

    pub fn dao_type(&self) -> Script {
        self.script(ScriptName::Dao)
    }

    /// sUDT type of the iCKB token, args is the domain logic script hash
    pub fn ickb_udt_type(&self) -> Script {
        let domain_logic_hash = self.script(ScriptName::DomainLogic).calc_script_hash();
        self.sudt
            .script_id
            .to_script(Bytes::from(domain_logic_hash.as_slice().to_vec()))
    }

    /// Receipt lock of `account_lock`
    pub fn claim_lock(&self, account_lock: &Script) -> Script {
        let lock_hash = account_lock.calc_script_hash();
        self.claim_lock
            .script_id
            .to_script(Bytes::from(lock_hash.as_slice().to_vec()))
    }

    /// Protocol cell deps, deduplicated, in `ScriptName::ALL` order followed by the extra ones
    pub fn cell_deps(&self) -> Vec<packed::CellDep> {
        let mut cell_deps: Vec<packed::CellDep> = Vec::new();
        let all = ScriptName::ALL
            .iter()
            .map(|name| self.item(*name).cell_dep.clone())
            .chain(self.extra_cell_deps.iter().cloned());
        for cell_dep in all {
            let cell_dep: packed::CellDep = cell_dep.into();
            if !cell_deps.contains(&cell_dep) {
                cell_deps.push(cell_dep);
            }
        }
        cell_deps
    }
}
