use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct JsonrpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// One call of a batch, `id` is its position in the batch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonrpcRequest {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    pub method: String,
    pub params: Vec<serde_json::Value>,
}

impl JsonrpcRequest {
    pub fn new(id: u64, method: String, params: Vec<serde_json::Value>) -> JsonrpcRequest {
        JsonrpcRequest {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: serde_json::Value::from(id),
            method,
            params,
        }
    }
}

/// Exactly one of `result` and `error` is set by a conforming server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonrpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonrpcError>,
}

impl JsonrpcResponse {
    pub fn new_result(id: serde_json::Value, result: serde_json::Value) -> JsonrpcResponse {
        JsonrpcResponse {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn into_result(self) -> Result<serde_json::Value, Error> {
        match self.error {
            Some(err) => Err(Error::Rpc(format!("{} (code: {})", err.message, err.code))),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}
