//! Coalesces the RPC calls issued within a short window into one JSONRPC batch.
//!
//! The pending table is owned by a single task, callers reach it through a
//! channel. Once the window elapses the whole table is moved into a flush task
//! and a fresh one starts collecting, so enqueues racing a flush always land
//! in the next batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

use super::jsonrpc::JsonrpcRequest;
use super::transport::BatchTransport;
use crate::error::Error;

pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(50);

type Responder = oneshot::Sender<Result<Value, Error>>;

struct PendingCall {
    key: String,
    method: String,
    params: Vec<Value>,
    responder: Responder,
}

struct PendingEntry {
    method: String,
    params: Vec<Value>,
    responders: Vec<Responder>,
}

/// Calls keyed by method and arguments, identical calls share one batch slot
#[derive(Default)]
struct PendingTable {
    slots: HashMap<String, usize>,
    entries: Vec<PendingEntry>,
}

impl PendingTable {
    fn push(&mut self, call: PendingCall) {
        if let Some(slot) = self.slots.get(&call.key) {
            self.entries[*slot].responders.push(call.responder);
            return;
        }
        self.slots.insert(call.key, self.entries.len());
        self.entries.push(PendingEntry {
            method: call.method,
            params: call.params,
            responders: vec![call.responder],
        });
    }
}

#[derive(Clone)]
pub struct RpcBatcher {
    sender: mpsc::UnboundedSender<PendingCall>,
}

impl RpcBatcher {
    /// Must be called from within a tokio runtime
    pub fn spawn(transport: Arc<dyn BatchTransport>, window: Duration) -> RpcBatcher {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(collect_batches(transport, window, receiver));
        RpcBatcher { sender }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, Error> {
        let (responder, response) = oneshot::channel();
        let call = PendingCall {
            key: request_key(method, &params),
            method: method.to_owned(),
            params,
            responder,
        };
        self.sender
            .send(call)
            .map_err(|_| Error::Transport("rpc batcher stopped".to_owned()))?;
        response
            .await
            .map_err(|_| Error::Transport("rpc batcher dropped the request".to_owned()))?
    }
}

fn request_key(method: &str, params: &[Value]) -> String {
    format!("{}/{}", method, Value::Array(params.to_vec()))
}

async fn collect_batches(
    transport: Arc<dyn BatchTransport>,
    window: Duration,
    mut receiver: mpsc::UnboundedReceiver<PendingCall>,
) {
    while let Some(first) = receiver.recv().await {
        let mut pending = PendingTable::default();
        pending.push(first);

        let deadline = time::sleep(window);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                call = receiver.recv() => match call {
                    Some(call) => pending.push(call),
                    None => break,
                },
            }
        }
        tokio::spawn(flush(Arc::clone(&transport), pending));
    }
}

async fn flush(transport: Arc<dyn BatchTransport>, pending: PendingTable) {
    let entries = pending.entries;
    let requests = entries
        .iter()
        .enumerate()
        .map(|(id, entry)| JsonrpcRequest::new(id as u64, entry.method.clone(), entry.params.clone()))
        .collect::<Vec<_>>();
    log::debug!("flush {} batched rpc requests", requests.len());

    let responses = match transport.call_batch(requests).await {
        Ok(responses) if responses.len() == entries.len() => responses,
        Ok(responses) => {
            let err = Error::Rpc(format!(
                "batch response has {} entries, expected {}",
                responses.len(),
                entries.len()
            ));
            return reject_all(entries, err);
        }
        Err(err) => return reject_all(entries, err),
    };
    for (entry, response) in entries.into_iter().zip(responses) {
        let result = response.into_result();
        for responder in entry.responders {
            // The caller may have given up waiting
            let _ = responder.send(result.clone());
        }
    }
}

fn reject_all(entries: Vec<PendingEntry>, err: Error) {
    log::warn!("rpc batch of {} requests failed: {}", entries.len(), err);
    for responder in entries.into_iter().flat_map(|entry| entry.responders) {
        let _ = responder.send(Err(err.clone()));
    }
}
