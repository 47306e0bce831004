use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::jsonrpc::{JsonrpcRequest, JsonrpcResponse};
use crate::error::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends one JSONRPC batch, responses are returned in request order.
pub trait BatchTransport: Send + Sync {
    fn call_batch(
        &self,
        requests: Vec<JsonrpcRequest>,
    ) -> BoxFuture<'_, Result<Vec<JsonrpcResponse>, Error>>;
}

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: &str) -> Result<HttpTransport, Error> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(HttpTransport {
            url: url.to_owned(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl BatchTransport for HttpTransport {
    fn call_batch(
        &self,
        requests: Vec<JsonrpcRequest>,
    ) -> BoxFuture<'_, Result<Vec<JsonrpcResponse>, Error>> {
        async move {
            let responses: Vec<JsonrpcResponse> = self
                .client
                .post(self.url.as_str())
                .json(&requests)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(sort_by_request_order(responses))
        }
        .boxed()
    }
}

// Servers are allowed to answer a batch in any order
fn sort_by_request_order(mut responses: Vec<JsonrpcResponse>) -> Vec<JsonrpcResponse> {
    responses.sort_by_key(|response| response.id.as_u64().unwrap_or(u64::max_value()));
    responses
}
