//! Blocking HTTP client for the node RPC surface.

use {
    crate::{
        error::{Result, RpcError},
        wire::{ForgeRequest, PreapplyOperation, RunOperationRequest, RunOperationResponse},
    },
    log::{debug, warn},
    serde::de::DeserializeOwned,
    std::time::Duration,
};

pub use crate::wire::HeadBlock;

const COMM_HEAD: &str = "/chains/main/blocks/head";
/// Branch source for payments: ten blocks behind head so a small
/// reorg cannot orphan the batch.
const COMM_PAYMENT_HEAD: &str = "/chains/main/blocks/head~10";
const COMM_RUNOPS: &str = "/chains/main/blocks/head/helpers/scripts/run_operation";
const COMM_FORGE: &str = "/chains/main/blocks/head/helpers/forge/operations";
const COMM_PREAPPLY: &str = "/chains/main/blocks/head/helpers/preapply/operations";
const COMM_INJECT: &str = "/injection/operation";

/// GET requests are retried this many times on transport errors and
/// 5xx responses. POSTs are never retried here.
const MAX_GET_ATTEMPTS: u32 = 3;
const GET_RETRY_DELAY: Duration = Duration::from_secs(1);

/// The node RPC operations the pipeline needs. Object-safe so the
/// executor can run against an in-memory fake in tests.
pub trait NodeClient: Send + Sync {
    fn head(&self) -> Result<HeadBlock>;
    /// `head~10`, the branch payments are forged against.
    fn payment_head(&self) -> Result<HeadBlock>;
    fn counter(&self, address: &str) -> Result<u64>;
    fn balance(&self, address: &str) -> Result<u64>;
    fn run_operation(&self, request: &RunOperationRequest) -> Result<RunOperationResponse>;
    /// Returns the forged operation as a hex string.
    fn forge(&self, request: &ForgeRequest) -> Result<String>;
    fn preapply(&self, operations: &[PreapplyOperation]) -> Result<serde_json::Value>;
    /// Submits signed bytes, returns the operation hash.
    fn inject(&self, signed_bytes_hex: &str) -> Result<String>;
    /// Operation hashes of the block at `level`, grouped by validation
    /// pass.
    fn operation_hashes(&self, level: u64) -> Result<Vec<Vec<String>>>;
}

pub struct HttpNodeClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpNodeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut last_err = None;
        for attempt in 1..=MAX_GET_ATTEMPTS {
            match self.get_once(path) {
                Ok(value) => return Ok(value),
                Err(err @ RpcError::Status { status, .. }) if status < 500 => return Err(err),
                Err(err) => {
                    warn!("GET {path} attempt {attempt}/{MAX_GET_ATTEMPTS} failed: {err}");
                    last_err = Some(err);
                    if attempt < MAX_GET_ATTEMPTS {
                        std::thread::sleep(GET_RETRY_DELAY * attempt);
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| RpcError::BadResponse {
            path: path.to_string(),
            reason: "no attempt made".to_string(),
        }))
    }

    fn get_once<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send()?;
        Self::decode(path, response)
    }

    fn post<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!("POST {path}");
        let response = self.client.post(self.url(path)).json(body).send()?;
        Self::decode(path, response)
    }

    fn decode<T: DeserializeOwned>(path: &str, response: reqwest::blocking::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }

    /// The node returns counters and balances as JSON strings.
    pub(crate) fn get_numeric(&self, path: &str) -> Result<u64> {
        let raw: String = self.get(path)?;
        raw.parse().map_err(|_| RpcError::BadResponse {
            path: path.to_string(),
            reason: format!("expected numeric string, got '{raw}'"),
        })
    }
}

impl NodeClient for HttpNodeClient {
    fn head(&self) -> Result<HeadBlock> {
        self.get(COMM_HEAD)
    }

    fn payment_head(&self) -> Result<HeadBlock> {
        self.get(COMM_PAYMENT_HEAD)
    }

    fn counter(&self, address: &str) -> Result<u64> {
        self.get_numeric(&format!(
            "/chains/main/blocks/head/context/contracts/{address}/counter"
        ))
    }

    fn balance(&self, address: &str) -> Result<u64> {
        self.get_numeric(&format!(
            "/chains/main/blocks/head/context/contracts/{address}/balance"
        ))
    }

    fn run_operation(&self, request: &RunOperationRequest) -> Result<RunOperationResponse> {
        self.post(COMM_RUNOPS, request)
    }

    fn forge(&self, request: &ForgeRequest) -> Result<String> {
        self.post(COMM_FORGE, request)
    }

    fn preapply(&self, operations: &[PreapplyOperation]) -> Result<serde_json::Value> {
        self.post(COMM_PREAPPLY, &operations)
    }

    fn inject(&self, signed_bytes_hex: &str) -> Result<String> {
        self.post(COMM_INJECT, &signed_bytes_hex)
    }

    fn operation_hashes(&self, level: u64) -> Result<Vec<Vec<String>>> {
        self.get(&format!("/chains/main/blocks/{level}/operation_hashes"))
    }
}
