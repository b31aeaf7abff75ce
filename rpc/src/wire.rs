//! Wire types for the node's operation endpoints.
//!
//! The node's JSON conventions string-encode every numeric field of an
//! operation, so the transfer content carries `u64`s internally and
//! (de)serializes them through [`string_u64`]. Envelope builders cover
//! the forge / run_operation / preapply bodies; signature decoding
//! turns a base58check signature into the raw 64-byte hex suffix the
//! injection endpoint expects.

use {
    crate::error::{Result, RpcError},
    serde::{Deserialize, Serialize},
};

/// Raw signature size appended to the forged bytes at injection.
pub const SIGNATURE_BYTES_SIZE: usize = 64;

/// Placeholder signature accepted by the simulation endpoint; the node
/// does not verify it there.
pub const DUMMY_SIGNATURE: &str =
    "edsigtXomBKi5CTRf5cjATJWSyaRvhfYNHqSUGrn4SdbYRcGwQrUGjzEfQDTuqHhuA8b2d8NarZjz8TRf65WkpQmo423BtomS8Q";

/// String-encoded `u64`, the node's convention for mutez/gas fields.
pub mod string_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One transaction inside a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferContent {
    pub kind: String,
    pub source: String,
    pub destination: String,
    #[serde(with = "string_u64")]
    pub fee: u64,
    #[serde(with = "string_u64")]
    pub counter: u64,
    #[serde(with = "string_u64")]
    pub gas_limit: u64,
    #[serde(with = "string_u64")]
    pub storage_limit: u64,
    #[serde(with = "string_u64")]
    pub amount: u64,
}

impl TransferContent {
    pub fn transaction(
        source: &str,
        destination: &str,
        amount: u64,
        counter: u64,
        fee: u64,
        gas_limit: u64,
        storage_limit: u64,
    ) -> Self {
        Self {
            kind: "transaction".to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            fee,
            counter,
            gas_limit,
            storage_limit,
            amount,
        }
    }
}

/// Body of `helpers/forge/operations`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgeRequest<'a> {
    pub branch: &'a str,
    pub contents: &'a [TransferContent],
}

#[derive(Debug, Clone, Serialize)]
struct SignedEnvelope<'a> {
    branch: &'a str,
    contents: &'a [TransferContent],
    signature: &'a str,
}

/// Body of `helpers/scripts/run_operation`: the operation wrapped with
/// the chain id and a dummy signature.
#[derive(Debug, Clone, Serialize)]
pub struct RunOperationRequest<'a> {
    operation: SignedEnvelope<'a>,
    chain_id: &'a str,
}

impl<'a> RunOperationRequest<'a> {
    pub fn new(branch: &'a str, contents: &'a [TransferContent], chain_id: &'a str) -> Self {
        Self {
            operation: SignedEnvelope {
                branch,
                contents,
                signature: DUMMY_SIGNATURE,
            },
            chain_id,
        }
    }
}

/// One element of the `helpers/preapply/operations` body (the endpoint
/// takes an array of these).
#[derive(Debug, Clone, Serialize)]
pub struct PreapplyOperation<'a> {
    pub protocol: &'a str,
    pub branch: &'a str,
    pub contents: &'a [TransferContent],
    pub signature: &'a str,
}

// ── Simulation results ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RunOperationResponse {
    pub contents: Vec<SimulatedContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedContent {
    pub metadata: SimulationMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationMetadata {
    pub operation_result: Option<OperationResult>,
    #[serde(default)]
    pub internal_operation_results: Vec<InternalOperationResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationResult {
    pub status: String,
    pub consumed_milligas: Option<String>,
    pub paid_storage_size_diff: Option<String>,
    #[serde(default)]
    pub errors: Vec<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InternalOperationResult {
    pub result: OperationResult,
}

impl OperationResult {
    pub fn is_applied(&self) -> bool {
        self.status == "applied"
    }

    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }

    /// First error id, for the report's reason column.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.id.as_str())
    }
}

fn milligas_to_gas(milligas: Option<&String>) -> u64 {
    milligas
        .and_then(|raw| raw.parse::<u64>().ok())
        .map(|mg| mg.div_ceil(1_000))
        .unwrap_or(0)
}

impl SimulationMetadata {
    /// Total consumed gas: the main result plus every internal
    /// operation's result, milligas rounded up per operation.
    pub fn consumed_gas(&self) -> u64 {
        let mut gas = milligas_to_gas(
            self.operation_result
                .as_ref()
                .and_then(|r| r.consumed_milligas.as_ref()),
        );
        for internal in &self.internal_operation_results {
            gas += milligas_to_gas(internal.result.consumed_milligas.as_ref());
        }
        gas
    }

    /// Total paid storage size diff across main and internal results.
    pub fn consumed_storage(&self) -> u64 {
        let main: u64 = self
            .operation_result
            .as_ref()
            .and_then(|r| r.paid_storage_size_diff.as_ref())
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        let internal: u64 = self
            .internal_operation_results
            .iter()
            .filter_map(|i| i.result.paid_storage_size_diff.as_ref())
            .filter_map(|raw| raw.parse::<u64>().ok())
            .sum();
        main + internal
    }
}

// ── Head block ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct HeadHeader {
    pub level: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadMetadata {
    pub protocol: String,
}

/// The slice of a block response the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadBlock {
    pub hash: String,
    pub chain_id: String,
    pub header: HeadHeader,
    pub metadata: HeadMetadata,
}

// ── Signature decoding ───────────────────────────────────────────────

// (prefix, base58 payload prefix length in bytes)
const SIGNATURE_PREFIXES: [(&str, usize); 3] = [("edsig", 5), ("p2sig", 4), ("sig", 3)];

/// Strip the base58check envelope from a signer response and return the
/// raw 64 signature bytes as hex, ready to append to the forged bytes.
pub fn decode_signature(signature: &str) -> Result<String> {
    let prefix_len = SIGNATURE_PREFIXES
        .iter()
        .find(|(prefix, _)| signature.starts_with(prefix))
        .map(|(_, len)| *len)
        .ok_or_else(|| RpcError::BadSignature(signature.to_string()))?;

    let decoded = bs58::decode(signature)
        .with_check(None)
        .into_vec()
        .map_err(|_| RpcError::BadSignature(signature.to_string()))?;

    // Length check before slicing: a crafted payload shorter than the
    // prefix must surface as a wire error, not a panic.
    if decoded.len() != prefix_len + SIGNATURE_BYTES_SIZE {
        return Err(RpcError::BadSignature(signature.to_string()));
    }
    Ok(hex::encode(&decoded[prefix_len..]))
}
