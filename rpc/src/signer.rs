//! Remote signer client. Key material never enters this process; the
//! signer holds the keys and returns a base58check signature.

use {
    crate::error::{Result, RpcError},
    log::debug,
    serde::Deserialize,
    std::time::Duration,
};

/// Generic-operation watermark prepended to the forged bytes before
/// signing.
const OPERATION_WATERMARK: &str = "03";

pub trait SignerClient: Send + Sync {
    /// Sign forged operation bytes (hex, without watermark) for the
    /// configured key. Returns the base58check signature.
    fn sign(&self, op_bytes_hex: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

/// HTTP signer speaking the `POST /keys/<pkh>` convention of the
/// standard remote-signer daemons.
pub struct HttpSignerClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSignerClient {
    /// `base_url` is the signer root; `pkh` selects the signing key.
    pub fn new(base_url: &str, pkh: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: format!("{}/keys/{}", base_url.trim_end_matches('/'), pkh),
            client,
        })
    }
}

impl SignerClient for HttpSignerClient {
    fn sign(&self, op_bytes_hex: &str) -> Result<String> {
        debug!("signing {} bytes of forged operation", op_bytes_hex.len() / 2);
        let body = format!("{OPERATION_WATERMARK}{op_bytes_hex}");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| RpcError::SignerUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::SignerUnreachable(format!(
                "signer returned {}: {}",
                status.as_u16(),
                response.text().unwrap_or_default()
            )));
        }
        let parsed: SignResponse = response
            .json()
            .map_err(|e| RpcError::SignerUnreachable(e.to_string()))?;
        Ok(parsed.signature)
    }
}
