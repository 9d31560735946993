//! Application configuration.
//!
//! Everything is read from the process environment once at startup
//! (after `.env` has been loaded by the binary). Credentials are optional
//! here: a missing credential makes the call that needs it fail, it never
//! stops the process from starting.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default pinning API base (signing endpoint lives under it).
pub const DEFAULT_PINATA_API_URL: &str = "https://uploads.pinata.cloud/v3";

/// Default public IPFS gateway used to resolve CIDs into links.
pub const DEFAULT_PINATA_GATEWAY: &str = "gateway.pinata.cloud";

/// Default signed URL lifetime in seconds.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 60;

/// Flow EVM testnet JSON-RPC endpoint.
pub const DEFAULT_EVM_RPC_URL: &str = "https://testnet.evm.nodes.onflow.org";

/// Network identifier that enables the faucet hint in the agent prompt.
pub const FLOW_TESTNET: &str = "flow-testnet";

/// OpenAI-compatible chat completions base URL.
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Video Intelligence REST API base URL.
pub const DEFAULT_VIDEO_INTELLIGENCE_URL: &str = "https://videointelligence.googleapis.com/v1";

/// Default HTTP port for `serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings for every component.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Endpoint returning `{ "url": ... }` signed upload targets.
    pub gateway_url: String,
    /// Hostname of the IPFS gateway used for links.
    pub pinata_gateway: String,
    /// Pinning service JWT.
    pub pinata_jwt: Option<String>,
    /// Pinning API base for URL signing.
    pub pinata_api_url: String,
    /// Lifetime of signed URLs issued by `serve`.
    pub signed_url_expiry: Duration,
    /// Largest file a signed URL accepts, in bytes.
    pub max_upload_size: Option<u64>,
    /// Connected wallet, if any.
    pub wallet_address: Option<String>,
    /// Network identifier reported by the wallet.
    pub network_id: String,
    /// EVM JSON-RPC endpoint.
    pub evm_rpc_url: String,
    /// Chat completions API key.
    pub openai_api_key: Option<String>,
    /// Chat model name.
    pub openai_model: String,
    /// Chat completions base URL.
    pub openai_api_url: String,
    /// OAuth bearer token for the Video Intelligence API.
    pub video_intelligence_token: Option<String>,
    /// Video Intelligence base URL.
    pub video_intelligence_url: String,
    /// HTTP port for `serve`.
    pub port: u16,
}

impl Settings {
    /// Read settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "PORT",
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let signed_url_expiry = match var("PINATA_SIGNED_URL_EXPIRY") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(
                |e: std::num::ParseIntError| ConfigError::Invalid {
                    name: "PINATA_SIGNED_URL_EXPIRY",
                    message: e.to_string(),
                },
            )?),
            None => Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS),
        };

        let max_upload_size = match var("PINATA_MAX_FILE_SIZE") {
            Some(raw) => Some(raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "PINATA_MAX_FILE_SIZE",
                message: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            gateway_url: var("CINEMA_GATEWAY_URL")
                .or_else(|| var("SERVER_URL"))
                .unwrap_or_else(|| format!("http://localhost:{}/api/upload-url", port)),
            pinata_gateway: var("PINATA_GATEWAY").unwrap_or_else(|| DEFAULT_PINATA_GATEWAY.to_string()),
            pinata_jwt: var("PINATA_JWT"),
            pinata_api_url: var("PINATA_API_URL").unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
            signed_url_expiry,
            max_upload_size,
            wallet_address: var("WALLET_ADDRESS"),
            network_id: var("NETWORK_ID").unwrap_or_else(|| FLOW_TESTNET.to_string()),
            evm_rpc_url: var("EVM_RPC_URL").unwrap_or_else(|| DEFAULT_EVM_RPC_URL.to_string()),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_api_url: var("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
            video_intelligence_token: var("VIDEO_INTELLIGENCE_TOKEN"),
            video_intelligence_url: var("VIDEO_INTELLIGENCE_URL")
                .unwrap_or_else(|| DEFAULT_VIDEO_INTELLIGENCE_URL.to_string()),
            port,
        })
    }

    /// Whether the configured network offers a faucet.
    pub fn can_use_faucet(&self) -> bool {
        self.network_id == FLOW_TESTNET
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: format!("http://localhost:{}/api/upload-url", DEFAULT_PORT),
            pinata_gateway: DEFAULT_PINATA_GATEWAY.to_string(),
            pinata_jwt: None,
            pinata_api_url: DEFAULT_PINATA_API_URL.to_string(),
            signed_url_expiry: Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS),
            max_upload_size: None,
            wallet_address: None,
            network_id: FLOW_TESTNET.to_string(),
            evm_rpc_url: DEFAULT_EVM_RPC_URL.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            video_intelligence_token: None,
            video_intelligence_url: DEFAULT_VIDEO_INTELLIGENCE_URL.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Non-empty, trimmed environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
