//! Error types for the cinema upload pipeline and its services.
//!
//! Each concern gets its own error enum:
//!
//! - [`ConfigError`] - Malformed configuration
//! - [`GatewayError`] - Signed upload URL requests
//! - [`UploadError`] - Pinning uploads
//! - [`ValidationError`] - Upload form validation
//! - [`FlowError`] - Top-level upload flow failures
//! - [`ModerationError`] - Video analysis
//! - [`WalletError`] - Read-only chain queries
//! - [`AgentError`] - Conversational agent
//! - [`ServerError`] - HTTP server
//!
//! Conversion into the enclosing error is automatic via `From`,
//! so `?` works across boundaries.

use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting could not be parsed.
    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

// =============================================================================
// Gateway Errors
// =============================================================================

/// Errors while obtaining a signed upload URL.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network call failed.
    #[error("Error fetching URL - {0}")]
    Request(String),

    /// Endpoint answered with a non-success status.
    #[error("Gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// Body had no usable `url`.
    #[error("Gateway response did not contain an upload URL")]
    MissingUrl,

    /// Signing credential not configured.
    #[error("Missing pinning credential (PINATA_JWT)")]
    MissingCredential,
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Errors while pinning a file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Pinning credential not configured.
    #[error("Missing pinning credential (PINATA_JWT)")]
    MissingCredential,

    /// Network call failed.
    #[error("Error uploading '{file}' to IPFS. Error - {message}")]
    Request { file: String, message: String },

    /// Pinning service answered with a non-success status.
    #[error("Pinning service rejected '{file}' (HTTP {status}): {body}")]
    Status { file: String, status: u16, body: String },

    /// Response did not carry a content address.
    #[error("Upload of '{0}' returned no CID")]
    MissingCid(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Reasons an upload form is rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty or blank.
    #[error("Movie title is required")]
    MissingTitle,

    /// No movie file selected.
    #[error("Movie file is required")]
    MissingMovie,

    /// No thumbnail selected.
    #[error("Thumbnail image is required")]
    MissingThumbnail,

    /// File is not of the accepted media type.
    #[error("'{file}' is {actual}, expected {expected}")]
    WrongMediaType {
        file: String,
        expected: &'static str,
        actual: String,
    },
}

// =============================================================================
// Flow Errors (top-level)
// =============================================================================

/// Failures surfaced by the upload flow controller.
#[derive(Debug, Error)]
pub enum FlowError {
    /// No wallet is connected; authentication has been requested.
    #[error("Please connect wallet first!")]
    WalletNotConnected,

    /// Form is incomplete.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Signed URL could not be obtained.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A file failed to pin.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl FlowError {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            FlowError::WalletNotConnected => "Please connect wallet first!",
            FlowError::Validation(_) => "Please fill all fields",
            FlowError::Gateway(_) => "Failed to fetch upload URL, Please try again !",
            FlowError::Upload(_) => "Upload failed, please try again.",
        }
    }
}

// =============================================================================
// Moderation Errors
// =============================================================================

/// Errors from the video analysis service.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Input is not a `gs://` URI.
    #[error("Invalid input. Must be a Google Cloud Storage path starting with 'gs://'.")]
    InvalidUri(String),

    /// Access token not configured.
    #[error("Missing VIDEO_INTELLIGENCE_TOKEN environment variable")]
    MissingToken,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// API answered with an error.
    #[error("API error: {0}")]
    Api(String),

    /// The long-running operation finished with an error.
    #[error("Annotation failed: {0}")]
    Operation(String),

    /// Operation did not finish in the allotted polls.
    #[error("Annotation still running after {0} polls")]
    Timeout(u32),
}

// =============================================================================
// Wallet Errors
// =============================================================================

/// Errors from chain queries.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet address configured.
    #[error("No wallet address configured (WALLET_ADDRESS)")]
    NotConfigured,

    /// Address is not a 0x-prefixed 20-byte hex string.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// HTTP request failed.
    #[error("RPC request failed: {0}")]
    Request(String),

    /// Node answered with a JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Result could not be decoded.
    #[error("Invalid RPC result: {0}")]
    InvalidResult(String),
}

// =============================================================================
// Agent Errors
// =============================================================================

/// Errors from the conversational agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing API key.
    #[error("I need an OPENAI_API_KEY in your .env file to power my intelligence.")]
    MissingApiKey,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// API answered with an error.
    #[error("API error: {0}")]
    Api(String),

    /// Response body was not understood.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// Model kept calling tools past the iteration cap.
    #[error("Agent stopped after {0} tool rounds without an answer")]
    TooManySteps(usize),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Feature needs configuration that is absent.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Upstream service failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Could not bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GatewayError> for ServerError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingCredential => ServerError::Unavailable(err.to_string()),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        ServerError::Upstream(err.to_string())
    }
}

impl From<ModerationError> for ServerError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::InvalidUri(_) => ServerError::BadRequest(err.to_string()),
            ModerationError::MissingToken => ServerError::Unavailable(err.to_string()),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type for pinning operations.
pub type PinResult<T> = Result<T, UploadError>;

/// Result type for moderation operations.
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Result type for chain queries.
pub type WalletResult<T> = Result<T, WalletError>;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
