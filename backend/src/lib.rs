//! # Cinema - movie NFT upload, moderation and wallet agent
//!
//! Cinema takes a movie and its thumbnail from the upload form, pins both to
//! IPFS through short-lived signed URLs, and hands back the public gateway
//! link used as the NFT's media. A conversational agent can read the wallet's
//! Flow EVM state and screen videos for explicit content.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Upload form │────▶│   Wallet +  │────▶│  Signed URL │────▶│  Pin files  │
//! │ (title, …)  │     │  validation │     │  (gateway)  │     │  (IPFS CID) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────────────┐
//! │ Chat / HTTP │────▶│    Agent    │────▶│ wallet RPC · video moderation │
//! └─────────────┘     └─────────────┘     └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cinema::{ConfiguredWallet, GatewayClient, GatewayResolver, MediaFile, PinataClient,
//!              UploadController, UploadRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut controller = UploadController::new(
//!         ConfiguredWallet::new(Some("0x…".into())),
//!         GatewayClient::new("http://localhost:3000/api/upload-url"),
//!         PinataClient::new(std::env::var("PINATA_JWT").ok(), GatewayResolver::new("gateway.pinata.cloud")),
//!     );
//!     let request = UploadRequest::new(
//!         "Cosmic Odyssey",
//!         MediaFile::from_path("odyssey.mp4").await.unwrap(),
//!         MediaFile::from_path("poster.png").await.unwrap(),
//!     );
//!     let submission = controller.submit(&request).await.unwrap();
//!     println!("{}", submission.link);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment settings
//! - [`models`] - Media files, form, upload results
//! - [`gateway`] - Signed upload URLs
//! - [`pinning`] - IPFS pinning and gateway links
//! - [`wallet`] - Wallet session and EVM reads
//! - [`flow`] - Upload flow controller
//! - [`moderation`] - Explicit-content detection
//! - [`agent`] - Conversational agent
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Upload pipeline
pub mod flow;
pub mod gateway;
pub mod pinning;
pub mod wallet;

// Moderation & agent
pub mod agent;
pub mod moderation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors & config
// =============================================================================

pub use config::Settings;
pub use error::{
    AgentError, ConfigError, FlowError, GatewayError, ModerationError, ServerError, UploadError, ValidationError,
    WalletError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{MediaFile, SignedUploadTarget, UploadRequest, UploadResult, WalletIdentity};

// =============================================================================
// Re-exports - Upload pipeline
// =============================================================================

pub use flow::{FlowEvent, FlowState, Submission, UploadController};
pub use gateway::{GatewayClient, PinataSigner, SignOptions, UrlIssuer};
pub use pinning::{upload_files, FileUploader, GatewayResolver, PinataClient};
pub use wallet::{ConfiguredWallet, EvmRpcClient, WalletSession};

// =============================================================================
// Re-exports - Moderation, agent & server
// =============================================================================

pub use agent::{Agent, ChatModel, MemorySaver, OpenAiChat};
pub use api::{router, serve, start_server, ActivityLog, AppState};
pub use moderation::{Likelihood, Verdict, VideoAnalyzer};
