//! Wallet session and read-only chain access.
//!
//! Signing never happens here: the wallet is only asked who is connected,
//! and the chain is only read (chain id, balances).

pub mod rpc;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::WalletIdentity;

pub use rpc::{validate_address, Balance, EvmRpcClient};

/// The user's wallet connection.
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Currently connected identity, if any.
    fn current_user(&self) -> Option<WalletIdentity>;

    /// Ask the user to connect. Returns immediately; connection completes
    /// out of band.
    async fn authenticate(&self);
}

/// Wallet identity supplied through configuration (`WALLET_ADDRESS`).
#[derive(Debug, Default)]
pub struct ConfiguredWallet {
    identity: Option<WalletIdentity>,
    prompts: AtomicUsize,
}

impl ConfiguredWallet {
    /// An address that is not `0x` + 40 hex digits is ignored, leaving the
    /// wallet disconnected.
    pub fn new(address: Option<String>) -> Self {
        let identity = address.and_then(|addr| match validate_address(&addr) {
            Ok(()) => Some(WalletIdentity::new(addr)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring WALLET_ADDRESS");
                None
            }
        });
        Self {
            identity,
            prompts: AtomicUsize::new(0),
        }
    }

    /// How many times authentication has been requested.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl WalletSession for ConfiguredWallet {
    fn current_user(&self) -> Option<WalletIdentity> {
        self.identity.clone()
    }

    async fn authenticate(&self) {
        self.prompts.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("no wallet connected: set WALLET_ADDRESS to your Flow EVM address and resubmit");
    }
}
