//! CID to gateway link conversion.

/// Resolves content identifiers into links on a public IPFS gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResolver {
    base: String,
}

impl GatewayResolver {
    /// `host` may be a bare hostname (`example.mypinata.cloud`) or a full
    /// base URL; bare hosts are served over https.
    pub fn new(host: impl AsRef<str>) -> Self {
        let host = host.as_ref().trim().trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        Self { base }
    }

    /// Gateway URL for `cid`.
    pub fn convert(&self, cid: &str) -> String {
        format!("{}/ipfs/{}", self.base, cid)
    }
}
