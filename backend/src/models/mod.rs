//! Domain models for the upload pipeline.
//!
//! - [`MediaFile`] - A named binary blob with its MIME type
//! - [`UploadRequest`] - The upload form as submitted
//! - [`SignedUploadTarget`] - Single-use signed upload URL
//! - [`UploadResult`] - One pinned file
//! - [`WalletIdentity`] - The connected wallet

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// =============================================================================
// Media Files
// =============================================================================

/// A file selected for upload.
///
/// The payload is reference-counted, so cloning a `MediaFile` does not copy
/// the movie bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name as shown to the pinning service.
    pub name: String,
    /// MIME type (`video/mp4`, `image/jpeg`, ...).
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl MediaFile {
    /// Build a file from in-memory bytes, inferring the MIME type from the name.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self::new(name, bytes))
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file has no contents.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `true` for `video/*` files.
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }

    /// `true` for `image/*` files.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// =============================================================================
// Upload Form
// =============================================================================

/// The upload form as the user submitted it.
///
/// Files are optional because an incomplete form can still be submitted;
/// the flow controller rejects it before any network call.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub title: String,
    pub movie: Option<MediaFile>,
    pub thumbnail: Option<MediaFile>,
    pub description: String,
}

impl UploadRequest {
    /// Complete form.
    pub fn new(title: impl Into<String>, movie: MediaFile, thumbnail: MediaFile) -> Self {
        Self {
            title: title.into(),
            movie: Some(movie),
            thumbnail: Some(thumbnail),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// =============================================================================
// Upload Target & Results
// =============================================================================

/// A short-lived signed URL authorizing one submission's uploads.
///
/// Not `Clone`: a target is consumed by the submission that requested it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUploadTarget {
    pub url: String,
}

impl SignedUploadTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// One file pinned to IPFS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Name of the uploaded file.
    pub file_name: String,
    /// Content identifier returned by the pinning service.
    pub cid: String,
    /// Gateway URL resolving the CID.
    pub gateway_link: String,
}

// =============================================================================
// Wallet
// =============================================================================

/// The wallet the user is signed in with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletIdentity {
    pub address: String,
}

impl WalletIdentity {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Shortened form for display (`0x1234...abcd`).
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.address.chars().collect();
        if chars.len() <= 10 {
            return self.address.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
