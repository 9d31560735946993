//! Pinning client: uploads files to IPFS through a signed URL.
//!
//! [`upload_files`] turns an ordered list of files into a lazy stream of
//! [`UploadResult`]s. Files go up strictly one after the other; the next
//! upload only starts once the consumer polls for the next item. The first
//! failure is yielded as an error and ends the stream.

pub mod link;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{PinResult, UploadError};
use crate::models::{MediaFile, SignedUploadTarget, UploadResult};

pub use link::GatewayResolver;

/// Uploads a single file and reports where it landed.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload_file(&self, target: &SignedUploadTarget, file: &MediaFile) -> PinResult<UploadResult>;
}

/// Ordered, fail-fast stream of upload results.
pub type UploadStream<'a> = BoxStream<'a, PinResult<UploadResult>>;

/// Upload `files` in order against `target`.
///
/// The stream owns the target and the files; polling it to the end again is
/// impossible, and building a new stream re-issues every upload.
pub fn upload_files<'a, U>(uploader: &'a U, target: SignedUploadTarget, files: Vec<MediaFile>) -> UploadStream<'a>
where
    U: FileUploader + ?Sized,
{
    let total = files.len();
    stream::unfold(
        (target, files.into_iter().enumerate(), false),
        move |(target, mut pending, failed)| async move {
            if failed {
                return None;
            }
            let (index, file) = pending.next()?;
            tracing::debug!(file = %file.name, position = index + 1, total, "pinning file");
            match uploader.upload_file(&target, &file).await {
                Ok(result) => Some((Ok(result), (target, pending, false))),
                Err(e) => Some((Err(e), (target, pending, true))),
            }
        },
    )
    .boxed()
}

/// Pinning service response body.
#[derive(Debug, Deserialize)]
struct PinataUploadResponse {
    #[serde(default)]
    data: Option<PinnedFile>,
}

#[derive(Debug, Deserialize)]
struct PinnedFile {
    #[serde(default)]
    cid: Option<String>,
}

/// Pinata uploads through presigned URLs.
#[derive(Debug, Clone)]
pub struct PinataClient {
    http: reqwest::Client,
    jwt: Option<String>,
    resolver: GatewayResolver,
}

impl PinataClient {
    pub fn new(jwt: Option<String>, resolver: GatewayResolver) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwt,
            resolver,
        }
    }

    fn form_for(file: &MediaFile) -> PinResult<Form> {
        let part = Part::stream_with_length(file.bytes.clone(), file.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| UploadError::Request {
                file: file.name.clone(),
                message: e.to_string(),
            })?;

        Ok(Form::new()
            .text("network", "public")
            .text("name", file.name.clone())
            .part("file", part))
    }
}

#[async_trait]
impl FileUploader for PinataClient {
    async fn upload_file(&self, target: &SignedUploadTarget, file: &MediaFile) -> PinResult<UploadResult> {
        let jwt = self.jwt.as_deref().ok_or(UploadError::MissingCredential)?;

        let response = self
            .http
            .post(&target.url)
            .bearer_auth(jwt)
            .multipart(Self::form_for(file)?)
            .send()
            .await
            .map_err(|e| UploadError::Request {
                file: file.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| UploadError::Request {
            file: file.name.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(UploadError::Status {
                file: file.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let cid = serde_json::from_str::<PinataUploadResponse>(&body)
            .ok()
            .and_then(|r| r.data)
            .and_then(|d| d.cid)
            .filter(|cid| !cid.trim().is_empty())
            .ok_or_else(|| UploadError::MissingCid(file.name.clone()))?;

        tracing::info!(file = %file.name, %cid, "file pinned");

        Ok(UploadResult {
            file_name: file.name.clone(),
            gateway_link: self.resolver.convert(&cid),
            cid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Uploader that records calls and fails on a chosen file.
    struct Recording {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl FileUploader for Recording {
        async fn upload_file(&self, _target: &SignedUploadTarget, file: &MediaFile) -> PinResult<UploadResult> {
            self.calls.lock().unwrap().push(file.name.clone());
            if self.fail_on == Some(file.name.as_str()) {
                return Err(UploadError::MissingCid(file.name.clone()));
            }
            Ok(UploadResult {
                file_name: file.name.clone(),
                cid: format!("cid-{}", file.name),
                gateway_link: format!("https://gw/ipfs/cid-{}", file.name),
            })
        }
    }

    fn files() -> Vec<MediaFile> {
        vec![
            MediaFile::new("odyssey.mp4", vec![1u8; 8]),
            MediaFile::new("poster.jpg", vec![2u8; 4]),
        ]
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let uploader = Recording { calls: Mutex::new(Vec::new()), fail_on: None };
        let results: Vec<_> = upload_files(&uploader, SignedUploadTarget::new("https://up"), files())
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().file_name, "odyssey.mp4");
        assert_eq!(results[1].as_ref().unwrap().file_name, "poster.jpg");
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let uploader = Recording { calls: Mutex::new(Vec::new()), fail_on: None };
        let mut stream = upload_files(&uploader, SignedUploadTarget::new("https://up"), files());

        assert!(uploader.calls.lock().unwrap().is_empty());
        stream.next().await.unwrap().unwrap();
        assert_eq!(*uploader.calls.lock().unwrap(), vec!["odyssey.mp4"]);
    }

    #[tokio::test]
    async fn test_first_failure_ends_stream() {
        let uploader = Recording { calls: Mutex::new(Vec::new()), fail_on: Some("odyssey.mp4") };
        let results: Vec<_> = upload_files(&uploader, SignedUploadTarget::new("https://up"), files())
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
        assert_eq!(*uploader.calls.lock().unwrap(), vec!["odyssey.mp4"]);
    }

    #[tokio::test]
    async fn test_pinata_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signed/abc"))
            .and(header("authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "1", "name": "odyssey.mp4", "cid": "bafyodyssey", "size": 8 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PinataClient::new(Some("jwt".into()), GatewayResolver::new("gw.example"));
        let target = SignedUploadTarget::new(format!("{}/signed/abc", server.uri()));
        let result = client
            .upload_file(&target, &MediaFile::new("odyssey.mp4", vec![0u8; 8]))
            .await
            .unwrap();

        assert_eq!(result.cid, "bafyodyssey");
        assert_eq!(result.file_name, "odyssey.mp4");
        assert_eq!(result.gateway_link, "https://gw.example/ipfs/bafyodyssey");
    }

    #[tokio::test]
    async fn test_pinata_missing_cid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
            .mount(&server)
            .await;

        let client = PinataClient::new(Some("jwt".into()), GatewayResolver::new("gw.example"));
        let target = SignedUploadTarget::new(server.uri());
        let err = client
            .upload_file(&target, &MediaFile::new("poster.jpg", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingCid(name) if name == "poster.jpg"));
    }

    #[tokio::test]
    async fn test_pinata_without_credential() {
        let client = PinataClient::new(None, GatewayResolver::new("gw.example"));
        let err = client
            .upload_file(&SignedUploadTarget::new("http://127.0.0.1:9"), &MediaFile::new("a.mp4", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingCredential));
    }
}
