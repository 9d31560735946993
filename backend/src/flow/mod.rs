//! Upload flow controller.
//!
//! Drives one submission through
//! `Idle → WalletCheck → Validating → RequestingUrl → Uploading → Succeeded | Failed`.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Wallet  │──▶│   Form   │──▶│  Signed URL  │──▶│  Pin movie,  │
//! │  check   │   │ validate │   │  (gateway)   │   │  thumbnail   │
//! └──────────┘   └──────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Every state change and every pinned file is published on a broadcast
//! channel ([`UploadController::subscribe`]). Nothing is retried and
//! nothing can be cancelled once uploading starts.

pub mod state;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::error::{FlowError, ValidationError};
use crate::gateway::UrlIssuer;
use crate::models::{MediaFile, UploadRequest, UploadResult, WalletIdentity};
use crate::pinning::{upload_files, FileUploader};
use crate::wallet::WalletSession;

pub use state::{FlowEvent, FlowState};

/// Capacity of the event channel; slow subscribers lose the oldest events.
const EVENT_CAPACITY: usize = 64;

/// Position of the movie in the upload order.
const MOVIE_INDEX: usize = 0;

/// A completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Wallet that submitted.
    pub wallet: WalletIdentity,
    /// Movie title.
    pub title: String,
    /// Gateway link of the movie file.
    pub link: String,
    /// One result per file, movie first.
    pub results: Vec<UploadResult>,
}

/// Controller-owned UI fields.
struct Status {
    state: FlowState,
    loading: bool,
    action: Option<String>,
    link: Option<String>,
    results: Vec<UploadResult>,
    last_error: Option<String>,
    events: broadcast::Sender<FlowEvent>,
}

impl Status {
    fn enter(&mut self, state: FlowState) {
        tracing::debug!(%state, "upload flow transition");
        self.state = state.clone();
        self.emit(FlowEvent::StateChanged { state });
    }

    fn emit(&mut self, event: FlowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn fail(&mut self, err: FlowError) -> FlowError {
        tracing::error!(error = %err, "upload failed");
        self.loading = false;
        self.action = None;
        self.last_error = Some(err.to_string());
        self.enter(FlowState::Failed {
            message: err.user_message().to_string(),
        });
        err
    }
}

/// State machine coordinating wallet gating, validation, the gateway and
/// the pinning client.
pub struct UploadController<W, G, P> {
    wallet: W,
    gateway: G,
    uploader: P,
    status: Status,
}

impl<W, G, P> UploadController<W, G, P>
where
    W: WalletSession,
    G: UrlIssuer,
    P: FileUploader,
{
    pub fn new(wallet: W, gateway: G, uploader: P) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            wallet,
            gateway,
            uploader,
            status: Status {
                state: FlowState::Idle,
                loading: false,
                action: None,
                link: None,
                results: Vec::new(),
                last_error: None,
                events,
            },
        }
    }

    /// Receive every subsequent [`FlowEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.status.events.subscribe()
    }

    pub fn state(&self) -> &FlowState {
        &self.status.state
    }

    /// `true` while a submission is in flight (submit control disabled).
    pub fn is_loading(&self) -> bool {
        self.status.loading
    }

    /// Label of what is happening right now.
    pub fn current_action(&self) -> Option<&str> {
        self.status.action.as_deref()
    }

    /// Link to the uploaded movie, once known.
    pub fn link(&self) -> Option<&str> {
        self.status.link.as_deref()
    }

    /// Results pinned by the latest submission, including those of a
    /// submission that failed part-way.
    pub fn results(&self) -> &[UploadResult] {
        &self.status.results
    }

    /// Detailed description of the latest failure.
    pub fn last_error(&self) -> Option<&str> {
        self.status.last_error.as_deref()
    }

    /// Leave a terminal state and return to `Idle`.
    pub fn acknowledge(&mut self) {
        if self.status.state.is_terminal() {
            self.status.enter(FlowState::Idle);
        }
    }

    /// Run a full submission.
    ///
    /// Without a connected wallet, authentication is requested and no
    /// network call is made. An invalid form returns to `Idle`. Gateway and
    /// upload failures leave the controller in `Failed`.
    pub async fn submit(&mut self, request: &UploadRequest) -> Result<Submission, FlowError> {
        self.acknowledge();
        self.status.last_error = None;

        self.status.enter(FlowState::WalletCheck);
        let Some(wallet) = self.wallet.current_user() else {
            tracing::info!("wallet not connected, requesting authentication");
            self.wallet.authenticate().await;
            self.status.emit(FlowEvent::AuthenticationRequested);
            self.status.enter(FlowState::Idle);
            return Err(FlowError::WalletNotConnected);
        };

        self.status.enter(FlowState::Validating);
        let (movie, thumbnail) = match validate(request) {
            Ok(files) => files,
            Err(err) => {
                tracing::info!(error = %err, "upload form rejected");
                self.status.last_error = Some(err.to_string());
                self.status.enter(FlowState::Idle);
                return Err(err.into());
            }
        };

        tracing::info!(
            wallet = %wallet.address,
            title = %request.title,
            movie = %movie.name,
            thumbnail = %thumbnail.name,
            "ready to upload and mint"
        );

        self.status.loading = true;
        self.status.link = None;
        self.status.results.clear();
        self.status.action = Some("Requesting upload URL".to_string());
        self.status.enter(FlowState::RequestingUrl);

        let target = match self.gateway.request_temporary_url().await {
            Ok(target) => target,
            Err(err) => return Err(self.status.fail(err.into())),
        };

        let files = vec![movie.clone(), thumbnail.clone()];
        let total = files.len();
        self.status.enter(FlowState::Uploading { completed: 0, total });

        let mut uploads = upload_files(&self.uploader, target, files);
        let mut index = 0;
        while let Some(item) = uploads.next().await {
            let result = match item {
                Ok(result) => result,
                Err(err) => return Err(self.status.fail(err.into())),
            };

            if index == MOVIE_INDEX {
                self.status.link = Some(result.gateway_link.clone());
            }
            self.status.results.push(result.clone());
            self.status.emit(FlowEvent::FileUploaded { index, total, result });

            index += 1;
            if index < total {
                self.status.action = Some(format!("Uploading file {} of {}", index + 1, total));
            }
            self.status.enter(FlowState::Uploading { completed: index, total });
        }
        drop(uploads);

        let link = self.status.link.clone().unwrap_or_default();
        self.status.loading = false;
        self.status.action = None;
        self.status.enter(FlowState::Succeeded { link: link.clone() });
        tracing::info!(%link, "movie uploaded to IPFS");

        Ok(Submission {
            wallet,
            title: request.title.clone(),
            link,
            results: self.status.results.clone(),
        })
    }
}

/// Check the form and borrow the two files in upload order.
pub fn validate(request: &UploadRequest) -> Result<(&MediaFile, &MediaFile), ValidationError> {
    if request.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    let movie = request.movie.as_ref().ok_or(ValidationError::MissingMovie)?;
    let thumbnail = request.thumbnail.as_ref().ok_or(ValidationError::MissingThumbnail)?;

    if !movie.is_video() {
        return Err(ValidationError::WrongMediaType {
            file: movie.name.clone(),
            expected: "video/*",
            actual: movie.mime_type.clone(),
        });
    }
    if !thumbnail.is_image() {
        return Err(ValidationError::WrongMediaType {
            file: thumbnail.name.clone(),
            expected: "image/*",
            actual: thumbnail.mime_type.clone(),
        });
    }
    Ok((movie, thumbnail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult, PinResult, UploadError};
    use crate::models::SignedUploadTarget;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeWallet {
        address: Option<String>,
        prompts: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl WalletSession for FakeWallet {
        fn current_user(&self) -> Option<WalletIdentity> {
            self.address.clone().map(WalletIdentity::new)
        }

        async fn authenticate(&self) {
            *self.prompts.lock().unwrap() += 1;
        }
    }

    enum GatewayReply {
        Url(&'static str),
        Fail,
    }

    struct FakeGateway {
        reply: GatewayReply,
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl UrlIssuer for FakeGateway {
        async fn request_temporary_url(&self) -> GatewayResult<SignedUploadTarget> {
            *self.calls.lock().unwrap() += 1;
            match self.reply {
                GatewayReply::Url(url) => Ok(SignedUploadTarget::new(url)),
                GatewayReply::Fail => Err(GatewayError::Request("connection refused".into())),
            }
        }
    }

    #[derive(Default)]
    struct FakeUploader {
        /// (target url, file name) per call.
        calls: Arc<Mutex<Vec<(String, String)>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl FileUploader for FakeUploader {
        async fn upload_file(&self, target: &SignedUploadTarget, file: &MediaFile) -> PinResult<UploadResult> {
            self.calls.lock().unwrap().push((target.url.clone(), file.name.clone()));
            if self.fail_on == Some(file.name.as_str()) {
                return Err(UploadError::Request {
                    file: file.name.clone(),
                    message: "pin failed".into(),
                });
            }
            Ok(UploadResult {
                file_name: file.name.clone(),
                cid: format!("bafy-{}", file.name),
                gateway_link: format!("https://gw.example/ipfs/bafy-{}", file.name),
            })
        }
    }

    struct Harness {
        controller: UploadController<FakeWallet, FakeGateway, FakeUploader>,
        prompts: Arc<Mutex<usize>>,
        gateway_calls: Arc<Mutex<usize>>,
        uploads: Arc<Mutex<Vec<(String, String)>>>,
    }

    fn harness(connected: bool, reply: GatewayReply, fail_on: Option<&'static str>) -> Harness {
        let wallet = FakeWallet {
            address: connected.then(|| "0x1234567890abcdef1234567890abcdef12345678".to_string()),
            ..FakeWallet::default()
        };
        let gateway = FakeGateway { reply, calls: Arc::default() };
        let uploader = FakeUploader { fail_on, ..FakeUploader::default() };

        Harness {
            prompts: wallet.prompts.clone(),
            gateway_calls: gateway.calls.clone(),
            uploads: uploader.calls.clone(),
            controller: UploadController::new(wallet, gateway, uploader),
        }
    }

    fn cosmic_odyssey() -> UploadRequest {
        UploadRequest::new(
            "Cosmic Odyssey",
            MediaFile::new("odyssey.mp4", vec![0u8; 16]),
            MediaFile::new("poster.jpg", vec![1u8; 8]),
        )
        .with_description("A journey past the heliopause")
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_successful_submission() {
        let mut h = harness(true, GatewayReply::Url("https://up.example/abc"), None);

        let submission = h.controller.submit(&cosmic_odyssey()).await.unwrap();

        assert_eq!(
            *h.uploads.lock().unwrap(),
            vec![
                ("https://up.example/abc".to_string(), "odyssey.mp4".to_string()),
                ("https://up.example/abc".to_string(), "poster.jpg".to_string()),
            ]
        );
        assert_eq!(submission.link, "https://gw.example/ipfs/bafy-odyssey.mp4");
        assert_eq!(submission.results[0].file_name, "odyssey.mp4");
        assert_eq!(submission.results[1].file_name, "poster.jpg");
        assert_eq!(
            h.controller.state(),
            &FlowState::Succeeded { link: "https://gw.example/ipfs/bafy-odyssey.mp4".into() }
        );
        assert_eq!(h.controller.link(), Some("https://gw.example/ipfs/bafy-odyssey.mp4"));
        assert!(!h.controller.is_loading());
        assert_eq!(*h.gateway_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wallet_not_connected_requests_authentication() {
        let mut h = harness(false, GatewayReply::Url("https://up.example/abc"), None);

        let err = h.controller.submit(&cosmic_odyssey()).await.unwrap_err();

        assert!(matches!(err, FlowError::WalletNotConnected));
        assert_eq!(*h.prompts.lock().unwrap(), 1);
        assert_eq!(*h.gateway_calls.lock().unwrap(), 0);
        assert!(h.uploads.lock().unwrap().is_empty());
        assert_eq!(h.controller.state(), &FlowState::Idle);
    }

    #[tokio::test]
    async fn test_missing_fields_return_to_idle() {
        let mut h = harness(true, GatewayReply::Url("https://up.example/abc"), None);

        let mut request = cosmic_odyssey();
        request.thumbnail = None;
        let err = h.controller.submit(&request).await.unwrap_err();

        assert!(matches!(err, FlowError::Validation(ValidationError::MissingThumbnail)));
        assert_eq!(err.user_message(), "Please fill all fields");
        assert_eq!(h.controller.state(), &FlowState::Idle);
        assert!(h.controller.last_error().is_some());
        assert_eq!(*h.gateway_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_skips_upload() {
        let mut h = harness(true, GatewayReply::Fail, None);

        let err = h.controller.submit(&cosmic_odyssey()).await.unwrap_err();

        assert!(matches!(err, FlowError::Gateway(_)));
        assert!(h.uploads.lock().unwrap().is_empty());
        match h.controller.state() {
            FlowState::Failed { message } => assert!(message.contains("try again")),
            other => panic!("unexpected state {:?}", other),
        }
        assert!(!h.controller.is_loading());
    }

    #[tokio::test]
    async fn test_empty_gateway_url_never_reaches_uploader() {
        use crate::gateway::GatewayClient;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "url": "" })))
            .expect(1)
            .mount(&server)
            .await;

        let wallet = FakeWallet {
            address: Some("0x1234567890abcdef1234567890abcdef12345678".to_string()),
            ..FakeWallet::default()
        };
        let uploader = FakeUploader::default();
        let uploads = uploader.calls.clone();
        let mut controller = UploadController::new(wallet, GatewayClient::new(server.uri()), uploader);

        let err = controller.submit(&cosmic_odyssey()).await.unwrap_err();

        assert!(matches!(err, FlowError::Gateway(GatewayError::MissingUrl)));
        assert!(uploads.lock().unwrap().is_empty());
        assert!(matches!(controller.state(), FlowState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_thumbnail_failure_keeps_movie_result_in_memory() {
        let mut h = harness(true, GatewayReply::Url("https://up.example/abc"), Some("poster.jpg"));

        let err = h.controller.submit(&cosmic_odyssey()).await.unwrap_err();

        assert!(matches!(err, FlowError::Upload(_)));
        assert!(matches!(h.controller.state(), FlowState::Failed { .. }));
        assert_eq!(h.controller.results().len(), 1);
        assert_eq!(h.controller.results()[0].file_name, "odyssey.mp4");
        assert_eq!(h.uploads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_next_interaction_after_failure_starts_from_idle() {
        let mut h = harness(true, GatewayReply::Fail, None);
        let _ = h.controller.submit(&cosmic_odyssey()).await;
        assert!(h.controller.state().is_terminal());

        h.controller.acknowledge();
        assert_eq!(h.controller.state(), &FlowState::Idle);
    }

    #[tokio::test]
    async fn test_each_submission_requests_its_own_url() {
        let mut h = harness(true, GatewayReply::Url("https://up.example/abc"), None);
        h.controller.submit(&cosmic_odyssey()).await.unwrap();
        h.controller.submit(&cosmic_odyssey()).await.unwrap();
        assert_eq!(*h.gateway_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_events_are_published_in_order() {
        let mut h = harness(true, GatewayReply::Url("https://up.example/abc"), None);
        let mut rx = h.controller.subscribe();

        h.controller.submit(&cosmic_odyssey()).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        let states: Vec<FlowState> = events
            .iter()
            .filter_map(|e| match e {
                FlowEvent::StateChanged { state } => Some(state.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(states[0], FlowState::WalletCheck);
        assert_eq!(states[1], FlowState::Validating);
        assert_eq!(states[2], FlowState::RequestingUrl);
        assert_eq!(states[3], FlowState::Uploading { completed: 0, total: 2 });
        assert!(matches!(states.last(), Some(FlowState::Succeeded { .. })));

        let uploaded: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                FlowEvent::FileUploaded { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(uploaded, vec![0, 1]);
    }

    #[test]
    fn test_validate_rejects_wrong_media_types() {
        let request = UploadRequest::new(
            "Swapped",
            MediaFile::new("poster.jpg", vec![0u8]),
            MediaFile::new("odyssey.mp4", vec![0u8]),
        );
        assert!(matches!(
            validate(&request),
            Err(ValidationError::WrongMediaType { expected: "video/*", .. })
        ));
    }

    #[test]
    fn test_validate_blank_title() {
        let mut request = cosmic_odyssey();
        request.title = "   ".into();
        assert_eq!(validate(&request).unwrap_err(), ValidationError::MissingTitle);
    }
}
