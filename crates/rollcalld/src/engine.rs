use crate::config::Config;
use image::RgbImage;
use rollcall_core::{Embedding, FaceEncoder};
use rollcall_hw::{Camera, ListenOptions, Microphone};
use rollcall_speech::{recognize_roll, HttpStt, SpeechOutcome, SttBackend};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Upper bound on one transcription request.
const STT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] rollcall_hw::CameraError),
    #[error("frame error: {0}")]
    Frame(#[from] rollcall_hw::frame::FrameError),
    #[error("encoder error: {0}")]
    Encoder(#[from] rollcall_core::EncoderError),
    #[error("microphone error: {0}")]
    Microphone(#[from] rollcall_hw::MicrophoneError),
    #[error("speech service error: {0}")]
    Speech(#[from] rollcall_speech::SttError),
    #[error("engine did not reply within {0:?}")]
    Timeout(Duration),
    #[error("engine failed to start: {0}")]
    Startup(String),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// The blocking work the engine thread performs on behalf of request handlers.
pub trait CaptureBackend: Send + 'static {
    /// Encode every face in a submitted image.
    fn encode_image(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EngineError>;

    /// Open the camera, grab one frame, and encode every face in it.
    fn capture_faces(&mut self) -> Result<Vec<Embedding>, EngineError>;

    /// Open the microphone, capture one utterance, and transcribe it.
    fn listen(&mut self) -> Result<SpeechOutcome, EngineError>;
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    EncodeImage {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<Embedding>, EngineError>>,
    },
    CaptureFaces {
        reply: oneshot::Sender<Result<Vec<Embedding>, EngineError>>,
    },
    Listen {
        reply: oneshot::Sender<Result<SpeechOutcome, EngineError>>,
    },
}

/// How long handlers wait on the engine before giving up.
#[derive(Debug, Clone, Copy)]
pub struct EngineTimeouts {
    pub capture: Duration,
    pub listen: Duration,
}

impl EngineTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture: config.capture_timeout,
            listen: config.listen_timeout + STT_REQUEST_TIMEOUT,
        }
    }
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    timeouts: EngineTimeouts,
}

impl EngineHandle {
    /// Encode the faces in an uploaded image, most confident first.
    pub async fn encode_image(&self, image: RgbImage) -> Result<Vec<Embedding>, EngineError> {
        self.call(self.timeouts.capture, |reply| EngineRequest::EncodeImage { image, reply })
            .await
    }

    /// Capture one camera frame and encode every face in it.
    pub async fn capture_faces(&self) -> Result<Vec<Embedding>, EngineError> {
        self.call(self.timeouts.capture, |reply| EngineRequest::CaptureFaces { reply })
            .await
    }

    /// Listen for one spoken roll number.
    pub async fn listen(&self) -> Result<SpeechOutcome, EngineError> {
        self.call(self.timeouts.listen, |reply| EngineRequest::Listen { reply })
            .await
    }

    /// Send a request and await its reply. A timed-out caller stops waiting;
    /// the engine still completes the request and releases its device.
    async fn call<T>(
        &self,
        timeout: Duration,
        request: impl FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = async {
            self.tx
                .send(request(reply_tx))
                .await
                .map_err(|_| EngineError::ChannelClosed)?;
            reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?timeout, "engine request timed out");
                Err(EngineError::Timeout(timeout))
            }
        }
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The backend is built on the engine thread itself so that blocking
/// resources (ONNX sessions, HTTP clients) never live on the async runtime.
/// Fails fast if the backend cannot be constructed.
pub async fn spawn_engine<B, F>(factory: F, timeouts: EngineTimeouts) -> Result<EngineHandle, EngineError>
where
    B: CaptureBackend,
    F: FnOnce() -> Result<B, EngineError> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);
    let (ready_tx, ready_rx) = oneshot::channel::<Result<(), EngineError>>();

    std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            let mut backend = match factory() {
                Ok(backend) => {
                    let _ = ready_tx.send(Ok(()));
                    backend
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::EncodeImage { image, reply } => {
                        let _ = reply.send(backend.encode_image(&image));
                    }
                    EngineRequest::CaptureFaces { reply } => {
                        let _ = reply.send(backend.capture_faces());
                    }
                    EngineRequest::Listen { reply } => {
                        let _ = reply.send(backend.listen());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(|e| EngineError::Startup(format!("failed to spawn engine thread: {e}")))?;

    ready_rx.await.map_err(|_| EngineError::ChannelClosed)??;
    Ok(EngineHandle { tx, timeouts })
}

/// Camera, microphone and ONNX models on real hardware.
///
/// Devices are opened per request and released before the reply is sent.
pub struct HardwareBackend {
    encoder: FaceEncoder,
    camera_device: String,
    warmup_frames: usize,
    listen: ListenOptions,
    stt: Option<Box<dyn SttBackend>>,
}

impl HardwareBackend {
    pub fn load(config: &Config) -> Result<Self, EngineError> {
        let encoder = FaceEncoder::load(&config.model_dir)?;
        tracing::info!(dir = %config.model_dir.display(), "face encoder loaded");

        let stt: Option<Box<dyn SttBackend>> = match &config.stt_api_key {
            Some(key) => {
                let client = HttpStt::new(&config.stt_url, key, &config.stt_model, STT_REQUEST_TIMEOUT)?;
                tracing::info!(url = %config.stt_url, model = %config.stt_model, "speech service configured");
                Some(Box::new(client))
            }
            None => {
                tracing::warn!("ROLLCALL_STT_API_KEY not set; spoken roll call disabled");
                None
            }
        };

        Ok(Self {
            encoder,
            camera_device: config.camera_device.clone(),
            warmup_frames: config.warmup_frames,
            listen: ListenOptions {
                calibration: config.calibration,
                timeout: config.listen_timeout,
                ..ListenOptions::default()
            },
            stt,
        })
    }
}

impl CaptureBackend for HardwareBackend {
    fn encode_image(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EngineError> {
        let encodings = self.encoder.encode(image)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            faces = encodings.len(),
            "image encoded"
        );
        Ok(encodings)
    }

    fn capture_faces(&mut self) -> Result<Vec<Embedding>, EngineError> {
        let warmup = self.warmup_frames;
        let frame = Camera::with_device(&self.camera_device, |camera| camera.capture_frame(warmup))?;
        tracing::debug!(
            sequence = frame.sequence,
            dark = frame.is_dark,
            "capture: frame acquired"
        );
        let image = frame.into_image()?;
        self.encode_image(&image)
    }

    fn listen(&mut self) -> Result<SpeechOutcome, EngineError> {
        let Some(stt) = &self.stt else {
            return Ok(SpeechOutcome::ServiceError(
                "speech service not configured".to_string(),
            ));
        };

        let utterance = {
            let microphone = Microphone::open_default()?;
            microphone.listen(&self.listen)?
        };
        tracing::debug!(duration = ?utterance.duration(), "listen: utterance captured");

        Ok(recognize_roll(stt.as_ref(), &utterance))
    }
}
