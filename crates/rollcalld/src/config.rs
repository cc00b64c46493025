use std::path::PathBuf;
use std::time::Duration;

/// Service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 127.0.0.1:5000).
    pub bind: String,
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Administrator login.
    pub admin_user: String,
    pub admin_password: String,
    /// Lifetime of an authenticated session.
    pub session_ttl: Duration,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Frames discarded after opening the camera (AGC/AE stabilization).
    pub warmup_frames: usize,
    /// How long a request waits for a face capture or encode.
    pub capture_timeout: Duration,
    /// How long a request waits for a spoken roll number.
    pub listen_timeout: Duration,
    /// Ambient-noise calibration window before listening.
    pub calibration: Duration,
    /// Base URL of an OpenAI-compatible transcription API.
    pub stt_url: String,
    /// Bearer token for the transcription API. Unset disables speech.
    pub stt_api_key: Option<String>,
    pub stt_model: String,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| rollcall_core::default_model_dir());

        let database_path = std::env::var("ROLLCALL_DATABASE_URL")
            .map(|url| rollcall_store::path_from_url(&url))
            .unwrap_or_else(|_| rollcall_core::default_database_path());

        Self {
            bind: env_string("ROLLCALL_BIND", "127.0.0.1:5000"),
            database_path,
            admin_user: env_string("ROLLCALL_ADMIN_USER", "admin"),
            admin_password: env_string("ROLLCALL_ADMIN_PASSWORD", "password"),
            session_ttl: Duration::from_secs(env_u64("ROLLCALL_SESSION_TTL_SECS", 8 * 60 * 60)),
            model_dir,
            camera_device: env_string("ROLLCALL_CAMERA_DEVICE", "/dev/video0"),
            warmup_frames: env_usize("ROLLCALL_WARMUP_FRAMES", 4),
            capture_timeout: Duration::from_secs(env_u64("ROLLCALL_CAPTURE_TIMEOUT_SECS", 10)),
            listen_timeout: Duration::from_secs(env_u64("ROLLCALL_LISTEN_TIMEOUT_SECS", 20)),
            calibration: Duration::from_millis(env_u64("ROLLCALL_CALIBRATION_MS", 1000)),
            stt_url: env_string("ROLLCALL_STT_URL", "https://api.openai.com/v1"),
            stt_api_key: std::env::var("ROLLCALL_STT_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            stt_model: env_string("ROLLCALL_STT_MODEL", "whisper-1"),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
