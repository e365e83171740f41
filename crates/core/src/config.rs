use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub artifacts: ArtifactConfig,
    pub capture: CaptureConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            artifacts: ArtifactConfig::from_env(),
            capture: CaptureConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:     {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  artifacts:  data_dir={}, s3_bucket={}",
            self.artifacts.data_dir.display(),
            self.artifacts.s3_bucket.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  capture:    renderer={}, timeout={}s, attempts={}",
            self.capture.renderer_url.as_deref().unwrap_or("(none)"),
            self.capture.timeout_secs,
            self.capture.attempts
        );
        tracing::info!(
            "  scheduler:  tick={}min, utc_offset={}h",
            self.scheduler.tick_minutes,
            self.scheduler.utc_offset_hours
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3001),
            cors_origin: env_or("CORS_ORIGIN", "*"),
        }
    }
}

// ── Artifact storage ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Local directory for blobs and the JSON state stores.
    pub data_dir: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    /// Base URL artifacts are served from (prepended to keys).
    pub public_base_url: Option<String>,
}

impl ArtifactConfig {
    fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            s3_bucket: env_opt("S3_BUCKET"),
            s3_prefix: env_opt("S3_PREFIX"),
            region: env_or("AWS_REGION", "ap-northeast-1"),
            access_key_id: env_opt("AWS_ACCESS_KEY_ID"),
            secret_access_key: env_opt("AWS_SECRET_ACCESS_KEY"),
            endpoint_url: env_opt("AWS_ENDPOINT_URL"),
            public_base_url: env_opt("ARTIFACT_PUBLIC_BASE_URL"),
        }
    }

    pub fn is_s3(&self) -> bool {
        self.s3_bucket.is_some()
    }
}

// ── Capture ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Render service endpoint turning a page URL into a PNG.
    pub renderer_url: Option<String>,
    /// Per-attempt capture timeout.
    pub timeout_secs: u64,
    /// Bounded retry count (linear backoff between attempts).
    pub attempts: u32,
    /// Liveness probe timeout.
    pub liveness_timeout_secs: u64,
}

impl CaptureConfig {
    fn from_env() -> Self {
        Self {
            renderer_url: env_opt("CAPTURE_RENDERER_URL"),
            timeout_secs: env_u64("CAPTURE_TIMEOUT_SECS", 45),
            attempts: env_u32("CAPTURE_ATTEMPTS", 3),
            liveness_timeout_secs: env_u64("LIVENESS_TIMEOUT_SECS", 30),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick cadence in minutes. Never finer than 1.
    pub tick_minutes: u32,
    /// Deployment wall-clock offset from UTC, in whole hours.
    pub utc_offset_hours: i32,
    /// Operation-level timeout for manual checks, in seconds.
    pub manual_check_timeout_secs: u64,
}

impl SchedulerConfig {
    fn from_env() -> Self {
        Self {
            tick_minutes: env_u32("SCHEDULER_TICK_MINUTES", 60).max(1),
            utc_offset_hours: env_i32("PAGEWATCH_UTC_OFFSET_HOURS", 0),
            manual_check_timeout_secs: env_u64("MANUAL_CHECK_TIMEOUT_SECS", 120),
        }
    }
}
