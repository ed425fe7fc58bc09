use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_MS: u64 = 5000;
const MIN_POLL_MS: u64 = 250;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub session_path: Option<PathBuf>,
    pub report_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            session_path: None,
            report_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Read settings from the environment. Call `dotenvy` first if `.env`
    /// files should participate.
    pub fn from_env() -> Self {
        let api_base = opt_env("MATCHVISION_API_BASE")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let session_path = opt_env("MATCHVISION_SESSION_PATH").map(PathBuf::from);
        let report_dir = opt_env("REPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_base,
            poll_interval: poll_interval(opt_env("JOB_POLL_MS").as_deref()),
            http_timeout: http_timeout(opt_env("HTTP_TIMEOUT_SECS").as_deref()),
            session_path,
            report_dir,
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn parse_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|val| val.trim().parse::<u64>().ok())
}

fn poll_interval(raw: Option<&str>) -> Duration {
    let ms = parse_u64(raw).unwrap_or(DEFAULT_POLL_MS).max(MIN_POLL_MS);
    Duration::from_millis(ms)
}

fn http_timeout(raw: Option<&str>) -> Duration {
    let secs = parse_u64(raw)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
        .clamp(5, 3600);
    Duration::from_secs(secs)
}
