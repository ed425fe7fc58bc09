use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::http_client::http_client;
use crate::urls::api_url;

pub type JobId = u64;

const VIDEOS_PATH: &str = "/api/videos/";
const SIGNUP_PATH: &str = "/api/auth/signup";
const SIGNIN_PATH: &str = "/api/auth/signin";
const USER_PATH: &str = "/api/auth/user/";
const PROFILE_UPDATE_PATH: &str = "/api/auth/profile/update";

/// One processing job as the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: JobId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub output_video_url: Option<String>,
    #[serde(default)]
    pub summary_json_url: Option<String>,
    #[serde(default)]
    pub object_tracks_json_url: Option<String>,
    #[serde(default)]
    pub keypoint_tracks_json_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_frame_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub id: JobId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub team_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUser {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub token: String,
}

/// `GET /api/auth/user/` payload. Older backends only send `name`/`email`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.experience_level.is_none()
    }
}

/// Non-2xx response from the backend, with the server's message when it
/// sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Message suitable for an inline banner: the server's own text for HTTP
/// errors, the full chain otherwise.
pub fn banner_message(err: &anyhow::Error) -> String {
    if let Some(http) = err.downcast_ref::<HttpError>() {
        return http.message.clone();
    }
    format!("{err:#}")
}

/// Everything the dashboard needs from the backend. The HTTP implementation
/// is [`HttpBackend`]; tests script their own.
pub trait BackendApi: Send + Sync {
    fn upload_video(&self, path: &Path, token: Option<&str>) -> Result<UploadResponse>;
    fn video_status(&self, id: JobId, token: Option<&str>) -> Result<VideoRecord>;
    fn list_videos(&self, token: Option<&str>) -> Result<Vec<VideoRecord>>;
    /// Raw body of an artifact URL (already absolute).
    fn fetch_artifact(&self, url: &str, token: Option<&str>) -> Result<String>;
    fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse>;
    fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse>;
    fn current_user(&self, token: &str) -> Result<UserProfile>;
    fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base: config.api_base.clone(),
            timeout: config.http_timeout,
        }
    }

    fn client(&self) -> Result<&'static Client> {
        http_client(self.timeout)
    }

    fn url(&self, path: &str) -> String {
        api_url(&self.base, path)
    }
}

impl BackendApi for HttpBackend {
    fn upload_video(&self, path: &Path, token: Option<&str>) -> Result<UploadResponse> {
        let form = multipart::Form::new()
            .file("video_file", path)
            .with_context(|| format!("open {}", path.display()))?;
        let req = with_bearer(self.client()?.post(self.url(VIDEOS_PATH)), token).multipart(form);
        send_json(req).context("upload video")
    }

    fn video_status(&self, id: JobId, token: Option<&str>) -> Result<VideoRecord> {
        let url = self.url(&format!("{VIDEOS_PATH}{id}/"));
        let req = with_bearer(self.client()?.get(url), token);
        send_json(req).with_context(|| format!("status for job {id}"))
    }

    fn list_videos(&self, token: Option<&str>) -> Result<Vec<VideoRecord>> {
        let req = with_bearer(self.client()?.get(self.url(VIDEOS_PATH)), token);
        send_json(req).context("list videos")
    }

    fn fetch_artifact(&self, url: &str, token: Option<&str>) -> Result<String> {
        let req = with_bearer(self.client()?.get(url), token);
        send_text(req).with_context(|| format!("fetch {url}"))
    }

    fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse> {
        let req = self.client()?.post(self.url(SIGNUP_PATH)).json(request);
        send_json(req).context("sign up")
    }

    fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse> {
        let req = self.client()?.post(self.url(SIGNIN_PATH)).json(request);
        send_json(req).context("sign in")
    }

    fn current_user(&self, token: &str) -> Result<UserProfile> {
        let req = self.client()?.get(self.url(USER_PATH)).bearer_auth(token);
        send_json(req).context("validate token")
    }

    fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        let req = self
            .client()?
            .put(self.url(PROFILE_UPDATE_PATH))
            .bearer_auth(token)
            .json(update);
        send_json(req).context("update profile")
    }
}

fn with_bearer(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

fn send_text(req: RequestBuilder) -> Result<String> {
    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(HttpError {
            status: status.as_u16(),
            message: server_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        }
        .into());
    }
    Ok(body)
}

fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let body = send_text(req)?;
    parse_json(&body)
}

/// `#[serde(default)]` only covers a missing key; the backend also sends
/// `null` for absent values.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw.trim()).context("invalid json response")
}

/// Pull the human-readable part out of an error body
/// (`{"message": ..}`, `{"error": ..}`, `{"detail": ..}`), else the body text.
pub fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(root) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = root.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }
    Some(trimmed.chars().take(200).collect())
}
