use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{AuthResponse, JobId, UserProfile, VideoRecord};

const CACHE_DIR: &str = "matchvision_terminal";
const SESSION_FILE: &str = "session.json";

const KEY_TOKEN: &str = "token";
const KEY_USER: &str = "user";
const KEY_PROFILE: &str = "profile";
const KEY_VIDEO_DATA: &str = "videoData";
const KEY_VIDEO_ID: &str = "videoId";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl SessionUser {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }

    pub fn initials(&self) -> String {
        let mut out = String::new();
        for part in [&self.first_name, &self.last_name] {
            if let Some(ch) = part.chars().next() {
                out.extend(ch.to_uppercase());
            }
        }
        if out.is_empty() {
            out.extend(self.email.chars().next().map(|c| c.to_ascii_uppercase()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Client-side session: credentials plus the last job the user worked on.
/// Every field is a best-effort cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    token: Option<String>,
    user: Option<SessionUser>,
    profile: Option<SessionProfile>,
    video_data: Option<VideoRecord>,
    video_id: Option<JobId>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn profile(&self) -> Option<&SessionProfile> {
        self.profile.as_ref()
    }

    pub fn video_id(&self) -> Option<JobId> {
        self.video_id
    }

    pub fn video_data(&self) -> Option<&VideoRecord> {
        self.video_data.as_ref()
    }

    /// Store credentials from a signin/signup response. The backend sends a
    /// single `name`; the first word is the first name.
    pub fn login(&mut self, auth: &AuthResponse) {
        let (first_name, last_name) = split_display_name(&auth.user.name);
        self.token = Some(auth.token.clone());
        self.user = Some(SessionUser {
            first_name,
            last_name,
            email: auth.user.email.clone(),
            last_login: None,
        });
    }

    /// Refresh user and profile from a validated `GET /api/auth/user/`.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        let (split_first, split_last) = profile
            .name
            .as_deref()
            .map(split_display_name)
            .unwrap_or_default();
        let previous = self.user.clone().unwrap_or_default();
        let pick = |fresh: Option<&String>, split: String, prev: String| {
            fresh
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .or_else(|| (!split.is_empty()).then_some(split))
                .unwrap_or(prev)
        };
        self.user = Some(SessionUser {
            first_name: pick(profile.first_name.as_ref(), split_first, previous.first_name),
            last_name: pick(profile.last_name.as_ref(), split_last, previous.last_name),
            email: profile.email.clone().unwrap_or(previous.email),
            last_login: profile.last_login.clone().or(previous.last_login),
        });
        let previous = self.profile.clone().unwrap_or_default();
        self.profile = Some(SessionProfile {
            phone_number: profile.phone_number.clone().or(previous.phone_number),
            experience_level: profile.experience_level.clone().or(previous.experience_level),
            created_at: profile.created_at.clone().or(previous.created_at),
        });
    }

    /// Drop credentials and profile, keeping nothing job-related either.
    pub fn logout(&mut self) {
        *self = Self::default();
    }

    /// Forget credentials after a failed token validation. Job continuity is
    /// kept so a re-login resumes the same job.
    pub fn clear_credentials(&mut self) {
        self.token = None;
        self.user = None;
        self.profile = None;
    }

    pub fn set_job(&mut self, id: JobId) {
        if self.video_id != Some(id) {
            self.video_data = None;
        }
        self.video_id = Some(id);
    }

    pub fn remember_record(&mut self, record: &VideoRecord) {
        self.video_id = Some(record.id);
        self.video_data = Some(record.clone());
    }

    pub fn clear_job(&mut self) {
        self.video_id = None;
        self.video_data = None;
    }
}

pub fn split_display_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// File-backed session, the terminal stand-in for browser local storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// `override_path` wins; otherwise the XDG cache location. With neither
    /// available the store is memory-only.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            path: override_path.or_else(default_session_path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Missing file, bad JSON or a bad individual key all degrade to the
    /// default for what could not be read.
    pub fn load(&self) -> Session {
        let Some(path) = self.path.as_ref() else {
            return Session::default();
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return Session::default();
        };
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw) else {
            return Session::default();
        };
        Session {
            token: read_key::<String>(&map, KEY_TOKEN).filter(|t| !t.trim().is_empty()),
            user: read_key(&map, KEY_USER),
            profile: read_key(&map, KEY_PROFILE),
            video_data: read_key(&map, KEY_VIDEO_DATA),
            video_id: read_key(&map, KEY_VIDEO_ID),
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let mut map = Map::new();
        write_key(&mut map, KEY_TOKEN, &session.token)?;
        write_key(&mut map, KEY_USER, &session.user)?;
        write_key(&mut map, KEY_PROFILE, &session.profile)?;
        write_key(&mut map, KEY_VIDEO_DATA, &session.video_data)?;
        write_key(&mut map, KEY_VIDEO_ID, &session.video_id)?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(map)).context("serialize session")?;
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes()).context("write session")?;
        fs::rename(&tmp, path).context("swap session")?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("remove session"),
        }
    }
}

/// The file holds the bearer token, so it is owner-only on unix.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn read_key<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    if value.is_null() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

fn write_key<T: Serialize>(map: &mut Map<String, Value>, key: &str, value: &Option<T>) -> Result<()> {
    if let Some(value) = value {
        let value = serde_json::to_value(value).with_context(|| format!("serialize {key}"))?;
        map.insert(key.to_string(), value);
    }
    Ok(())
}

fn default_session_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(SESSION_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(SESSION_FILE),
    )
}
