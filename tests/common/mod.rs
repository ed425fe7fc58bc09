#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

use matchvision_terminal::api::{
    AuthResponse, AuthUser, BackendApi, JobId, ProfileUpdate, SignInRequest, SignUpRequest,
    UploadResponse, UserProfile, VideoRecord,
};
use matchvision_terminal::state::Delta;

pub const API_BASE: &str = "http://api.test";

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("{}: {err}", path.display()))
}

pub fn record(id: JobId, status: &str) -> VideoRecord {
    VideoRecord {
        id,
        status: status.to_string(),
        ..VideoRecord::default()
    }
}

pub fn completed(id: JobId, summary: Option<&str>) -> VideoRecord {
    VideoRecord {
        summary_json_url: summary.map(str::to_string),
        output_video_url: Some(format!("/media/{id}/out.mp4")),
        ..record(id, "completed")
    }
}

/// Backend whose status responses are played back in order; the last one
/// repeats forever.
#[derive(Default)]
pub struct ScriptedBackend {
    pub statuses: Mutex<VecDeque<Result<VideoRecord, String>>>,
    pub upload: Mutex<Option<UploadResponse>>,
    pub summary: Mutex<Option<String>>,
    pub videos: Mutex<Vec<VideoRecord>>,
    pub token_valid: bool,
    pub status_calls: AtomicUsize,
    pub artifact_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub fetched_urls: Mutex<Vec<String>>,
    pub status_ids: Mutex<Vec<JobId>>,
}

impl ScriptedBackend {
    pub fn with_statuses(statuses: Vec<Result<VideoRecord, String>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            token_valid: true,
            ..Self::default()
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls_for(&self, id: JobId) -> usize {
        self.status_ids
            .lock()
            .unwrap()
            .iter()
            .filter(|called| **called == id)
            .count()
    }

    pub fn artifact_calls(&self) -> usize {
        self.artifact_calls.load(Ordering::SeqCst)
    }
}

impl BackendApi for ScriptedBackend {
    fn upload_video(&self, _path: &Path, _token: Option<&str>) -> Result<UploadResponse> {
        self.upload
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("upload rejected"))
    }

    fn video_status(&self, id: JobId, _token: Option<&str>) -> Result<VideoRecord> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_ids.lock().unwrap().push(id);
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        match next {
            Some(Ok(record)) => Ok(VideoRecord { id, ..record }),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no scripted status")),
        }
    }

    fn list_videos(&self, _token: Option<&str>) -> Result<Vec<VideoRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.videos.lock().unwrap().clone())
    }

    fn fetch_artifact(&self, url: &str, _token: Option<&str>) -> Result<String> {
        self.artifact_calls.fetch_add(1, Ordering::SeqCst);
        self.fetched_urls.lock().unwrap().push(url.to_string());
        self.summary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("http 404: not found"))
    }

    fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse> {
        Ok(AuthResponse {
            user: AuthUser {
                name: format!("{} {}", request.first_name, request.last_name),
                email: request.email.clone(),
            },
            token: "signup-token".to_string(),
        })
    }

    fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse> {
        if request.password != "Secret123" {
            return Err(anyhow!("Invalid credentials"));
        }
        Ok(AuthResponse {
            user: AuthUser {
                name: "Coach Carter".to_string(),
                email: request.email.clone(),
            },
            token: "signin-token".to_string(),
        })
    }

    fn current_user(&self, _token: &str) -> Result<UserProfile> {
        if !self.token_valid {
            return Err(anyhow!("http 401: invalid token"));
        }
        Ok(UserProfile {
            first_name: Some("Coach".to_string()),
            last_name: Some("Carter".to_string()),
            email: Some("coach@club.test".to_string()),
            ..UserProfile::default()
        })
    }

    fn update_profile(&self, _token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        Ok(UserProfile {
            first_name: update.first_name.clone(),
            last_name: update.last_name.clone(),
            phone_number: update.phone_number.clone(),
            experience_level: update.experience_level.clone(),
            ..UserProfile::default()
        })
    }
}

/// Every delta until the senders are gone, bounded by `limit`.
pub fn drain_until_closed(rx: &Receiver<Delta>, limit: Duration) -> Vec<Delta> {
    let deadline = Instant::now() + limit;
    let mut out = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(delta) => out.push(delta),
            Err(RecvTimeoutError::Disconnected) => return out,
            Err(RecvTimeoutError::Timeout) => panic!("channel still open after {limit:?}"),
        }
    }
}

/// Deltas until `done` returns true for one of them.
pub fn collect_until(
    rx: &Receiver<Delta>,
    limit: Duration,
    mut done: impl FnMut(&Delta) -> bool,
) -> Vec<Delta> {
    let deadline = Instant::now() + limit;
    let mut out = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(delta) => {
                let stop = done(&delta);
                out.push(delta);
                if stop {
                    return out;
                }
            }
            Err(err) => panic!("no matching delta: {err:?}; got {out:?}"),
        }
    }
}

pub fn wait_for(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
