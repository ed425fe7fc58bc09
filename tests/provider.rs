mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use matchvision_terminal::api::{
    AuthResponse, AuthUser, BackendApi, SignInRequest, UploadResponse, VideoRecord,
};
use matchvision_terminal::config::AppConfig;
use matchvision_terminal::job::JobStatus;
use matchvision_terminal::match_stats::{TEAM_A, TEAM_B, goals_label};
use matchvision_terminal::provider::spawn_provider;
use matchvision_terminal::routes::Screen;
use matchvision_terminal::session::Session;
use matchvision_terminal::state::{AppState, Delta, ProviderCommand, apply_delta};

use common::{API_BASE, ScriptedBackend, collect_until, completed, fixture, record, wait_for};

fn test_config() -> AppConfig {
    AppConfig {
        api_base: API_BASE.to_string(),
        poll_interval: Duration::from_millis(10),
        ..AppConfig::default()
    }
}

fn is_summary_outcome(delta: &Delta) -> bool {
    matches!(
        delta,
        Delta::SetMatchStats { .. } | Delta::SummaryUnavailable { .. } | Delta::JobFailed { .. }
    )
}

fn signed_in_session() -> Session {
    let mut session = Session::default();
    session.login(&AuthResponse {
        user: AuthUser {
            name: "Coach Carter".to_string(),
            email: "coach@club.test".to_string(),
        },
        token: "stored-token".to_string(),
    });
    session
}

#[test]
fn upload_to_completed_summary_updates_dashboard() {
    let backend = Arc::new(ScriptedBackend::with_statuses(vec![
        Ok(record(42, "pending")),
        Ok(record(42, "processing")),
        Ok(completed(42, Some("/media/42/summary.json"))),
    ]));
    *backend.upload.lock().unwrap() = Some(UploadResponse {
        id: 42,
        status: "pending".to_string(),
        message: None,
    });
    *backend.summary.lock().unwrap() = Some(fixture("match_summary.json"));
    let api: Arc<dyn BackendApi> = backend.clone();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::from_session(signed_in_session());
    let path = PathBuf::from("derby.mp4");
    let ticket = state.begin_upload(&path);
    assert_eq!(state.job.status, JobStatus::Uploading);
    cmd_tx
        .send(ProviderCommand::Upload {
            ticket,
            path,
            token: state.session.token().map(str::to_string),
        })
        .unwrap();

    for delta in collect_until(&rx, Duration::from_secs(5), is_summary_outcome) {
        apply_delta(&mut state, delta);
    }

    assert_eq!(state.job.id, Some(42));
    assert_eq!(state.job.status, JobStatus::Completed);
    assert_eq!(state.job.polls, 3);
    assert!(!state.stats_loading);
    assert_eq!(
        state
            .job
            .results
            .as_ref()
            .and_then(|r| r.summary_json_url.as_deref()),
        Some("http://api.test/media/42/summary.json")
    );
    assert_eq!(goals_label(state.match_stats.as_ref(), TEAM_A), "Team A Goals: 1");
    assert_eq!(goals_label(state.match_stats.as_ref(), TEAM_B), "Team B Goals: 0");
    assert_eq!(state.session.video_id(), Some(42));
    assert!(state.take_session_dirty());
    assert!(!state.pitch_dots.is_empty());
    assert_eq!(backend.artifact_calls(), 1);

    drop(cmd_tx);
    provider.join().unwrap();
}

#[test]
fn validated_session_adopts_latest_completed_job() {
    let backend = Arc::new(ScriptedBackend::with_statuses(vec![Ok(completed(
        11,
        Some("/media/11/summary.json"),
    ))]));
    *backend.videos.lock().unwrap() = vec![
        uploaded(10, "completed", "2024-05-01T10:00:00Z"),
        uploaded(11, "completed", "2024-05-03T10:00:00Z"),
        uploaded(12, "processing", "2024-05-04T10:00:00Z"),
    ];
    *backend.summary.lock().unwrap() = Some(fixture("match_summary.json"));
    let api: Arc<dyn BackendApi> = backend.clone();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::from_session(signed_in_session());
    assert!(state.validating_session);
    assert_eq!(state.job.id, None);
    cmd_tx
        .send(ProviderCommand::ValidateSession {
            token: "stored-token".to_string(),
            resume_job: state.session.video_id(),
        })
        .unwrap();

    let deltas = collect_until(&rx, Duration::from_secs(5), is_summary_outcome);
    assert!(matches!(deltas[0], Delta::SessionValidated { .. }));
    for delta in deltas {
        apply_delta(&mut state, delta);
    }

    assert!(!state.validating_session);
    assert_eq!(state.screen, Screen::Dashboard);
    assert_eq!(state.job.id, Some(11));
    assert_eq!(state.job.status, JobStatus::Completed);
    assert!(state.match_stats.is_some());
    assert!(
        state
            .logs
            .iter()
            .any(|line| line.contains("latest completed job 11"))
    );

    drop(cmd_tx);
    provider.join().unwrap();
}

#[test]
fn rejected_token_returns_to_sign_in() {
    let backend = ScriptedBackend {
        token_valid: false,
        ..ScriptedBackend::default()
    };
    let api: Arc<dyn BackendApi> = Arc::new(backend);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::from_session(signed_in_session());
    cmd_tx
        .send(ProviderCommand::ValidateSession {
            token: "stored-token".to_string(),
            resume_job: None,
        })
        .unwrap();
    for delta in collect_until(&rx, Duration::from_secs(5), |d| {
        matches!(d, Delta::SessionInvalid { .. })
    }) {
        apply_delta(&mut state, delta);
    }

    assert!(!state.session.is_authenticated());
    assert_eq!(state.screen, Screen::SignIn);

    drop(cmd_tx);
    provider.join().unwrap();
}

#[test]
fn wrong_password_shows_server_message() {
    let api: Arc<dyn BackendApi> = Arc::new(ScriptedBackend::with_statuses(Vec::new()));

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::new();
    cmd_tx
        .send(ProviderCommand::SignIn {
            request: SignInRequest {
                email: "coach@club.test".to_string(),
                password: "nope".to_string(),
            },
            resume_job: None,
        })
        .unwrap();
    for delta in collect_until(&rx, Duration::from_secs(5), |d| {
        matches!(d, Delta::AuthFailed { .. })
    }) {
        apply_delta(&mut state, delta);
    }

    assert_eq!(state.banner.as_deref(), Some("Invalid credentials"));
    assert_eq!(state.screen, Screen::SignIn);

    drop(cmd_tx);
    provider.join().unwrap();
}

fn accepted(id: u64) -> Option<UploadResponse> {
    Some(UploadResponse {
        id,
        status: "pending".to_string(),
        message: None,
    })
}

/// Count of status requests for `id` once it stays put for a few intervals.
fn settled_calls(backend: &ScriptedBackend, id: u64) -> usize {
    std::thread::sleep(Duration::from_millis(30));
    let calls = backend.status_calls_for(id);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(backend.status_calls_for(id), calls, "job {id} still polled");
    calls
}

#[test]
fn stop_polling_ends_requests_for_the_job() {
    let backend = Arc::new(ScriptedBackend::with_statuses(vec![Ok(record(0, "processing"))]));
    *backend.upload.lock().unwrap() = accepted(1);
    let api: Arc<dyn BackendApi> = backend.clone();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::from_session(signed_in_session());
    let ticket = state.begin_upload(&PathBuf::from("first.mp4"));
    cmd_tx
        .send(ProviderCommand::Upload {
            ticket,
            path: PathBuf::from("first.mp4"),
            token: None,
        })
        .unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        backend.status_calls_for(1) >= 2
    }));

    state.reset_job();
    cmd_tx.send(ProviderCommand::StopPolling).unwrap();
    settled_calls(&backend, 1);

    while let Ok(delta) = rx.try_recv() {
        apply_delta(&mut state, delta);
    }
    assert_eq!(state.job.id, None);
    assert_eq!(state.job.status, JobStatus::Idle);

    drop(cmd_tx);
    provider.join().unwrap();
}

#[test]
fn new_upload_replaces_the_running_poll() {
    let backend = Arc::new(ScriptedBackend::with_statuses(vec![Ok(record(0, "processing"))]));
    let api: Arc<dyn BackendApi> = backend.clone();

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let provider = spawn_provider(api, test_config(), tx, cmd_rx);

    let mut state = AppState::from_session(signed_in_session());
    for (name, id) in [("first.mp4", 1), ("second.mp4", 2)] {
        *backend.upload.lock().unwrap() = accepted(id);
        let path = PathBuf::from(name);
        let ticket = state.begin_upload(&path);
        cmd_tx
            .send(ProviderCommand::Upload {
                ticket,
                path,
                token: None,
            })
            .unwrap();
        assert!(wait_for(Duration::from_secs(5), || {
            backend.status_calls_for(id) >= 2
        }));
    }

    settled_calls(&backend, 1);
    assert!(backend.status_calls_for(2) > 2);

    while let Ok(delta) = rx.try_recv() {
        apply_delta(&mut state, delta);
    }
    assert_eq!(state.job.id, Some(2));
    assert_eq!(state.job.status, JobStatus::Processing);
    assert_eq!(state.job.file_name.as_deref(), Some("second.mp4"));

    drop(cmd_tx);
    provider.join().unwrap();
}

fn uploaded(id: u64, status: &str, uploaded_at: &str) -> VideoRecord {
    VideoRecord {
        uploaded_at: Some(uploaded_at.to_string()),
        ..record(id, status)
    }
}
