use std::path::Path;

use matchvision_terminal::api::{AuthResponse, AuthUser, UploadResponse, UserProfile, VideoRecord};
use matchvision_terminal::job::{JobResults, JobStatus};
use matchvision_terminal::match_stats::{Goal, MatchStats, TEAM_A, goals_label};
use matchvision_terminal::routes::Screen;
use matchvision_terminal::state::{AppState, Delta, apply_delta};

fn signed_in() -> AppState {
    let mut state = AppState::new();
    apply_delta(
        &mut state,
        Delta::SignedIn {
            auth: AuthResponse {
                user: AuthUser {
                    name: "Ada Lovelace".to_string(),
                    email: "ada@club.test".to_string(),
                },
                token: "tok".to_string(),
            },
        },
    );
    state
}

fn submitted(state: &mut AppState, ticket: u64, id: u64) {
    apply_delta(
        state,
        Delta::JobSubmitted {
            ticket,
            response: UploadResponse {
                id,
                status: "pending".to_string(),
                message: None,
            },
        },
    );
}

fn one_goal() -> Box<MatchStats> {
    Box::new(MatchStats {
        goals: vec![Goal {
            frame: 10,
            team: TEAM_A.to_string(),
            player_id: Some(9),
        }],
        ..MatchStats::default()
    })
}

#[test]
fn sign_in_lands_on_dashboard_and_marks_session_dirty() {
    let mut state = signed_in();
    assert_eq!(state.screen, Screen::Dashboard);
    assert_eq!(state.session.token(), Some("tok"));
    assert_eq!(
        state.session.user().map(|u| u.first_name.as_str()),
        Some("Ada")
    );
    assert!(state.take_session_dirty());
    assert!(!state.take_session_dirty());
}

#[test]
fn resubmission_ignores_results_for_the_old_job() {
    let mut state = signed_in();
    let first = state.begin_upload(Path::new("first.mp4"));
    submitted(&mut state, first, 1);

    let second = state.begin_upload(Path::new("second.mp4"));
    assert_ne!(first, second);
    assert_eq!(state.job.id, None);
    submitted(&mut state, second, 2);

    apply_delta(
        &mut state,
        Delta::JobCompleted {
            job_id: 1,
            results: JobResults::default(),
        },
    );
    apply_delta(
        &mut state,
        Delta::SetMatchStats {
            job_id: 1,
            stats: one_goal(),
        },
    );
    assert_eq!(state.job.id, Some(2));
    assert_eq!(state.job.status, JobStatus::Pending);
    assert!(state.match_stats.is_none());
    assert_eq!(state.job.file_name.as_deref(), Some("second.mp4"));
}

#[test]
fn late_upload_response_after_reset_is_dropped() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    state.reset_job();
    submitted(&mut state, ticket, 9);

    assert_eq!(state.job.id, None);
    assert_eq!(state.job.status, JobStatus::Idle);
    assert_eq!(state.session.video_id(), None);
    assert!(
        state
            .logs
            .iter()
            .any(|line| line.contains("stale upload result"))
    );
}

#[test]
fn upload_failure_marks_job_failed() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    apply_delta(
        &mut state,
        Delta::UploadFailed {
            ticket,
            error: "http 413: file too large".to_string(),
        },
    );
    assert_eq!(state.job.status, JobStatus::Failed);
    assert_eq!(state.job.error.as_deref(), Some("http 413: file too large"));
}

#[test]
fn completed_job_without_summary_shows_not_available() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    submitted(&mut state, ticket, 5);
    apply_delta(
        &mut state,
        Delta::JobCompleted {
            job_id: 5,
            results: JobResults::default(),
        },
    );
    assert!(!state.stats_loading);
    apply_delta(
        &mut state,
        Delta::SummaryUnavailable {
            job_id: 5,
            reason: "no summary artifact".to_string(),
        },
    );

    assert_eq!(state.job.status, JobStatus::Completed);
    assert_eq!(goals_label(state.match_stats.as_ref(), TEAM_A), "Team A Goals: N/A");
    assert_eq!(
        state.logs.back().map(String::as_str),
        Some("[WARN] Summary not available for job 5: no summary artifact")
    );
}

#[test]
fn status_updates_are_cached_in_the_session() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    submitted(&mut state, ticket, 5);
    state.take_session_dirty();

    let record = VideoRecord {
        id: 5,
        status: "processing".to_string(),
        ..VideoRecord::default()
    };
    apply_delta(&mut state, Delta::JobStatus { job_id: 5, record });
    assert_eq!(state.job.status, JobStatus::Processing);
    assert_eq!(state.job.polls, 1);
    assert_eq!(
        state.session.video_data().map(|r| r.status.as_str()),
        Some("processing")
    );
    assert!(state.take_session_dirty());
}

#[test]
fn adopted_job_does_not_replace_an_active_one() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    submitted(&mut state, ticket, 3);
    apply_delta(
        &mut state,
        Delta::JobAdopted {
            record: VideoRecord {
                id: 99,
                status: "completed".to_string(),
                ..VideoRecord::default()
            },
        },
    );
    assert_eq!(state.job.id, Some(3));
}

#[test]
fn logout_clears_session_and_job() {
    let mut state = signed_in();
    let ticket = state.begin_upload(Path::new("clip.mp4"));
    submitted(&mut state, ticket, 4);
    apply_delta(
        &mut state,
        Delta::SetMatchStats {
            job_id: 4,
            stats: one_goal(),
        },
    );
    assert!(state.match_stats.is_some());

    state.logout();
    assert_eq!(state.screen, Screen::SignIn);
    assert!(!state.session.is_authenticated());
    assert_eq!(state.session.video_id(), None);
    assert!(state.match_stats.is_none());
    assert_eq!(state.job.id, None);

    // Results still in flight for the old job go nowhere.
    apply_delta(
        &mut state,
        Delta::JobCompleted {
            job_id: 4,
            results: JobResults::default(),
        },
    );
    assert_eq!(state.job.status, JobStatus::Idle);
}

#[test]
fn rejected_session_is_sent_to_sign_in() {
    let mut state = signed_in();
    state.navigate(Screen::TacticalAnalysis);
    assert_eq!(state.screen, Screen::TacticalAnalysis);
    apply_delta(
        &mut state,
        Delta::SessionInvalid {
            reason: "http 401: expired".to_string(),
        },
    );
    assert_eq!(state.screen, Screen::SignIn);
    assert!(!state.session.is_authenticated());

    state.navigate(Screen::MatchReports);
    assert_eq!(state.screen, Screen::SignIn);
}

#[test]
fn profile_refresh_updates_user_names() {
    let mut state = signed_in();
    apply_delta(
        &mut state,
        Delta::SessionValidated {
            profile: UserProfile {
                first_name: Some("Augusta".to_string()),
                last_name: Some("King".to_string()),
                email: Some("ada@club.test".to_string()),
                experience_level: Some("Pro".to_string()),
                ..UserProfile::default()
            },
        },
    );
    let user = state.session.user().cloned().unwrap_or_default();
    assert_eq!(user.display_name(), "Augusta King");
    assert_eq!(state.profile_baseline.experience_level, "Pro");
}

#[test]
fn export_progress_then_finish() {
    let mut state = AppState::new();
    apply_delta(
        &mut state,
        Delta::ExportStarted {
            path: "report.xlsx".to_string(),
            total: 0,
        },
    );
    apply_delta(
        &mut state,
        Delta::ExportProgress {
            current: 2,
            total: 6,
            message: "Passes".to_string(),
        },
    );
    assert_eq!((state.export.current, state.export.total), (2, 6));
    apply_delta(
        &mut state,
        Delta::ExportFinished {
            path: "report.xlsx".to_string(),
            sheets: 6,
            rows: 40,
        },
    );
    assert!(state.export.done);
    assert!(!state.export.failed);
    assert_eq!(state.export.message, "Done: 6 sheets, 40 rows");
}
