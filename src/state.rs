use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

use crate::api::{
    AuthResponse, JobId, ProfileUpdate, SignInRequest, SignUpRequest, UploadResponse, UserProfile,
    VideoRecord,
};
use crate::auth::ProfileForm;
use crate::forms::TextForm;
use crate::job::{JobResults, JobStatus, JobView};
use crate::match_stats::{MatchStats, TEAM_A, TEAM_B, TimelineEvent, TimelineKind};
use crate::pitch::{PitchDot, layout_players};
use crate::routes::{Screen, guard};
use crate::session::Session;

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub session: Session,
    /// Set whenever `session` changed and has not been written yet.
    pub session_dirty: bool,
    pub validating_session: bool,
    pub job: JobView,
    pub upload_ticket: u64,
    pub upload_input: Option<String>,
    pub match_stats: Option<MatchStats>,
    pub stats_loading: bool,
    pub pitch_dots: Vec<PitchDot>,
    pub player_team: &'static str,
    pub player_selected: usize,
    pub timeline_filter: Option<TimelineKind>,
    pub timeline_scroll: u16,
    pub sign_in: TextForm,
    pub sign_up: TextForm,
    pub profile_form: TextForm,
    pub profile_baseline: ProfileForm,
    pub banner: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::SignIn,
            session: Session::default(),
            session_dirty: false,
            validating_session: false,
            job: JobView::default(),
            upload_ticket: 0,
            upload_input: None,
            match_stats: None,
            stats_loading: false,
            pitch_dots: Vec::new(),
            player_team: TEAM_A,
            player_selected: 0,
            timeline_filter: None,
            timeline_scroll: 0,
            sign_in: TextForm::sign_in(),
            sign_up: TextForm::sign_up(),
            profile_form: TextForm::profile(&ProfileForm::default()),
            profile_baseline: ProfileForm::default(),
            banner: None,
            logs: VecDeque::new(),
            help_overlay: false,
            export: ExportState::new(),
        }
    }

    /// State restored from a persisted session. A stored token is trusted
    /// until the backend says otherwise.
    pub fn from_session(session: Session) -> Self {
        let mut state = Self::new();
        let authenticated = session.is_authenticated();
        state.screen = guard(Screen::Dashboard, authenticated);
        state.validating_session = authenticated;
        if let Some(id) = session.video_id() {
            state.job.id = Some(id);
            state.job.status = session
                .video_data()
                .filter(|record| record.id == id)
                .and_then(|record| JobStatus::parse(&record.status))
                .unwrap_or(JobStatus::Pending);
        }
        state.session = session;
        state
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    /// Returns true once per batch of session changes.
    pub fn take_session_dirty(&mut self) -> bool {
        std::mem::take(&mut self.session_dirty)
    }

    pub fn navigate(&mut self, target: Screen) {
        self.screen = guard(target, self.session.is_authenticated());
        self.banner = None;
        self.upload_input = None;
        if self.screen == Screen::Settings {
            self.start_profile_edit();
        }
    }

    /// Prepare the job view for a new upload and hand out its ticket.
    pub fn begin_upload(&mut self, path: &std::path::Path) -> u64 {
        self.clear_job_view();
        self.upload_ticket += 1;
        self.job.status = JobStatus::Uploading;
        self.job.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.push_log(format!("[INFO] Uploading {}", path.display()));
        self.upload_ticket
    }

    /// Back to idle. Any upload still in flight becomes stale.
    pub fn reset_job(&mut self) {
        self.clear_job_view();
        self.upload_ticket += 1;
        self.push_log("[INFO] Job reset");
    }

    fn clear_job_view(&mut self) {
        self.job.reset();
        self.match_stats = None;
        self.stats_loading = false;
        self.pitch_dots.clear();
        self.player_selected = 0;
        self.timeline_scroll = 0;
        if self.session.video_id().is_some() {
            self.session.clear_job();
            self.session_dirty = true;
        }
    }

    pub fn logout(&mut self) {
        self.clear_job_view();
        self.upload_ticket += 1;
        self.session.logout();
        self.session_dirty = true;
        self.validating_session = false;
        self.sign_in = TextForm::sign_in();
        self.sign_up = TextForm::sign_up();
        self.screen = Screen::SignIn;
        self.push_log("[INFO] Signed out");
    }

    pub fn start_profile_edit(&mut self) {
        self.profile_baseline = ProfileForm::from_session(&self.session);
        self.profile_form = TextForm::profile(&self.profile_baseline);
    }

    /// Changed profile fields, or None when the form is invalid.
    pub fn profile_changes(&mut self) -> Option<ProfileUpdate> {
        let form = self.profile_form.to_profile();
        let errors = form.validate();
        if !errors.is_empty() {
            self.profile_form.errors = errors;
            return None;
        }
        Some(form.diff(&self.profile_baseline))
    }

    pub fn selected_player_id(&self) -> Option<u64> {
        let stats = self.match_stats.as_ref()?;
        stats
            .players_for_team(self.player_team)
            .get(self.player_selected)
            .map(|(id, _)| *id)
    }

    pub fn player_count(&self) -> usize {
        self.match_stats
            .as_ref()
            .map(|stats| stats.players_for_team(self.player_team).len())
            .unwrap_or(0)
    }

    pub fn move_player_selection(&mut self, step: isize) {
        let count = self.player_count();
        if count == 0 {
            self.player_selected = 0;
            return;
        }
        let next = self.player_selected as isize + step;
        self.player_selected = next.clamp(0, count as isize - 1) as usize;
    }

    pub fn toggle_player_team(&mut self) {
        self.player_team = if self.player_team == TEAM_A { TEAM_B } else { TEAM_A };
        self.player_selected = 0;
    }

    pub fn cycle_timeline_filter(&mut self) {
        self.timeline_filter = match self.timeline_filter {
            None => Some(TimelineKind::Goal),
            Some(TimelineKind::Goal) => Some(TimelineKind::Shot),
            Some(TimelineKind::Shot) => Some(TimelineKind::Pass),
            Some(TimelineKind::Pass) => None,
        };
        self.timeline_scroll = 0;
    }

    pub fn timeline_events(&self) -> Vec<TimelineEvent> {
        let Some(stats) = &self.match_stats else {
            return Vec::new();
        };
        stats
            .timeline()
            .into_iter()
            .filter(|event| self.timeline_filter.is_none_or(|kind| event.kind == kind))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub failed: bool,
    pub last_updated: Option<Instant>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self {
            active: false,
            done: false,
            path: None,
            current: 0,
            total: 0,
            message: String::new(),
            failed: false,
            last_updated: None,
        }
    }

    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::new();
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SessionValidated {
        profile: UserProfile,
    },
    SessionInvalid {
        reason: String,
    },
    SignedIn {
        auth: AuthResponse,
    },
    AuthFailed {
        message: String,
    },
    ProfileUpdated {
        profile: UserProfile,
    },
    ProfileUpdateFailed {
        message: String,
    },
    JobSubmitted {
        ticket: u64,
        response: UploadResponse,
    },
    UploadFailed {
        ticket: u64,
        error: String,
    },
    /// Latest completed job picked when the session had none.
    JobAdopted {
        record: VideoRecord,
    },
    JobStatus {
        job_id: JobId,
        record: VideoRecord,
    },
    JobCompleted {
        job_id: JobId,
        results: JobResults,
    },
    JobFailed {
        job_id: JobId,
        error: String,
    },
    SetMatchStats {
        job_id: JobId,
        stats: Box<MatchStats>,
    },
    SummaryUnavailable {
        job_id: JobId,
        reason: String,
    },
    ExportStarted {
        path: String,
        total: usize,
    },
    ExportProgress {
        current: usize,
        total: usize,
        message: String,
    },
    ExportFinished {
        path: String,
        sheets: usize,
        rows: usize,
    },
    ExportFailed {
        error: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    SignIn {
        request: SignInRequest,
        resume_job: Option<JobId>,
    },
    SignUp {
        request: SignUpRequest,
    },
    ValidateSession {
        token: String,
        resume_job: Option<JobId>,
    },
    UpdateProfile {
        token: String,
        update: ProfileUpdate,
    },
    Upload {
        ticket: u64,
        path: PathBuf,
        token: Option<String>,
    },
    StopPolling,
    ExportReport {
        path: PathBuf,
        stats: Box<MatchStats>,
        job_id: Option<JobId>,
    },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SessionValidated { profile } => {
            state.validating_session = false;
            state.session.apply_profile(&profile);
            state.session_dirty = true;
            if state.screen != Screen::Settings {
                state.start_profile_edit();
            }
        }
        Delta::SessionInvalid { reason } => {
            state.validating_session = false;
            state.session.clear_credentials();
            state.session_dirty = true;
            state.screen = guard(state.screen, false);
            state.push_log(format!("[WARN] Stored session rejected: {reason}"));
        }
        Delta::SignedIn { auth } => {
            state.session.login(&auth);
            state.session_dirty = true;
            state.sign_in = TextForm::sign_in();
            state.sign_up = TextForm::sign_up();
            state.banner = None;
            state.start_profile_edit();
            state.screen = guard(Screen::Dashboard, true);
            state.push_log(format!("[INFO] Signed in as {}", auth.user.email));
        }
        Delta::AuthFailed { message } => {
            state.sign_in.submitting = false;
            state.sign_in.clear_secrets();
            state.sign_up.submitting = false;
            state.banner = Some(message);
        }
        Delta::ProfileUpdated { profile } => {
            state.session.apply_profile(&profile);
            state.session_dirty = true;
            state.start_profile_edit();
            state.banner = Some("Profile updated".to_string());
            state.push_log("[INFO] Profile updated");
        }
        Delta::ProfileUpdateFailed { message } => {
            state.profile_form.submitting = false;
            state.banner = Some(message);
        }
        Delta::JobSubmitted { ticket, response } => {
            if ticket != state.upload_ticket {
                state.push_log(format!(
                    "[INFO] Ignoring stale upload result (job {})",
                    response.id
                ));
                return;
            }
            state.job.id = Some(response.id);
            state.job.status = JobStatus::parse(&response.status).unwrap_or(JobStatus::Pending);
            state.job.error = None;
            state.session.set_job(response.id);
            state.session_dirty = true;
            state.push_log(format!(
                "[INFO] Job {} submitted ({})",
                response.id, state.job.status
            ));
        }
        Delta::UploadFailed { ticket, error } => {
            if ticket != state.upload_ticket {
                return;
            }
            state.job.status = JobStatus::Failed;
            state.job.error = Some(error.clone());
            state.push_log(format!("[WARN] Upload failed: {error}"));
        }
        Delta::JobAdopted { record } => {
            if state.job.id.is_some() || state.job.status == JobStatus::Uploading {
                return;
            }
            state.job.id = Some(record.id);
            state.job.status = JobStatus::parse(&record.status).unwrap_or(JobStatus::Pending);
            state.session.remember_record(&record);
            state.session_dirty = true;
            state.push_log(format!(
                "[INFO] Using latest completed job {} (uploaded {})",
                record.id,
                record.uploaded_at.as_deref().unwrap_or("unknown")
            ));
        }
        Delta::JobStatus { job_id, record } => {
            if !state.job.is_current(job_id) {
                return;
            }
            state.job.polls = state.job.polls.saturating_add(1);
            if let Some(status) = JobStatus::parse(&record.status) {
                state.job.status = status;
            }
            state.session.remember_record(&record);
            state.session_dirty = true;
        }
        Delta::JobCompleted { job_id, results } => {
            if !state.job.is_current(job_id) {
                return;
            }
            state.job.status = JobStatus::Completed;
            state.job.error = None;
            state.stats_loading = results.summary_json_url.is_some();
            state.job.results = Some(results);
            state.push_log(format!("[INFO] Job {job_id} completed"));
        }
        Delta::JobFailed { job_id, error } => {
            if !state.job.is_current(job_id) {
                return;
            }
            state.job.status = JobStatus::Failed;
            state.job.error = Some(error.clone());
            state.stats_loading = false;
            state.push_log(format!("[ALERT] Job {job_id} failed: {error}"));
        }
        Delta::SetMatchStats { job_id, stats } => {
            if !state.job.is_current(job_id) {
                return;
            }
            state.pitch_dots = layout_players(&stats);
            state.match_stats = Some(*stats);
            state.stats_loading = false;
            state.player_selected = 0;
            state.timeline_scroll = 0;
            state.push_log(format!("[INFO] Summary loaded for job {job_id}"));
        }
        Delta::SummaryUnavailable { job_id, reason } => {
            if !state.job.is_current(job_id) {
                return;
            }
            state.stats_loading = false;
            state.match_stats = None;
            state.push_log(format!(
                "[WARN] Summary not available for job {job_id}: {reason}"
            ));
        }
        Delta::ExportStarted { path, total } => {
            state.export.active = true;
            state.export.path = Some(path);
            state.export.total = total;
            state.export.current = 0;
            state.export.message = "Starting export".to_string();
            state.export.done = false;
            state.export.failed = false;
            state.export.last_updated = Some(Instant::now());
        }
        Delta::ExportProgress {
            current,
            total,
            message,
        } => {
            state.export.active = true;
            state.export.total = total;
            state.export.current = current;
            state.export.message = message;
            state.export.last_updated = Some(Instant::now());
        }
        Delta::ExportFinished { path, sheets, rows } => {
            state.export.active = true;
            state.export.current = state.export.total.max(sheets);
            state.export.total = state.export.current;
            state.export.message = format!("Done: {sheets} sheets, {rows} rows");
            state.export.done = true;
            state.export.last_updated = Some(Instant::now());
            state.push_log(format!("[INFO] Report written to {path}"));
            state.export.path = Some(path);
        }
        Delta::ExportFailed { error } => {
            state.export.active = true;
            state.export.done = true;
            state.export.failed = true;
            state.export.message = format!("Failed: {error}");
            state.export.last_updated = Some(Instant::now());
            state.push_log(format!("[WARN] Report export failed: {error}"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
