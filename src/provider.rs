use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, NaiveDateTime};

use crate::api::{BackendApi, JobId, VideoRecord, banner_message};
use crate::config::AppConfig;
use crate::job::JobStatus;
use crate::job_poller::{PollHandle, PollerConfig, spawn_job_poller};
use crate::match_stats::MatchStats;
use crate::report_export::export_match_report_with_progress;
use crate::state::{Delta, ProviderCommand};

/// Background worker: runs every backend call the UI asks for and owns the
/// single live poll loop. Exits when the command channel closes.
pub fn spawn_provider(
    api: Arc<dyn BackendApi>,
    config: AppConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut provider = Provider {
            api,
            poller: PollerConfig {
                api_base: config.api_base.clone(),
                interval: config.poll_interval,
            },
            tx,
            active: None,
        };
        while let Ok(cmd) = cmd_rx.recv() {
            provider.handle(cmd);
        }
        provider.stop_polling();
    })
}

struct Provider {
    api: Arc<dyn BackendApi>,
    poller: PollerConfig,
    tx: Sender<Delta>,
    active: Option<PollHandle>,
}

impl Provider {
    fn handle(&mut self, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::SignIn {
                request,
                resume_job,
            } => match self.api.sign_in(&request) {
                Ok(auth) => {
                    let token = auth.token.clone();
                    let _ = self.tx.send(Delta::SignedIn { auth });
                    self.resume(&token, resume_job);
                }
                Err(err) => self.auth_failed("Sign in", &err),
            },
            ProviderCommand::SignUp { request } => match self.api.sign_up(&request) {
                Ok(auth) => {
                    let token = auth.token.clone();
                    let _ = self.tx.send(Delta::SignedIn { auth });
                    self.resume(&token, None);
                }
                Err(err) => self.auth_failed("Sign up", &err),
            },
            ProviderCommand::ValidateSession { token, resume_job } => {
                match self.api.current_user(&token) {
                    Ok(profile) => {
                        let _ = self.tx.send(Delta::SessionValidated { profile });
                        self.resume(&token, resume_job);
                    }
                    Err(err) => {
                        let _ = self.tx.send(Delta::SessionInvalid {
                            reason: format!("{err:#}"),
                        });
                    }
                }
            }
            ProviderCommand::UpdateProfile { token, update } => {
                match self.api.update_profile(&token, &update) {
                    Ok(profile) => {
                        let _ = self.tx.send(Delta::ProfileUpdated { profile });
                    }
                    Err(err) => {
                        let _ = self.tx.send(Delta::ProfileUpdateFailed {
                            message: banner_message(&err),
                        });
                    }
                }
            }
            ProviderCommand::Upload {
                ticket,
                path,
                token,
            } => self.upload(ticket, path, token),
            ProviderCommand::StopPolling => self.stop_polling(),
            ProviderCommand::ExportReport {
                path,
                stats,
                job_id,
            } => self.export(path, stats, job_id),
        }
    }

    fn auth_failed(&self, action: &str, err: &anyhow::Error) {
        let _ = self.tx.send(Delta::Log(format!("[WARN] {action} failed: {err:#}")));
        let _ = self.tx.send(Delta::AuthFailed {
            message: banner_message(err),
        });
    }

    /// Upload first; only a job id from the backend starts a poll loop. The
    /// previous loop is stopped before the request goes out.
    fn upload(&mut self, ticket: u64, path: PathBuf, token: Option<String>) {
        self.stop_polling();
        match self.api.upload_video(&path, token.as_deref()) {
            Ok(response) => {
                let job_id = response.id;
                let _ = self.tx.send(Delta::JobSubmitted { ticket, response });
                self.watch(job_id, token);
            }
            Err(err) => {
                let _ = self.tx.send(Delta::UploadFailed {
                    ticket,
                    error: format!("{err:#}"),
                });
            }
        }
    }

    fn watch(&mut self, job_id: JobId, token: Option<String>) {
        self.stop_polling();
        self.active = Some(spawn_job_poller(
            Arc::clone(&self.api),
            token,
            job_id,
            self.poller.clone(),
            self.tx.clone(),
        ));
    }

    // Cancel without joining: a request in flight may take up to the HTTP
    // timeout, and its result is discarded by the loop anyway.
    fn stop_polling(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.cancel();
        }
    }

    /// Continue the session's job, or fall back to the latest completed one.
    fn resume(&mut self, token: &str, job: Option<JobId>) {
        match job {
            Some(job_id) => self.watch(job_id, Some(token.to_string())),
            None => self.adopt_latest(token),
        }
    }

    fn adopt_latest(&mut self, token: &str) {
        let records = match self.api.list_videos(Some(token)) {
            Ok(records) => records,
            Err(err) => {
                let _ = self
                    .tx
                    .send(Delta::Log(format!("[WARN] Listing jobs failed: {err:#}")));
                return;
            }
        };
        let Some(record) = pick_latest_completed(&records).cloned() else {
            let _ = self
                .tx
                .send(Delta::Log("[INFO] No completed jobs yet".to_string()));
            return;
        };
        let job_id = record.id;
        let _ = self.tx.send(Delta::JobAdopted { record });
        self.watch(job_id, Some(token.to_string()));
    }

    fn export(&self, path: PathBuf, stats: Box<MatchStats>, job_id: Option<JobId>) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let display_path = path.display().to_string();
            let _ = tx.send(Delta::ExportStarted {
                path: display_path.clone(),
                total: 0,
            });
            let progress_tx = tx.clone();
            let report = export_match_report_with_progress(&path, &stats, job_id, |progress| {
                let _ = progress_tx.send(Delta::ExportProgress {
                    current: progress.current,
                    total: progress.total,
                    message: progress.message,
                });
            });
            match report {
                Ok(report) => {
                    let _ = tx.send(Delta::ExportFinished {
                        path: report.path.display().to_string(),
                        sheets: report.sheets,
                        rows: report.rows,
                    });
                }
                Err(err) => {
                    let _ = tx.send(Delta::ExportFailed {
                        error: format!("{display_path}: {err:#}"),
                    });
                }
            }
        });
    }
}

/// Latest completed job by `uploaded_at`, ties (and unparseable timestamps)
/// broken by the larger id.
pub fn pick_latest_completed(records: &[VideoRecord]) -> Option<&VideoRecord> {
    records
        .iter()
        .filter(|record| JobStatus::parse(&record.status) == Some(JobStatus::Completed))
        .max_by_key(|record| (upload_millis(record.uploaded_at.as_deref()), record.id))
}

fn upload_millis(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
