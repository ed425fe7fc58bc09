use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::{BackendApi, JobId};
use crate::job::{PollStep, next_step};
use crate::match_stats::{MatchStats, parse_match_stats_json};
use crate::state::Delta;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub api_base: String,
    pub interval: Duration,
}

/// Owner side of a running poll loop. Dropping it stops the loop.
pub struct PollHandle {
    job_id: JobId,
    cancel_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Ask the loop to stop. No request is started after this returns; a
    /// request already in flight is discarded when it comes back.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Cancel and wait for the thread to exit.
    pub fn stop(mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Poll `job_id` immediately and then every `config.interval` until the job
/// reaches a terminal state or the handle is cancelled. On completion the
/// summary artifact is fetched exactly once.
pub fn spawn_job_poller(
    api: Arc<dyn BackendApi>,
    token: Option<String>,
    job_id: JobId,
    config: PollerConfig,
    tx: Sender<Delta>,
) -> PollHandle {
    let (cancel_tx, cancel_rx) = mpsc::channel();
    let thread = thread::spawn(move || {
        run_poll_loop(api.as_ref(), token.as_deref(), job_id, &config, &tx, &cancel_rx);
    });
    PollHandle {
        job_id,
        cancel_tx: Some(cancel_tx),
        thread: Some(thread),
    }
}

fn cancelled(cancel_rx: &Receiver<()>) -> bool {
    !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty))
}

fn run_poll_loop(
    api: &dyn BackendApi,
    token: Option<&str>,
    job_id: JobId,
    config: &PollerConfig,
    tx: &Sender<Delta>,
    cancel_rx: &Receiver<()>,
) {
    loop {
        if cancelled(cancel_rx) {
            return;
        }
        let response = api.video_status(job_id, token);
        if cancelled(cancel_rx) {
            return;
        }

        match response {
            Ok(record) => {
                let step = next_step(&record, &config.api_base);
                let _ = tx.send(Delta::JobStatus {
                    job_id,
                    record: record.clone(),
                });
                match step {
                    PollStep::Continue(_) => {}
                    PollStep::Completed(results) => {
                        let summary_url = results.summary_json_url.clone();
                        let _ = tx.send(Delta::JobCompleted { job_id, results });
                        match summary_url {
                            Some(url) => hydrate_summary(api, token, job_id, &url, tx, cancel_rx),
                            None => {
                                let _ = tx.send(Delta::SummaryUnavailable {
                                    job_id,
                                    reason: "no summary artifact".to_string(),
                                });
                            }
                        }
                        return;
                    }
                    PollStep::Failed(error) => {
                        let _ = tx.send(Delta::JobFailed { job_id, error });
                        return;
                    }
                }
            }
            // No retry: a failed status request ends the job.
            Err(err) => {
                let _ = tx.send(Delta::JobFailed {
                    job_id,
                    error: format!("status request failed: {err:#}"),
                });
                return;
            }
        }

        match cancel_rx.recv_timeout(config.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Fetch and parse the summary once. Failures are logged only; the job stays
/// completed with no statistics.
pub fn hydrate_summary(
    api: &dyn BackendApi,
    token: Option<&str>,
    job_id: JobId,
    url: &str,
    tx: &Sender<Delta>,
    cancel_rx: &Receiver<()>,
) {
    let result = fetch_summary(api, token, url);
    if cancelled(cancel_rx) {
        return;
    }
    match result {
        Ok(stats) => {
            let _ = tx.send(Delta::SetMatchStats {
                job_id,
                stats: Box::new(stats),
            });
        }
        Err(err) => {
            let _ = tx.send(Delta::SummaryUnavailable {
                job_id,
                reason: format!("{err:#}"),
            });
        }
    }
}

pub fn fetch_summary(api: &dyn BackendApi, token: Option<&str>, url: &str) -> Result<MatchStats> {
    let body = api
        .fetch_artifact(url, token)
        .with_context(|| format!("fetch summary {url}"))?;
    parse_match_stats_json(&body).context("parse summary")
}
