use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{JobId, VideoRecord};
use crate::urls::normalize_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Uploading,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "uploading" => Some(Self::Uploading),
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// No further polling once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States the poller keeps re-visiting.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Uploading | Self::Pending | Self::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Artifact URLs of a completed job, already absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResults {
    pub output_video_url: Option<String>,
    pub summary_json_url: Option<String>,
    pub object_tracks_json_url: Option<String>,
    pub keypoint_tracks_json_url: Option<String>,
    pub event_frame_urls: Vec<String>,
}

impl JobResults {
    /// Only a `completed` record yields results; the URL fields of any other
    /// record are not trusted.
    pub fn from_completed(record: &VideoRecord, api_base: &str) -> Option<Self> {
        if JobStatus::parse(&record.status) != Some(JobStatus::Completed) {
            return None;
        }
        let norm = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|value| normalize_url(api_base, value))
        };
        Some(Self {
            output_video_url: norm(&record.output_video_url),
            summary_json_url: norm(&record.summary_json_url),
            object_tracks_json_url: norm(&record.object_tracks_json_url),
            keypoint_tracks_json_url: norm(&record.keypoint_tracks_json_url),
            event_frame_urls: record
                .event_frame_urls
                .iter()
                .filter_map(|url| normalize_url(api_base, url))
                .collect(),
        })
    }
}

/// What the poller does after one status response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Continue(JobStatus),
    Completed(JobResults),
    Failed(String),
}

pub fn next_step(record: &VideoRecord, api_base: &str) -> PollStep {
    match JobStatus::parse(&record.status) {
        Some(JobStatus::Completed) => {
            PollStep::Completed(JobResults::from_completed(record, api_base).unwrap_or_default())
        }
        Some(JobStatus::Failed) => {
            PollStep::Failed(format!("job {} failed on the backend", record.id))
        }
        Some(status) if status.is_in_flight() => PollStep::Continue(status),
        _ => PollStep::Failed(format!(
            "job {} reported unexpected status {:?}",
            record.id, record.status
        )),
    }
}

/// Job state shared by every analytics screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobView {
    pub id: Option<JobId>,
    pub status: JobStatus,
    pub file_name: Option<String>,
    pub results: Option<JobResults>,
    pub error: Option<String>,
    pub polls: u32,
}

impl JobView {
    pub fn is_current(&self, job_id: JobId) -> bool {
        self.id == Some(job_id)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn status_line(&self) -> String {
        let file = self.file_name.as_deref().unwrap_or("");
        match (self.id, self.status) {
            (None, JobStatus::Idle) => "No match video selected".to_string(),
            (None, status) => format!("{file} {status}").trim().to_string(),
            (Some(id), status) => {
                let mut line = format!("Job #{id} {status}");
                if !file.is_empty() {
                    line = format!("{line} ({file})");
                }
                if let Some(err) = &self.error {
                    line = format!("{line}: {err}");
                }
                line
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> VideoRecord {
        VideoRecord {
            id: 9,
            status: status.to_string(),
            summary_json_url: Some("/media/9/summary.json".to_string()),
            output_video_url: Some("https://cdn.example.com/9.mp4".to_string()),
            ..VideoRecord::default()
        }
    }

    #[test]
    fn urls_are_ignored_before_completion() {
        assert!(JobResults::from_completed(&record("processing"), "http://h").is_none());
        let results = JobResults::from_completed(&record("completed"), "http://h").unwrap();
        assert_eq!(
            results.summary_json_url.as_deref(),
            Some("http://h/media/9/summary.json")
        );
        assert_eq!(
            results.output_video_url.as_deref(),
            Some("https://cdn.example.com/9.mp4")
        );
    }

    #[test]
    fn unknown_status_fails_the_job() {
        assert!(matches!(next_step(&record("exploded"), "http://h"), PollStep::Failed(_)));
        assert_eq!(
            next_step(&record("PENDING"), "http://h"),
            PollStep::Continue(JobStatus::Pending)
        );
    }
}
