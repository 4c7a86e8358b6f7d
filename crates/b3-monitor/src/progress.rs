//! Progress tracking for a single ETL job.
//!
//! A [`JobState`] belongs to the caller that starts the job and is passed
//! `&mut` through the run. Nothing here is global, so concurrent jobs each
//! carry their own state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Validating,
    Cleaning,
    Transforming,
    Loading,
    Completed,
    Failed,
}

impl JobStatus {
    /// Progress percentage reached on entering this status.
    ///
    /// `Failed` has none: a failed job keeps the progress it had.
    pub fn entry_progress(&self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Validating => Some(10),
            JobStatus::Cleaning => Some(30),
            JobStatus::Transforming => Some(60),
            JobStatus::Loading => Some(80),
            JobStatus::Completed => Some(100),
            JobStatus::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Validating => "validating",
            JobStatus::Cleaning => "cleaning",
            JobStatus::Transforming => "transforming",
            JobStatus::Loading => "loading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One line of the job's own log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub step: String,
    pub message: String,
}

impl fmt::Display for JobLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:?}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.level,
            self.step,
            self.message
        )
    }
}

/// Mutable state of one ETL job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Percent complete, 0 to 100
    pub progress: u8,
    pub current_step: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed_rows: usize,
    pub cleaned_rows: usize,
    pub error_count: usize,
    pub error_message: Option<String>,
    pub logs: Vec<JobLogEntry>,
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

impl JobState {
    pub fn new() -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            current_step: String::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            processed_rows: 0,
            cleaned_rows: 0,
            error_count: 0,
            error_message: None,
            logs: Vec::new(),
        }
    }

    /// Move to `status`, recording `step` as the current step.
    ///
    /// The first transition out of `Pending` stamps `started_at`; a
    /// terminal status stamps `finished_at`. Progress never moves backwards.
    pub fn enter(&mut self, status: JobStatus, step: impl Into<String>) {
        let now = Utc::now();
        if self.started_at.is_none() && status != JobStatus::Pending {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.finished_at = Some(now);
        }
        if let Some(progress) = status.entry_progress() {
            self.progress = self.progress.max(progress);
        }
        self.status = status;
        self.current_step = step.into();

        let step = self.current_step.clone();
        self.log(LogLevel::Info, &step, format!("status: {status}"));
    }

    /// Set progress within the current stage, clamped to 100.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Append a log entry and mirror it to `tracing`.
    pub fn log(&mut self, level: LogLevel, step: &str, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!(job_id = %self.job_id, step, "{message}"),
            LogLevel::Warning => warn!(job_id = %self.job_id, step, "{message}"),
            LogLevel::Error => {
                self.error_count += 1;
                error!(job_id = %self.job_id, step, "{message}")
            }
        }
        self.logs.push(JobLogEntry {
            timestamp: Utc::now(),
            level,
            step: step.to_string(),
            message,
        });
    }

    pub fn info(&mut self, step: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, step, message);
    }

    pub fn warn(&mut self, step: &str, message: impl Into<String>) {
        self.log(LogLevel::Warning, step, message);
    }

    /// Mark the job completed.
    pub fn complete(&mut self) {
        self.enter(JobStatus::Completed, "finished");
    }

    /// Mark the job failed at the current step.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        let step = self.current_step.clone();
        self.log(LogLevel::Error, &step, message.clone());
        self.error_message = Some(message);
        self.status = JobStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && !self.status.is_terminal()
    }

    /// Wall time from start to finish, or to now while still running.
    pub fn elapsed(&self) -> Option<Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - started)
    }

    /// Entries at or above `Warning`.
    pub fn problems(&self) -> impl Iterator<Item = &JobLogEntry> {
        self.logs.iter().filter(|e| e.level != LogLevel::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = JobState::new();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.started_at.is_none());
        assert!(!job.is_running());
        assert!(job.elapsed().is_none());
    }

    #[test]
    fn test_jobs_get_distinct_ids() {
        assert_ne!(JobState::new().job_id, JobState::new().job_id);
    }

    #[test]
    fn test_stage_progression() {
        let mut job = JobState::new();
        let stages = [
            (JobStatus::Validating, 10),
            (JobStatus::Cleaning, 30),
            (JobStatus::Transforming, 60),
            (JobStatus::Loading, 80),
        ];
        for (status, progress) in stages {
            job.enter(status, status.as_str());
            assert_eq!(job.progress, progress);
            assert!(job.is_running());
        }
        job.complete();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.finished_at.is_some());
        assert!(!job.is_running());
        assert_eq!(job.logs.len(), 5);
        assert_eq!(job.error_count, 0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = JobState::new();
        job.enter(JobStatus::Transforming, "indicators");
        job.set_progress(45);
        assert_eq!(job.progress, 60);
        job.set_progress(250);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_fail_keeps_progress_and_records_error() {
        let mut job = JobState::new();
        job.enter(JobStatus::Cleaning, "cleaning");
        job.warn("cleaning", "12 rows dropped");
        job.fail("empty dataset");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 30);
        assert_eq!(job.error_count, 1);
        assert_eq!(job.error_message.as_deref(), Some("empty dataset"));
        assert_eq!(job.problems().count(), 2);

        let last = job.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.step, "cleaning");
        assert!(last.to_string().contains("cleaning: empty dataset"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Transforming).unwrap();
        assert_eq!(json, "\"transforming\"");
        let json = serde_json::to_string(&LogLevel::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
    }
}
