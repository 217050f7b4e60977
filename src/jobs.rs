//! Conversion jobs and the queue that owns them.
//!
//! ## Lifecycle
//!
//! ```text
//!   Pending ──start──▶ Converting ──finish(Ok)──▶ Done
//!                          │
//!                          └──────finish(Err)──▶ Error
//! ```
//!
//! `Done` and `Error` are terminal. A job reaches `Done` only with
//! non-empty output; any failure, including an empty result, lands in
//! `Error` with a message and no bytes.
//!
//! [`JobQueue`] is the single owner of the job collection. Callers add
//! jobs, run them with [`JobQueue::run_all`], then read results or remove
//! finished jobs. There is no process-wide job list.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, ErrorKind};
use crate::format::TargetFormat;
use crate::output::{output_file_name, ConversionOutput};
use crate::source::SourceFile;
use crate::stream::{convert_stream, JobRequest};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Converting,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Converting => "converting",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended in [`JobStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ConvertError> for JobFailure {
    fn from(e: &ConvertError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// One file queued for conversion to one target.
#[derive(Debug)]
pub struct ConversionJob {
    id: u64,
    source: SourceFile,
    target: String,
    status: JobStatus,
    output: Option<ConversionOutput>,
    failure: Option<JobFailure>,
}

impl ConversionJob {
    pub fn new(id: u64, source: SourceFile, target: impl Into<String>) -> Self {
        Self {
            id,
            source,
            target: target.into(),
            status: JobStatus::Pending,
            output: None,
            failure: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Requested target MIME type.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Present only in [`JobStatus::Done`].
    pub fn output(&self) -> Option<&ConversionOutput> {
        self.output.as_ref()
    }

    /// Present only in [`JobStatus::Error`].
    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    /// Move `Pending → Converting`.
    pub fn start(&mut self) -> Result<(), ConvertError> {
        self.transition(JobStatus::Pending, JobStatus::Converting)
    }

    /// Move `Converting → Done` or `Converting → Error`.
    ///
    /// A successful result with no bytes is recorded as an encode failure.
    pub fn finish(
        &mut self,
        result: Result<ConversionOutput, ConvertError>,
    ) -> Result<(), ConvertError> {
        let result = result.and_then(|out| {
            if out.bytes.is_empty() {
                Err(ConvertError::encode(out.target.label(), "conversion produced no output"))
            } else {
                Ok(out)
            }
        });

        match result {
            Ok(out) => {
                self.transition(JobStatus::Converting, JobStatus::Done)?;
                self.output = Some(out);
            }
            Err(e) => {
                self.transition(JobStatus::Converting, JobStatus::Error)?;
                self.failure = Some(JobFailure::from(&e));
            }
        }
        Ok(())
    }

    /// Take the converted bytes out of a finished job, leaving the
    /// metadata in place.
    pub fn take_bytes(&mut self) -> Option<Vec<u8>> {
        self.output.as_mut().map(|o| std::mem::take(&mut o.bytes))
    }

    /// Download name for the output (`holiday.heic` → `holiday.jpg`).
    pub fn output_name(&self) -> Option<String> {
        TargetFormat::from_mime(&self.target).map(|t| output_file_name(self.source.name(), t))
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            file_name: self.source.name().to_string(),
            target: self.target.clone(),
            status: self.status,
            output_name: self.output.as_ref().and_then(|_| self.output_name()),
            output_bytes: self.output.as_ref().map(|o| o.stats.output_bytes),
            duration_ms: self.output.as_ref().map(|o| o.stats.duration_ms),
            error: self.failure.clone(),
        }
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<(), ConvertError> {
        if self.status != from {
            return Err(ConvertError::InvalidJobTransition {
                id: self.id,
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Serializable snapshot of a job, for job lists and `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: u64,
    pub file_name: String,
    pub target: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

/// Totals for one [`JobQueue::run_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Owns a collection of [`ConversionJob`]s.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<ConversionJob>,
    next_id: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `source` for conversion to `target_mime`. Returns the job id.
    pub fn add(&mut self, source: SourceFile, target_mime: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.jobs.push(ConversionJob::new(id, source, target_mime));
        id
    }

    pub fn get(&self, id: u64) -> Option<&ConversionJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut ConversionJob> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// Jobs in insertion order.
    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn remove(&mut self, id: u64) -> Option<ConversionJob> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        Some(self.jobs.remove(pos))
    }

    /// Drop every job in a terminal state. Returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.status.is_terminal());
        before - self.jobs.len()
    }

    pub fn summaries(&self) -> Vec<JobSummary> {
        self.jobs.iter().map(ConversionJob::summary).collect()
    }

    /// Convert every pending job, `config.concurrency` at a time.
    ///
    /// Each job ends `Done` or `Error`; one failure never affects the
    /// others. Jobs already past `Pending` are left alone.
    pub async fn run_all(&mut self, config: &ConversionConfig) -> BatchSummary {
        let mut requests = Vec::new();
        for job in self.jobs.iter_mut() {
            if job.start().is_ok() {
                requests.push(JobRequest::new(job.id, job.source.clone(), job.target.clone()));
            }
        }

        let total = requests.len();
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };
        if let Some(cb) = &config.progress_callback {
            cb.on_batch_start(total);
        }
        info!("Running {} pending job(s)", total);

        let mut outcomes = convert_stream(requests, config);
        while let Some(outcome) = outcomes.next().await {
            let Some(job) = self.get_mut(outcome.id) else {
                warn!("Job {} vanished during the batch", outcome.id);
                continue;
            };
            if let Err(e) = job.finish(outcome.result) {
                warn!("{e}");
                continue;
            }
            if job.status == JobStatus::Done {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        if let Some(cb) = &config.progress_callback {
            cb.on_batch_complete(total, summary.succeeded);
        }
        info!(
            "Batch complete: {}/{} succeeded, {} failed",
            summary.succeeded, summary.total, summary.failed
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_source(name: &str) -> SourceFile {
        SourceFile::new(name, "text/csv", b"a,b\n1,2\n".to_vec())
    }

    #[test]
    fn new_job_is_pending() {
        let job = ConversionJob::new(7, csv_source("d.csv"), "text/html");
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.output().is_none());
        assert!(job.failure().is_none());
        assert_eq!(job.output_name().as_deref(), Some("d.html"));
    }

    #[test]
    fn finish_requires_converting() {
        let mut job = ConversionJob::new(1, csv_source("d.csv"), "text/csv");
        let err = job
            .finish(Err(ConvertError::TaskFailed("x".into())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Job);
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn terminal_states_are_never_left() {
        let mut job = ConversionJob::new(1, csv_source("d.csv"), "text/csv");
        job.start().expect("start");
        job.finish(Err(ConvertError::decode("CSV", "bad"))).expect("finish");
        assert_eq!(job.status(), JobStatus::Error);

        assert!(job.start().is_err());
        assert!(job.finish(Err(ConvertError::decode("CSV", "bad"))).is_err());
        assert_eq!(job.status(), JobStatus::Error);
        assert_eq!(job.failure().map(|f| f.kind), Some(ErrorKind::DecodeError));
    }

    #[test]
    fn empty_output_forces_error() {
        use crate::format::Category;
        use crate::output::ConversionStats;
        use crate::source::SourceFormat;

        let mut job = ConversionJob::new(1, csv_source("d.csv"), "text/csv");
        job.start().expect("start");
        job.finish(Ok(ConversionOutput {
            bytes: Vec::new(),
            target: TargetFormat::Csv,
            category: Category::Spreadsheet,
            source_format: SourceFormat::Csv,
            stats: ConversionStats::default(),
        }))
        .expect("finish");
        assert_eq!(job.status(), JobStatus::Error);
        assert!(job.output().is_none());
        assert_eq!(job.failure().map(|f| f.kind), Some(ErrorKind::EncodeError));
    }

    #[tokio::test]
    async fn run_all_marks_each_job_done_or_error() {
        let mut queue = JobQueue::new();
        let good = queue.add(csv_source("d.csv"), "text/csv");
        let bad = queue.add(SourceFile::new("x.zip", "application/zip", b"PK".to_vec()), "text/csv");
        let wrong_target = queue.add(csv_source("e.csv"), "image/png");

        let summary = queue.run_all(&ConversionConfig::default()).await;
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                succeeded: 1,
                failed: 2
            }
        );

        let done = queue.get(good).expect("job");
        assert_eq!(done.status(), JobStatus::Done);
        assert_eq!(done.output().map(|o| o.bytes.as_slice()), Some(&b"a,b\n1,2\n"[..]));

        for id in [bad, wrong_target] {
            let job = queue.get(id).expect("job");
            assert_eq!(job.status(), JobStatus::Error);
            assert!(job.output().is_none());
            assert_eq!(
                job.failure().map(|f| f.kind),
                Some(ErrorKind::UnsupportedConversion)
            );
        }

        // A second run has nothing left to do.
        let again = queue.run_all(&ConversionConfig::default()).await;
        assert_eq!(again.total, 0);

        assert_eq!(queue.clear_finished(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn ids_are_unique_and_removal_works() {
        let mut queue = JobQueue::new();
        let a = queue.add(csv_source("a.csv"), "text/csv");
        let b = queue.add(csv_source("b.csv"), "text/csv");
        assert_ne!(a, b);
        assert_eq!(queue.remove(a).map(|j| j.id()), Some(a));
        assert!(queue.get(a).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn summary_serialises_status_lowercase() {
        let mut queue = JobQueue::new();
        queue.add(csv_source("a.csv"), "text/csv");
        let json = serde_json::to_value(queue.summaries()).expect("serialize");
        assert_eq!(json[0]["status"], "pending");
        assert!(json[0].get("error").is_none());
    }
}
