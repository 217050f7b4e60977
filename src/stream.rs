//! Streaming batch API: emit job outcomes as they complete.
//!
//! ## Why stream?
//!
//! A batch mixes quick conversions (a small PNG) with slow ones (a large
//! workbook laid out to PDF). Yielding each [`JobOutcome`] as soon as its
//! conversion finishes lets callers update a job list or write files
//! incrementally instead of waiting for the slowest input.
//!
//! Outcomes arrive in completion order, not submission order. Match on
//! [`JobOutcome::id`] if order matters.
//!
//! Per-job progress events (`on_job_start`, `on_job_complete`,
//! `on_job_error`) fire from here. Batch-level events belong to
//! [`crate::jobs::JobQueue::run_all`].

use crate::config::ConversionConfig;
use crate::convert::convert_with_config;
use crate::error::ConvertError;
use crate::output::ConversionOutput;
use crate::source::SourceFile;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{debug, info};

/// One unit of work for [`convert_stream`].
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Caller-chosen identifier echoed back in the outcome.
    pub id: u64,
    pub source: SourceFile,
    /// Target MIME type.
    pub target: String,
}

impl JobRequest {
    pub fn new(id: u64, source: SourceFile, target: impl Into<String>) -> Self {
        Self {
            id,
            source,
            target: target.into(),
        }
    }
}

/// The result of one [`JobRequest`].
#[derive(Debug)]
pub struct JobOutcome {
    pub id: u64,
    pub file_name: String,
    pub result: Result<ConversionOutput, ConvertError>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A boxed stream of job outcomes.
pub type JobStream = Pin<Box<dyn Stream<Item = JobOutcome> + Send>>;

/// Convert every request, at most `config.concurrency` at a time.
///
/// Failures do not stop the stream: every request yields exactly one
/// outcome, and a failing job never affects the others.
///
/// # Example
/// ```rust,no_run
/// use edgequake_convert::{convert_stream, ConversionConfig, JobRequest, SourceFile};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let requests = vec![
///     JobRequest::new(1, SourceFile::from_path("a.heic", "").await?, "image/jpeg"),
///     JobRequest::new(2, SourceFile::from_path("b.xlsx", "").await?, "text/csv"),
/// ];
/// let mut stream = convert_stream(requests, &ConversionConfig::default());
/// while let Some(outcome) = stream.next().await {
///     match outcome.result {
///         Ok(out) => println!("{}: {} bytes", outcome.file_name, out.bytes.len()),
///         Err(e) => eprintln!("{}: {e}", outcome.file_name),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(requests: Vec<JobRequest>, config: &ConversionConfig) -> JobStream {
    let concurrency = config.concurrency.max(1);
    info!(
        "Starting streaming batch: {} job(s), concurrency {}",
        requests.len(),
        concurrency
    );
    let config = config.clone();

    let s = stream::iter(requests.into_iter().map(move |request| {
        let cfg = config.clone();
        async move { run_one(request, &cfg).await }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

async fn run_one(request: JobRequest, config: &ConversionConfig) -> JobOutcome {
    let JobRequest { id, source, target } = request;
    let file_name = source.name().to_string();

    if let Some(cb) = &config.progress_callback {
        cb.on_job_start(id, &file_name);
    }
    debug!("Job {} started: '{}' → {}", id, file_name, target);

    let result = convert_with_config(&source, &target, config).await;

    if let Some(cb) = &config.progress_callback {
        match &result {
            Ok(out) => cb.on_job_complete(id, &file_name, out.bytes.len()),
            Err(e) => cb.on_job_error(id, &file_name, &e.to_string()),
        }
    }

    JobOutcome {
        id,
        file_name,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::JobProgressCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        completed: AtomicUsize,
        failed: AtomicUsize,
    }

    impl JobProgressCallback for Counter {
        fn on_job_start(&self, _id: u64, _name: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn on_job_complete(&self, _id: u64, _name: &str, _len: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_job_error(&self, _id: u64, _name: &str, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn every_request_yields_one_outcome() {
        let counter = Arc::new(Counter::default());
        let config = ConversionConfig::builder()
            .concurrency(2)
            .progress_callback(counter.clone())
            .build()
            .expect("config");

        let requests = vec![
            JobRequest::new(1, SourceFile::new("a.csv", "text/csv", b"x,y\n".to_vec()), "text/csv"),
            JobRequest::new(2, SourceFile::new("b.zip", "application/zip", b"PK".to_vec()), "text/csv"),
            JobRequest::new(3, SourceFile::new("c.csv", "", b"1\n".to_vec()), "text/html"),
        ];

        let mut outcomes: Vec<JobOutcome> = convert_stream(requests, &config).collect().await;
        outcomes.sort_by_key(|o| o.id);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());
        assert_eq!(outcomes[1].file_name, "b.zip");

        assert_eq!(counter.started.load(Ordering::SeqCst), 3);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
        assert_eq!(counter.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_batch_is_an_empty_stream() {
        let outcomes: Vec<JobOutcome> =
            convert_stream(Vec::new(), &ConversionConfig::default()).collect().await;
        assert!(outcomes.is_empty());
    }
}
