//! Concurrent execution of independent dubbing jobs.

use crate::error::{AutodubError, Result};
use crate::pipeline::{AssemblyOrchestrator, DubbingJob, DubbingResult};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Result of a single job within a batch.
#[derive(Debug)]
pub struct JobResult {
    pub index: usize,
    pub job_id: String,
    pub result: Result<DubbingResult>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BatchStats {
    pub total_jobs: usize,
    pub successful_jobs: usize,
    pub failed_jobs: usize,
    pub total_time: Duration,
}

/// Run `jobs` with at most `concurrency` in flight. Results come back in
/// input order; one job failing never affects another.
pub async fn run_jobs(
    orchestrator: &AssemblyOrchestrator,
    jobs: Vec<DubbingJob>,
    concurrency: usize,
    show_progress: bool,
) -> Result<(Vec<JobResult>, BatchStats)> {
    if concurrency == 0 {
        return Err(AutodubError::Config(
            "Concurrency must be greater than 0".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for job in &jobs {
        if !seen.insert(job.id.as_str()) {
            return Err(AutodubError::InvalidInput(format!(
                "Duplicate job id '{}'",
                job.id
            )));
        }
    }

    let total_jobs = jobs.len();
    let start_time = Instant::now();
    info!(
        "Running {} dubbing jobs with concurrency {}",
        total_jobs, concurrency
    );

    let progress_bar = if show_progress && total_jobs > 0 {
        let pb = ProgressBar::new(total_jobs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut futures = FuturesUnordered::new();

    for (index, job) in jobs.into_iter().enumerate() {
        let sem = semaphore.clone();
        let pb = progress_bar.clone();

        futures.push(async move {
            let job_id = job.id.clone();
            let job_start = Instant::now();

            let result = match sem.acquire().await {
                Ok(_permit) => {
                    debug!("Starting job {}", job_id);
                    orchestrator.run(job).await
                }
                Err(e) => Err(AutodubError::StageFailed {
                    stage: "scheduling".to_string(),
                    message: e.to_string(),
                }),
            };
            let duration_ms = job_start.elapsed().as_millis() as u64;

            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            match &result {
                Ok(done) => debug!(
                    "Job {} finished in {}ms: {}",
                    job_id, duration_ms, done.report.overall_quality
                ),
                Err(e) => warn!("Job {} failed: {}", job_id, e),
            }

            JobResult {
                index,
                job_id,
                result,
                duration_ms,
            }
        });
    }

    let mut results: Vec<JobResult> = Vec::with_capacity(total_jobs);
    while let Some(result) = futures.next().await {
        results.push(result);
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Dubbing complete");
    }

    results.sort_by_key(|r| r.index);

    let successful_jobs = results.iter().filter(|r| r.result.is_ok()).count();
    let stats = BatchStats {
        total_jobs,
        successful_jobs,
        failed_jobs: total_jobs - successful_jobs,
        total_time: start_time.elapsed(),
    };
    info!(
        "Batch complete: {}/{} jobs succeeded in {:.2}s",
        stats.successful_jobs,
        stats.total_jobs,
        stats.total_time.as_secs_f64()
    );

    Ok((results, stats))
}
