use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{PipeScanError, Result};

use super::client::BuildApi;
use super::types::Build;

/// Resource whose version inputs are inspected unless the caller overrides it.
pub const DEFAULT_RESOURCE_NAME: &str = "product-version";

const MAX_CONCURRENT_JOB_SCANS: usize = 10;

/// The earliest build of one job whose inputs carried the target version.
#[derive(Debug, Clone, Serialize)]
pub struct BuildMatch {
    pub pipeline: String,
    pub job: String,
    pub status: String,
    pub build: Build,
}

/// A job whose scan was aborted by a fetch or decode failure.
#[derive(Debug)]
pub struct JobScanFailure {
    pub job: String,
    pub error: PipeScanError,
}

/// Combined outcome of one pipeline scan. Jobs with no matching build appear
/// in neither list.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub matches: Vec<BuildMatch>,
    pub failures: Vec<JobScanFailure>,
    pub jobs_scanned: usize,
}

/// Fans per-job build inspection out across a bounded worker pool.
///
/// Each job scan holds one semaphore permit for its whole duration, so at
/// most the pool capacity of job scans have requests in flight at any time.
/// Within a job, builds are inspected strictly sequentially in the order the
/// server listed them.
pub struct BuildScanner {
    api: Arc<dyn BuildApi>,
    pool: Arc<Semaphore>,
}

impl BuildScanner {
    pub fn new(api: Arc<dyn BuildApi>) -> Self {
        Self::with_capacity(api, MAX_CONCURRENT_JOB_SCANS)
    }

    pub fn with_capacity(api: Arc<dyn BuildApi>, capacity: usize) -> Self {
        Self {
            api,
            pool: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Scans every job of `pipeline` for the earliest build with an input
    /// whose `resource` matches `resource` and whose version number matches
    /// `version`.
    ///
    /// A failed job-list fetch is fatal. A failed fetch inside one job's scan
    /// aborts only that job; it is recorded in the report and the remaining
    /// jobs keep scanning.
    pub async fn find_matching_builds(
        &self,
        pipeline: &str,
        resource: &str,
        version: &str,
    ) -> Result<ScanReport> {
        let jobs = self.api.list_jobs(pipeline).await?;
        info!("Scanning {} jobs on pipeline {pipeline}", jobs.len());

        let mut names = Vec::with_capacity(jobs.len());
        let mut tasks = Vec::with_capacity(jobs.len());
        for job in jobs {
            let api = Arc::clone(&self.api);
            let pool = Arc::clone(&self.pool);
            let pipeline = pipeline.to_owned();
            let resource = resource.to_owned();
            let version = version.to_owned();

            names.push(job.name.clone());
            tasks.push(tokio::spawn(async move {
                // Never closed; acquire only fails on a closed semaphore.
                let _permit = pool.acquire_owned().await.unwrap();
                scan_job(api.as_ref(), &pipeline, &job.name, &resource, &version).await
            }));
        }

        let mut report = ScanReport::default();
        for (job, joined) in names.into_iter().zip(join_all(tasks).await) {
            report.jobs_scanned += 1;

            match joined {
                Ok(Ok(Some(found))) => report.matches.push(found),
                Ok(Ok(None)) => debug!("No build of job {job} carries the target version"),
                Ok(Err(error)) => {
                    warn!("Scan of job {job} failed: {error}");
                    report.failures.push(JobScanFailure { job, error });
                }
                // A panicked or cancelled worker counts as that job failing,
                // not as a scan-wide abort.
                Err(join_error) => {
                    warn!("Scan task for job {job} aborted: {join_error}");
                    report.failures.push(JobScanFailure {
                        job,
                        error: PipeScanError::ScanAborted(join_error.to_string()),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Inspects one job's builds in listing order and returns the first build
/// whose inputs carry the target resource version, or `None` once every
/// build has been inspected without a match.
async fn scan_job(
    api: &dyn BuildApi,
    pipeline: &str,
    job: &str,
    resource: &str,
    version: &str,
) -> Result<Option<BuildMatch>> {
    let builds = api.list_builds(pipeline, job).await?;

    for build in builds {
        let resources = api.build_resources(build.id).await?;

        let matched = resources
            .inputs
            .iter()
            .any(|input| input.resource == resource && input.version.number == version);

        if matched {
            return Ok(Some(BuildMatch {
                pipeline: pipeline.to_owned(),
                job: job.to_owned(),
                status: build.status.clone(),
                build,
            }));
        }
    }

    Ok(None)
}
