use super::pipeline::run_query;
use super::query::Query;
use crate::core::io::archive::{ARCHIVE_EXTENSION, ArchiveError, ArchiveWriter, merge_archives};
use crate::engine::config::ProcessConfig;
use crate::engine::deadline::CancellationToken;
use crate::engine::error::{EngineError, ProcessError, QueryError, QueryFailure};
use crate::engine::progress::{Progress, ProgressReporter};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of a processing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    /// Archives left on disk, in worker order.
    pub output_paths: Vec<PathBuf>,
    /// Queries that produced no record.
    pub failures: Vec<QueryFailure>,
    /// Number of records written across all archives.
    pub records_written: usize,
}

/// An ordered list of queries with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct QueryCollection {
    queries: Vec<(String, Query)>,
    occurrences: HashMap<String, usize>,
    assigned: HashSet<String>,
}

impl QueryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query and returns its identifier.
    ///
    /// The first query with a given base id keeps it unchanged; the n-th repeat is named
    /// `<base id>_<n>`. When that name is already taken (another query's base id may end in
    /// `_<n>`), the suffix is bumped until the name is free. Renames are logged as warnings
    /// unless `warn_duplicate` is false.
    pub fn add(&mut self, query: Query, warn_duplicate: bool) -> &str {
        let base = query.base_id();
        let seen = self.occurrences.entry(base.clone()).or_insert(0);
        *seen += 1;
        let mut suffix = *seen;

        let mut id = if suffix == 1 {
            base.clone()
        } else {
            format!("{base}_{suffix}")
        };
        while self.assigned.contains(&id) {
            suffix += 1;
            id = format!("{base}_{suffix}");
        }

        if id != base && warn_duplicate {
            warn!(
                query = %base,
                renamed = %id,
                "Duplicate query id; the query was renamed."
            );
        }

        self.assigned.insert(id.clone());
        let index = self.queries.len();
        self.queries.push((id, query));
        &self.queries[index].0
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|(id, _)| id.as_str())
    }

    pub fn queries(&self) -> impl Iterator<Item = (&str, &Query)> {
        self.queries.iter().map(|(id, query)| (id.as_str(), query))
    }

    /// How many queries were added with this base id.
    pub fn occurrences(&self, base_id: &str) -> usize {
        self.occurrences.get(base_id).copied().unwrap_or(0)
    }

    /// Builds and stores a graph for every query.
    ///
    /// Queries are split into at most `config.worker_count` contiguous chunks, each handled
    /// by one worker writing `<prefix>-<worker>.gnn`. With `combine_output` the worker files
    /// are merged into `<prefix>.gnn` and removed.
    ///
    /// # Errors
    ///
    /// Invalid query parameters are reported before any work starts. Failures of single
    /// queries are collected in the report; only archive I/O errors and cancellation abort the
    /// whole run.
    #[instrument(skip_all, name = "process_queries", fields(queries = self.len(), workers = config.worker_count))]
    pub fn process(
        &self,
        config: &ProcessConfig,
        reporter: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<ProcessReport, ProcessError> {
        for (id, query) in &self.queries {
            query.validate(id)?;
        }
        if self.queries.is_empty() {
            info!("No queries to process.");
            return Ok(ProcessReport::default());
        }
        if let Some(parent) = config.output_prefix.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ArchiveError::from)?;
            }
        }

        let workers = config.worker_count.min(self.queries.len());
        let chunk_size = self.queries.len().div_ceil(workers);
        let chunks: Vec<&[(String, Query)]> = self.queries.chunks(chunk_size).collect();
        info!(
            features = ?config.plan.names(),
            chunks = chunks.len(),
            "Processing queries."
        );

        reporter.report(Progress::PhaseStart {
            name: "Processing queries",
        });
        reporter.report(Progress::TaskStart {
            total_steps: self.queries.len() as u64,
        });

        let outputs = run_workers(&chunks, config, reporter, cancel)?;

        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);

        if cancel.is_cancelled() {
            warn!("Processing was cancelled; worker archives are left incomplete.");
            return Err(ProcessError::Cancelled);
        }

        let mut report = ProcessReport::default();
        let mut worker_paths = Vec::with_capacity(outputs.len());
        for output in outputs {
            report.records_written += output.records;
            report.failures.extend(output.failures);
            worker_paths.push(output.path);
        }

        report.output_paths = if config.combine_output {
            vec![combine(&worker_paths, &config.output_prefix)?]
        } else {
            worker_paths
        };

        info!(
            records = report.records_written,
            failures = report.failures.len(),
            "Processing finished."
        );
        Ok(report)
    }
}

struct WorkerOutput {
    path: PathBuf,
    records: usize,
    failures: Vec<QueryFailure>,
}

fn run_workers(
    chunks: &[&[(String, Query)]],
    config: &ProcessConfig,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<WorkerOutput>, ProcessError> {
    #[cfg(feature = "parallel")]
    let results: Vec<Result<WorkerOutput, ProcessError>> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(chunks.len())
            .build()
            .map_err(|e| ProcessError::WorkerPool(e.to_string()))?;
        pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(index, chunk)| run_worker(index, chunk, config, reporter, cancel))
                .collect()
        })
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<WorkerOutput, ProcessError>> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| run_worker(index, chunk, config, reporter, cancel))
        .collect();

    results.into_iter().collect()
}

/// Processes one chunk in order, appending each finished record to the worker's archive.
fn run_worker(
    index: usize,
    chunk: &[(String, Query)],
    config: &ProcessConfig,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> Result<WorkerOutput, ProcessError> {
    let path = worker_path(&config.output_prefix, index);
    let mut writer = ArchiveWriter::create(&path)?;
    let mut failures = Vec::new();

    for (id, query) in chunk {
        if cancel.is_cancelled() {
            break;
        }
        match run_query(id, query, &config.plan, config.query_timeout, cancel) {
            Ok(record) => {
                writer.append(&record)?;
                debug!(worker = index, query = %id, "Query completed.");
            }
            Err(QueryError::Engine(EngineError::Cancelled)) => break,
            Err(e) => {
                warn!(worker = index, query = %id, error = %e, "Query failed.");
                reporter.report(Progress::QueryFailed {
                    id: id.clone(),
                    message: e.to_string(),
                });
                failures.push(QueryFailure::new(id, &e));
            }
        }
        reporter.report(Progress::TaskIncrement);
    }

    let records = writer.len();
    let path = writer.finish()?;
    Ok(WorkerOutput {
        path,
        records,
        failures,
    })
}

/// Leaves a single `<prefix>.gnn`, merging when there is more than one worker archive.
fn combine(worker_paths: &[PathBuf], prefix: &Path) -> Result<PathBuf, ArchiveError> {
    let combined = with_suffix(prefix, &format!(".{ARCHIVE_EXTENSION}"));
    match worker_paths {
        [single] => std::fs::rename(single, &combined)?,
        _ => {
            merge_archives(worker_paths, &combined)?;
            for path in worker_paths {
                std::fs::remove_file(path)?;
            }
        }
    }
    Ok(combined)
}

fn worker_path(prefix: &Path, index: usize) -> PathBuf {
    with_suffix(prefix, &format!("-{index}.{ARCHIVE_EXTENSION}"))
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
