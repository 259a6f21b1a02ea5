//! Batch indexing engine.
//!
//! Partitions a model's record set into fixed-size batches, runs them
//! in-process or across a fixed worker pool fed by a bounded queue, and
//! reconciles stale index records against the authoritative store via
//! set difference.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Duration, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::backends::SearchBackend;
use crate::connections::ConnectionRegistry;
use crate::document::{ModelKey, Record};
use crate::error::{Result, StackError};
use crate::indexes::IndexDefinition;
use crate::query::SearchQuerySet;

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Hours back from now to consider records fresh; ignored when
    /// `start_date` is set explicitly.
    pub age_hours: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Overrides the connection-level batch size; 0 falls back to it.
    pub batch_size: Option<usize>,
    /// Remove index records whose database row no longer exists.
    pub remove: bool,
    /// Worker threads; 0 runs batches in-process.
    pub workers: usize,
    pub commit: bool,
    pub verbosity: u8,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            age_hours: None,
            start_date: None,
            end_date: None,
            batch_size: None,
            remove: false,
            workers: 0,
            commit: true,
            verbosity: 1,
        }
    }
}

impl UpdateOptions {
    /// The effective date window: explicit dates win, otherwise `age_hours`
    /// derives the start.
    pub fn window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let start = self
            .start_date
            .or_else(|| self.age_hours.map(|hours| Utc::now() - Duration::hours(hours)));
        (start, self.end_date)
    }

    fn has_date_filter(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.age_hours.is_some()
    }
}

/// Totals for one update run.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateSummary {
    pub indexed: usize,
    pub removed: usize,
}

impl UpdateSummary {
    fn absorb(&mut self, other: Self) {
        self.indexed += other.indexed;
        self.removed += other.removed;
    }
}

/// Partition `[0, total)` into contiguous, non-overlapping ranges of
/// `batch_size`, the final one possibly shorter.
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<(usize, usize)> {
    if batch_size == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(batch_size)
        .map(|start| (start, (start + batch_size).min(total)))
        .collect()
}

/// One unit of work for a worker: re-resolves its index and backend from
/// the registry so no backend handles cross the channel.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub model: ModelKey,
    pub alias: String,
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub verbosity: u8,
    pub commit: bool,
}

enum Job {
    Update(BatchJob),
    Close,
}

/// Fixed-size worker pool over a bounded queue. Capacity is twice the
/// worker count so workers always have a waiting task without unbounded
/// queue growth.
pub struct WorkerPool {
    sender: Sender<Job>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(registry: Arc<ConnectionRegistry>, workers: usize) -> Self {
        let (sender, receiver) = bounded::<Job>(workers * 2);
        let handles = (0..workers)
            .map(|worker_id| {
                let registry = Arc::clone(&registry);
                let receiver: Receiver<Job> = receiver.clone();
                std::thread::spawn(move || {
                    loop {
                        match receiver.recv() {
                            // A dispatcher that aborted mid-run drops the
                            // sender; drain and exit like a close.
                            Ok(Job::Close) | Err(_) => break,
                            Ok(Job::Update(job)) => {
                                // No result channel back; failures are the
                                // worker's to report.
                                if let Err(err) = run_batch(&registry, &job) {
                                    error!(
                                        worker_id,
                                        model = %job.model,
                                        alias = %job.alias,
                                        start = job.start,
                                        end = job.end,
                                        "batch update failed: {err}"
                                    );
                                }
                            }
                        }
                    }
                })
            })
            .collect();
        Self { sender, handles }
    }

    /// Blocks while the queue is full.
    pub fn submit(&self, job: BatchJob) -> Result<()> {
        self.sender
            .send(Job::Update(job))
            .map_err(|_| StackError::Query("worker pool queue closed".to_string()))
    }

    /// Enqueue one close sentinel per worker behind all outstanding jobs,
    /// then wait for every worker to exit.
    pub fn shutdown(self) {
        for _ in &self.handles {
            let _ = self.sender.send(Job::Close);
        }
        drop(self.sender);
        for handle in self.handles {
            if handle.join().is_err() {
                warn!("indexing worker panicked");
            }
        }
    }
}

fn run_batch(registry: &Arc<ConnectionRegistry>, job: &BatchJob) -> Result<()> {
    let connection = registry.resolve(&job.alias)?;
    let unified = connection.get_unified_index()?;
    let index = unified.get_index(&job.model)?;
    let backend = connection.get_backend()?;

    let records = index.build_records(Some(&job.alias), job.start_date, job.end_date)?;
    do_update(
        backend.as_ref(),
        index,
        &records,
        job.start,
        job.end,
        job.total,
        job.verbosity,
        job.commit,
    )
}

#[allow(clippy::too_many_arguments)]
fn do_update(
    backend: &dyn SearchBackend,
    index: &IndexDefinition,
    records: &[Record],
    start: usize,
    end: usize,
    total: usize,
    verbosity: u8,
    commit: bool,
) -> Result<()> {
    let end = end.min(records.len());
    let batch = records.get(start..end).unwrap_or(&[]);
    if verbosity >= 2 {
        debug!("indexed {} - {} of {}", start + 1, end, total);
    }
    backend.update(index, batch, commit)
}

/// Update every matching model on every target alias.
///
/// Empty `labels` means every indexed model; empty `aliases` means every
/// configured connection. Any error is logged with model and alias context
/// and re-raised, aborting the remaining work list; committed batches stay
/// committed (indexes are eventually consistent and idempotent on retry).
pub fn update_index(
    registry: &Arc<ConnectionRegistry>,
    labels: &[String],
    aliases: &[String],
    opts: &UpdateOptions,
) -> Result<UpdateSummary> {
    let aliases = if aliases.is_empty() {
        registry.aliases()
    } else {
        aliases.to_vec()
    };

    let pool = (opts.workers > 0).then(|| WorkerPool::start(Arc::clone(registry), opts.workers));
    let mut summary = UpdateSummary::default();

    for alias in &aliases {
        let labels = if labels.is_empty() {
            all_labels(registry, alias)?
        } else {
            labels.to_vec()
        };
        for label in &labels {
            match update_backend(registry, label, alias, opts, pool.as_ref()) {
                Ok(part) => summary.absorb(part),
                Err(err) => {
                    error!(label = %label, alias = %alias, "error updating: {err}");
                    // Dropping the pool lets in-flight workers drain and
                    // exit; they are not preemptively signaled.
                    return Err(err);
                }
            }
        }
    }

    if let Some(pool) = pool {
        pool.shutdown();
    }
    Ok(summary)
}

fn all_labels(registry: &Arc<ConnectionRegistry>, alias: &str) -> Result<Vec<String>> {
    let connection = registry.resolve(alias)?;
    let unified = connection.get_unified_index()?;
    Ok(unified
        .get_indexed_models()
        .into_iter()
        .map(|model| model.0)
        .collect())
}

/// Update one app-or-model label on one alias. Public so the CLI can drive
/// labels individually with its own progress reporting.
pub fn update_backend(
    registry: &Arc<ConnectionRegistry>,
    label: &str,
    alias: &str,
    opts: &UpdateOptions,
    pool: Option<&WorkerPool>,
) -> Result<UpdateSummary> {
    let connection = registry.resolve(alias)?;
    let backend = connection.get_backend()?;
    let unified = connection.get_unified_index()?;

    let mut summary = UpdateSummary::default();
    let (start_date, end_date) = opts.window();

    for model in candidate_models(unified, label) {
        let index = match unified.get_index(&model) {
            Ok(index) => index,
            Err(err) if err.is_not_handled() => {
                debug!(model = %model, alias = %alias, "skipping - no index");
                continue;
            }
            Err(err) => return Err(err),
        };

        let records = index.build_records(Some(alias), start_date, end_date)?;
        let total = records.len();
        info!(alias = %alias, "indexing {total} {model}");

        // A zero override would partition into no batches and silently index
        // nothing; treat it like an unset override.
        let batch_size = opts
            .batch_size
            .filter(|size| *size > 0)
            .unwrap_or(connection.batch_size());

        for (start, end) in batch_ranges(total, batch_size) {
            match pool {
                None => do_update(
                    backend.as_ref(),
                    index,
                    &records,
                    start,
                    end,
                    total,
                    opts.verbosity,
                    opts.commit,
                )?,
                Some(pool) => pool.submit(BatchJob {
                    model: model.clone(),
                    alias: alias.to_string(),
                    start,
                    end,
                    total,
                    start_date,
                    end_date,
                    verbosity: opts.verbosity,
                    commit: opts.commit,
                })?,
            }
        }
        summary.indexed += total;

        if opts.remove {
            summary.removed += remove_stale(
                registry,
                alias,
                index,
                backend.as_ref(),
                batch_size,
                opts,
                records,
            )?;
        }
    }

    Ok(summary)
}

fn candidate_models(unified: &crate::unified::UnifiedIndex, label: &str) -> Vec<ModelKey> {
    let models = unified.models_for_label(label);
    if models.is_empty() && label.contains('.') {
        // A fully-qualified model with no index still flows through
        // `get_index` so the caller sees a NotHandled skip, not silence.
        return vec![ModelKey::new(label)];
    }
    models
}

/// Stale-record reconciliation: collect the full stale set first, then
/// delete. Deleting while scanning would shift the index-side pagination
/// offsets and skip or revisit entries; the memory cost is proportional to
/// drift size and accepted.
fn remove_stale(
    registry: &Arc<ConnectionRegistry>,
    alias: &str,
    index: &IndexDefinition,
    backend: &dyn SearchBackend,
    batch_size: usize,
    opts: &UpdateOptions,
    records: Vec<Record>,
) -> Result<usize> {
    // A date-restricted run saw a reduced record set that may not hold all
    // pks; rebuild the unrestricted set so live records are never
    // misclassified as stale.
    let records = if opts.has_date_filter() {
        index.index_records(Some(alias))?
    } else {
        records
    };

    if records.is_empty() {
        return Ok(0);
    }

    let database_pks: HashSet<String> = records.iter().map(Record::canonical_pk).collect();

    // Page the index, not the database: records may exist index-side only,
    // so the index-reported total drives the batching.
    let sqs = SearchQuerySet::new(Arc::clone(registry), Some(alias))
        .models([index.model().clone()]);
    let index_total = sqs.count()?;

    let mut stale_records: HashSet<String> = HashSet::new();
    for (start, upper_bound) in batch_ranges(index_total, batch_size) {
        // A scan failure aborts before any partial stale set is acted on.
        for (pk, doc_id) in sqs.pk_and_doc_id(start, upper_bound)? {
            if !database_pks.contains(&pk) {
                stale_records.insert(doc_id);
            }
        }
    }

    if !stale_records.is_empty() {
        info!(alias = %alias, model = %index.model(), "removing {} stale records", stale_records.len());
        for doc_id in &stale_records {
            if opts.verbosity >= 2 {
                debug!("removing {doc_id}");
            }
            backend.remove(doc_id, opts.commit)?;
        }
    }

    Ok(stale_records.len())
}

/// Clear one or all connections. Confirmation is the CLI's concern; this
/// always proceeds.
pub fn clear_index(
    registry: &Arc<ConnectionRegistry>,
    aliases: &[String],
    commit: bool,
) -> Result<()> {
    let aliases = if aliases.is_empty() {
        registry.aliases()
    } else {
        aliases.to_vec()
    };
    for alias in &aliases {
        let backend = registry.resolve(alias)?.get_backend()?;
        match backend.clear(commit) {
            Ok(()) => info!(alias = %alias, "cleared index"),
            Err(err) => {
                error!(alias = %alias, "error clearing index: {err}");
                return Err(err);
            }
        }
    }
    Ok(())
}
