//! Bounded-concurrency domain-file download
//!
//! Every file is fetched on its own task. A semaphore caps how many fetches
//! are in flight; each task sends its result over a channel and a single
//! collector merges them. A failing file is logged and skipped.

use super::{rewrites_from_file, RewriteEntry};
use crate::catalogue::DomainFileSource;
use crate::error::{Error, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Result of downloading a batch of domain files
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Entries from every file that downloaded successfully
    pub rewrites: Vec<RewriteEntry>,
    /// Files downloaded successfully
    pub files_ok: usize,
    /// Files that failed and were skipped
    pub files_failed: usize,
}

struct FileResult {
    path: String,
    result: Result<String>,
}

/// Download `file_refs` and convert their hostnames into rewrites to `target`
///
/// At most `concurrency` downloads run at once. Entries from one file keep
/// their order; files are merged in completion order. Returns
/// [`Error::Cancelled`] if `cancel` fires before every file is in, discarding
/// anything collected so far.
#[instrument(skip_all, fields(files = file_refs.len(), concurrency = concurrency))]
pub async fn fetch_all(
    source: Arc<dyn DomainFileSource>,
    file_refs: &[String],
    target: IpAddr,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<FetchOutcome> {
    let gate = Arc::new(Semaphore::new(concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<FileResult>(file_refs.len().max(1));
    let mut tasks = JoinSet::new();

    for path in file_refs {
        let source = Arc::clone(&source);
        let gate = Arc::clone(&gate);
        let tx = tx.clone();
        let cancel = cancel.clone();
        let path = path.clone();

        tasks.spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = fetch_one(source.as_ref(), &gate, &path) => result,
            };
            // Receiver only goes away when the collector bails out.
            let _ = tx.send(FileResult { path, result }).await;
        });
    }
    drop(tx);

    let mut outcome = FetchOutcome::default();
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tasks.abort_all();
                warn!("Domain file download cancelled, discarding partial results");
                return Err(Error::Cancelled);
            }
            message = rx.recv() => message,
        };

        match message {
            Some(FileResult { path, result: Ok(content) }) => {
                let rewrites = rewrites_from_file(&content, target);
                debug!(path = %path, domains = rewrites.len(), "Downloaded domain file");
                outcome.rewrites.extend(rewrites);
                outcome.files_ok += 1;
            }
            Some(FileResult { path, result: Err(e) }) => {
                error!(path = %path, error = %e, "Error downloading domain file");
                outcome.files_failed += 1;
            }
            None => break,
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                error!(error = %e, "Domain file task panicked");
                outcome.files_failed += 1;
            }
        }
    }

    Ok(outcome)
}

async fn fetch_one(source: &dyn DomainFileSource, gate: &Semaphore, path: &str) -> Result<String> {
    let _permit = gate.acquire().await.map_err(|_| Error::Cancelled)?;
    source.fetch_domain_file(path).await
}
