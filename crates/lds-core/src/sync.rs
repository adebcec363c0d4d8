//! One synchronization pass
//!
//! Catalogue → service selection → domain-file download → rule
//! reconciliation, strictly in that order. The first failing stage ends the
//! pass and its error is returned wrapped with the stage name. Scheduling
//! passes is the caller's job.

use crate::catalogue::{CatalogueSource, DomainFileSource, HttpCatalogue};
use crate::config::{Config, SyncConfig};
use crate::domains::fetch_all;
use crate::error::{Error, Result};
use crate::http::build_client;
use crate::rules::{AdGuardClient, FilteringApi, Reconciler};
use crate::selection::select_file_refs;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// What one pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Services listed in the catalogue
    pub services: usize,
    /// Domain files selected for download
    pub files_selected: usize,
    /// Selected files that failed and were skipped
    pub files_failed: usize,
    /// Rewrite entries collected
    pub rewrites: usize,
    /// Managed rules written to the filtering service
    pub rules_written: usize,
    /// Foreign rules left in place
    pub rules_preserved: usize,
}

/// Runs synchronization passes against one catalogue and one filtering service
pub struct Syncer {
    catalogue: Arc<dyn CatalogueSource>,
    files: Arc<dyn DomainFileSource>,
    reconciler: Reconciler,
    config: SyncConfig,
}

impl Syncer {
    /// Assemble a syncer from its collaborators
    pub fn new(
        catalogue: Arc<dyn CatalogueSource>,
        files: Arc<dyn DomainFileSource>,
        api: Arc<dyn FilteringApi>,
        config: SyncConfig,
    ) -> Self {
        Self {
            catalogue,
            files,
            reconciler: Reconciler::new(api),
            config,
        }
    }

    /// Build the HTTP-backed syncer described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let sync = config.sync_config()?;
        let client = build_client(sync.timeout)?;
        let catalogue = Arc::new(HttpCatalogue::from_config(client.clone(), config)?);
        let api = Arc::new(AdGuardClient::from_config(client, config)?);

        Ok(Self::new(catalogue.clone(), catalogue, api, sync))
    }

    /// Settings this syncer runs with
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full pass
    ///
    /// If no domain files are selected the filtering service is not
    /// contacted at all. Cancelling `cancel` aborts in-flight requests and
    /// guarantees nothing from this pass is written afterwards.
    #[instrument(skip_all, fields(target = %self.config.target))]
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        info!("Fetching cache domains configuration");
        let entries = cancellable(cancel, self.catalogue.fetch_catalogue())
            .await
            .map_err(|e| Error::step("fetch catalogue", e))?;
        report.services = entries.len();

        let file_refs = select_file_refs(&entries, &self.config.services);
        report.files_selected = file_refs.len();
        info!(
            services = report.services,
            files = report.files_selected,
            "Selected domain files"
        );
        if file_refs.is_empty() {
            info!("No domain files to process");
            return Ok(report);
        }

        info!(file_count = file_refs.len(), "Downloading domains from files");
        let outcome = fetch_all(
            Arc::clone(&self.files),
            &file_refs,
            self.config.target,
            self.config.concurrency,
            cancel,
        )
        .await
        .map_err(|e| Error::step("download domain files", e))?;
        report.files_failed = outcome.files_failed;
        report.rewrites = outcome.rewrites.len();
        if outcome.files_failed > 0 {
            warn!(
                failed = outcome.files_failed,
                succeeded = outcome.files_ok,
                "Some domain files could not be downloaded"
            );
        }
        info!(count = report.rewrites, "Downloaded domain entries");

        let summary = cancellable(cancel, self.reconciler.reconcile(&outcome.rewrites))
            .await
            .map_err(|e| Error::step("reconcile rules", e))?;
        report.rules_written = summary.written;
        report.rules_preserved = summary.preserved;

        info!(
            rules = report.rules_written,
            preserved = report.rules_preserved,
            "Filtering rules updated successfully"
        );
        Ok(report)
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}
