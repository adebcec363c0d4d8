//! Run command - one pass, then a pass every interval until shutdown

use anyhow::{Context, Result};
use clap::Args;
use lds_core::{SyncReport, Syncer};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::load_config;
use crate::args::Args as GlobalArgs;

/// Run command arguments
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Run a single synchronization pass and exit
    #[arg(long, env = "RUN_ONCE", value_parser = clap::builder::BoolishValueParser::new())]
    pub once: bool,
}

/// Execute the run command
pub fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    info!("Starting lancache-dns-sync");

    let config = load_config(global.config.as_deref(), &global.overrides)?;
    config.validate().context("Invalid configuration")?;

    let syncer = Syncer::from_config(&config).context("Failed to set up synchronization")?;
    info!(
        adguard = %config.adguard.url,
        target = %syncer.config().target,
        services = ?config.sync.services,
        interval = %config.sync.interval,
        "Loaded configuration"
    );

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, shutting down...");
        token.cancel();
    })
    .context("Failed to set signal handler")?;

    let runtime = super::runtime()?;
    runtime.block_on(run_loop(
        &syncer,
        config.sync.interval.as_duration(),
        args.once,
        &cancel,
    ))?;

    info!("lancache-dns-sync stopped");
    Ok(())
}

/// Drive passes until `cancel` fires
///
/// The first pass failing is fatal; later failures are logged and the next
/// tick tries again.
async fn run_loop(
    syncer: &Syncer,
    every: Duration,
    once: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    info!("Running initial synchronization");
    match syncer.run_once(cancel).await {
        Ok(report) => log_report(&report),
        Err(e) if e.is_cancelled() => {
            warn!("Initial synchronization cancelled");
            return Ok(());
        }
        Err(e) => return Err(e).context("Initial synchronization failed"),
    }

    if once {
        info!("Run-once mode, exiting");
        return Ok(());
    }

    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every = ?every, "Scheduler started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        info!("Running scheduled synchronization");
        match syncer.run_once(cancel).await {
            Ok(report) => log_report(&report),
            Err(e) if e.is_cancelled() => break,
            Err(e) => error!(error = %e, "Scheduled synchronization failed"),
        }
    }

    Ok(())
}

fn log_report(report: &SyncReport) {
    info!(
        services = report.services,
        files = report.files_selected,
        failed_files = report.files_failed,
        rewrites = report.rewrites,
        rules = report.rules_written,
        preserved = report.rules_preserved,
        "Synchronization completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lds_core::config::{ServiceSelection, SyncConfig};
    use lds_core::rules::FilterStatus;
    use lds_core::{CatalogueEntry, CatalogueSource, DomainFileSource, Error, FilteringApi};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Catalogue {
        fail: bool,
    }

    #[async_trait]
    impl CatalogueSource for Catalogue {
        async fn fetch_catalogue(&self) -> lds_core::Result<Vec<CatalogueEntry>> {
            if self.fail {
                return Err(Error::format("http://cdn/cache_domains.json", "expected value"));
            }
            Ok(vec![CatalogueEntry::new("steam", ["steam.txt"])])
        }
    }

    #[async_trait]
    impl DomainFileSource for Catalogue {
        async fn fetch_domain_file(&self, _path: &str) -> lds_core::Result<String> {
            Ok("lancache.steamcontent.com\n".to_string())
        }
    }

    /// Counts writes; fails every write after the first when `flaky`
    #[derive(Default)]
    struct Api {
        writes: AtomicUsize,
        flaky: bool,
    }

    #[async_trait]
    impl FilteringApi for Api {
        async fn filtering_status(&self) -> lds_core::Result<FilterStatus> {
            Ok(FilterStatus::default())
        }

        async fn set_rules(&self, _rules: Vec<String>) -> lds_core::Result<()> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.flaky && n > 0 {
                return Err(Error::Status {
                    url: "http://adguard/control/filtering/set_rules".to_string(),
                    status: 500,
                });
            }
            Ok(())
        }
    }

    fn syncer(catalogue_fails: bool, api: Arc<Api>) -> Syncer {
        let catalogue = Arc::new(Catalogue {
            fail: catalogue_fails,
        });
        Syncer::new(
            catalogue.clone(),
            catalogue,
            api,
            SyncConfig {
                services: ServiceSelection::All,
                target: "192.168.1.100".parse().unwrap(),
                concurrency: 2,
                timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn test_once_runs_single_pass() {
        let api = Arc::new(Api::default());
        let syncer = syncer(false, api.clone());

        run_loop(&syncer, Duration::from_millis(10), true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_pass_failure_is_fatal() {
        let api = Arc::new(Api::default());
        let syncer = syncer(true, api.clone());

        let result = run_loop(&syncer, Duration::from_millis(10), false, &CancellationToken::new()).await;

        assert!(result.is_err());
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_later_failures_keep_loop_alive() {
        let api = Arc::new(Api {
            flaky: true,
            ..Default::default()
        });
        let syncer = syncer(false, api.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        run_loop(&syncer, Duration::from_millis(10), false, &cancel)
            .await
            .unwrap();

        assert!(api.writes.load(Ordering::SeqCst) >= 3);
    }
}
