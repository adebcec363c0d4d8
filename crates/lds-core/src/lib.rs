//! # lancache-dns-sync core
//!
//! Keeps an AdGuard Home user-rule list in step with the
//! [uklans cache-domains](https://github.com/uklans/cache-domains) catalogue,
//! so every game-CDN hostname resolves to a local lancache.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Catalogue client** - fetches the `cache_domains.json` index
//! - **Service selection** - narrows the catalogue to the configured services
//! - **Domain-file fetcher** - bounded-concurrency download of the domain lists
//! - **Rule reconciler** - rewrites the managed region of the AdGuard rule list
//! - **Orchestrator** - one synchronization pass over all of the above
//!
//! ## Example
//!
//! ```rust,no_run
//! use lds_core::{Config, Syncer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> lds_core::Result<()> {
//! let config = Config::load("lancache-dns-sync.toml")?;
//! config.validate()?;
//!
//! let syncer = Syncer::from_config(&config)?;
//! let report = syncer.run_once(&CancellationToken::new()).await?;
//! println!("wrote {} rules", report.rules_written);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod catalogue;
pub mod config;
pub mod domains;
pub mod error;
pub mod http;
pub mod rules;
pub mod selection;
pub mod sync;

// Re-exports for convenience
pub use catalogue::{CatalogueEntry, CatalogueSource, DomainFileSource, HttpCatalogue};
pub use config::{Config, ServiceSelection, SyncConfig};
pub use domains::RewriteEntry;
pub use error::{Error, Result};
pub use rules::{AdGuardClient, FilteringApi, Reconciler};
pub use sync::{SyncReport, Syncer};
