//! Service selection
//!
//! Narrows the catalogue down to the domain files of the configured services.

use crate::catalogue::CatalogueEntry;
use crate::config::ServiceSelection;
use std::collections::HashSet;
use tracing::warn;

/// Collect the domain-file paths of every selected service
///
/// Output follows catalogue order, not the order services were requested in.
/// Requested names missing from the catalogue are logged and contribute
/// nothing.
pub fn select_file_refs(entries: &[CatalogueEntry], selection: &ServiceSelection) -> Vec<String> {
    if let ServiceSelection::Named(names) = selection {
        let available: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        for name in names.iter().filter(|n| !available.contains(n.as_str())) {
            warn!(service = %name, "Requested service not found in cache domains");
        }
    }

    entries
        .iter()
        .filter(|entry| selection.contains(&entry.name))
        .flat_map(|entry| entry.domain_files.iter().cloned())
        .collect()
}

/// Names of all services in the catalogue, in catalogue order
pub fn service_names(entries: &[CatalogueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}
