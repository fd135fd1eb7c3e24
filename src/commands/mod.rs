pub mod report;
pub mod run;
pub mod validate;
pub mod weekly;

// Re-export command functions for convenience
pub use report::{history, stats};
pub use run::{run, RunArgs};
pub use validate::validate;
pub use weekly::weekly;

use anyhow::{Context, Result};
use std::path::Path;

/// Write the Prometheus text exposition to `path`
pub fn write_metrics(path: &Path) -> Result<()> {
    let text = dalbit::metrics::encode_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {e}"))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Metrics written");
    Ok(())
}

/// Register metrics when an output file was requested
pub fn init_metrics_for(path: Option<&Path>) {
    if path.is_some() {
        if let Err(e) = dalbit::metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed");
        }
    }
}
