use sim_io::metrics::{init_metrics, render};
use std::path::Path;
use tracing::info;

pub fn init() {
    init_metrics();
}

/// Writes the current Prometheus text exposition to `path`.
pub fn write_snapshot(path: &Path) -> std::io::Result<()> {
    let text = render().map_err(|e| std::io::Error::other(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Metrics snapshot written");
    Ok(())
}
