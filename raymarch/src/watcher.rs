//! Scene file watching for `render --watch`.
//!
//! The parent directory is watched rather than the file itself because
//! editors commonly replace a file on save, which would end a watch on the
//! original inode.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, RecursiveMode, Watcher as NotifyWatcher};
use tracing::{error, info, warn};

/// Bursts of events closer together than this trigger a single re-render.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// True if `event` modified or created `target`.
fn touches(event: &Event, target: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == target.file_name())
}

/// Blocks, calling `on_change` every time `scene` is written. Errors from
/// `on_change` are logged and watching continues.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created or the scene directory
/// cannot be watched.
pub fn watch(scene: &Path, mut on_change: impl FnMut() -> Result<()>) -> Result<()> {
    let scene: PathBuf = scene
        .canonicalize()
        .with_context(|| format!("scene file {} not found", scene.display()))?;
    let directory = scene.parent().unwrap_or_else(|| Path::new("."));

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to create file watcher")?;
    watcher
        .watch(directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", directory.display()))?;
    info!(scene = %scene.display(), "watching for changes, press Ctrl-C to stop");

    while let Ok(result) = rx.recv() {
        match result {
            Ok(event) if touches(&event, &scene) => {
                while rx.recv_timeout(DEBOUNCE).is_ok() {}
                info!("scene changed, re-rendering");
                if let Err(e) = on_change() {
                    error!("render failed: {e:#}");
                }
            }
            Ok(_) => {}
            Err(e) => warn!("file watcher error: {e:?}"),
        }
    }
    Ok(())
}
