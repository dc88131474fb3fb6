//! Write-then-rename replacement of a file's contents.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replace the contents of `path` with `bytes`.
///
/// The bytes go to a sibling staging file, are flushed with `sync_all`, and
/// the staging file is renamed over `path`. On failure the staging file is
/// removed and `path` keeps its previous contents.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(path);
    let written = write_synced(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
