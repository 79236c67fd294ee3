// tfredact/src/utils/atomic_write.rs
//! Writes output files through a sibling temporary file and a rename, so a failed
//! run never leaves a half-written document at the destination.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TMP_SUFFIX: &str = ".tmp";

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

/// Replaces `path` with `contents`.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    let written = (|| -> Result<()> {
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        fs2::FileExt::lock_exclusive(&tmp)?;
        tmp.write_all(contents)?;
        tmp.flush()?;
        tmp.sync_all()?;
        fs2::FileExt::unlock(&tmp)?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Failed to write {}", tmp_path.display()));
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move output into place at {}", path.display()))?;
    Ok(())
}
