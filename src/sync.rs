//! Reconciling staged output with the destination tree.
//!
//! The sync engine is the only component that ever touches the permanent
//! tree, and only in apply mode, and only with content that passed through
//! a staging directory.

use std::fs;
use std::path::Path;
use std::process::Command;

use walkdir::WalkDir;

use crate::config::SyncMode;
use crate::error::{Error, Result};

/// Walk every generated file under `staging_root` and reconcile it with the
/// corresponding path under `dst_root`.
///
/// Apply mode overwrites the destination byte-for-byte, creating parent
/// directories as needed, and prints one `# <relative path>` line per file.
/// Diff mode prints a unified diff per differing file (a missing
/// destination compares as empty) and mutates nothing. Apply is
/// idempotent: a second pass over the same staged tree is a no-op diff.
pub fn sync_output(dst_root: &Path, staging_root: &Path, mode: SyncMode) -> Result<()> {
    for entry in WalkDir::new(staging_root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_generated_output(entry.path()) {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(staging_root)
            .map_err(|_| Error::PathNotUnderRoot {
                path: entry.path().to_path_buf(),
                root: staging_root.to_path_buf(),
            })?;
        let dst_path = dst_root.join(rel_path);

        match mode {
            SyncMode::Apply => {
                println!("# {}", rel_path.to_string_lossy().replace('\\', "/"));
                copy_file(&dst_path, entry.path())?;
            }
            SyncMode::Diff => {
                if files_differ(&dst_path, entry.path())? {
                    // -N treats an absent destination as empty. The diff
                    // exit status is reporting, not an error.
                    let _ = Command::new("diff")
                        .arg("-N")
                        .arg("-u")
                        .arg(&dst_path)
                        .arg(entry.path())
                        .status();
                }
            }
        }
    }
    Ok(())
}

/// Generated sources and their annotation metadata; everything else in
/// staging is scratch.
fn is_generated_output(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("rs") | Some("meta")
    )
}

/// Whether staged content differs from the destination, an absent
/// destination comparing as empty.
pub(crate) fn files_differ(dst_path: &Path, src_path: &Path) -> Result<bool> {
    let staged = fs::read(src_path)?;
    let current = fs::read(dst_path).unwrap_or_default();
    Ok(staged != current)
}

/// Overwrite `dst_path` with the content of `src_path`, creating parent
/// directories as needed.
pub fn copy_file(dst_path: &Path, src_path: &Path) -> Result<()> {
    let content = fs::read(src_path)?;
    if let Some(parent) = dst_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dst_path, content)?;
    Ok(())
}
