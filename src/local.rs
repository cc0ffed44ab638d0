//! Batch generation for proto files living in this repository.
//!
//! Each [`GenerationJob`] covers one directory root. Files are enumerated
//! recursively, version-locked legacy snapshots and explicitly excluded
//! files are skipped, and every remaining proto is fed to protoc with
//! per-file options. Output is staged in an ephemeral directory and handed
//! to the sync engine in one pass per run.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::backends::slash_path;
use crate::config::{Config, GENERATED_PREAMBLE};
use crate::error::{Error, Result};
use crate::{protoc, sync};

/// One local directory of proto files and its generation policy.
#[derive(Debug)]
pub struct GenerationJob {
    /// Directory root, relative to the repository root.
    pub path: &'static str,
    /// Also run the service-stub backend.
    pub grpc: bool,
    /// Files (repo-relative) that additionally receive code-location
    /// annotations.
    pub annotate_for: &'static [&'static str],
    /// Files (repo-relative) excluded from generation outright.
    pub exclude: &'static [&'static str],
}

/// The fixed job list. Jobs are independent: processing order has no
/// effect on staged content.
pub const JOBS: &[GenerationJob] = &[
    GenerationJob {
        path: "testdata",
        grpc: false,
        annotate_for: &["testdata/annotations/annotations.proto"],
        exclude: &[],
    },
    GenerationJob {
        path: "grpc/testdata",
        grpc: true,
        annotate_for: &[],
        exclude: &[],
    },
    GenerationJob {
        path: "internal/testprotos",
        grpc: false,
        annotate_for: &[],
        exclude: &["internal/testprotos/irregular/irregular.proto"],
    },
];

/// Version-locked snapshot directories are regenerated never.
static LEGACY_SNAPSHOT_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"legacy/proto[23]_[0-9]{8}_[0-9a-f]{8}/").expect("legacy snapshot pattern")
});

/// Whether a path sits inside a legacy dated-snapshot directory.
pub fn is_legacy_snapshot(path: &str) -> bool {
    LEGACY_SNAPSHOT_RX.is_match(path)
}

/// Generate all local proto files and reconcile the result.
pub fn generate(config: &Config) -> Result<()> {
    let staging = tempfile::Builder::new()
        .prefix("tmp")
        .tempdir_in(&config.repo_root)?;

    for job in JOBS {
        let mut sub_dirs = BTreeSet::new();
        let src_dir = config.repo_root.join(job.path);

        for entry in WalkDir::new(&src_dir) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !slash_path(path).ends_with(".proto") {
                continue;
            }

            let rel_path = slash_path(rel_to(path, &config.repo_root)?);
            let src_rel = rel_to(path, &src_dir)?;
            if !track_candidate(job, &rel_path, src_rel, &mut sub_dirs) {
                continue;
            }

            let mut opts = format!("paths=source_relative,{}", config.overrides.to_opt());
            if job.annotate_for.contains(&rel_path.as_str()) {
                opts.push_str(",annotate_code");
            }
            let backend_list = if job.grpc { "rust,grpc" } else { "rust" };

            protoc::invoke(
                backend_list,
                &[
                    include_flag(&config.proto_root.join("src")),
                    include_flag(&config.repo_root),
                    OsString::from(format!(
                        "--rust_out={}:{}",
                        opts,
                        staging.path().display()
                    )),
                    OsString::from(rel_path),
                ],
            )?;
        }

        // Sub-packages under testdata are unreachable from the main build
        // graph; stage a shim that links every one of them in so a full
        // build sweep still exercises them.
        if Path::new(job.path).file_name() == Some(OsStr::new("testdata")) {
            let shim = import_shim(&config.module_path, job.path, &sub_dirs);
            let shim_path = staging.path().join(job.path).join("gen_test.rs");
            if let Some(parent) = shim_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(shim_path, shim)?;
        }
    }

    sync::sync_output(&config.repo_root, staging.path(), config.mode)
}

/// Record one candidate proto file and decide whether it is generated.
///
/// Legacy snapshots are invisible to the job. Excluded files are not
/// generated but still contribute their directory to the discovered
/// sub-package set, so the import shim links their package in.
fn track_candidate(
    job: &GenerationJob,
    rel_path: &str,
    src_rel: &Path,
    sub_dirs: &mut BTreeSet<String>,
) -> bool {
    if is_legacy_snapshot(rel_path) {
        return false;
    }
    sub_dirs.insert(slash_path(src_rel.parent().unwrap_or(Path::new(""))));
    !job.exclude.contains(&rel_path)
}

/// Synthesized source that imports every discovered sub-package, sorted
/// lexicographically regardless of discovery order.
fn import_shim(module_path: &str, job_path: &str, sub_dirs: &BTreeSet<String>) -> String {
    let mut imports: Vec<String> = sub_dirs
        .iter()
        .map(|sub_dir| {
            let segments: Vec<String> = std::iter::once(module_path)
                .chain(job_path.split('/'))
                .chain(sub_dir.split('/'))
                .filter(|s| !s.is_empty() && *s != ".")
                .map(|s| s.replace('-', "_"))
                .collect();
            format!("use {} as _;", segments.join("::"))
        })
        .collect();
    imports.sort();

    let mut lines: Vec<String> = GENERATED_PREAMBLE.iter().map(|s| s.to_string()).collect();
    lines.push("#![allow(unused_imports)]".to_string());
    lines.push(String::new());
    lines.extend(imports);
    format!("{}\n", lines.join("\n"))
}

fn include_flag(path: &Path) -> OsString {
    let mut flag = OsString::from("-I");
    flag.push(path);
    flag
}

fn rel_to<'a>(path: &'a Path, root: &Path) -> Result<&'a Path> {
    path.strip_prefix(root).map_err(|_| Error::PathNotUnderRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })
}
