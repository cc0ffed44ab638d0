//! Startup configuration.
//!
//! Everything here is resolved once at process start and treated as
//! read-only for the rest of the run: the invocation mode, the repository
//! and proto-tree roots, the package-override table, and the legacy-move
//! table for packages that changed location.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::backends::BackendKind;
use crate::error::{Error, Result};

/// Environment variable that switches the binary into plugin mode.
///
/// Its value is a comma-separated list of backend names. protoc sets it on
/// the child it spawns; a human never should.
pub const PLUGIN_ENV: &str = "PROTOSYNC_PLUGINS";

/// Environment variable providing the default `--protoroot` value.
pub const PROTO_ROOT_ENV: &str = "PROTOBUF_ROOT";

/// Fixed header prepended to every generated file.
pub const GENERATED_PREAMBLE: &[&str] = &[
    "// Copyright (c) The protosync Authors.",
    "// Licensed under MIT OR Apache-2.0.",
    "",
    "// Code generated by protosync. DO NOT EDIT.",
    "",
];

/// How the process was invoked, resolved once from [`PLUGIN_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run the full batch orchestration.
    Batch,
    /// Act as a protoc plugin for the named backends, then exit.
    Plugin(Vec<BackendKind>),
}

impl Mode {
    /// Resolve the invocation mode from the environment.
    pub fn from_env() -> Result<Mode> {
        match std::env::var(PLUGIN_ENV) {
            Ok(list) if !list.is_empty() => Ok(Mode::Plugin(BackendKind::parse_list(&list)?)),
            _ => Ok(Mode::Batch),
        }
    }
}

/// Whether the sync engine mutates the destination tree or only reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Print unified diffs against the destination; mutate nothing.
    Diff,
    /// Overwrite destination files with staged content.
    Apply,
}

/// Overrides the import identity for specific proto files.
///
/// The generated code for each listed file is placed under (and imported
/// through) the given module path instead of whatever the toolchain would
/// infer from the file's declared package.
#[derive(Debug, Clone)]
pub struct PackageOverrides(BTreeMap<String, String>);

impl PackageOverrides {
    /// The standard override table for this repository.
    pub fn standard() -> Self {
        let table = [
            // field_mask.proto still declares its historical location; the
            // remote pass copies the staged output to the new one (see
            // LEGACY_MOVES). We need the package as a dependency of several
            // tests but do not want a dependency on the old home.
            ("google/protobuf/field_mask.proto", "genproto/protobuf/field_mask"),
            ("google/protobuf/any.proto", "protosync/types/known/any"),
            ("google/protobuf/duration.proto", "protosync/types/known/duration"),
            ("google/protobuf/empty.proto", "protosync/types/known/empty"),
            ("google/protobuf/struct.proto", "protosync/types/known/value"),
            ("google/protobuf/timestamp.proto", "protosync/types/known/timestamp"),
            ("google/protobuf/wrappers.proto", "protosync/types/known/wrappers"),
            ("google/protobuf/descriptor.proto", "protosync/types/descriptor"),
            ("google/protobuf/compiler/plugin.proto", "protosync/types/plugin"),
            ("conformance/conformance.proto", "protosync/internal/testprotos/conformance"),
            (
                "google/protobuf/test_messages_proto2.proto",
                "protosync/internal/testprotos/conformance",
            ),
            (
                "google/protobuf/test_messages_proto3.proto",
                "protosync/internal/testprotos/conformance",
            ),
            (
                "benchmarks.proto",
                "protosync/internal/testprotos/benchmarks",
            ),
            (
                "datasets/google_message1/proto2/benchmark_message1_proto2.proto",
                "protosync/internal/testprotos/benchmarks/datasets/google_message1/proto2",
            ),
            (
                "datasets/google_message1/proto3/benchmark_message1_proto3.proto",
                "protosync/internal/testprotos/benchmarks/datasets/google_message1/proto3",
            ),
            (
                "datasets/google_message2/benchmark_message2.proto",
                "protosync/internal/testprotos/benchmarks/datasets/google_message2",
            ),
            (
                "datasets/google_message3/benchmark_message3.proto",
                "protosync/internal/testprotos/benchmarks/datasets/google_message3",
            ),
            (
                "datasets/google_message4/benchmark_message4.proto",
                "protosync/internal/testprotos/benchmarks/datasets/google_message4",
            ),
        ];
        let mut map: BTreeMap<String, String> = table
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // The split dataset files share their dataset's module.
        for n in 1..=8 {
            map.insert(
                format!("datasets/google_message3/benchmark_message3_{n}.proto"),
                "protosync/internal/testprotos/benchmarks/datasets/google_message3".to_string(),
            );
        }
        for n in 1..=3 {
            map.insert(
                format!("datasets/google_message4/benchmark_message4_{n}.proto"),
                "protosync/internal/testprotos/benchmarks/datasets/google_message4".to_string(),
            );
        }
        PackageOverrides(map)
    }

    /// Look up the override for a proto path, if any.
    pub fn get(&self, proto_path: &str) -> Option<&str> {
        self.0.get(proto_path).map(String::as_str)
    }

    /// Render the table as a protoc option string, `M<path>=<import>,...`.
    ///
    /// Entries are emitted in sorted key order so the option string (and
    /// therefore anything a backend derives from it) is deterministic.
    pub fn to_opt(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("M{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A staged file that must be duplicated under a second path because the
/// package moved but the remote sources do not yet reflect it.
#[derive(Debug, Clone, Copy)]
pub struct LegacyMove {
    /// Staging-relative path of the file at its historical location.
    pub from: &'static str,
    /// Staging-relative path it should also exist at.
    pub to: &'static str,
}

/// Transitional {from, to} pairs applied after the remote pass.
pub const LEGACY_MOVES: &[LegacyMove] = &[LegacyMove {
    from: "genproto/protobuf/field_mask/field_mask.rs",
    to: "protosync/internal/testprotos/fieldmaskpb/field_mask.rs",
}];

/// Resolved batch-run configuration. Read-only after startup.
#[derive(Debug)]
pub struct Config {
    /// Repository root, from `git rev-parse --show-toplevel`.
    pub repo_root: PathBuf,
    /// Root package name, from `cargo metadata`. Staged remote output is
    /// keyed under this path.
    pub module_path: String,
    /// Root of the protobuf source tree.
    pub proto_root: PathBuf,
    /// Apply or diff-only.
    pub mode: SyncMode,
    /// The package-override table.
    pub overrides: PackageOverrides,
}

impl Config {
    /// Resolve the batch configuration from flags and the environment.
    ///
    /// The proto root is checked first so a missing root fails before any
    /// subprocess is spawned.
    pub fn resolve(execute: bool, proto_root: Option<PathBuf>) -> Result<Config> {
        let proto_root = proto_root
            .or_else(|| std::env::var_os(PROTO_ROOT_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "the protobuf source root is not set; pass --protoroot or set {PROTO_ROOT_ENV}"
                ))
            })?;

        let repo_root = repo_root()?;
        let module_path = module_path(&repo_root)?;

        Ok(Config {
            repo_root,
            module_path,
            proto_root,
            mode: if execute { SyncMode::Apply } else { SyncMode::Diff },
            overrides: PackageOverrides::standard(),
        })
    }
}

/// Determine the repository root path.
fn repo_root() -> Result<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()?;
    if !output.status.success() {
        return Err(Error::Subprocess {
            command: "git rev-parse --show-toplevel".to_string(),
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(PathBuf::from(
        String::from_utf8_lossy(&output.stdout).trim(),
    ))
}

/// Determine the root package name of the repository.
fn module_path(repo_root: &Path) -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--no-deps", "--format-version", "1"])
        .current_dir(repo_root)
        .output()?;
    if !output.status.success() {
        return Err(Error::Subprocess {
            command: "cargo metadata --no-deps".to_string(),
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    let meta: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let packages = meta
        .get("packages")
        .and_then(|p| p.as_array())
        .ok_or_else(|| Error::Config("cargo metadata returned no packages".to_string()))?;

    // Prefer the package whose manifest sits at the repository root.
    let root_manifest = repo_root.join("Cargo.toml");
    let package = packages
        .iter()
        .find(|p| {
            p.get("manifest_path")
                .and_then(|m| m.as_str())
                .map(Path::new)
                == Some(root_manifest.as_path())
        })
        .or_else(|| packages.first())
        .ok_or_else(|| Error::Config("cargo metadata returned no packages".to_string()))?;

    package
        .get("name")
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Config("cargo metadata package has no name".to_string()))
}
