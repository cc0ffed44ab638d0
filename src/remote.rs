//! Batch generation for protos vendored outside this repository.
//!
//! "Remote" means external to the local tree, not the network: every
//! target resolves against a search prefix under the proto root supplied
//! at startup. Targets are processed in list order; all of them share one
//! staging directory keyed by each file's own import identity, so ordering
//! only affects readability of the run, never the staged content.

use std::ffi::OsString;

use crate::config::{Config, LEGACY_MOVES};
use crate::error::Result;
use crate::{protoc, sync};

/// One vendored proto to regenerate: a search prefix under the proto root
/// and the file's path relative to that prefix.
#[derive(Debug)]
pub struct RemoteTarget {
    /// Search prefix, joined onto the proto root (`""` for the root
    /// itself).
    pub prefix: &'static str,
    /// Proto path relative to the prefix.
    pub path: &'static str,
}

const fn target(prefix: &'static str, path: &'static str) -> RemoteTarget {
    RemoteTarget { prefix, path }
}

/// The fixed remote target list.
pub const TARGETS: &[RemoteTarget] = &[
    target("", "conformance/conformance.proto"),
    target("benchmarks", "benchmarks.proto"),
    target("benchmarks", "datasets/google_message1/proto2/benchmark_message1_proto2.proto"),
    target("benchmarks", "datasets/google_message1/proto3/benchmark_message1_proto3.proto"),
    target("benchmarks", "datasets/google_message2/benchmark_message2.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_1.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_2.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_3.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_4.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_5.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_6.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_7.proto"),
    target("benchmarks", "datasets/google_message3/benchmark_message3_8.proto"),
    target("benchmarks", "datasets/google_message4/benchmark_message4.proto"),
    target("benchmarks", "datasets/google_message4/benchmark_message4_1.proto"),
    target("benchmarks", "datasets/google_message4/benchmark_message4_2.proto"),
    target("benchmarks", "datasets/google_message4/benchmark_message4_3.proto"),
    target("src", "google/protobuf/any.proto"),
    target("src", "google/protobuf/compiler/plugin.proto"),
    target("src", "google/protobuf/descriptor.proto"),
    target("src", "google/protobuf/duration.proto"),
    target("src", "google/protobuf/empty.proto"),
    target("src", "google/protobuf/field_mask.proto"),
    target("src", "google/protobuf/struct.proto"),
    target("src", "google/protobuf/test_messages_proto2.proto"),
    target("src", "google/protobuf/test_messages_proto3.proto"),
    target("src", "google/protobuf/timestamp.proto"),
    target("src", "google/protobuf/wrappers.proto"),
];

/// Generate all remote proto files and reconcile the result.
///
/// Only staged output under the module path is synced; anything keyed
/// elsewhere (such as the historical `field_mask` location) stays in
/// staging unless a legacy move copies it inside.
pub fn generate(config: &Config) -> Result<()> {
    let staging = tempfile::Builder::new()
        .prefix("tmp")
        .tempdir_in(&config.repo_root)?;

    let opts = format!("{},module={}", config.overrides.to_opt(), config.module_path);
    for target in TARGETS {
        let mut include = OsString::from("-I");
        include.push(config.proto_root.join(target.prefix));
        protoc::invoke(
            "rust",
            &[
                include,
                OsString::from(format!("--rust_out={}:{}", opts, staging.path().display())),
                OsString::from(target.path),
            ],
        )?;
    }

    // Packages that moved location after their remote sources were
    // vendored: duplicate the staged file at its new home.
    for mv in LEGACY_MOVES {
        sync::copy_file(&staging.path().join(mv.to), &staging.path().join(mv.from))?;
    }

    sync::sync_output(
        &config.repo_root,
        &staging.path().join(&config.module_path),
        config.mode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::copy_file;
    use std::fs;

    #[test]
    fn test_targets_are_well_formed() {
        assert!(!TARGETS.is_empty());
        for target in TARGETS {
            assert!(target.path.ends_with(".proto"));
            assert!(!target.path.starts_with('/'));
        }
        // The relocated package is generated before the move is applied.
        assert!(
            TARGETS
                .iter()
                .any(|t| t.path == "google/protobuf/field_mask.proto")
        );
    }

    #[test]
    fn test_benchmark_targets_have_import_overrides() {
        // Without an override a dataset file would be keyed by its declared
        // package, outside the module subtree, and never synced.
        let overrides = crate::config::PackageOverrides::standard();
        for target in TARGETS.iter().filter(|t| t.prefix == "benchmarks") {
            assert!(
                overrides.get(target.path).is_some(),
                "missing override for {}",
                target.path
            );
        }
    }

    #[test]
    fn test_legacy_move_duplicates_staged_file() {
        let staging = tempfile::tempdir().unwrap();
        for mv in LEGACY_MOVES {
            let from = staging.path().join(mv.from);
            fs::create_dir_all(from.parent().unwrap()).unwrap();
            fs::write(&from, "staged content\n").unwrap();

            let to = staging.path().join(mv.to);
            copy_file(&to, &from).unwrap();
            assert_eq!(fs::read_to_string(&to).unwrap(), "staged content\n");
            // The original stays put; the move is a copy.
            assert!(from.is_file());
        }
    }
}
