//! Code-generation backends.
//!
//! Each backend turns one file descriptor into generated source text for a
//! single concern: `rust` emits the message structs, `grpc` emits service
//! stubs. The orchestrator treats them as black boxes behind
//! [`BackendKind`]; the plugin adapter dispatches to them by name.

pub mod grpc;
pub mod rust;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use prost_types::FileDescriptorProto;

use crate::error::{Error, Result};

/// A code-generation backend known to this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Message struct generation.
    Rust,
    /// Service stub generation.
    Grpc,
}

impl BackendKind {
    /// Resolve a backend by name.
    pub fn from_name(name: &str) -> Result<BackendKind> {
        match name {
            "rust" => Ok(BackendKind::Rust),
            "grpc" => Ok(BackendKind::Grpc),
            other => Err(Error::UnknownBackend(other.to_string())),
        }
    }

    /// Parse a comma-separated backend list, preserving order.
    pub fn parse_list(list: &str) -> Result<Vec<BackendKind>> {
        list.split(',').map(BackendKind::from_name).collect()
    }

    /// The name this backend is selected by.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Rust => "rust",
            BackendKind::Grpc => "grpc",
        }
    }
}

/// Generation parameters decoded from the protoc plugin parameter string.
#[derive(Debug, Clone, Default)]
pub struct GenParams {
    /// Place output next to the proto file rather than by import identity.
    pub source_relative: bool,
    /// Emit a sibling `.meta` file of code-location metadata.
    pub annotate: bool,
    /// Module path the field-number tables are generated under.
    pub module_path: Option<String>,
    /// Import-identity overrides, keyed by proto path (`M` entries).
    pub overrides: BTreeMap<String, String>,
}

impl GenParams {
    /// Parse the protoc plugin parameter string.
    ///
    /// Unknown entries are ignored; protoc passes everything after the colon
    /// of `--rust_out=<params>:<dir>` verbatim.
    pub fn parse(param: &str) -> GenParams {
        let mut params = GenParams::default();
        for part in param.split(',') {
            if part == "paths=source_relative" {
                params.source_relative = true;
            } else if part == "annotate_code" {
                params.annotate = true;
            } else if let Some(module) = part.strip_prefix("module=") {
                params.module_path = Some(module.to_string());
            } else if let Some(entry) = part.strip_prefix('M') {
                if let Some((proto, import)) = entry.split_once('=') {
                    params.overrides.insert(proto.to_string(), import.to_string());
                }
            }
        }
        params
    }
}

/// Directory a file's generated output lands in, relative to the output root.
///
/// Under `paths=source_relative` this is the proto file's own directory;
/// otherwise the override table wins, falling back to the path spelled by
/// the file's declared package.
pub fn output_dir(file: &FileDescriptorProto, params: &GenParams) -> PathBuf {
    if params.source_relative {
        return Path::new(file.name())
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
    }
    if let Some(import) = params.overrides.get(file.name()) {
        return PathBuf::from(import);
    }
    PathBuf::from(file.package().replace('.', "/"))
}

/// The proto file's base name without the `.proto` extension.
pub fn proto_stem(file: &FileDescriptorProto) -> &str {
    let base = file.name().rsplit('/').next().unwrap_or_default();
    base.strip_suffix(".proto").unwrap_or(base)
}

/// Render a path with forward slashes, the form protoc expects in
/// `CodeGeneratorResponse` file names.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// An identifier for generated code.
///
/// Keywords become raw identifiers; the few names that cannot be spelled
/// raw (`crate`, `self`, `super`, `Self`) get a trailing underscore.
pub(crate) fn ident(name: &str) -> syn::Ident {
    match name {
        "crate" | "self" | "super" | "Self" => {
            syn::Ident::new(&format!("{name}_"), proc_macro2::Span::call_site())
        }
        _ => syn::parse_str(name)
            .unwrap_or_else(|_| syn::Ident::new_raw(name, proc_macro2::Span::call_site())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, package: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_backend_list() {
        assert_eq!(
            BackendKind::parse_list("rust,grpc").unwrap(),
            vec![BackendKind::Rust, BackendKind::Grpc]
        );
        assert!(BackendKind::parse_list("rust,ecto").is_err());
    }

    #[test]
    fn test_parse_params() {
        let params = GenParams::parse(
            "paths=source_relative,Mgoogle/protobuf/any.proto=protosync/types/known/any,annotate_code,module=protosync",
        );
        assert!(params.source_relative);
        assert!(params.annotate);
        assert_eq!(params.module_path.as_deref(), Some("protosync"));
        assert_eq!(
            params.overrides.get("google/protobuf/any.proto").map(String::as_str),
            Some("protosync/types/known/any")
        );
    }

    #[test]
    fn test_output_dir_source_relative_wins() {
        let file = descriptor("testdata/nested/example.proto", "example.nested");
        let mut params = GenParams::parse("Mtestdata/nested/example.proto=somewhere/else");
        params.source_relative = true;
        assert_eq!(output_dir(&file, &params), PathBuf::from("testdata/nested"));
    }

    #[test]
    fn test_output_dir_override_then_package() {
        let file = descriptor("google/protobuf/any.proto", "google.protobuf");
        let params = GenParams::parse("Mgoogle/protobuf/any.proto=protosync/types/known/any");
        assert_eq!(output_dir(&file, &params), PathBuf::from("protosync/types/known/any"));

        let plain = descriptor("benchmarks.proto", "benchmarks");
        assert_eq!(output_dir(&plain, &GenParams::default()), PathBuf::from("benchmarks"));
    }

    #[test]
    fn test_ident_sanitizes_unusable_names() {
        assert_eq!(ident("widget").to_string(), "widget");
        assert_eq!(ident("type").to_string(), "r#type");
        assert_eq!(ident("self").to_string(), "self_");
        assert_eq!(ident("Self").to_string(), "Self_");
        assert_eq!(ident("crate").to_string(), "crate_");
    }

    #[test]
    fn test_proto_stem() {
        let file = descriptor("google/protobuf/field_mask.proto", "google.protobuf");
        assert_eq!(proto_stem(&file), "field_mask");
    }
}
