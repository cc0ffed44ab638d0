//! The protoc plugin half of the binary.
//!
//! When protoc spawns this executable it feeds one serialized
//! `CodeGeneratorRequest` on stdin and expects one serialized
//! `CodeGeneratorResponse` on stdout. The pure request handling lives in
//! [`handle_request`] so the dispatch logic is testable without any
//! subprocess; [`run`] only does the stdio framing.

use std::io::{self, Read, Write};

use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

use crate::backends::{self, BackendKind, GenParams};
use crate::error::{Error, Result};
use crate::fieldnum;

/// Read a request from stdin, dispatch it, write the response to stdout.
///
/// Any decode or backend error aborts the process with no partial output.
pub fn run(backend_list: &[BackendKind]) -> Result<()> {
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    let request = CodeGeneratorRequest::decode(&input[..])?;

    let response = handle_request(&request, backend_list)?;

    let mut output = Vec::new();
    response.encode(&mut output)?;
    io::stdout().write_all(&output)?;
    Ok(())
}

/// Dispatch one generation request to each backend in list order.
///
/// For every file marked for generation each backend runs in turn; the
/// `rust` backend additionally feeds the file to the field-number
/// extractor. Version markers are suppressed so the output is fully
/// reproducible: the orchestrator diffs staged bytes against the tree.
pub fn handle_request(
    request: &CodeGeneratorRequest,
    backend_list: &[BackendKind],
) -> Result<CodeGeneratorResponse> {
    let params = GenParams::parse(request.parameter());
    let rust_opts = backends::rust::Options {
        version_markers: false,
    };
    let module_path = params
        .module_path
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    let mut files = Vec::new();
    for file_name in &request.file_to_generate {
        let file = request
            .proto_file
            .iter()
            .find(|f| f.name.as_ref() == Some(file_name))
            .ok_or_else(|| Error::CodeGen(format!("file descriptor not found: {file_name}")))?;

        for backend in backend_list {
            match backend {
                BackendKind::Rust => {
                    files.extend(backends::rust::generate_file(
                        file,
                        &params,
                        &rust_opts,
                        request.compiler_version.as_ref(),
                    )?);
                    files.extend(fieldnum::generate(file, &module_path));
                }
                BackendKind::Grpc => {
                    files.extend(backends::grpc::generate_file(file, &params)?);
                }
            }
        }
    }

    Ok(CodeGeneratorResponse {
        file: files,
        error: None,
        supported_features: Some(1), // FEATURE_PROTO3_OPTIONAL
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

    fn request_for(file: FileDescriptorProto, parameter: &str) -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: vec![file.name().to_string()],
            parameter: Some(parameter.to_string()),
            proto_file: vec![file],
            ..Default::default()
        }
    }

    fn local_proto() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("testdata/sample/sample.proto".to_string()),
            package: Some("sample".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Widget".to_string()),
                field: vec![FieldDescriptorProto {
                    name: Some("name".to_string()),
                    number: Some(1),
                    r#type: Some(Type::String as i32),
                    label: Some(Label::Optional as i32),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_rust_backend_dispatch() {
        let request = request_for(local_proto(), "paths=source_relative");
        let response = handle_request(&request, &[BackendKind::Rust]).unwrap();
        assert_eq!(response.file.len(), 1);
        assert_eq!(response.file[0].name(), "testdata/sample/sample.rs");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_field_numbers_for_well_known_package() {
        let mut file = local_proto();
        file.name = Some("google/protobuf/sample.proto".to_string());
        file.package = Some("google.protobuf".to_string());
        let request = request_for(file, "module=protosync");
        let response = handle_request(&request, &[BackendKind::Rust]).unwrap();
        let names: Vec<&str> = response.file.iter().map(|f| f.name()).collect();
        assert!(names.contains(&"protosync/internal/fieldnum/sample_gen.rs"));
    }

    #[test]
    fn test_missing_descriptor_is_fatal() {
        let request = CodeGeneratorRequest {
            file_to_generate: vec!["missing.proto".to_string()],
            ..Default::default()
        };
        assert!(handle_request(&request, &[BackendKind::Rust]).is_err());
    }

    #[test]
    fn test_output_is_reproducible() {
        let request = request_for(local_proto(), "paths=source_relative");
        let first = handle_request(&request, &[BackendKind::Rust, BackendKind::Grpc]).unwrap();
        let second = handle_request(&request, &[BackendKind::Rust, BackendKind::Grpc]).unwrap();
        assert_eq!(first, second);
    }
}
