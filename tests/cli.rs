// Drive the real binary in both invocation modes.
use assert_cmd::Command;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use prost::Message;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};

fn protosync() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("protosync"));
    // Keep the test hermetic regardless of the caller's environment.
    cmd.env_remove("PROTOSYNC_PLUGINS");
    cmd.env_remove("PROTOBUF_ROOT");
    cmd
}

#[test]
fn batch_mode_requires_proto_root() {
    protosync()
        .assert()
        .failure()
        .stderr(predicate::str::contains("protobuf source root is not set"));
}

#[test]
fn unknown_plugin_backend_is_fatal() {
    protosync()
        .env("PROTOSYNC_PLUGINS", "rust,ecto")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend: ecto"));
}

#[test]
fn plugin_mode_answers_a_generation_request() {
    let request = CodeGeneratorRequest {
        file_to_generate: vec!["testdata/sample/sample.proto".to_string()],
        parameter: Some("paths=source_relative".to_string()),
        proto_file: vec![FileDescriptorProto {
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
        }],
        ..Default::default()
    };
    let mut input = Vec::new();
    request.encode(&mut input).unwrap();

    let assert = protosync()
        .env("PROTOSYNC_PLUGINS", "rust")
        .write_stdin(input)
        .assert()
        .success();

    let response = CodeGeneratorResponse::decode(&assert.get_output().stdout[..]).unwrap();
    assert!(response.error.is_none());
    assert_eq!(response.file.len(), 1);
    assert_eq!(response.file[0].name(), "testdata/sample/sample.rs");
    assert!(response.file[0].content().contains("pub struct Widget"));
}

#[test]
fn plugin_mode_never_reaches_batch_orchestration() {
    // An empty request is valid; the process must answer it and exit
    // instead of complaining about batch configuration.
    protosync()
        .env("PROTOSYNC_PLUGINS", "rust")
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("protobuf source root").not());
}
