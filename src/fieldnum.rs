//! Field-number table extraction.
//!
//! Low-level encoders need wire field numbers without pulling in full
//! descriptor reflection at runtime. For every proto file in the
//! `google.protobuf` package this module emits a companion source file of
//! named constants, one per field of every message (nested messages
//! included), as the compile-time-checked substitute.

use heck::ToUpperCamelCase;
use prost_types::compiler::code_generator_response::File;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FileDescriptorProto};

use crate::config::GENERATED_PREAMBLE;

/// The one package family field-number tables are generated for.
const WELL_KNOWN_PACKAGE: &str = "google.protobuf";

/// Generate the field-number table for a descriptor file.
///
/// Returns `None` for files outside [`WELL_KNOWN_PACKAGE`]. The table lands
/// under `<module_path>/internal/fieldnum/<base>_gen.rs`.
pub fn generate(file: &FileDescriptorProto, module_path: &str) -> Option<File> {
    if file.package() != WELL_KNOWN_PACKAGE {
        return None;
    }

    let mut lines: Vec<String> = GENERATED_PREAMBLE.iter().map(|s| s.to_string()).collect();
    lines.push("#![allow(non_upper_case_globals)]".to_string());
    lines.push(String::new());
    process_messages(&file.message_type, file.package(), "", &mut lines);

    let base = file
        .name()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_end_matches(".proto")
        .to_string();
    Some(File {
        name: Some(format!("{module_path}/internal/fieldnum/{base}_gen.rs")),
        content: Some(format!("{}\n", lines.join("\n"))),
        ..Default::default()
    })
}

/// Depth-first over every message, in descriptor declaration order.
fn process_messages(
    messages: &[DescriptorProto],
    package: &str,
    name_prefix: &str,
    lines: &mut Vec<String>,
) {
    for message in messages {
        let rust_name = format!("{name_prefix}{}", message.name().to_upper_camel_case());
        let full_name = format!("{package}.{}", message.name());
        lines.push(format!("// Field numbers for {full_name}."));
        for field in &message.field {
            let type_name = match field.r#type() {
                Type::Enum | Type::Message | Type::Group => {
                    field.type_name().trim_start_matches('.').to_string()
                }
                scalar => scalar_kind_name(scalar).to_string(),
            };
            lines.push(format!(
                "pub const {rust_name}_{}: i32 = {}; // {} {type_name}",
                field.name().to_upper_camel_case(),
                field.number(),
                cardinality(field.label()),
            ));
        }
        lines.push(String::new());
        process_messages(&message.nested_type, &full_name, &format!("{rust_name}_"), lines);
    }
}

fn cardinality(label: Label) -> &'static str {
    match label {
        Label::Optional => "optional",
        Label::Required => "required",
        Label::Repeated => "repeated",
    }
}

fn scalar_kind_name(proto_type: Type) -> &'static str {
    match proto_type {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Enum | Type::Message | Type::Group => "",
    }
}
