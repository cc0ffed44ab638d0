//! Message struct generation.
//!
//! Emits one Rust source file per proto file: a prost-style struct per
//! message (nested messages are flattened with their parent's name as a
//! prefix) and an `i32`-backed enum per enum type. Output is formatted with
//! prettyplease and carries the standard generated-file preamble.

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Literal, TokenStream};
use prost_types::compiler::Version;
use prost_types::compiler::code_generator_response::File;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use quote::quote;

use super::{GenParams, ident, output_dir, proto_stem, slash_path};
use crate::config::GENERATED_PREAMBLE;
use crate::error::{Error, Result};

/// Knobs for the rust backend.
#[derive(Debug, Clone)]
pub struct Options {
    /// Emit version-marker comments (tool and protoc versions) in the file
    /// header. These carry environment-dependent text, so the orchestrator
    /// turns them off to keep staged output byte-reproducible for diffing.
    pub version_markers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            version_markers: true,
        }
    }
}

/// Generate the Rust source for one proto file.
///
/// Returns the generated file plus, when `annotate_code` was requested, a
/// sibling `.meta` file of code-location metadata.
pub fn generate_file(
    file: &FileDescriptorProto,
    params: &GenParams,
    opts: &Options,
    compiler_version: Option<&Version>,
) -> Result<Vec<File>> {
    let mut body = TokenStream::new();
    emit_messages(&mut body, &file.message_type, "")?;
    emit_enums(&mut body, &file.enum_type, "");

    let dir = output_dir(file, params);
    let out_path = dir.join(format!("{}.rs", proto_stem(file)));

    let mut files = vec![File {
        name: Some(slash_path(&out_path)),
        content: Some(render(file, body, opts, compiler_version)),
        ..Default::default()
    }];
    if params.annotate {
        files.push(meta_file(file, &out_path));
    }
    Ok(files)
}

/// Emit a struct per message, depth-first in declaration order.
fn emit_messages(tokens: &mut TokenStream, messages: &[DescriptorProto], prefix: &str) -> Result<()> {
    for message in messages {
        // Synthetic map-entry messages have no checked-in counterpart.
        if message
            .options
            .as_ref()
            .and_then(|o| o.map_entry)
            .unwrap_or(false)
        {
            continue;
        }
        let name = format!("{prefix}{}", message.name().to_upper_camel_case());
        let struct_ident = ident(&name);
        let fields = message
            .field
            .iter()
            .map(field_tokens)
            .collect::<Result<Vec<_>>>()?;
        tokens.extend(quote! {
            #[derive(Clone, PartialEq, ::prost::Message)]
            pub struct #struct_ident {
                #(#fields)*
            }
        });
        emit_messages(tokens, &message.nested_type, &name)?;
        emit_enums(tokens, &message.enum_type, &name);
    }
    Ok(())
}

/// Emit an `i32`-backed enum per enum descriptor.
fn emit_enums(tokens: &mut TokenStream, enums: &[EnumDescriptorProto], prefix: &str) {
    for enum_type in enums {
        let enum_ident = ident(&format!("{prefix}{}", enum_type.name().to_upper_camel_case()));
        let variants = enum_type.value.iter().map(|v| {
            let variant = ident(&v.name().to_upper_camel_case());
            let number = Literal::i32_unsuffixed(v.number());
            quote! { #variant = #number, }
        });
        tokens.extend(quote! {
            #[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
            #[repr(i32)]
            pub enum #enum_ident {
                #(#variants)*
            }
        });
    }
}

/// Tokens for one struct field, prost attribute included.
fn field_tokens(field: &FieldDescriptorProto) -> Result<TokenStream> {
    let name = ident(&field.name().to_snake_case());
    let tag = field.number().to_string();
    let repeated = field.label() == Label::Repeated;

    Ok(match field.r#type() {
        Type::Message | Type::Group => {
            let ty = ident(&local_type_name(field.type_name()));
            if repeated {
                quote! {
                    #[prost(message, repeated, tag = #tag)]
                    pub #name: Vec<#ty>,
                }
            } else {
                quote! {
                    #[prost(message, optional, tag = #tag)]
                    pub #name: Option<#ty>,
                }
            }
        }
        Type::Enum => {
            let path = local_type_name(field.type_name());
            if repeated {
                quote! {
                    #[prost(enumeration = #path, repeated, tag = #tag)]
                    pub #name: Vec<i32>,
                }
            } else {
                quote! {
                    #[prost(enumeration = #path, tag = #tag)]
                    pub #name: i32,
                }
            }
        }
        scalar => {
            let (kind, ty) = scalar_parts(scalar).ok_or_else(|| {
                Error::CodeGen(format!("unsupported field type for {}", field.name()))
            })?;
            let kind = ident(kind);
            if repeated {
                quote! {
                    #[prost(#kind, repeated, tag = #tag)]
                    pub #name: Vec<#ty>,
                }
            } else if field.proto3_optional() {
                quote! {
                    #[prost(#kind, optional, tag = #tag)]
                    pub #name: Option<#ty>,
                }
            } else {
                quote! {
                    #[prost(#kind, tag = #tag)]
                    pub #name: #ty,
                }
            }
        }
    })
}

/// prost kind name and Rust type for a scalar field.
fn scalar_parts(proto_type: Type) -> Option<(&'static str, TokenStream)> {
    match proto_type {
        Type::Double => Some(("double", quote!(f64))),
        Type::Float => Some(("float", quote!(f32))),
        Type::Int64 => Some(("int64", quote!(i64))),
        Type::Uint64 => Some(("uint64", quote!(u64))),
        Type::Int32 => Some(("int32", quote!(i32))),
        Type::Fixed64 => Some(("fixed64", quote!(u64))),
        Type::Fixed32 => Some(("fixed32", quote!(u32))),
        Type::Bool => Some(("bool", quote!(bool))),
        Type::String => Some(("string", quote!(String))),
        Type::Bytes => Some(("bytes", quote!(Vec<u8>))),
        Type::Uint32 => Some(("uint32", quote!(u32))),
        Type::Sfixed32 => Some(("sfixed32", quote!(i32))),
        Type::Sfixed64 => Some(("sfixed64", quote!(i64))),
        Type::Sint32 => Some(("sint32", quote!(i32))),
        Type::Sint64 => Some(("sint64", quote!(i64))),
        Type::Message | Type::Group | Type::Enum => None,
    }
}

/// Trailing segment of a fully qualified type name (e.g. `.pkg.Msg` -> `Msg`).
fn local_type_name(type_name: &str) -> String {
    type_name
        .rsplit('.')
        .next()
        .unwrap_or(type_name)
        .to_upper_camel_case()
}

/// Format the token body and prepend the generated-file header.
fn render(
    file: &FileDescriptorProto,
    tokens: TokenStream,
    opts: &Options,
    compiler_version: Option<&Version>,
) -> String {
    let raw = tokens.to_string();
    let body = match syn::parse_file(&raw) {
        Ok(parsed) => prettyplease::unparse(&parsed),
        Err(_) => raw,
    };

    let mut header: Vec<String> = GENERATED_PREAMBLE.iter().map(|s| s.to_string()).collect();
    if opts.version_markers {
        header.push("// versions:".to_string());
        header.push(format!("//  protoc-gen-rust v{}", env!("CARGO_PKG_VERSION")));
        if let Some(v) = compiler_version {
            header.push(format!(
                "//  protoc          v{}.{}.{}",
                v.major(),
                v.minor(),
                v.patch()
            ));
        }
        header.push(String::new());
    }
    header.push(format!("// source: {}", file.name()));
    header.push(String::new());

    format!("{}\n{}", header.join("\n"), body)
}

/// The `.meta` sibling emitted under `annotate_code`: one line per message
/// mapping the proto name to the generated Rust name.
fn meta_file(file: &FileDescriptorProto, out_path: &std::path::Path) -> File {
    let mut lines: Vec<String> = GENERATED_PREAMBLE.iter().map(|s| s.to_string()).collect();
    let package = file.package();
    collect_annotations(&file.message_type, package, "", &mut lines);
    File {
        name: Some(format!("{}.meta", slash_path(out_path))),
        content: Some(format!("{}\n", lines.join("\n"))),
        ..Default::default()
    }
}

fn collect_annotations(
    messages: &[DescriptorProto],
    proto_prefix: &str,
    rust_prefix: &str,
    lines: &mut Vec<String>,
) {
    for message in messages {
        let proto_name = format!("{proto_prefix}.{}", message.name());
        let rust_name = format!("{rust_prefix}{}", message.name().to_upper_camel_case());
        lines.push(format!("annotation: {proto_name} => {rust_name}"));
        collect_annotations(&message.nested_type, &proto_name, &rust_name, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, number: i32, proto_type: Type, label: Label) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(proto_type as i32),
            label: Some(label as i32),
            ..Default::default()
        }
    }

    fn sample_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("testdata/sample/sample.proto".to_string()),
            package: Some("sample".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("widget".to_string()),
                field: vec![
                    field("name", 1, Type::String, Label::Optional),
                    field("tags", 2, Type::String, Label::Repeated),
                ],
                nested_type: vec![DescriptorProto {
                    name: Some("part".to_string()),
                    field: vec![field("id", 1, Type::Int64, Label::Optional)],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn source_relative() -> GenParams {
        GenParams::parse("paths=source_relative")
    }

    #[test]
    fn test_struct_generation() {
        let files = generate_file(
            &sample_file(),
            &source_relative(),
            &Options::default(),
            None,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "testdata/sample/sample.rs");
        let content = files[0].content();
        assert!(content.contains("pub struct Widget"));
        assert!(content.contains("pub name: String"));
        assert!(content.contains("pub tags: Vec<String>"));
        // Nested messages are flattened under the parent name.
        assert!(content.contains("pub struct WidgetPart"));
        assert!(content.starts_with("// Copyright"));
        assert!(content.contains("DO NOT EDIT"));
    }

    #[test]
    fn test_version_markers_suppressed() {
        let with_markers = generate_file(
            &sample_file(),
            &source_relative(),
            &Options::default(),
            None,
        )
        .unwrap();
        assert!(with_markers[0].content().contains("// versions:"));

        let without = generate_file(
            &sample_file(),
            &source_relative(),
            &Options {
                version_markers: false,
            },
            None,
        )
        .unwrap();
        assert!(!without[0].content().contains("// versions:"));
    }

    #[test]
    fn test_annotate_emits_meta_sibling() {
        let params = GenParams::parse("paths=source_relative,annotate_code");
        let files =
            generate_file(&sample_file(), &params, &Options::default(), None).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].name(), "testdata/sample/sample.rs.meta");
        assert!(files[1].content().contains("annotation: sample.widget => Widget"));
    }

    #[test]
    fn test_keyword_field_names_are_raw() {
        let mut file = sample_file();
        file.message_type[0]
            .field
            .push(field("type", 3, Type::Int32, Label::Optional));
        let files =
            generate_file(&file, &source_relative(), &Options::default(), None).unwrap();
        assert!(files[0].content().contains("pub r#type: i32"));
    }

    #[test]
    fn test_unrawable_field_names_get_a_suffix() {
        let mut file = sample_file();
        file.message_type[0]
            .field
            .push(field("self", 4, Type::Int32, Label::Optional));
        let files =
            generate_file(&file, &source_relative(), &Options::default(), None).unwrap();
        assert!(files[0].content().contains("pub self_: i32"));
    }
}
