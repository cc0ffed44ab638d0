//! Service stub generation (the secondary backend).
//!
//! Emits one `<file>_grpc.rs` per proto file that declares services: a
//! trait per service with one method per RPC. Files without services
//! produce no output.

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use prost_types::FileDescriptorProto;
use prost_types::compiler::code_generator_response::File;
use quote::quote;

use super::{GenParams, ident, output_dir, proto_stem, slash_path};
use crate::config::GENERATED_PREAMBLE;
use crate::error::Result;

/// Generate service stubs for one proto file.
pub fn generate_file(file: &FileDescriptorProto, params: &GenParams) -> Result<Vec<File>> {
    if file.service.is_empty() {
        return Ok(Vec::new());
    }

    let mut body = TokenStream::new();
    for service in &file.service {
        let trait_ident = ident(&service.name().to_upper_camel_case());
        let methods = service.method.iter().map(|method| {
            let name = ident(&method.name().to_snake_case());
            let input = ident(&local_type_name(method.input_type()));
            let output = ident(&local_type_name(method.output_type()));
            quote! {
                fn #name(&self, request: #input) -> Result<#output, Box<dyn std::error::Error>>;
            }
        });
        body.extend(quote! {
            pub trait #trait_ident {
                #(#methods)*
            }
        });
    }

    let raw = body.to_string();
    let formatted = match syn::parse_file(&raw) {
        Ok(parsed) => prettyplease::unparse(&parsed),
        Err(_) => raw,
    };
    let mut header: Vec<String> = GENERATED_PREAMBLE.iter().map(|s| s.to_string()).collect();
    header.push(format!("// source: {}", file.name()));
    header.push(String::new());

    let out_path = output_dir(file, params).join(format!("{}_grpc.rs", proto_stem(file)));
    Ok(vec![File {
        name: Some(slash_path(&out_path)),
        content: Some(format!("{}\n{}", header.join("\n"), formatted)),
        ..Default::default()
    }])
}

fn local_type_name(type_name: &str) -> String {
    type_name
        .rsplit('.')
        .next()
        .unwrap_or(type_name)
        .to_upper_camel_case()
}
