//! protosync
//!
//! Regenerates the checked-in protobuf-generated sources of a repository
//! and reconciles them against the tree, either by overwriting (apply) or
//! by reporting unified diffs (the default dry run).
//!
//! The binary is dual-mode: invoked normally it runs the batch
//! orchestration, spawning protoc with itself registered as the `rust`
//! plugin; when protoc spawns it back with [`config::PLUGIN_ENV`] set, it
//! acts purely as the plugin, answering one code-generation request on
//! stdio and exiting.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backends;
pub mod config;
mod error;
pub mod fieldnum;
pub mod local;
pub mod plugin;
pub mod protoc;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
