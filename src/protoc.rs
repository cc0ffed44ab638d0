//! Launching protoc with this binary as its plugin.
//!
//! The orchestrator never generates code in-process: it spawns protoc,
//! names the current executable as the `rust` plugin, and protoc invokes it
//! back in plugin mode (selected via [`crate::config::PLUGIN_ENV`] in the
//! child environment). One blocking request/response per invocation.

use std::ffi::OsString;
use std::process::Command;

use crate::config::PLUGIN_ENV;
use crate::error::{Error, Result};

/// Invoke protoc once with the given backend list and arguments.
///
/// A non-zero exit is fatal; the error carries the failing command line and
/// its combined output.
pub fn invoke(backend_list: &str, args: &[OsString]) -> Result<()> {
    let plugin_exe = std::env::current_exe()?;
    let mut cmd = Command::new("protoc");
    cmd.arg(format!("--plugin=protoc-gen-rust={}", plugin_exe.display()));
    cmd.args(args);
    cmd.env(PLUGIN_ENV, backend_list);

    let output = cmd.output()?;
    if !output.status.success() {
        let command = std::iter::once("protoc".to_string())
            .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(Error::Subprocess {
            command,
            output: combined,
        });
    }
    Ok(())
}
