//! Batch entry point.
//!
//! Usage:
//!   protosync --protoroot /path/to/protobuf          # diff only
//!   protosync --protoroot /path/to/protobuf --execute # write to the tree

use std::path::PathBuf;

use clap::Parser;

use protosync::config::{Config, Mode};
use protosync::{local, plugin, remote};

#[derive(Parser, Debug)]
#[command(
    name = "protosync",
    about = "Regenerate checked-in protobuf-generated sources and reconcile them against the tree"
)]
struct Args {
    /// Write generated files to the destination tree instead of diffing.
    #[arg(long)]
    execute: bool,

    /// Root of the protobuf source tree (defaults to $PROTOBUF_ROOT).
    #[arg(long)]
    protoroot: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("[protosync] error: {err}");
        std::process::exit(1);
    }
}

fn run() -> protosync::Result<()> {
    // protoc re-invokes this binary with the plugin environment variable
    // set; everything else is a batch run.
    match Mode::from_env()? {
        Mode::Plugin(backend_list) => {
            plugin::run(&backend_list)?;
        }
        Mode::Batch => {
            let args = Args::parse();
            let config = Config::resolve(args.execute, args.protoroot)?;
            eprintln!(
                "[protosync] generating into {} ({})",
                config.repo_root.display(),
                if args.execute { "apply" } else { "diff" },
            );
            local::generate(&config)?;
            remote::generate(&config)?;
        }
    }
    Ok(())
}
