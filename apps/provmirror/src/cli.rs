//! Command line interface definition

use clap::Parser;
use std::path::PathBuf;

/// provmirror - Read-through mirror for the Terraform provider registry
#[derive(Parser, Debug)]
#[command(name = "provmirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read-through mirror for the Terraform provider registry")]
#[command(long_about = None)]
pub struct Cli {
    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Directory mirrored assets and keys are stored in
    #[arg(long, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Base URL mirrored files are served under
    #[arg(long, value_name = "URL")]
    pub public_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}
