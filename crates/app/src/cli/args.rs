pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bucketgate")]
#[command(about = "Group-authorized HTTP gateway for S3-compatible object storage")]
pub struct Args {
    /// Path to the config file (defaults to ~/.bucketgate/config.toml)
    #[arg(long, global = true, env = "BUCKETGATE_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
