use std::path::PathBuf;

use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Path to the job TOML file
    #[arg(long, default_value = "job.toml", env = "SLUICE_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// Output file to read
    #[arg(long)]
    pub file: PathBuf,

    /// Record delimiter the file was written with ("null" = NUL byte)
    #[arg(long, default_value = "null")]
    pub delimiter: String,

    /// Codec: auto (by extension), none, gzip, snappy or deflate
    #[arg(long, default_value = "auto")]
    pub codec: String,

    /// Print at most this many records
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Clone, Debug)]
pub struct ParamsArgs {
    /// Job file whose plugins to describe; built-in plugins without it
    #[arg(long, env = "SLUICE_CONFIG")]
    pub config: Option<PathBuf>,
}
