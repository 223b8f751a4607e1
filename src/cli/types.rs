use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "n5crop",
    version,
    about = "Calibrated crops from multi-resolution N5 exports"
)]
pub(super) struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub(super) verbose: bool,

    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Prints channels, scale levels and transforms of an export as JSON.
    Info { root: PathBuf },
    /// Crops every channel of an export around a world-space point.
    Crop(CropArgs),
}

#[derive(Debug, Args)]
pub(super) struct CropArgs {
    /// Root directory of the N5 export.
    pub(super) root: PathBuf,

    /// World-space crop center.
    #[arg(
        long,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true,
        required_unless_present = "click",
        conflicts_with = "click"
    )]
    pub(super) center: Option<Vec<f64>>,

    /// Display-space click, resolved through --viewer-transform.
    #[arg(
        long,
        num_args = 2,
        value_names = ["X", "Y"],
        allow_negative_numbers = true,
        requires = "viewer_transform"
    )]
    pub(super) click: Option<Vec<i32>>,

    /// World-to-display transform as 12 row-packed values.
    #[arg(long, num_args = 12, allow_negative_numbers = true)]
    pub(super) viewer_transform: Option<Vec<f64>>,

    /// Crop around this point instead of the clicked one.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub(super) custom_center: Option<Vec<f64>>,

    #[arg(long)]
    pub(super) width: Option<u64>,

    #[arg(long)]
    pub(super) height: Option<u64>,

    #[arg(long)]
    pub(super) depth: Option<u64>,

    /// Scale level, 0 is full resolution.
    #[arg(long, allow_negative_numbers = true)]
    pub(super) level: Option<i64>,

    /// Write one file per channel.
    #[arg(long, conflicts_with = "stack")]
    pub(super) separate: bool,

    /// Write all channels into one (x, y, channel, z) file.
    #[arg(long)]
    pub(super) stack: bool,

    /// JSON or YAML file with default crop parameters.
    #[arg(long)]
    pub(super) defaults: Option<PathBuf>,

    #[arg(short, long, default_value = ".")]
    pub(super) output: PathBuf,

    /// Prepended to every output file name.
    #[arg(long, default_value = "")]
    pub(super) prefix: String,

    /// Also write a PNG of the middle slice.
    #[arg(long)]
    pub(super) preview: bool,
}
