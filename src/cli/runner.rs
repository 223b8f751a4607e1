use std::path::Path;

use clap::Parser;
use serde_json::{Value, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::crop::{
    CropDefaults, CropError, CropRequest, ParameterSource, ViewerTransformResolver, load_defaults,
};
use crate::formats::{ExportOptions, TiffSample};
use crate::runtime::{AppContext, AppError};
use crate::source::{ChannelSources, MultiResolutionSource};
use crate::transform::{AffineTransform3, Point3};

use super::types::{Cli, Commands, CropArgs};

fn init_logging(verbose: bool) {
    let env_filter = if verbose { "n5_crop=debug" } else { "n5_crop=info" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = match cli.command {
        Commands::Info { root } => info(&root),
        Commands::Crop(args) => crop(&args),
    }
    .map_err(|error| error.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|error| error.to_string())?
    );
    Ok(())
}

fn info(root: &Path) -> Result<Value, AppError> {
    let app = AppContext::new();
    let metadata = app.source_service().open(root)?;
    let summary = app.source_service().summarize(&metadata)?;
    Ok(json!(summary))
}

fn point(values: &[f64]) -> Point3 {
    [values[0], values[1], values[2]]
}

fn defaults(args: &CropArgs) -> Result<CropDefaults, AppError> {
    let mut defaults = match &args.defaults {
        Some(path) => load_defaults(path)?,
        None => CropDefaults::default(),
    };
    if let Some(width) = args.width {
        defaults.width = width;
    }
    if let Some(height) = args.height {
        defaults.height = height;
    }
    if let Some(depth) = args.depth {
        defaults.depth = depth;
    }
    if let Some(level) = args.level {
        defaults.scale_level = level;
    }
    if args.separate {
        defaults.combine_channels = false;
    }
    if args.stack {
        defaults.combine_channels = true;
    }
    defaults.use_custom_center = args.custom_center.is_some();
    Ok(defaults)
}

/// Fills a request from the session defaults and the command line's custom center.
struct CommandLineParameters {
    custom_center: Option<Point3>,
}

impl ParameterSource for CommandLineParameters {
    fn collect(&mut self, defaults: &CropDefaults, world_point: Point3) -> Option<CropRequest> {
        let request = defaults.request_at(world_point);
        Some(match self.custom_center {
            Some(center) => request.with_custom_center(center),
            None => request,
        })
    }
}

fn crop(args: &CropArgs) -> Result<Value, AppError> {
    let app = AppContext::with_defaults(defaults(args)?);
    let metadata = app.source_service().open(&args.root)?;
    let written = match app.source_service().channels(&metadata)? {
        ChannelSources::U8(sources) => crop_channels(&app, &sources, args)?,
        ChannelSources::U16(sources) => crop_channels(&app, &sources, args)?,
        ChannelSources::F32(sources) => crop_channels(&app, &sources, args)?,
    };
    Ok(json!({ "status": "ok", "crops": written }))
}

fn crop_channels<T: TiffSample>(
    app: &AppContext,
    sources: &[MultiResolutionSource<T>],
    args: &CropArgs,
) -> Result<Vec<Value>, AppError> {
    let mut parameters = CommandLineParameters {
        custom_center: args.custom_center.as_deref().map(point),
    };
    let outcome = match (&args.click, &args.viewer_transform, &args.center) {
        (Some(click), Some(values), _) => {
            let resolver = ViewerTransformResolver::new(&AffineTransform3::from_row_packed(values)?)?;
            app.crop_service()
                .crop_at_click(sources, (click[0], click[1]), &resolver, &mut parameters)?
        }
        (_, _, Some(center)) => {
            let session = app.crop_service().session();
            let request = parameters
                .collect(&session.defaults(), point(center))
                .unwrap_or_else(|| session.request_at(point(center)));
            app.crop_service().crop(sources, &request)?
        }
        _ => {
            return Err(CropError::Config(
                "either --center or --click with --viewer-transform is required".into(),
            )
            .into());
        }
    };

    let options = ExportOptions {
        prefix: args.prefix.clone(),
        preview: args.preview,
    };
    let written = app.io_service().write(&outcome, &args.output, &options)?;
    Ok(outcome
        .calibrations()
        .iter()
        .zip(&written)
        .map(|(calibration, crop)| {
            json!({
                "label": crop.label,
                "tiff": crop.tiff,
                "sidecar": crop.sidecar,
                "preview": crop.preview,
                "hyperstack": crop.hyperstack,
                "calibration": calibration,
            })
        })
        .collect())
}
