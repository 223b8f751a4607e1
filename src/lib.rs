pub mod cli;
pub mod crop;
pub mod formats;
pub mod model;
pub mod runtime;
pub mod source;
pub mod storage;
pub mod transform;

pub fn run_cli() -> Result<(), String> {
    cli::run_cli()
}
