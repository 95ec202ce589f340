//! Image processing application with plugin support

#![warn(missing_docs)]

mod error;
mod params;
mod plugin_loader;

use clap::Parser;
use error::AppError;
use params::Selection;
use plugin_loader::Plugin;

use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about="Image processing application with plugin support", long_about = None)]
struct Cli {
    input: PathBuf,
    output: PathBuf,
    plugin: String,
    params: PathBuf,

    #[arg(long, default_value = "target/debug")]
    plugin_path: PathBuf,

    /// Restrict the plugin to X,Y,WIDTH,HEIGHT
    #[arg(long)]
    selection: Option<Selection>,
}

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if !cli.input.exists() {
        return Err(AppError::InputImageNotFound(cli.input));
    }
    if !cli.params.exists() {
        return Err(AppError::ParamsFileNotFound(cli.params));
    }

    let img = image::open(&cli.input)?.to_rgba8();
    log::info!(
        "Loaded {} ({}x{})",
        cli.input.display(),
        img.width(),
        img.height()
    );

    let params_text = fs::read_to_string(&cli.params)?;
    let params = params::prepare(&params_text, cli.selection, &cli.plugin_path)?;

    let plugin = Plugin::load(&cli.plugin_path, &cli.plugin)?;
    let out_img = plugin.run(&img, &params)?;

    out_img.save(&cli.output)?;
    log::info!(
        "Saved {} ({}x{})",
        cli.output.display(),
        out_img.width(),
        out_img.height()
    );

    Ok(())
}
