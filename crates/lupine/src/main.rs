use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use lupine::bundler::Bundler;
use lupine::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry point Lua script
    #[arg(short, long, default_value = "src/main.lua")]
    entry: PathBuf,

    /// Output bundled Lua file
    #[arg(short, long, default_value = "build/bundle.lua")]
    output: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target Lua dialect (e.g., lua51, lua52, lua53, lua54, luajit)
    #[arg(long)]
    lua_version: Option<String>,

    /// Seal the bundle against the host require (no runtime fallback)
    #[arg(long)]
    isolate: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("Starting lupine Lua bundler");

    debug!("Entry point: {:?}", cli.entry);
    debug!("Output: {:?}", cli.output);

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    // Override lua-version from CLI if provided
    if let Some(lua_version) = cli.lua_version {
        config.set_lua_version(lua_version)?;
    }
    if cli.isolate {
        config.isolate = true;
    }

    debug!("Configuration: {:?}", config);

    // Display target dialect for troubleshooting
    info!(
        "Target Lua version: {} ({})",
        config.lua_version,
        config.lua_dialect().unwrap_or("unknown")
    );

    // Create bundler and run
    let mut bundler = Bundler::new(config);
    bundler.bundle(&cli.entry, &cli.output)?;

    info!("Bundle created successfully at {:?}", cli.output);

    Ok(())
}
