//! assetmin - incremental asset bundler.

mod cli;

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::{ColorChoice, Parser};
use crossbeam::channel;
use tiny_http::Server;

use assetmin::asset::Minifiers;
use assetmin::config::AssetConfig;
use assetmin::dispatch::AssetMin;
use assetmin::fs::DiskFs;
use assetmin::watch::{self, AssetWatcher};
use assetmin::{embed, log, logger, serve};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = load_config(&cli)?;
    let roots = config.watch_roots();

    if !cli.command.build_args().no_defaults {
        let minifiers = if config.build.minify {
            Minifiers::standard()
        } else {
            Minifiers::passthrough()
        };
        embed::write_defaults(&config, &DiskFs, &minifiers)
            .context("failed to write starter files")?;
    }
    let engine = AssetMin::new(&config, DiskFs);

    // Watcher first: changes made during the initial scan are buffered.
    let watcher = match cli.command {
        Commands::Build { .. } => None,
        _ => Some(start_watcher(&config, &roots)?),
    };

    let count = watch::register_all(&engine, &roots);
    engine.recompile_all().context("initial build failed")?;
    log!("asset"; "{} sources → {}", count, config.paths.output.display());

    let Some(watcher) = watcher else {
        return Ok(());
    };
    let server = match cli.command {
        Commands::Serve { .. } => {
            let (server, addr) = serve::bind_with_retry(config.serve.interface, config.serve.port)?;
            log!("serve"; "http://{}", addr);
            Some(Arc::new(server))
        }
        _ => None,
    };
    let shutdown_rx = setup_shutdown_handler(server.clone())?;

    let engine = &engine;
    thread::scope(|scope| {
        if let Some(server) = &server {
            scope.spawn(move || serve::serve(server, engine));
        }
        log!("watch"; "watching for changes, Ctrl+C to stop");
        watcher.run(&engine, &shutdown_rx);
    });
    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AssetConfig> {
    let mut config = AssetConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if let Some(minify) = cli.command.build_args().minify {
        config.build.minify = minify;
    }
    if let Commands::Serve {
        interface, port, ..
    } = &cli.command
    {
        if let Some(interface) = interface {
            config.serve.interface = *interface;
        }
        if let Some(port) = port {
            config.serve.port = *port;
        }
    }
    Ok(config)
}

fn start_watcher(config: &AssetConfig, roots: &[std::path::PathBuf]) -> Result<AssetWatcher> {
    let mut watcher = AssetWatcher::new(roots).context("failed to start file watcher")?;
    if let Some(file) = &config.script.preamble_file {
        watcher
            .watch_preamble(file)
            .with_context(|| format!("failed to watch {}", file.display()))?;
    }
    Ok(watcher)
}

/// Ctrl+C stops the watcher and unblocks the server.
fn setup_shutdown_handler(server: Option<Arc<Server>>) -> Result<channel::Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        log!("watch"; "shutting down...");
        let _ = shutdown_tx.try_send(());
        if let Some(server) = &server {
            server.unblock();
        }
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))?;
    Ok(shutdown_rx)
}
