mod app;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};

use app::{Cli, init_sink, process_input};
use tagmap::config::MappingConfig;
use tagmap::mapping::Matchers;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = cli.runtime();
    if let Some(threads) = runtime.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let config = MappingConfig::load(&cli.mapping)
        .with_context(|| format!("Config: Failed to load mapping {:?}", cli.mapping))?;
    let matchers = Arc::new(Matchers::from_config(&config)?);

    let sink = init_sink(&cli.output)?;
    let sink_handle = Arc::new(Mutex::new(sink));

    let start = std::time::Instant::now();
    let stats = process_input(&cli, matchers, &runtime, sink_handle)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Matched {} features into {} rows in {:.2}s ({} features/s)",
        stats.features,
        stats.rows,
        elapsed.as_secs_f64(),
        (stats.features as f64 / elapsed.as_secs_f64()) as u64
    );

    Ok(())
}
