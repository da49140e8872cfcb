use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tagmap::config::{DEFAULT_BATCH_SIZE, RuntimeConfig};
use tagmap::input::LineBatches;
use tagmap::mapping::Matchers;
use tagmap::pipeline::{BatchProcessor, MatchingProcessor};
use tagmap::sinks::{JsonlSink, RowSink, TableRow};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tag mapping configuration (YAML)
    #[arg(short, long)]
    pub mapping: PathBuf,

    /// Input features, one JSON object per line ("-" for stdin)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output rows as JSON lines ("-" for stdout)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Lines per parallel work unit
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            threads: self.threads,
            batch_size: self.batch_size,
        }
    }
}

pub type SinkHandle = Arc<Mutex<Box<dyn RowSink + Send>>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct PassStats {
    pub features: u64,
    pub rows: u64,
}

pub fn init_sink(output: &Path) -> Result<Box<dyn RowSink + Send>> {
    if output == Path::new("-") {
        tracing::info!("Sink: jsonl -> stdout");
        Ok(Box::new(JsonlSink::stdout()?))
    } else {
        tracing::info!("Sink: jsonl -> {:?}", output);
        Ok(Box::new(JsonlSink::new(output).with_context(|| {
            format!("CLI: Failed to create output file {:?}", output)
        })?))
    }
}

pub fn open_input(input: &Path) -> Result<Box<dyn BufRead + Send>> {
    if input == Path::new("-") {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = File::open(input)
        .with_context(|| format!("CLI: Failed to open input file {:?}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

fn lock_sink(sink: &SinkHandle) -> Result<std::sync::MutexGuard<'_, Box<dyn RowSink + Send>>> {
    sink.lock()
        .map_err(|_| anyhow!("Pipeline: Sink lock poisoned"))
}

pub fn run_pass<P, R>(
    reader: R,
    processor: Arc<P>,
    sink: SinkHandle,
    batch_size: usize,
) -> Result<PassStats>
where
    P: BatchProcessor + 'static,
    R: BufRead + Send,
{
    let (tx, rx) = bounded::<Vec<TableRow>>(64);
    let features = Arc::new(AtomicU64::new(0));

    let sink_handle = sink.clone();
    let writer = std::thread::spawn(move || -> Result<u64> {
        let mut sink = lock_sink(&sink_handle)?;
        let mut row_count = 0u64;
        for batch in rx {
            for row in batch {
                sink.add_row(row)?;
                row_count += 1;
            }
        }
        Ok(row_count)
    });

    let decode_result = LineBatches::new(reader, batch_size)
        .par_bridge()
        .try_for_each(|batch| -> Result<()> {
            let batch = batch.context("Input: Failed to read line")?;
            let line_count = batch.len() as u64;

            let rows = processor.process_batch(batch)?;
            let total = features.fetch_add(line_count, Ordering::Relaxed) + line_count;
            if total / 1_000_000 > (total - line_count) / 1_000_000 {
                tracing::info!("Processed {} lines", total);
            }

            if !rows.is_empty() {
                tx.send(rows)
                    .map_err(|err| anyhow!("Pipeline: Failed to send row batch: {}", err))?;
            }
            Ok(())
        });

    drop(tx);

    // The writer holds the root cause when the channel disconnected early.
    let row_count = match writer.join() {
        Ok(Ok(result)) => result,
        Ok(Err(writer_err)) => {
            return if decode_result.is_err() {
                Err(writer_err
                    .context("Pipeline: Sink writer thread failed (caused channel disconnect)"))
            } else {
                Err(writer_err)
            };
        }
        Err(panic_payload) => {
            let panic_msg = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(anyhow!(
                "Pipeline: Sink writer thread panicked: {}",
                panic_msg
            ));
        }
    };

    decode_result?;

    Ok(PassStats {
        features: features.load(Ordering::Relaxed),
        rows: row_count,
    })
}

pub fn process_input(
    cli: &Cli,
    matchers: Arc<Matchers>,
    runtime: &RuntimeConfig,
    sink: SinkHandle,
) -> Result<PassStats> {
    let reader = open_input(&cli.input)?;
    tracing::info!(
        "Classifying features from {:?} (batch size {})...",
        cli.input,
        runtime.batch_size
    );
    let processor = Arc::new(MatchingProcessor { matchers });
    let stats = run_pass(reader, processor, sink.clone(), runtime.batch_size)?;

    lock_sink(&sink)?
        .finish()
        .context("Pipeline: Failed to finalize sink")?;
    Ok(stats)
}
