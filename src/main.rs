//! Line-oriented driver: reads JSON events from stdin, aggregates them and
//! writes the emitted events to stdout as JSON lines.

use std::io::BufRead;
use std::io::BufWriter;
use std::io::Write;

use clap::Parser;
use d_aggregate::encode_metrics;
use d_aggregate::AggregateProcessor;
use d_aggregate::AggregateProcessorConfig;
use d_aggregate::Error;
use d_aggregate::Event;
use d_aggregate::Record;
use d_aggregate::Result;
use serde_json::Value;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "d-aggregate", version, about = "Windowed event aggregation over JSON lines")]
struct Cli {
    /// Configuration file layered over `CONFIG_PATH` and the environment
    #[arg(short, long)]
    config: Option<String>,

    /// Number of input lines handed to the processor per batch
    #[arg(short, long, default_value_t = 100)]
    batch_size: usize,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    print_metrics: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_observability();

    let mut config = AggregateProcessorConfig::new()?;
    if let Some(path) = &cli.config {
        info!("with_override_config from: {}", path);
        config = config.with_override_config(path)?;
    }
    let processor = AggregateProcessor::builder(config).build()?;

    let stdin = std::io::stdin();
    let mut out = BufWriter::new(std::io::stdout().lock());
    let batch_size = cli.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => batch.push(Record::new(Event::from_value(value))),
            Err(e) => warn!(error = %e, "skipping malformed input line"),
        }
        if batch.len() >= batch_size {
            let records = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            write_records(&mut out, processor.execute(records)?)?;
        }
    }
    if !batch.is_empty() {
        write_records(&mut out, processor.execute(batch)?)?;
    }

    processor.prepare_for_shutdown();
    while !processor.is_ready_for_shutdown() {
        write_records(&mut out, processor.execute(Vec::new())?)?;
    }
    processor.shutdown();
    out.flush()?;

    if cli.print_metrics {
        eprintln!("{}", encode_metrics(processor.metrics_registry())?);
    }
    Ok(())
}

/// Writes each record's payload as one JSON line; tags are added under `tags`.
fn write_records(
    out: &mut impl Write,
    records: Vec<Record>,
) -> Result<()> {
    for record in records {
        let event = record.into_event();
        let tags: Vec<Value> = event.tags().iter().cloned().map(Value::String).collect();
        let mut data = event.into_map();
        if !tags.is_empty() {
            data.insert("tags".to_string(), Value::Array(tags));
        }
        let line = serde_json::to_string(&data).map_err(|e| Error::Fatal(format!("failed to encode event: {e}")))?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
