//! latop - dump latency reports from recorded operations.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::fs::File;
use std::io::{self, BufReader, Write};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use latop_cli::{render, replay, Args};
use latop_core::UsageRegistry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the report on stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "latop=info,latop_cli=info,latop_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = args.to_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        input = ?args.input,
        verbose = args.verbose,
        format = ?args.format,
        "starting latop"
    );

    let registry = UsageRegistry::new(config)?;

    let summary = match &args.input {
        Some(path) => replay(BufReader::new(File::open(path)?), &registry)?,
        None => replay(io::stdin().lock(), &registry)?,
    };
    tracing::debug!(?summary, "operations replayed");

    let report = registry.snapshot(args.verbose);
    let rendered = render(&report, args.format)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
