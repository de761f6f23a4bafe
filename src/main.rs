use anyhow::{Context, Result};
use churnbench::{
    cli::{Cli, OutputFormat},
    config::WorkloadConfig,
    engine::WorkloadEngine,
    memory_probe::SystemProbe,
    report,
    rng::XorShift64,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Default engine, with the round count optionally overridden
fn build_engine(rounds: Option<u64>) -> Result<WorkloadEngine<XorShift64, SystemProbe>> {
    match rounds {
        Some(rounds) => {
            let config = WorkloadConfig::builder()
                .rounds(rounds)
                .build()
                .context("invalid workload configuration")?;
            Ok(WorkloadEngine::from_config(config))
        }
        None => Ok(WorkloadEngine::with_defaults()),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let engine = build_engine(args.rounds)?;
    let config = engine.config().clone();
    let stats = engine.run();

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&args.label, &stats)),
        OutputFormat::Json => {
            let json = report::render_json(&args.label, &config, &stats)
                .context("failed to serialize report")?;
            println!("{json}");
        }
    }

    Ok(())
}
