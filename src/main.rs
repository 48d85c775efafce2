//! CLI entry point for `colprofile`.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use colprofile::error::ProfileError;
use colprofile::history::source::read_records;
use colprofile::history::store::ProfileStore;
use colprofile::output::formatter;
use colprofile::parser::dialect::DialectKind;
use colprofile::profiler::config::ProfileConfig;
use colprofile::profiler::pipeline::Profiler;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "colprofile",
    about = "Score table columns by how a SQL query history joins, filters, and groups on them"
)]
struct Cli {
    /// Query-history files to ingest (JSON Lines, JSON arrays, or API pages)
    input: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQL dialect, overriding the configuration file
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Directory holding the accumulated history and parsed queries
    #[arg(long, default_value = "colprofile-state")]
    state_dir: PathBuf,

    /// Output directory
    #[arg(long, default_value = "colprofile-output")]
    output_dir: PathBuf,

    /// Discard the accumulated history and parsed queries before ingesting
    #[arg(long)]
    reset: bool,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(2);
    }
}

fn run(cli: &Cli) -> Result<(), ProfileError> {
    let mut config = match &cli.config {
        Some(path) => ProfileConfig::load(path)?,
        None => ProfileConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }

    let mut store = ProfileStore::open(&cli.state_dir)?;
    if cli.reset {
        store.reset();
    }

    let readers = cli
        .input
        .iter()
        .map(|path| read_records(path))
        .collect::<Result<Vec<_>, _>>()?;

    let profiler = Profiler::new(config);
    let output = profiler.run(&mut store, readers.into_iter().flatten())?;

    store.save()?;
    formatter::publish(&cli.output_dir, &output)?;

    if cli.verbose {
        eprintln!(
            "Profiled {} columns from {} records ({} parse failures)",
            output.summary.len(),
            store.history.len(),
            output.parse_failures.len()
        );
    }
    Ok(())
}
