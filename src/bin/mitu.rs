//! mitu: build the phone prefix index and query it offline.

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use mitu::{
    sanitize_digits, BuildConfig, IndexWriter, Ingestor, PhoneIndex, TimeFormat, FORMAT_VERSION,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

fn long_version() -> String {
    format!(
        "{} (db schema v{})",
        env!("CARGO_PKG_VERSION"),
        FORMAT_VERSION
    )
}

#[derive(Parser)]
#[command(name = "mitu")]
#[command(version, long_version = long_version())]
#[command(about = "Offline phone number location and timezone lookup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the binary index from prefix data files
    Build {
        /// YAML build configuration (defaults to the bundled source layout)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output index file, overrides the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Look up a phone number
    Lookup {
        /// Phone number; all arguments are joined and non-digits dropped
        #[arg(required = true)]
        number: Vec<String>,

        /// Index file
        #[arg(long, default_value = mitu::config::DEFAULT_OUTPUT)]
        db: PathBuf,

        /// Clock style for the local time
        #[arg(long, value_enum, default_value_t = Clock::H12)]
        format: Clock,

        /// Print how long the lookup took
        #[arg(long)]
        timing: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Clock {
    #[value(name = "12")]
    H12,
    #[value(name = "24")]
    H24,
}

impl From<Clock> for TimeFormat {
    fn from(clock: Clock) -> Self {
        match clock {
            Clock::H12 => TimeFormat::H12,
            Clock::H24 => TimeFormat::H24,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = match &cli.command {
        Commands::Build { verbose: true, .. } => "debug",
        Commands::Build { .. } => "info",
        Commands::Lookup { .. } => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let outcome = match cli.command {
        Commands::Build {
            config,
            output,
            verbose,
        } => build(config.as_deref(), output, verbose),
        Commands::Lookup {
            number,
            db,
            format,
            timing,
            json,
        } => lookup(&number.concat(), &db, format.into(), timing, json),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build(
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig::default(),
    };
    if let Some(output) = output {
        config.output = output;
    }

    if verbose {
        for source in &config.sources {
            println!("Source: {:?} ({})", source.path, source.kind.name());
        }
    }

    let trie = Ingestor::run(&config)?;
    let stats = IndexWriter::new().write_to(&trie, &config.output)?;

    println!(
        "Successfully built {:?}: {} nodes, {} records, {} pool bytes ({} bytes)",
        config.output, stats.node_count, stats.record_count, stats.pool_size, stats.file_size
    );
    Ok(())
}

fn lookup(
    number: &str,
    db: &Path,
    format: TimeFormat,
    timing: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let digits = sanitize_digits(number);

    let index = PhoneIndex::open(db)?;

    let start = Instant::now();
    let result = index.lookup(&digits);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let now = Utc::now();
    if json {
        let local_time = result
            .location()
            .and_then(|location| location.local_time(now, format));
        let mut value = serde_json::to_value(result)?;
        if let Some(object) = value.as_object_mut() {
            if let Some(time) = local_time {
                object.insert("local_time".to_string(), time.into());
            }
            if timing {
                object.insert("elapsed_ms".to_string(), elapsed_ms.into());
            }
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", result.report(now, format));

    if timing {
        println!("Returned in {:.4} ms", elapsed_ms);
    }
    Ok(())
}
