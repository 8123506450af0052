use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use transit_sampler::{
    Database, load_boundary_file, random_point_in_polygon, summarize_row,
    try_random_point_in_polygon,
};

/// Sample trips inside a region and inspect the collected directions.
#[derive(Parser)]
#[command(name = "transit-sampler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print random origin/destination pairs inside a region, as JSON lines
    Sample {
        /// File holding the KML coordinates of the region
        #[arg(short, long)]
        boundary: PathBuf,

        /// Number of pairs
        #[arg(short, long, default_value_t = 10)]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Give up after this many rejected draws for one point
        #[arg(long)]
        max_attempts: Option<NonZeroUsize>,
    },

    /// Print per-mode totals of every stored response, as JSON lines
    Summarize {
        /// SQLite file written by a collector
        #[arg(short, long)]
        database: PathBuf,
    },
}

#[derive(Serialize)]
struct Pair {
    origin: (f64, f64),
    destination: (f64, f64),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Sample {
            boundary,
            count,
            seed,
            max_attempts,
        } => sample(boundary, count, seed, max_attempts),
        Commands::Summarize { database } => summarize(database),
    }
}

fn sample(
    boundary: PathBuf,
    count: usize,
    seed: Option<u64>,
    max_attempts: Option<NonZeroUsize>,
) -> Result<()> {
    let polygon = load_boundary_file(&boundary)
        .with_context(|| format!("failed to load boundary {}", boundary.display()))?;
    tracing::info!(
        vertices = polygon.vertices().len(),
        acceptance_ratio = polygon.acceptance_ratio(),
        "region loaded"
    );

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut draw = || match max_attempts {
        Some(max_attempts) => try_random_point_in_polygon(&mut rng, &polygon, max_attempts),
        None => Ok(random_point_in_polygon(&mut rng, &polygon)),
    };

    for _ in 0..count {
        let origin = draw().context("failed to sample origin")?;
        let destination = draw().context("failed to sample destination")?;
        let pair = Pair {
            origin: origin.x_y(),
            destination: destination.x_y(),
        };
        println!("{}", serde_json::to_string(&pair)?);
    }
    Ok(())
}

fn summarize(path: PathBuf) -> Result<()> {
    let database = Database::open_existing(&path, NonZeroUsize::MIN)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let rows = database.rows().context("failed to read rows")?;
    tracing::info!(rows = rows.len(), "summarizing");

    for (i, row) in rows.iter().enumerate() {
        let summary = summarize_row(row).with_context(|| format!("row #{i} is malformed"))?;
        println!("{}", serde_json::to_string(&summary)?);
    }
    Ok(())
}
