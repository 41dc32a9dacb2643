mod admin_levels;
mod export;
mod osm_loader;
mod rings;

use anyhow::{Context, Result};
use boundaries::osm_types::AdminLevel;
use boundaries::pipeline::{DEFAULT_EPSILON, DEFAULT_MAX_ITERATIONS, SimplifyConfig, simplify_boundaries};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Simplify administrative boundaries without introducing crossings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input OSM PBF file
    input: PathBuf,

    /// Output GeoJSON file
    output: PathBuf,

    /// Maximum deviation of the simplified lines in metres
    #[arg(short, long, env = "BOUNDARY_EPSILON", default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// Upper bound on conflict detection passes
    #[arg(short = 'i', long, env = "BOUNDARY_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Ignore administrative relations above this admin_level
    #[arg(long, env = "BOUNDARY_MAX_ADMIN_LEVEL", default_value_t = AdminLevel::MAX.0)]
    max_admin_level: u8,

    /// Log debug output unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = SimplifyConfig {
        epsilon: args.epsilon,
        max_iterations: args.max_iterations,
    };
    config.validate().context("Invalid simplification settings")?;
    let max_admin_level = AdminLevel::new(args.max_admin_level)
        .with_context(|| format!("--max-admin-level must be between {} and {}", AdminLevel::MIN, AdminLevel::MAX))?;

    let data = osm_loader::load_boundaries(&args.input)?;
    info!("Loaded {} boundary ways and {} relations", data.ways.len(), data.relations.len());

    let force_rings = rings::collect_ring_ways(&data.relations, &data.ways);
    info!("{} ways are simplified as rings", force_rings.len());

    let admin_levels = admin_levels::AdminLevelIndex::from_relations(&data.relations, max_admin_level);
    info!("{} ways have an admin level", admin_levels.len());

    let outcome = simplify_boundaries(&data.ways, &force_rings, &config)?;
    if !outcome.converged {
        warn!(
            "Output still contains {} conflicting segments",
            outcome.residual_conflicts
        );
    }

    let collection = export::build_feature_collection(&data.ways, &outcome.masks, &admin_levels);
    export::write_geojson(&args.output, collection)?;

    Ok(())
}
