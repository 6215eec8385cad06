//! Grow a city from a config file and report on it.

#[macro_use]
extern crate log;

mod export;

use anyhow::{bail, Result};
use structopt::StructOpt;

use abstutil::{prettyprint_usize, Timer};
use road_network::{BlockKind, CityGenerator, GeneratorConfig};

#[derive(StructOpt)]
#[structopt(name = "citygen", about = "Grows road networks and finds the blocks between them")]
enum Command {
    /// Generate a city and log a summary of it
    Generate {
        /// The path to a JSON config. Anything missing gets the default value.
        #[structopt(long)]
        config: Option<String>,
        /// Use this seed instead of the config's
        #[structopt(long)]
        seed: Option<u64>,
        /// Write the roads and blocks to this GeoJSON file, for debugging
        #[structopt(long)]
        geojson: Option<String>,
        /// Fail if the generated road network is structurally broken
        #[structopt(long)]
        validate: bool,
    },
    /// Print the default config as JSON, as a starting point for editing
    DefaultConfig,
}

fn main() -> Result<()> {
    let cmd = Command::from_args();
    // Keep stdout clean for piping the JSON somewhere
    if !matches!(cmd, Command::DefaultConfig) {
        abstutil::logger::setup();
    }

    match cmd {
        Command::Generate {
            config,
            seed,
            geojson,
            validate,
        } => generate(config, seed, geojson, validate)?,
        Command::DefaultConfig => println!("{}", GeneratorConfig::default().to_json()?),
    }
    Ok(())
}

fn generate(
    config_path: Option<String>,
    seed: Option<u64>,
    geojson: Option<String>,
    validate: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::load(&path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let mut timer = Timer::new(format!("generate city with seed {}", config.seed));
    let city = CityGenerator::new(config)?.generate(&mut timer);
    timer.done();

    for stats in &city.stats {
        if let Some(limit) = stats.tripped {
            warn!("One growth phase stopped early because of the {:?} budget", limit);
        }
    }
    info!(
        "{} blocks: {} downtown, {} arterial, {} residential",
        prettyprint_usize(city.blocks.len()),
        prettyprint_usize(city.count_blocks(BlockKind::Downtown)),
        prettyprint_usize(city.count_blocks(BlockKind::Arterial)),
        prettyprint_usize(city.count_blocks(BlockKind::Residential))
    );

    if validate {
        if let Err(err) = city.network.check_invariants() {
            bail!("The generated network is broken: {}", err);
        }
        info!("The generated network passes all checks");
    }
    if let Some(path) = geojson {
        export::write_geojson(&path, &city)?;
        info!("Wrote {}", path);
    }
    Ok(())
}
