use anyhow::Result;

use abstutil::{prettyprint_usize, Timer};

use crate::factory::{manhattan_city, paris_city, streets};
use crate::{extract_blocks, AgentEngine, Block, CityLayout, EngineStats, GeneratorConfig};
use crate::{BlockKind, RoadNetwork};

/// A finished city.
pub struct City {
    pub network: RoadNetwork,
    pub blocks: Vec<Block>,
    /// From the main roads, then the streets, if they were grown.
    pub stats: Vec<EngineStats>,
}

impl City {
    pub fn count_blocks(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| b.kind == kind).count()
    }
}

pub struct CityGenerator {
    config: GeneratorConfig,
}

impl CityGenerator {
    pub fn new(config: GeneratorConfig) -> Result<CityGenerator> {
        config.validate()?;
        Ok(CityGenerator { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Grow the roads and find the blocks between them. The same config always produces the same
    /// city.
    pub fn generate(&self, timer: &mut Timer) -> City {
        let cfg = &self.config;
        timer.start("terrain");
        let mut network = RoadNetwork::new(
            cfg.width,
            cfg.height,
            cfg.make_terrain(),
            cfg.make_density(),
        );
        timer.stop("terrain");

        timer.start("grow roads");
        let mut stats = Vec::new();
        let mut engine = AgentEngine::new(cfg.seed, cfg.budget.clone());
        let seeded = match cfg.city {
            CityLayout::Manhattan => {
                manhattan_city(&mut engine, cfg.center(), cfg.seed_radius, cfg)
            }
            CityLayout::Paris => paris_city(
                &mut engine,
                cfg.center(),
                cfg.seed_radius,
                cfg.paris_rings,
                cfg,
            ),
        };
        timer.note(format!("{} seed agents", seeded));
        stats.push(engine.run_to_completion(&mut network));
        timer.stop("grow roads");

        if cfg.grow_streets {
            timer.start("grow streets");
            // Same seed, different stream
            let mut engine = AgentEngine::new(cfg.seed.wrapping_add(1), cfg.budget.clone());
            streets(&mut engine, &mut network, cfg);
            stats.push(engine.run_to_completion(&mut network));
            timer.stop("grow streets");
        }

        timer.start("extract blocks");
        let blocks = extract_blocks(&network, cfg.max_block_area);
        timer.stop("extract blocks");

        info!(
            "Generated {} nodes, {} edges ({:.1}km of road) and {} blocks",
            prettyprint_usize(network.node_count()),
            prettyprint_usize(network.edge_count()),
            network.total_length() / 1000.0,
            prettyprint_usize(blocks.len())
        );
        if let Err(err) = network.check_invariants() {
            warn!("Generated network is broken: {}", err);
        }
        City {
            network,
            blocks,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Budget, DensityConfig, TerrainConfig};

    fn small_config(seed: u64, city: CityLayout) -> GeneratorConfig {
        GeneratorConfig {
            seed,
            width: 800.0,
            height: 800.0,
            city,
            seed_radius: 100.0,
            budget: Budget {
                max_total_steps: 3000,
                max_agents: 300,
                max_nodes: 1500,
            },
            terrain: TerrainConfig::Flat,
            density: DensityConfig::Radial { radius: 600.0 },
            ..GeneratorConfig::default()
        }
    }

    fn fingerprint(city: &City) -> (Vec<(usize, usize)>, Vec<Vec<geom::Pt2D>>) {
        let edges = city
            .network
            .all_edges()
            .map(|e| (e.src.0, e.dst.0))
            .collect();
        let blocks = city.blocks.iter().map(|b| b.pts.clone()).collect();
        (edges, blocks)
    }

    #[test]
    fn same_seed_same_city() {
        for layout in [CityLayout::Manhattan, CityLayout::Paris] {
            let generator = CityGenerator::new(small_config(3, layout)).unwrap();
            let a = generator.generate(&mut Timer::throwaway());
            let b = generator.generate(&mut Timer::throwaway());
            assert_eq!(fingerprint(&a), fingerprint(&b));
            assert!(a.network.edge_count() > 0);
            a.network.check_invariants().unwrap();
        }
    }

    #[test]
    fn generated_blocks_are_sane() {
        let config = small_config(5, CityLayout::Manhattan);
        let max_area = config.max_block_area;
        let city = CityGenerator::new(config)
            .unwrap()
            .generate(&mut Timer::throwaway());
        for block in &city.blocks {
            assert!(block.pts.len() >= 3);
            assert!(block.area() > 0.0);
            assert!(block.area() <= max_area);
            assert!(block.polygon().is_simple());
        }
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut config = small_config(1, CityLayout::Manhattan);
        config.width = -5.0;
        assert!(CityGenerator::new(config).is_err());
    }
}
