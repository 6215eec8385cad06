use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use geom::Pt2D;

use crate::terrain::{
    DensityField, FlatTerrain, NoiseDensity, NoiseTerrain, RadialDensity, Terrain, UniformDensity,
};
use crate::{AgentConfig, Budget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CityLayout {
    /// A grid downtown, handing off to highways at the edges.
    Manhattan,
    /// Ring roads with spokes.
    Paris,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TerrainConfig {
    Flat,
    Noise { amplitude: f64, frequency: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DensityConfig {
    Uniform { value: f64 },
    /// Falls off from the city center, reaching 0 at `radius`.
    Radial { radius: f64 },
    Noise { frequency: f32 },
}

/// Everything needed to generate a city. Missing fields in a JSON file get the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub width: f64,
    pub height: f64,
    pub city: CityLayout,
    /// Size of the initial grid, or the radius of the outermost ring.
    pub seed_radius: f64,
    pub highway: AgentConfig,
    pub street: AgentConfig,
    pub manhattan: AgentConfig,
    pub paris_rings: usize,
    pub budget: Budget,
    /// Faces bigger than this aren't blocks.
    pub max_block_area: f64,
    pub terrain: TerrainConfig,
    pub density: DensityConfig,
    /// After the main roads are done, fill in with streets.
    pub grow_streets: bool,
}

impl Default for GeneratorConfig {
    fn default() -> GeneratorConfig {
        GeneratorConfig {
            seed: 42,
            width: 2000.0,
            height: 2000.0,
            city: CityLayout::Manhattan,
            seed_radius: 150.0,
            highway: AgentConfig::highway(),
            street: AgentConfig::street(),
            manhattan: AgentConfig::manhattan(),
            paris_rings: 3,
            budget: Budget::default(),
            max_block_area: 250_000.0,
            terrain: TerrainConfig::Noise {
                amplitude: 40.0,
                frequency: 0.002,
            },
            density: DensityConfig::Radial { radius: 1200.0 },
            grow_streets: true,
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &str) -> Result<GeneratorConfig> {
        let raw = fs_err::read_to_string(path)?;
        let config: GeneratorConfig =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
        config
            .validate()
            .with_context(|| format!("checking {}", path))?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width > 0.0 && self.height > 0.0) {
            bail!("The map must have a positive size, not {}x{}", self.width, self.height);
        }
        if !(self.seed_radius > 0.0) {
            bail!("seed_radius must be positive, not {}", self.seed_radius);
        }
        if self.city == CityLayout::Paris && self.paris_rings == 0 {
            bail!("A Paris city needs at least one ring");
        }
        if !(self.max_block_area > 0.0) {
            bail!("max_block_area must be positive, not {}", self.max_block_area);
        }
        if self.budget.max_total_steps == 0
            || self.budget.max_agents == 0
            || self.budget.max_nodes == 0
        {
            bail!("Every budget must be positive: {:?}", self.budget);
        }
        for (name, agent) in [
            ("highway", &self.highway),
            ("street", &self.street),
            ("manhattan", &self.manhattan),
        ] {
            validate_agent(agent).with_context(|| format!("{} agents", name))?;
        }
        match self.terrain {
            TerrainConfig::Flat => {}
            TerrainConfig::Noise {
                amplitude,
                frequency,
            } => {
                if !(amplitude >= 0.0) || !(frequency > 0.0) {
                    bail!(
                        "Terrain noise needs a non-negative amplitude and positive frequency, not \
                         {} and {}",
                        amplitude,
                        frequency
                    );
                }
            }
        }
        match self.density {
            DensityConfig::Uniform { value } => {
                if !(0.0..=1.0).contains(&value) {
                    bail!("Uniform density must be in [0, 1], not {}", value);
                }
            }
            DensityConfig::Radial { radius } => {
                if !(radius > 0.0) {
                    bail!("Density radius must be positive, not {}", radius);
                }
            }
            DensityConfig::Noise { frequency } => {
                if !(frequency > 0.0) {
                    bail!("Density noise frequency must be positive, not {}", frequency);
                }
            }
        }
        Ok(())
    }

    pub fn center(&self) -> Pt2D {
        Pt2D::new(self.width / 2.0, self.height / 2.0)
    }

    /// fastnoise-lite wants an i32 seed.
    fn noise_seed(&self) -> i32 {
        (self.seed & 0x7fff_ffff) as i32
    }

    pub fn make_terrain(&self) -> Box<dyn Terrain> {
        match self.terrain {
            TerrainConfig::Flat => Box::new(FlatTerrain { height: 0.0 }),
            TerrainConfig::Noise {
                amplitude,
                frequency,
            } => Box::new(NoiseTerrain::new(self.noise_seed(), amplitude, frequency)),
        }
    }

    pub fn make_density(&self) -> Box<dyn DensityField> {
        match self.density {
            DensityConfig::Uniform { value } => Box::new(UniformDensity { value }),
            DensityConfig::Radial { radius } => Box::new(RadialDensity {
                centers: vec![self.center()],
                radius,
            }),
            // Different from the terrain noise
            DensityConfig::Noise { frequency } => Box::new(NoiseDensity::new(
                self.noise_seed().wrapping_add(1),
                frequency,
            )),
        }
    }
}

fn validate_agent(agent: &AgentConfig) -> Result<()> {
    if !(agent.step_size > 0.0) {
        bail!("step_size must be positive, not {}", agent.step_size);
    }
    if !(agent.snap_radius >= 0.0) {
        bail!("snap_radius can't be negative, not {}", agent.snap_radius);
    }
    if agent.snap_radius >= agent.step_size {
        bail!(
            "snap_radius {} must be smaller than step_size {}, or agents never move",
            agent.snap_radius,
            agent.step_size
        );
    }
    if !(0.0..=1.0).contains(&agent.branch_probability) {
        bail!(
            "branch_probability must be in [0, 1], not {}",
            agent.branch_probability
        );
    }
    if !(agent.max_turn_degrees >= 0.0) {
        bail!(
            "max_turn_degrees can't be negative, not {}",
            agent.max_turn_degrees
        );
    }
    Ok(())
}
