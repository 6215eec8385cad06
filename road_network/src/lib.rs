//! Grow a city's road network with agents, then find the blocks between the roads.
//!
//! Agents each carry a `Strategy` and take turns stepping through an `AgentEngine`. Every road
//! they lay down goes through `RoadNetwork::connect_with_intersection_handling`, which snaps to
//! nearby nodes and splits crossed roads, keeping the graph planar. `extract_blocks` then walks the
//! faces of the finished graph.

#[macro_use]
extern crate log;

mod agent;
mod blocks;
mod config;
mod engine;
pub mod factory;
mod generator;
mod network;
mod node;
mod resolver;
mod spatial;
pub mod strategy;
pub mod terrain;

pub use crate::agent::{
    Agent, AgentConfig, AgentData, AgentDataImpl, AgentID, GrowthCtx, Placement,
};
pub use crate::blocks::{extract_blocks, Block, BlockKind};
pub use crate::config::{CityLayout, DensityConfig, GeneratorConfig, TerrainConfig};
pub use crate::engine::{AgentEngine, Budget, BudgetLimit, EngineStats};
pub use crate::generator::{City, CityGenerator};
pub use crate::network::RoadNetwork;
pub use crate::node::{ConnectionType, Edge, EdgeID, Node, NodeID, NodeType};
pub use crate::resolver::{ConnectionResult, MERGE_ANGLE_DEGREES};
pub use crate::spatial::SpatialIndex;
