//! Seed the first agents of a city. Each factory queues agents on an `AgentEngine` and returns how
//! many it added.

use std::rc::Rc;

use geom::{Angle, Pt2D};

use crate::strategy::{
    HighwayData, HighwayStrategy, ManhattanData, ManhattanStrategy, ParisData, ParisStrategy,
    StreetStrategy,
};
use crate::{Agent, AgentEngine, ConnectionType, GeneratorConfig, NodeID, RoadNetwork};

const MANHATTAN_PRIORITY: f64 = 3.0;
const HIGHWAY_PRIORITY: f64 = 2.0;
const PARIS_PRIORITY: f64 = 2.5;
const STREET_PRIORITY: f64 = 0.0;
/// Highways spawned by the grid turn into streets this often when they branch.
const STREET_SHARE: f64 = 0.7;
const HANDOFF_PROBABILITY: f64 = 0.5;
const PARIS_SPOKES: usize = 6;

/// A downtown grid growing outwards from a square of side `2 * radius` around `origin`. Agents
/// start at the origin and at each corner of the square, heading along both axes.
pub fn manhattan_city(
    engine: &mut AgentEngine,
    origin: Pt2D,
    radius: f64,
    cfg: &GeneratorConfig,
) -> usize {
    let data = ManhattanData {
        highway: cfg.highway.clone(),
        street: cfg.street.clone(),
        handoff_probability: HANDOFF_PROBABILITY,
    };
    let strategy: Rc<ManhattanStrategy> = Rc::new(ManhattanStrategy);

    let mut seeds = Vec::new();
    for degrees in [0.0, 90.0, 180.0, 270.0] {
        seeds.push((origin, degrees));
    }
    for (dx, dy) in [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
        let corner = origin.offset(dx * radius, dy * radius);
        // Head away from the origin along both axes
        let horizontal = if dx > 0.0 { 0.0 } else { 180.0 };
        let vertical = if dy > 0.0 { 90.0 } else { 270.0 };
        seeds.push((corner, horizontal));
        seeds.push((corner, vertical));
    }

    let mut added = 0;
    for (pt, degrees) in seeds {
        let id = engine.new_agent_id();
        let agent = Agent::new(
            id,
            pt,
            Angle::degrees(degrees),
            cfg.manhattan.clone(),
            strategy.clone(),
        )
        .with_priority(MANHATTAN_PRIORITY)
        .with_data(data.clone());
        if engine.add_agent(agent) {
            added += 1;
        }
    }
    info!("Seeded a grid city with {} agents around {}", added, origin);
    added
}

/// Concentric ring roads around `origin`, the outermost at `radius`, plus highway spokes leading
/// out of the center.
pub fn paris_city(
    engine: &mut AgentEngine,
    origin: Pt2D,
    radius: f64,
    rings: usize,
    cfg: &GeneratorConfig,
) -> usize {
    let ring_strategy: Rc<ParisStrategy> = Rc::new(ParisStrategy);
    let mut added = 0;
    for ring in 1..=rings {
        let ring_radius = radius * (ring as f64) / (rings as f64);
        let start_degrees = 0.0;
        let id = engine.new_agent_id();
        let mut config = cfg.street.clone();
        config.node_type = cfg.highway.node_type;
        config.connection_type = cfg.highway.connection_type;
        // The ring ends by closing on itself, not by counting steps
        config.max_step_count = 0;
        let agent = Agent::new(
            id,
            origin.project_away(ring_radius, Angle::degrees(start_degrees)),
            Angle::degrees(start_degrees + 90.0),
            config,
            ring_strategy.clone(),
        )
        .with_priority(PARIS_PRIORITY)
        .with_data(ParisData {
            center: origin,
            radius: ring_radius,
            start_degrees,
            swept_degrees: 0.0,
            street: cfg.street.clone(),
        });
        if engine.add_agent(agent) {
            added += 1;
        }
    }

    let spoke_strategy: Rc<HighwayStrategy> = Rc::new(HighwayStrategy);
    for i in 0..PARIS_SPOKES {
        let id = engine.new_agent_id();
        // Offset from the rings' starting points, so spokes don't begin on top of ring nodes
        let degrees = 30.0 + 360.0 * (i as f64) / (PARIS_SPOKES as f64);
        let agent = Agent::new(
            id,
            origin,
            Angle::degrees(degrees),
            cfg.highway.clone(),
            spoke_strategy.clone(),
        )
        .with_priority(HIGHWAY_PRIORITY)
        .with_data(HighwayData {
            street: cfg.street.clone(),
            street_share: STREET_SHARE,
        });
        if engine.add_agent(agent) {
            added += 1;
        }
    }
    info!(
        "Seeded a ring city with {} rings and {} agents around {}",
        rings, added, origin
    );
    added
}

/// Fill in the gaps between the big roads: split every long enough main road or highway in the
/// middle, and send a street off to each side from there.
pub fn streets(engine: &mut AgentEngine, map: &mut RoadNetwork, cfg: &GeneratorConfig) -> usize {
    let min_length = 2.0 * cfg.street.step_size;
    let candidates: Vec<(NodeID, NodeID)> = map
        .all_edges()
        .filter(|e| {
            matches!(
                e.connection_type,
                ConnectionType::Main | ConnectionType::Highway
            )
        })
        .filter(|e| map.edge_line(e.id).length() >= min_length)
        .map(|e| (e.src, e.dst))
        .collect();

    let strategy: Rc<StreetStrategy> = Rc::new(StreetStrategy);
    let mut added = 0;
    for (src, dst) in candidates {
        // An earlier split might have already replaced this edge
        let e = match map.find_edge(src, dst) {
            Some(e) => e,
            None => continue,
        };
        let line = map.edge_line(e);
        let node_type = map.get_e(e).connection_type.node_type();
        let middle = map.split_edge(e, line.middle(), node_type);
        for turn in [90.0, -90.0] {
            let id = engine.new_agent_id();
            let agent = Agent::new(
                id,
                line.middle(),
                line.angle().rotate_degs(turn),
                cfg.street.clone(),
                strategy.clone(),
            )
            .with_priority(STREET_PRIORITY)
            .starting_from(middle);
            if engine.add_agent(agent) {
                added += 1;
            }
        }
    }
    info!("Seeded {} street agents", added);
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Budget;

    #[test]
    fn grid_seeds() {
        let mut engine = AgentEngine::new(1, Budget::default());
        let cfg = GeneratorConfig::default();
        assert_eq!(12, manhattan_city(&mut engine, Pt2D::new(500.0, 500.0), 50.0, &cfg));
        assert_eq!(12, engine.num_queued());
        assert_eq!("manhattan", engine.peek().unwrap().strategy().name());
    }

    #[test]
    fn ring_seeds() {
        let mut engine = AgentEngine::new(1, Budget::default());
        let cfg = GeneratorConfig::default();
        assert_eq!(
            3 + PARIS_SPOKES,
            paris_city(&mut engine, Pt2D::new(500.0, 500.0), 300.0, 3, &cfg)
        );
        // Rings outrank the spokes
        assert_eq!("paris", engine.peek().unwrap().strategy().name());
    }

    #[test]
    fn streets_leave_long_roads() {
        let mut map = RoadNetwork::flat(1000.0, 1000.0);
        let a = map.add_node(Pt2D::new(100.0, 500.0), crate::NodeType::Highway);
        let b = map.add_node(Pt2D::new(900.0, 500.0), crate::NodeType::Highway);
        let c = map.add_node(Pt2D::new(900.0, 505.0), crate::NodeType::Street);
        map.connect(a, b, ConnectionType::Highway);
        // Too short, and the wrong type
        map.connect(b, c, ConnectionType::Street);

        let mut engine = AgentEngine::new(1, Budget::default());
        let cfg = GeneratorConfig::default();
        assert_eq!(2, streets(&mut engine, &mut map, &cfg));
        assert_eq!(4, map.node_count());
        assert!(!map.are_connected(a, b));
        let start = engine.peek().unwrap();
        assert!(start.prev_node.is_some());
        assert!(start.pos.approx_eq(Pt2D::new(500.0, 500.0), 1e-9));
        map.check_invariants().unwrap();
    }
}
