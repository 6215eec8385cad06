use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use abstutil::wraparound_get;
use geom::{Polygon, Pt2D, EPSILON_DIST};

use crate::{ConnectionType, NodeID, RoadNetwork};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKind {
    /// Some side is a main road.
    Downtown,
    /// Some side is a highway, but none is a main road.
    Arterial,
    Residential,
}

/// The area enclosed by a loop of roads.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// The perimeter, clockwise, without repeating the first point at the end.
    pub pts: Vec<Pt2D>,
    pub kind: BlockKind,
}

impl Block {
    pub fn polygon(&self) -> Polygon {
        Polygon::new(self.pts.clone())
    }

    pub fn area(&self) -> f64 {
        self.polygon().area()
    }
}

/// Find every block enclosed by roads. Each directed edge is walked once; a walk always takes the
/// rightmost turn, so it traces a face clockwise, with the face on the right. The unbounded face
/// around everything is traced counter-clockwise and skipped, along with anything bigger than
/// `max_block_area`.
pub fn extract_blocks(map: &RoadNetwork, max_block_area: f64) -> Vec<Block> {
    let mut visited: BTreeSet<(NodeID, NodeID)> = BTreeSet::new();
    let mut blocks = Vec::new();
    let mut bad_loops = 0;
    for node in map.all_nodes() {
        let mut neighbors = map.neighbors(node.id);
        neighbors.sort();
        for next in neighbors {
            if visited.contains(&(node.id, next)) {
                continue;
            }
            match walk(map, node.id, next, &mut visited) {
                Some(ring) => {
                    if let Some(block) = make_block(map, ring, max_block_area) {
                        blocks.push(block);
                    }
                }
                None => {
                    bad_loops += 1;
                }
            }
        }
    }
    debug!(
        "Found {} blocks, discarded {} bad loops",
        blocks.len(),
        bad_loops
    );
    blocks
}

/// Walk from the directed edge `from -> to`, always turning rightmost. Returns the nodes visited
/// if the walk gets back to the starting edge. Running into any other edge already walked makes
/// a bad loop, which is dropped.
fn walk(
    map: &RoadNetwork,
    from: NodeID,
    to: NodeID,
    visited: &mut BTreeSet<(NodeID, NodeID)>,
) -> Option<Vec<NodeID>> {
    let start = (from, to);
    visited.insert(start);
    let mut ring = vec![from];
    let mut prev = from;
    let mut current = to;
    // Every directed edge can be walked at most once
    for _ in 0..=2 * map.edge_count() {
        let next = rightmost_turn(map, prev, current);
        if (current, next) == start {
            ring.push(current);
            return Some(ring);
        }
        if !visited.insert((current, next)) {
            debug!(
                "Bad loop starting at {} -> {} ran into {} -> {}",
                from, to, current, next
            );
            return None;
        }
        ring.push(current);
        prev = current;
        current = next;
    }
    debug!("Walk from {} -> {} never ended", from, to);
    None
}

/// At `current`, having arrived from `prev`, pick the outgoing edge turning furthest right. Only
/// go back the way we came at a dead end.
fn rightmost_turn(map: &RoadNetwork, prev: NodeID, current: NodeID) -> NodeID {
    let pt = map.get_n(current).pt;
    let heading = map.get_n(prev).pt.angle_to(pt);
    map.neighbors(current)
        .into_iter()
        .filter(|n| *n != prev)
        .min_by_key(|n| {
            let turn = heading.shortest_rotation_towards(pt.angle_to(map.get_n(*n).pt));
            (OrderedFloat(turn), *n)
        })
        .unwrap_or(prev)
}

fn make_block(map: &RoadNetwork, ring: Vec<NodeID>, max_block_area: f64) -> Option<Block> {
    let ring = strip_spurs(ring);
    if ring.len() < 3 {
        return None;
    }
    let polygon = Polygon::new(ring.iter().map(|n| map.get_n(*n).pt).collect());
    // The outside of everything
    if !polygon.is_clockwise() {
        return None;
    }
    let area = polygon.area();
    if area <= EPSILON_DIST || area > max_block_area {
        return None;
    }
    if !polygon.is_simple() {
        debug!("Skipping a block that crosses itself, around {}", polygon.center());
        return None;
    }

    let best = (0..ring.len())
        .filter_map(|i| {
            let a = ring[i];
            let b = *wraparound_get(&ring, (i + 1) as isize);
            map.find_edge(a, b).map(|e| map.get_e(e).connection_type)
        })
        .max_by_key(|ct| ct.rank())
        .unwrap_or(ConnectionType::None);
    let kind = match best {
        ConnectionType::Main => BlockKind::Downtown,
        ConnectionType::Highway => BlockKind::Arterial,
        _ => BlockKind::Residential,
    };
    Some(Block {
        pts: polygon.into_points(),
        kind,
    })
}

/// A walk into a dead end comes straight back out, visiting `a, b, a`. Drop the detour, and any
/// repeated nodes left behind.
fn strip_spurs(mut ring: Vec<NodeID>) -> Vec<NodeID> {
    loop {
        ring.dedup();
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return ring;
        }
        let len = ring.len() as isize;
        match (0..len).find(|i| wraparound_get(&ring, i - 1) == wraparound_get(&ring, i + 1)) {
            Some(tip) => {
                ring.remove(tip as usize);
            }
            None => return ring,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::NodeType;

    fn grid(map: &mut RoadNetwork, n: usize, spacing: f64, ct: ConnectionType) -> Vec<NodeID> {
        let mut ids = Vec::new();
        for y in 0..n {
            for x in 0..n {
                let pt = Pt2D::new(x as f64 * spacing, y as f64 * spacing);
                ids.push(map.add_node(pt, NodeType::Street));
            }
        }
        for y in 0..n {
            for x in 0..n {
                if x + 1 < n {
                    map.connect(ids[y * n + x], ids[y * n + x + 1], ct);
                }
                if y + 1 < n {
                    map.connect(ids[y * n + x], ids[(y + 1) * n + x], ct);
                }
            }
        }
        ids
    }

    #[test]
    fn one_square() {
        let mut map = RoadNetwork::flat(100.0, 100.0);
        grid(&mut map, 2, 10.0, ConnectionType::Street);
        let blocks = extract_blocks(&map, 1e6);
        assert_eq!(1, blocks.len());
        assert_eq!(4, blocks[0].pts.len());
        assert!((blocks[0].area() - 100.0).abs() < 1e-9);
        assert_eq!(BlockKind::Residential, blocks[0].kind);
        for pt in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            assert!(blocks[0].pts.contains(&Pt2D::new(pt.0, pt.1)));
        }
    }

    #[test]
    fn dead_ends_inside_a_block() {
        let mut map = RoadNetwork::flat(100.0, 100.0);
        let ids = grid(&mut map, 2, 10.0, ConnectionType::Highway);
        let spur = map.add_node(Pt2D::new(5.0, 5.0), NodeType::Street);
        map.connect(ids[0], spur, ConnectionType::Street);
        // A dangling road with nothing around it
        let a = map.add_node(Pt2D::new(50.0, 50.0), NodeType::Street);
        let b = map.add_node(Pt2D::new(60.0, 50.0), NodeType::Street);
        map.connect(a, b, ConnectionType::Street);

        let blocks = extract_blocks(&map, 1e6);
        assert_eq!(1, blocks.len());
        assert_eq!(4, blocks[0].pts.len());
        assert!((blocks[0].area() - 100.0).abs() < 1e-9);
        assert_eq!(BlockKind::Arterial, blocks[0].kind);
    }

    #[test]
    fn grid_blocks() {
        let mut map = RoadNetwork::flat(100.0, 100.0);
        let ids = grid(&mut map, 4, 10.0, ConnectionType::Street);
        // One main road along the bottom
        map.disconnect(ids[0], ids[1]);
        map.connect(ids[0], ids[1], ConnectionType::Main);

        let blocks = extract_blocks(&map, 1e6);
        assert_eq!(9, blocks.len());
        for block in &blocks {
            assert!((block.area() - 100.0).abs() < 1e-9);
            assert!(block.polygon().is_simple());
        }
        let downtown = blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Downtown)
            .count();
        assert_eq!(1, downtown);

        // Every block is over this limit
        assert!(extract_blocks(&map, 50.0).is_empty());
    }

    #[test]
    fn random_networks_make_sane_blocks() {
        let mut rng = XorShiftRng::seed_from_u64(17);
        for _ in 0..5 {
            let mut map = RoadNetwork::flat(500.0, 500.0);
            let ids = grid(&mut map, 6, 50.0, ConnectionType::Street);
            // Knock out some roads, and poke in some dead ends
            for _ in 0..15 {
                let a = ids[rng.gen_range(0..ids.len())];
                let b = ids[rng.gen_range(0..ids.len())];
                map.disconnect(a, b);
            }
            for _ in 0..5 {
                let from = ids[rng.gen_range(0..ids.len())];
                let pt = map.get_n(from).pt.offset(rng.gen_range(5.0..20.0), 7.0);
                let spur = map.add_node(pt, NodeType::Street);
                map.connect(from, spur, ConnectionType::Street);
            }

            let blocks = extract_blocks(&map, 1e9);
            let total: f64 = blocks.iter().map(|b| b.area()).sum();
            assert!(total <= 250.0 * 250.0 + 1e-6);
            for block in blocks {
                assert!(block.pts.len() >= 3);
                assert!(block.area() > 0.0);
                assert!(block.polygon().is_simple());
                assert!(block.polygon().is_clockwise());
            }
        }
    }

    #[test]
    fn spurs_are_stripped() {
        let ids: Vec<NodeID> = [0, 1, 2, 3, 2, 4, 0].iter().map(|i| NodeID(*i)).collect();
        assert_eq!(
            vec![NodeID(0), NodeID(1), NodeID(2), NodeID(4)],
            strip_spurs(ids)
        );
        let ids: Vec<NodeID> = [5, 0, 1, 2, 0].iter().map(|i| NodeID(*i)).collect();
        assert_eq!(vec![NodeID(0), NodeID(1), NodeID(2)], strip_spurs(ids));
    }
}
