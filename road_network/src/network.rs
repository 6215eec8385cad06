use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

use geom::{Bounds, Line, Pt2D};

use crate::spatial::SpatialIndex;
use crate::terrain::{DensityField, FlatTerrain, Terrain, UniformDensity};
use crate::{ConnectionType, Edge, EdgeID, Node, NodeID, NodeType};

/// The road graph being grown: nodes, the edges between them, and a spatial index kept in sync
/// with every change. All mutation goes through the methods here, which re-index every node whose
/// connections changed before returning, so the graph is consistent between any two calls.
pub struct RoadNetwork {
    nodes: BTreeMap<NodeID, Node>,
    edges: BTreeMap<EdgeID, Edge>,
    index: SpatialIndex,
    bounds: Bounds,
    terrain: Box<dyn Terrain>,
    density: Box<dyn DensityField>,
    next_node: usize,
    next_edge: usize,
}

impl RoadNetwork {
    pub fn new(
        width: f64,
        height: f64,
        terrain: Box<dyn Terrain>,
        density: Box<dyn DensityField>,
    ) -> RoadNetwork {
        RoadNetwork {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            index: SpatialIndex::new(),
            bounds: Bounds::from_size(width, height),
            terrain,
            density,
            next_node: 0,
            next_edge: 0,
        }
    }

    /// Flat ground and uniform density. Handy for tests.
    pub fn flat(width: f64, height: f64) -> RoadNetwork {
        RoadNetwork::new(
            width,
            height,
            Box::new(FlatTerrain { height: 0.0 }),
            Box::new(UniformDensity { value: 0.5 }),
        )
    }

    pub fn get_n(&self, id: NodeID) -> &Node {
        match self.nodes.get(&id) {
            Some(n) => n,
            None => panic!("{} doesn't exist", id),
        }
    }

    fn mut_n(&mut self, id: NodeID) -> &mut Node {
        match self.nodes.get_mut(&id) {
            Some(n) => n,
            None => panic!("{} doesn't exist", id),
        }
    }

    pub fn maybe_get_n(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_e(&self, id: EdgeID) -> &Edge {
        match self.edges.get(&id) {
            Some(e) => e,
            None => panic!("{} doesn't exist", id),
        }
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    pub fn density(&self) -> &dyn DensityField {
        self.density.as_ref()
    }

    pub fn edge_line(&self, id: EdgeID) -> Line {
        let e = self.get_e(id);
        Line::new(self.get_n(e.src).pt, self.get_n(e.dst).pt)
    }

    pub fn total_length(&self) -> f64 {
        self.edges.keys().map(|e| self.edge_line(*e).length()).sum()
    }

    /// Add a new node and index it.
    pub fn add_node(&mut self, pt: Pt2D, node_type: NodeType) -> NodeID {
        let id = NodeID(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                pt,
                elevation: self.terrain.height_at(pt.x(), pt.y()),
                node_type,
                edges: Vec::new(),
                added_to_index: true,
            },
        );
        self.index.insert(id, &Bounds::from(&[pt]));
        id
    }

    /// Reuse the closest existing node within `radius` of `pt`, or add a new one.
    pub fn add_node_nearby(&mut self, pt: Pt2D, node_type: NodeType, radius: f64) -> NodeID {
        match self.closest_node(pt, radius) {
            Some(id) => id,
            None => self.add_node(pt, node_type),
        }
    }

    /// The closest node within `radius` of `pt`, by true distance. Ties go to the older node.
    pub fn closest_node(&self, pt: Pt2D, radius: f64) -> Option<NodeID> {
        if radius < 0.0 {
            return None;
        }
        let mut best: Option<(NodeID, f64)> = None;
        for id in self.index.search(&Bounds::around(pt, radius)) {
            let dist = self.get_n(id).pt.dist_to(pt);
            if dist > radius {
                continue;
            }
            if best.map(|(_, d)| dist < d).unwrap_or(true) {
                best = Some((id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Nodes whose envelope (the node plus its neighbors) overlaps `bounds`.
    pub fn search(&self, bounds: &Bounds) -> Vec<NodeID> {
        self.index.search(bounds)
    }

    pub fn find_edge(&self, a: NodeID, b: NodeID) -> Option<EdgeID> {
        self.get_n(a)
            .edges
            .iter()
            .find(|e| self.edges[e].other_endpt(a) == b)
            .cloned()
    }

    pub fn are_connected(&self, a: NodeID, b: NodeID) -> bool {
        self.find_edge(a, b).is_some()
    }

    /// Connect two nodes. Returns false and changes nothing if they're already connected, or if
    /// asked to connect a node to itself.
    pub fn connect(&mut self, a: NodeID, b: NodeID, connection_type: ConnectionType) -> bool {
        if a == b || self.are_connected(a, b) {
            return false;
        }
        let id = EdgeID(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                src: a,
                dst: b,
                connection_type,
            },
        );
        self.mut_n(a).edges.push(id);
        self.mut_n(b).edges.push(id);
        self.reindex(a);
        self.reindex(b);
        true
    }

    /// Remove the edge between two nodes, if there is one. Returns the type the edge had.
    pub fn disconnect(&mut self, a: NodeID, b: NodeID) -> Option<ConnectionType> {
        let id = self.find_edge(a, b)?;
        let edge = self.remove_edge(id);
        Some(edge.connection_type)
    }

    fn remove_edge(&mut self, id: EdgeID) -> Edge {
        let edge = match self.edges.remove(&id) {
            Some(e) => e,
            None => panic!("{} doesn't exist", id),
        };
        for n in [edge.src, edge.dst] {
            self.mut_n(n).edges.retain(|e| *e != id);
            self.reindex(n);
        }
        edge
    }

    /// (neighbor, type) for every edge touching a node.
    pub fn connections(&self, id: NodeID) -> Vec<(NodeID, ConnectionType)> {
        self.get_n(id)
            .edges
            .iter()
            .map(|e| {
                let edge = &self.edges[e];
                (edge.other_endpt(id), edge.connection_type)
            })
            .collect()
    }

    pub fn neighbors(&self, id: NodeID) -> Vec<NodeID> {
        self.connections(id).into_iter().map(|(n, _)| n).collect()
    }

    /// Break an edge in two at `pt`, which should be on or near the edge. Both halves keep the
    /// original type. Returns the new node in the middle.
    pub fn split_edge(&mut self, id: EdgeID, pt: Pt2D, node_type: NodeType) -> NodeID {
        let edge = self.remove_edge(id);
        let middle = self.add_node(pt, node_type);
        self.connect(edge.src, middle, edge.connection_type);
        self.connect(middle, edge.dst, edge.connection_type);
        middle
    }

    /// Disconnect a node from everything and forget it.
    pub fn remove_node(&mut self, id: NodeID) {
        let edges = self.get_n(id).edges.clone();
        for e in edges {
            self.remove_edge(e);
        }
        self.index.remove(id);
        self.nodes.remove(&id);
    }

    /// The bounding box of a node and all of its neighbors.
    pub fn node_envelope(&self, id: NodeID) -> Bounds {
        let mut pts = vec![self.get_n(id).pt];
        for n in self.neighbors(id) {
            pts.push(self.get_n(n).pt);
        }
        Bounds::from(&pts)
    }

    /// Replace a node's index entry after its connections changed.
    pub fn reindex(&mut self, id: NodeID) {
        let envelope = self.node_envelope(id);
        self.index.insert(id, &envelope);
        self.mut_n(id).added_to_index = true;
    }

    /// Bulk load the whole index from scratch.
    pub fn rebuild_index(&mut self) {
        let entries = self
            .nodes
            .keys()
            .map(|id| (*id, self.node_envelope(*id)))
            .collect();
        self.index.rebuild(entries);
        for node in self.nodes.values_mut() {
            node.added_to_index = true;
        }
    }

    /// Every node the index knows about, sorted.
    pub fn indexed_nodes(&self) -> Vec<NodeID> {
        self.index.all()
    }

    /// Check the structural invariants: every edge is listed by exactly its two endpoints, no two
    /// edges join the same pair of nodes, and the spatial index holds exactly the nodes with
    /// up-to-date envelopes.
    pub fn check_invariants(&self) -> Result<()> {
        for edge in self.edges.values() {
            if edge.src == edge.dst {
                bail!("{} loops from {} to itself", edge.id, edge.src);
            }
            for n in [edge.src, edge.dst] {
                match self.nodes.get(&n) {
                    Some(node) => {
                        if node.edges.iter().filter(|e| **e == edge.id).count() != 1 {
                            bail!("{} doesn't list {} exactly once", n, edge.id);
                        }
                    }
                    None => bail!("{} refers to missing {}", edge.id, n),
                }
            }
        }

        for node in self.nodes.values() {
            let mut neighbors = BTreeSet::new();
            for e in &node.edges {
                match self.edges.get(e) {
                    Some(edge) => {
                        if !edge.touches(node.id) {
                            bail!("{} lists {}, which doesn't touch it", node.id, e);
                        }
                        if !neighbors.insert(edge.other_endpt(node.id)) {
                            bail!(
                                "{} has two edges to {}",
                                node.id,
                                edge.other_endpt(node.id)
                            );
                        }
                    }
                    None => bail!("{} lists missing {}", node.id, e),
                }
            }
            if !node.added_to_index {
                bail!("{} was never indexed", node.id);
            }
            match self.index.envelope(node.id) {
                Some(envelope) => {
                    if envelope != self.node_envelope(node.id) {
                        bail!("{} has a stale index envelope", node.id);
                    }
                }
                None => bail!("{} is missing from the index", node.id),
            }
        }

        let indexed = self.index.all();
        if indexed.len() != self.nodes.len() {
            bail!(
                "Index has {} entries, but there are {} nodes",
                indexed.len(),
                self.nodes.len()
            );
        }
        if !indexed.iter().eq(self.nodes.keys()) {
            bail!("Index and node list disagree");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn everywhere() -> Bounds {
        Bounds::from(&[Pt2D::new(-1e6, -1e6), Pt2D::new(1e6, 1e6)])
    }

    #[test]
    fn connections_are_symmetric() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let a = net.add_node(Pt2D::new(0.0, 0.0), NodeType::Street);
        let b = net.add_node(Pt2D::new(10.0, 0.0), NodeType::Street);
        assert!(net.connect(a, b, ConnectionType::Highway));
        assert_eq!(vec![(b, ConnectionType::Highway)], net.connections(a));
        assert_eq!(vec![(a, ConnectionType::Highway)], net.connections(b));

        // Already connected, in either direction
        assert!(!net.connect(a, b, ConnectionType::Street));
        assert!(!net.connect(b, a, ConnectionType::Street));
        assert!(!net.connect(a, a, ConnectionType::Street));
        assert_eq!(1, net.edge_count());
        net.check_invariants().unwrap();
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let a = net.add_node(Pt2D::new(0.0, 0.0), NodeType::Street);
        let b = net.add_node(Pt2D::new(10.0, 0.0), NodeType::Street);
        net.connect(a, b, ConnectionType::Street);

        assert_eq!(Some(ConnectionType::Street), net.disconnect(a, b));
        let after_first = (net.connections(a), net.connections(b), net.indexed_nodes());
        assert_eq!(None, net.disconnect(b, a));
        assert_eq!(
            after_first,
            (net.connections(a), net.connections(b), net.indexed_nodes())
        );
        assert_eq!(Some(Bounds::from(&[Pt2D::new(0.0, 0.0)])), net.index.envelope(a));
        net.check_invariants().unwrap();
    }

    #[test]
    fn nearby_nodes_are_reused() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let a = net.add_node(Pt2D::new(10.0, 10.0), NodeType::Main);
        let b = net.add_node(Pt2D::new(13.0, 10.0), NodeType::Main);
        assert_eq!(a, net.add_node_nearby(Pt2D::new(11.0, 10.0), NodeType::Street, 2.0));
        assert_eq!(b, net.add_node_nearby(Pt2D::new(12.5, 10.0), NodeType::Street, 2.0));
        let c = net.add_node_nearby(Pt2D::new(50.0, 50.0), NodeType::Street, 2.0);
        assert_eq!(3, net.node_count());
        assert_eq!(NodeType::Street, net.get_n(c).node_type);
        // Inside the bounding box, but not within the radius
        assert_eq!(None, net.closest_node(Pt2D::new(11.9, 11.9), 1.5));
    }

    #[test]
    fn split_replaces_the_edge() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let p = net.add_node(Pt2D::new(0.0, 0.0), NodeType::Highway);
        let q = net.add_node(Pt2D::new(30.0, 40.0), NodeType::Highway);
        net.connect(p, q, ConnectionType::Highway);
        let e = net.find_edge(p, q).unwrap();

        let x = net.split_edge(e, Pt2D::new(12.0, 16.0), NodeType::Highway);
        assert!(!net.are_connected(p, q));
        assert_eq!(vec![(x, ConnectionType::Highway)], net.connections(p));
        assert_eq!(vec![(x, ConnectionType::Highway)], net.connections(q));
        assert_eq!(2, net.connections(x).len());
        assert_eq!(2, net.edge_count());

        let px = net.get_n(p).pt.dist_to(net.get_n(x).pt);
        let xq = net.get_n(x).pt.dist_to(net.get_n(q).pt);
        assert!((px + xq - 50.0).abs() < 1e-9);
        net.check_invariants().unwrap();
    }

    #[test]
    fn remove_node_cleans_up() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let a = net.add_node(Pt2D::new(0.0, 0.0), NodeType::Street);
        let b = net.add_node(Pt2D::new(10.0, 0.0), NodeType::Street);
        let c = net.add_node(Pt2D::new(10.0, 10.0), NodeType::Street);
        net.connect(a, b, ConnectionType::Street);
        net.connect(b, c, ConnectionType::Street);
        net.remove_node(b);
        assert_eq!(0, net.edge_count());
        assert_eq!(vec![a, c], net.search(&everywhere()));
        net.check_invariants().unwrap();
    }

    #[test]
    fn index_tracks_random_edits() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        let mut net = RoadNetwork::flat(1000.0, 1000.0);
        let mut ids = Vec::new();
        for _ in 0..40 {
            let pt = Pt2D::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0));
            ids.push(net.add_node(pt, NodeType::Street));
        }
        for _ in 0..300 {
            let a = ids[rng.gen_range(0..ids.len())];
            let b = ids[rng.gen_range(0..ids.len())];
            match rng.gen_range(0..3) {
                0 => {
                    net.connect(a, b, ConnectionType::Street);
                }
                1 => {
                    net.disconnect(a, b);
                }
                _ => {
                    if let Some(e) = net.find_edge(a, b) {
                        let pt = net.edge_line(e).percent_along(rng.gen_range(0.1..0.9));
                        ids.push(net.split_edge(e, pt, NodeType::Street));
                    }
                }
            }
            net.check_invariants().unwrap();
        }

        let found = net.search(&everywhere());
        let expected: Vec<NodeID> = net.all_nodes().map(|n| n.id).collect();
        assert_eq!(expected, found);

        // A bulk rebuild agrees with the incremental index
        net.rebuild_index();
        net.check_invariants().unwrap();
        assert_eq!(expected, net.search(&everywhere()));
    }
}
