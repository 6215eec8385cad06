use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use geom::{Angle, Line, Pt2D, EPSILON_DIST};

use crate::{ConnectionType, EdgeID, NodeID, NodeType, RoadNetwork};

/// A new road this close in angle to an existing road leaving the same node is merged into it.
pub const MERGE_ANGLE_DEGREES: f64 = 20.0;
// Keeps the merge threshold exclusive, even after the rounding in computing angles.
const ANGLE_EPSILON: f64 = 1e-6;

/// The outcome of `connect_with_intersection_handling`. Exactly one of the three flags is set,
/// with two exceptions where all three are false: a non-finite target, which changes nothing and
/// returns `node1` as `node`, and a direct connection that `RoadNetwork::connect` refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionResult {
    /// A new road was built straight to the requested point.
    pub success: bool,
    /// The new road ran into an existing one, which was split at the crossing.
    pub did_intersect: bool,
    /// An existing node was used instead of the requested point.
    pub did_snap: bool,
    /// The node to carry on from. Not necessarily at the requested point.
    pub node: NodeID,
}

impl ConnectionResult {
    fn connected(node: NodeID, success: bool) -> ConnectionResult {
        ConnectionResult {
            success,
            did_intersect: false,
            did_snap: false,
            node,
        }
    }

    fn intersected(node: NodeID) -> ConnectionResult {
        ConnectionResult {
            success: false,
            did_intersect: true,
            did_snap: false,
            node,
        }
    }

    fn snapped(node: NodeID) -> ConnectionResult {
        ConnectionResult {
            success: false,
            did_intersect: false,
            did_snap: true,
            node,
        }
    }

    fn failed(node: NodeID) -> ConnectionResult {
        ConnectionResult::connected(node, false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HitKind {
    /// The new road crosses an existing one.
    Intersection,
    /// The new road stops just short of an existing one, and should be extended to meet it.
    Extension,
    /// The new road ends near an existing one, without crossing it.
    Projection,
}

#[derive(Clone, Copy, Debug)]
struct Hit {
    pt: Pt2D,
    edge: EdgeID,
    kind: HitKind,
    /// From the node the new road starts at
    dist: f64,
}

impl RoadNetwork {
    /// Try to build a road from an existing node towards `target`, which isn't part of the graph
    /// yet. Rather than create near-duplicate geometry, this may stop at an existing road and
    /// split it, or reuse an existing node. Checks happen in this order, and the order matters:
    ///
    /// 1. `target` is within `snap_radius` of `node1`: nothing happens, snap to `node1`.
    /// 2. Gather every node whose envelope is near the new road.
    /// 3. Test the new road as a ray against every edge of those nodes. Record crossings, near
    ///    misses just past the end of the new road, and projections of `target` onto nearby
    ///    edges.
    /// 4. The crossing closest to `node1` wins. Projections are only considered if no near miss
    ///    was found.
    /// 5. If there's a crossing, but an existing road from `node1` heads nearly the same way,
    ///    snap to the end of that road instead.
    /// 6. Snap to any node lying within `snap_radius` of the new road, if it's already a
    ///    neighbor of `node1` or closer to `node1` than anything found so far.
    /// 7. Otherwise snap to whatever node is near the final endpoint.
    /// 8. If there's still a crossing, split the crossed edge and connect to the new node there.
    /// 9. Before building a brand new node at `target`, check the roads already leaving `node1`:
    ///    reuse a neighbor near `target`, or split one of those roads if `target` is just beside
    ///    it (using `node1`'s type).
    /// 10. Otherwise, add a node at `target` and connect to it.
    pub fn connect_with_intersection_handling(
        &mut self,
        node1: NodeID,
        target: Pt2D,
        node_type: NodeType,
        snap_radius: f64,
        connection_type: ConnectionType,
    ) -> ConnectionResult {
        let p1 = self.get_n(node1).pt;
        if !target.is_valid() {
            warn!("Can't connect {} to {}", node1, target);
            return ConnectionResult::failed(node1);
        }
        if p1.dist_to(target) <= snap_radius {
            return ConnectionResult::snapped(node1);
        }
        let snap_radius = snap_radius.max(0.0);
        let candidate = Line::new(p1, target);

        let mut envelope = candidate.get_bounds();
        envelope.expand(snap_radius);
        let mut nearby: Vec<NodeID> = self
            .search(&envelope)
            .into_iter()
            .filter(|id| *id != node1)
            .collect();
        nearby.sort_by_key(|id| (OrderedFloat(self.get_n(*id).pt.dist_to(p1)), *id));

        let primary = pick_primary(self.find_hits(node1, &candidate, &nearby, snap_radius));

        let mut snap: Option<(NodeID, f64)> = None;
        if primary.is_some() {
            snap = self.parallel_neighbor(node1, candidate.angle());
        }

        // Perpendicular distance to the new road
        let mut best_dist = match (snap, primary) {
            (Some((_, dist)), _) => dist,
            (None, Some(hit)) => hit.dist,
            (None, None) => f64::INFINITY,
        };
        for id in &nearby {
            let pt = self.get_n(*id).pt;
            let off_road = match candidate.project_pt(pt, false) {
                Some(proj) => proj.dist_to(pt),
                // Only look past the far end; nodes behind node1 don't count.
                None if pt.dist_to(target) < pt.dist_to(p1) => pt.dist_to(target),
                None => continue,
            };
            if off_road > snap_radius {
                continue;
            }
            let dist = pt.dist_to(p1);
            if self.are_connected(node1, *id) || dist < best_dist {
                snap = Some((*id, dist));
                best_dist = dist;
            }
        }

        if snap.is_none() {
            let final_target = primary.map(|hit| hit.pt).unwrap_or(target);
            if let Some(hit) = primary {
                // The crossing is right next to where we started
                if hit.dist <= snap_radius {
                    return ConnectionResult::snapped(node1);
                }
            }
            snap = nearby
                .iter()
                .map(|id| (*id, self.get_n(*id).pt.dist_to(final_target)))
                .filter(|(_, dist)| *dist <= snap_radius)
                .min_by_key(|(id, dist)| (OrderedFloat(*dist), *id));
        }

        if let Some((id, _)) = snap {
            trace!("{} snaps to {}", node1, id);
            self.connect(node1, id, connection_type);
            return ConnectionResult::snapped(id);
        }

        if let Some(hit) = primary {
            let split_type = self.get_e(hit.edge).connection_type.node_type();
            trace!(
                "{:?} road from {} crosses {} at {}",
                connection_type,
                node1,
                hit.edge,
                hit.pt
            );
            let middle = self.split_edge(hit.edge, hit.pt, split_type);
            self.connect(node1, middle, connection_type);
            return ConnectionResult::intersected(middle);
        }

        if let Some(result) = self.snap_to_own_edges(node1, target, snap_radius) {
            return result;
        }

        let node2 = self.add_node(target, node_type);
        let success = self.connect(node1, node2, connection_type);
        ConnectionResult::connected(node2, success)
    }

    fn find_hits(
        &self,
        node1: NodeID,
        candidate: &Line,
        nearby: &[NodeID],
        snap_radius: f64,
    ) -> Vec<Hit> {
        let target = candidate.pt2();
        let length = candidate.length();
        let mut visited = BTreeSet::new();
        let mut hits = Vec::new();
        for id in nearby {
            visited.insert(*id);
            for e in self.get_n(*id).edges() {
                let other = self.get_e(*e).other_endpt(*id);
                // Roads from node1 trivially meet the new road at node1
                if other == node1 || visited.contains(&other) {
                    continue;
                }
                let existing = self.edge_line(*e);

                let ray = existing.ray_test(candidate);
                if ray.within_segment() && ray.factor_along_ray * length > EPSILON_DIST {
                    let dist = ray.factor_along_ray * length;
                    if ray.factor_along_ray <= 1.0 {
                        hits.push(Hit {
                            pt: ray.pt,
                            edge: *e,
                            kind: HitKind::Intersection,
                            dist,
                        });
                        continue;
                    }
                    if ray.pt.dist_to(target) <= snap_radius {
                        hits.push(Hit {
                            pt: ray.pt,
                            edge: *e,
                            kind: HitKind::Extension,
                            dist,
                        });
                        continue;
                    }
                }

                if let Some(proj) = existing.project_pt(target, false) {
                    let dist = proj.dist_to(candidate.pt1());
                    if proj.dist_to(target) <= snap_radius && dist > EPSILON_DIST {
                        hits.push(Hit {
                            pt: proj,
                            edge: *e,
                            kind: HitKind::Projection,
                            dist,
                        });
                    }
                }
            }
        }
        hits
    }

    /// The neighbor of `node` whose road heads closest to `angle`, if it's within the merge
    /// threshold. Returns the neighbor and its distance from `node`.
    fn parallel_neighbor(&self, node: NodeID, angle: Angle) -> Option<(NodeID, f64)> {
        let pt = self.get_n(node).pt;
        self.neighbors(node)
            .into_iter()
            .filter_map(|n| {
                let other = self.get_n(n).pt;
                let diff = angle.abs_degrees_to(pt.angle_to(other));
                if diff < MERGE_ANGLE_DEGREES - ANGLE_EPSILON {
                    Some((n, diff, pt.dist_to(other)))
                } else {
                    None
                }
            })
            .min_by_key(|(n, diff, _)| (OrderedFloat(*diff), *n))
            .map(|(n, _, dist)| (n, dist))
    }

    fn snap_to_own_edges(
        &mut self,
        node1: NodeID,
        target: Pt2D,
        snap_radius: f64,
    ) -> Option<ConnectionResult> {
        let neighbor = self
            .neighbors(node1)
            .into_iter()
            .map(|n| (n, self.get_n(n).pt.dist_to(target)))
            .filter(|(_, dist)| *dist <= snap_radius)
            .min_by_key(|(n, dist)| (OrderedFloat(*dist), *n));
        if let Some((n, _)) = neighbor {
            return Some(ConnectionResult::snapped(n));
        }

        let p1 = self.get_n(node1).pt;
        let beside = self
            .get_n(node1)
            .edges()
            .iter()
            .filter_map(|e| {
                let proj = self.edge_line(*e).project_pt(target, false)?;
                let dist = proj.dist_to(target);
                // Splitting right at either end would duplicate a node
                let far_enough = proj.dist_to(p1) > snap_radius
                    && proj.dist_to(self.get_n(self.get_e(*e).other_endpt(node1)).pt)
                        > snap_radius;
                if dist <= snap_radius && far_enough {
                    Some((*e, proj, dist))
                } else {
                    None
                }
            })
            .min_by_key(|(e, _, dist)| (OrderedFloat(*dist), *e));
        let (e, proj, _) = beside?;
        let node_type = self.get_n(node1).node_type;
        let middle = self.split_edge(e, proj, node_type);
        Some(ConnectionResult::snapped(middle))
    }
}

fn pick_primary(mut hits: Vec<Hit>) -> Option<Hit> {
    if hits.iter().any(|hit| hit.kind == HitKind::Extension) {
        hits.retain(|hit| hit.kind != HitKind::Projection);
    }
    hits.into_iter()
        .min_by_key(|hit| (OrderedFloat(hit.dist), hit.edge))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAP: f64 = 1.0;

    fn street(net: &mut RoadNetwork, x: f64, y: f64) -> NodeID {
        net.add_node(Pt2D::new(x, y), NodeType::Street)
    }

    fn connect_to(net: &mut RoadNetwork, from: NodeID, x: f64, y: f64) -> ConnectionResult {
        net.connect_with_intersection_handling(
            from,
            Pt2D::new(x, y),
            NodeType::Street,
            SNAP,
            ConnectionType::Street,
        )
    }

    fn node_at(net: &RoadNetwork, x: f64, y: f64) -> Option<NodeID> {
        net.closest_node(Pt2D::new(x, y), 1e-6)
    }

    #[test]
    fn t_intersection_splits_the_crossed_road() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let bottom = street(&mut net, 5.0, -2.0);
        let top = street(&mut net, 5.0, 2.0);
        net.connect(bottom, top, ConnectionType::Highway);

        let result = connect_to(&mut net, start, 10.0, 0.0);
        assert!(result.did_intersect);
        assert!(!result.success && !result.did_snap);
        assert!(net.get_n(result.node).pt.approx_eq(Pt2D::new(5.0, 0.0), 1e-9));
        assert_eq!(NodeType::Highway, net.get_n(result.node).node_type);

        assert!(!net.are_connected(bottom, top));
        assert!(net.are_connected(bottom, result.node));
        assert!(net.are_connected(result.node, top));
        assert!(net.are_connected(start, result.node));
        assert_eq!(None, node_at(&net, 10.0, 0.0));
        assert_eq!(4, net.node_count());
        net.check_invariants().unwrap();
    }

    #[test]
    fn close_targets_snap_to_the_start() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let result = connect_to(&mut net, start, 0.5, 0.5);
        assert!(result.did_snap);
        assert_eq!(start, result.node);
        assert_eq!(1, net.node_count());
        assert_eq!(0, net.edge_count());
    }

    #[test]
    fn non_finite_targets_change_nothing() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let result = connect_to(&mut net, start, f64::NAN, 3.0);
        assert!(!result.success && !result.did_intersect && !result.did_snap);
        assert_eq!(start, result.node);
        assert_eq!(1, net.node_count());
        assert_eq!(0, net.edge_count());
    }

    #[test]
    fn snaps_to_nodes_along_the_way() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let existing = street(&mut net, 10.0, 0.0);

        let result = connect_to(&mut net, start, 10.5, 0.3);
        assert!(result.did_snap);
        assert_eq!(existing, result.node);
        assert!(net.are_connected(start, existing));

        let other = street(&mut net, 0.0, 20.0);
        let result = connect_to(&mut net, other, 9.6, 0.5);
        assert!(result.did_snap);
        assert_eq!(existing, result.node);
        assert_eq!(3, net.node_count());
        net.check_invariants().unwrap();
    }

    #[test]
    fn near_parallel_without_a_crossing_connects_directly() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let neighbor = street(&mut net, 10.0, 0.0);
        net.connect(start, neighbor, ConnectionType::Street);

        let target = Pt2D::new(0.0, 0.0).project_away(10.0, Angle::degrees(15.0));
        let result = connect_to(&mut net, start, target.x(), target.y());
        assert!(result.success);
        assert!(net.get_n(result.node).pt.approx_eq(target, 1e-9));
        assert!(net.are_connected(start, neighbor));
        assert_eq!(2, net.connections(start).len());
        net.check_invariants().unwrap();
    }

    fn near_parallel_with_crossing(degrees: f64) -> (RoadNetwork, NodeID, ConnectionResult) {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let neighbor = street(&mut net, 10.0, 0.0);
        net.connect(start, neighbor, ConnectionType::Street);
        let bottom = street(&mut net, 15.0, -20.0);
        let top = street(&mut net, 15.0, 20.0);
        net.connect(bottom, top, ConnectionType::Street);

        let target = Pt2D::new(0.0, 0.0).project_away(20.0, Angle::degrees(degrees));
        let result = connect_to(&mut net, start, target.x(), target.y());
        net.check_invariants().unwrap();
        (net, neighbor, result)
    }

    #[test]
    fn near_parallel_crossing_merges_into_the_neighbor() {
        let (net, neighbor, result) = near_parallel_with_crossing(15.0);
        assert!(result.did_snap);
        assert_eq!(neighbor, result.node);
        assert_eq!(4, net.node_count());
        assert_eq!(2, net.edge_count());
    }

    #[test]
    fn merge_threshold_is_exclusive() {
        let (net, neighbor, result) = near_parallel_with_crossing(20.0);
        assert!(result.did_intersect);
        assert_ne!(neighbor, result.node);
        assert!((net.get_n(result.node).pt.x() - 15.0).abs() < 1e-9);
        assert_eq!(5, net.node_count());
    }

    #[test]
    fn existing_neighbors_beat_closer_crossings() {
        let build = |connected: bool| {
            let mut net = RoadNetwork::flat(100.0, 100.0);
            let start = street(&mut net, 0.0, 0.0);
            // Too far off in angle to merge with, but within snapping distance of the new road
            let neighbor = street(&mut net, 7.0, 2.8);
            if connected {
                net.connect(start, neighbor, ConnectionType::Street);
            }
            let bottom = street(&mut net, 5.0, -10.0);
            let top = street(&mut net, 5.0, 10.0);
            net.connect(bottom, top, ConnectionType::Street);
            let result = net.connect_with_intersection_handling(
                start,
                Pt2D::new(20.0, 0.0),
                NodeType::Street,
                3.0,
                ConnectionType::Street,
            );
            net.check_invariants().unwrap();
            (net, neighbor, bottom, top, result)
        };

        let (net, neighbor, bottom, top, result) = build(true);
        assert!(result.did_snap);
        assert_eq!(neighbor, result.node);
        assert!(net.are_connected(bottom, top));
        assert_eq!(4, net.node_count());
        assert_eq!(2, net.edge_count());

        // The same node, not yet connected, loses to the closer crossing
        let (net, neighbor, bottom, top, result) = build(false);
        assert!(result.did_intersect);
        assert_ne!(neighbor, result.node);
        assert!(net.get_n(result.node).pt.approx_eq(Pt2D::new(5.0, 0.0), 1e-9));
        assert!(!net.are_connected(bottom, top));
    }

    #[test]
    fn crossings_next_to_a_node_snap_to_it() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        // Crosses y = 0 at about x = 5.36, closer to start than `near` is
        let near = street(&mut net, 5.5, 0.8);
        let far = street(&mut net, 4.5, -5.0);
        net.connect(near, far, ConnectionType::Street);

        let result = connect_to(&mut net, start, 10.0, 0.0);
        assert!(result.did_snap);
        assert_eq!(near, result.node);
        assert!(net.are_connected(start, near));
        assert!(net.are_connected(near, far));
        assert_eq!(3, net.node_count());
        assert_eq!(2, net.edge_count());
        net.check_invariants().unwrap();
    }

    #[test]
    fn extensions_outrank_projections() {
        let hit = |x: f64, edge: usize, kind: HitKind| Hit {
            pt: Pt2D::new(x, 0.0),
            edge: EdgeID(edge),
            kind,
            dist: x,
        };
        let primary = pick_primary(vec![
            hit(9.0, 0, HitKind::Projection),
            hit(11.0, 1, HitKind::Extension),
        ])
        .unwrap();
        assert_eq!(HitKind::Extension, primary.kind);
        assert_eq!(EdgeID(1), primary.edge);

        // A crossing still beats both, being closer
        let primary = pick_primary(vec![
            hit(9.0, 0, HitKind::Projection),
            hit(11.0, 1, HitKind::Extension),
            hit(6.0, 2, HitKind::Intersection),
        ])
        .unwrap();
        assert_eq!(HitKind::Intersection, primary.kind);

        // With no extension around, the closest projection counts
        let primary = pick_primary(vec![
            hit(9.0, 3, HitKind::Projection),
            hit(9.0, 0, HitKind::Projection),
            hit(12.0, 2, HitKind::Intersection),
        ])
        .unwrap();
        assert_eq!(EdgeID(0), primary.edge);
        assert!(pick_primary(Vec::new()).is_none());
    }

    #[test]
    fn stopping_short_extends_to_the_road() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let bottom = street(&mut net, 12.0, -5.0);
        let top = street(&mut net, 12.0, 5.0);
        net.connect(bottom, top, ConnectionType::Street);

        let result = connect_to(&mut net, start, 11.5, 0.0);
        assert!(result.did_intersect);
        assert!(net.get_n(result.node).pt.approx_eq(Pt2D::new(12.0, 0.0), 1e-9));
        assert!(net.are_connected(start, result.node));
        assert!(!net.are_connected(bottom, top));
        net.check_invariants().unwrap();
    }

    #[test]
    fn ending_beside_a_road_projects_onto_it() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 10.0);
        let left = street(&mut net, 5.0, 11.5);
        let right = street(&mut net, 15.0, 10.3);
        net.connect(left, right, ConnectionType::Street);
        let old_road = Line::new(Pt2D::new(5.0, 11.5), Pt2D::new(15.0, 10.3));

        // The ray would only meet the road past its far end
        let target = Pt2D::new(10.0, 10.0);
        let result = connect_to(&mut net, start, target.x(), target.y());
        assert!(result.did_intersect);
        let pt = net.get_n(result.node).pt;
        assert!(old_road.dist_to_pt(pt) < 1e-9);
        assert!(pt.dist_to(target) <= SNAP);
        assert!(!net.are_connected(left, right));
        assert!(net.are_connected(start, result.node));
        net.check_invariants().unwrap();
    }

    #[test]
    fn targets_beside_our_own_road_split_it() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        let far = street(&mut net, 20.0, 0.0);
        net.connect(start, far, ConnectionType::Street);

        let result = connect_to(&mut net, start, 10.0, 0.5);
        assert!(result.did_snap);
        assert!(net.get_n(result.node).pt.approx_eq(Pt2D::new(10.0, 0.0), 1e-9));
        assert!(!net.are_connected(start, far));
        assert!(net.are_connected(start, result.node));
        assert!(net.are_connected(result.node, far));
        net.check_invariants().unwrap();
    }

    #[test]
    fn unclaimed_space_just_connects() {
        let mut net = RoadNetwork::flat(100.0, 100.0);
        let start = street(&mut net, 0.0, 0.0);
        street(&mut net, 50.0, 50.0);
        let result = connect_to(&mut net, start, 10.0, 0.0);
        assert!(result.success);
        assert!(net.are_connected(start, result.node));
        // The new edge is reachable through the index
        let found = net.search(&geom::Bounds::around(Pt2D::new(5.0, 0.0), 0.5));
        assert_eq!(vec![start, result.node], found);
        net.check_invariants().unwrap();
    }
}
