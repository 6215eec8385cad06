use std::collections::BTreeMap;

use rstar::{RTree, RTreeObject, AABB};

use geom::Bounds;

use crate::NodeID;

#[derive(Clone, Debug, PartialEq)]
struct IndexEntry {
    id: NodeID,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An R-tree over road nodes. Each node is stored with the envelope of itself and its neighbors,
/// so a range query also finds nodes whose edges pass through the range.
///
/// Envelopes are never changed in place. When a node's neighbors change, the caller removes and
/// re-inserts it; `insert` does both.
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    // The envelope each node was last inserted with, needed to find the entry again for removal
    envelopes: BTreeMap<NodeID, AABB<[f64; 2]>>,
}

impl SpatialIndex {
    pub fn new() -> SpatialIndex {
        SpatialIndex {
            tree: RTree::new(),
            envelopes: BTreeMap::new(),
        }
    }

    /// Insert a node, replacing any existing entry for it.
    pub fn insert(&mut self, id: NodeID, bounds: &Bounds) {
        self.remove(id);
        let envelope = bounds.to_aabb();
        self.tree.insert(IndexEntry { id, envelope });
        self.envelopes.insert(id, envelope);
    }

    /// Returns false if the node wasn't indexed.
    pub fn remove(&mut self, id: NodeID) -> bool {
        match self.envelopes.remove(&id) {
            Some(envelope) => self.tree.remove(&IndexEntry { id, envelope }).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, id: NodeID) -> bool {
        self.envelopes.contains_key(&id)
    }

    /// Every node whose envelope overlaps `bounds`, sorted by ID. This is only a bounding box
    /// check; callers filter by real distance.
    pub fn search(&self, bounds: &Bounds) -> Vec<NodeID> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let mut ids: Vec<NodeID> = self
            .tree
            .locate_in_envelope_intersecting(&bounds.to_aabb())
            .map(|entry| entry.id)
            .collect();
        ids.sort();
        ids
    }

    /// Every indexed node, sorted by ID.
    pub fn all(&self) -> Vec<NodeID> {
        let mut ids: Vec<NodeID> = self.tree.iter().map(|entry| entry.id).collect();
        ids.sort();
        ids
    }

    pub fn envelope(&self, id: NodeID) -> Option<Bounds> {
        self.envelopes.get(&id).map(Bounds::from_aabb)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Throw away the tree and bulk load everything from scratch.
    pub fn rebuild(&mut self, entries: Vec<(NodeID, Bounds)>) {
        self.envelopes.clear();
        let mut objects = Vec::new();
        for (id, bounds) in entries {
            let envelope = bounds.to_aabb();
            self.envelopes.insert(id, envelope);
            objects.push(IndexEntry { id, envelope });
        }
        self.tree = RTree::bulk_load(objects);
    }
}

impl Default for SpatialIndex {
    fn default() -> SpatialIndex {
        SpatialIndex::new()
    }
}
