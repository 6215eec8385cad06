use std::fmt;

use serde::{Deserialize, Serialize};

use geom::Pt2D;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub usize);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeID(pub usize);

impl fmt::Display for EdgeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Edge #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum NodeType {
    Main,
    Highway,
    Street,
}

impl NodeType {
    /// The kind of road an agent placing this type of node lays down by default.
    pub fn connection_type(self) -> ConnectionType {
        match self {
            NodeType::Main => ConnectionType::Main,
            NodeType::Highway => ConnectionType::Highway,
            NodeType::Street => ConnectionType::Street,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Placing a node with this type doesn't connect it to anything.
    None,
    Main,
    Highway,
    Street,
    ParkPath,
}

impl ConnectionType {
    /// The type of node created when an edge of this type is split.
    pub fn node_type(self) -> NodeType {
        match self {
            ConnectionType::Main => NodeType::Main,
            ConnectionType::Highway => NodeType::Highway,
            ConnectionType::None | ConnectionType::Street | ConnectionType::ParkPath => {
                NodeType::Street
            }
        }
    }

    /// Bigger is more important. Used to classify blocks by what surrounds them.
    pub fn rank(self) -> usize {
        match self {
            ConnectionType::None => 0,
            ConnectionType::ParkPath => 1,
            ConnectionType::Street => 2,
            ConnectionType::Highway => 3,
            ConnectionType::Main => 4,
        }
    }
}

/// A point in the road graph. The position never changes once the node exists; the spatial index
/// relies on that.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeID,
    pub pt: Pt2D,
    /// Terrain height under `pt`, sampled when the node was created.
    pub elevation: f64,
    pub node_type: NodeType,
    /// Both endpoints of an edge list the same `EdgeID`. The order is meaningless.
    pub(crate) edges: Vec<EdgeID>,
    pub added_to_index: bool,
}

impl Node {
    pub fn edges(&self) -> &Vec<EdgeID> {
        &self.edges
    }

    pub fn is_dead_end(&self) -> bool {
        self.edges.len() == 1
    }
}

/// One undirected road segment between two nodes. There's a single record per logical edge,
/// shared by both endpoints, so the connection is symmetric by construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeID,
    pub src: NodeID,
    pub dst: NodeID,
    pub connection_type: ConnectionType,
}

impl Edge {
    pub fn other_endpt(&self, n: NodeID) -> NodeID {
        if self.src == n {
            self.dst
        } else if self.dst == n {
            self.src
        } else {
            panic!("{} doesn't touch {}", self.id, n);
        }
    }

    pub fn touches(&self, n: NodeID) -> bool {
        self.src == n || self.dst == n
    }
}
