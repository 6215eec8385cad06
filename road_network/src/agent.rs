use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

use geom::{Angle, Pt2D};

use crate::strategy::Strategy;
use crate::{ConnectionResult, ConnectionType, NodeID, NodeType, RoadNetwork};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentID(pub usize);

impl fmt::Display for AgentID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Agent #{}", self.0)
    }
}

/// How one kind of agent moves and builds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// How far to move each step, in meters.
    pub step_size: f64,
    /// Existing nodes and roads within this distance of a new node are reused.
    pub snap_radius: f64,
    /// The agent dies after this many steps. 0 means no limit.
    pub max_step_count: usize,
    /// Agents this many generations removed from the original can't branch anymore.
    pub max_branch_count: usize,
    /// If false, the agent works once and is dropped.
    pub requeue: bool,
    pub node_type: NodeType,
    /// The kind of road laid down between consecutive nodes. `None` places disconnected nodes.
    pub connection_type: ConnectionType,
    /// The chance of branching after each step, in [0, 1].
    pub branch_probability: f64,
    /// The most the agent may turn in one step.
    pub max_turn_degrees: f64,
}

impl Default for AgentConfig {
    fn default() -> AgentConfig {
        AgentConfig {
            step_size: 10.0,
            snap_radius: 3.0,
            max_step_count: 40,
            max_branch_count: 4,
            requeue: true,
            node_type: NodeType::Street,
            connection_type: ConnectionType::Street,
            branch_probability: 0.2,
            max_turn_degrees: 0.0,
        }
    }
}

impl AgentConfig {
    /// Long straight blocks of the downtown grid.
    pub fn manhattan() -> AgentConfig {
        AgentConfig {
            step_size: 20.0,
            snap_radius: 6.0,
            node_type: NodeType::Main,
            connection_type: ConnectionType::Main,
            branch_probability: 0.3,
            ..Default::default()
        }
    }

    pub fn highway() -> AgentConfig {
        AgentConfig {
            step_size: 25.0,
            snap_radius: 8.0,
            node_type: NodeType::Highway,
            connection_type: ConnectionType::Highway,
            branch_probability: 0.08,
            max_turn_degrees: 15.0,
            ..Default::default()
        }
    }

    pub fn street() -> AgentConfig {
        AgentConfig {
            step_size: 12.0,
            snap_radius: 4.0,
            max_step_count: 25,
            branch_probability: 0.35,
            max_turn_degrees: 4.0,
            ..Default::default()
        }
    }
}

/// Strategy-specific state carried by an agent. Any `'static + Clone + Debug` type can implement
/// this with an empty `impl`; cloning an agent clones its data too.
pub trait AgentData: AgentDataImpl + fmt::Debug {}

pub trait AgentDataImpl {
    fn clone_box(&self) -> Box<dyn AgentData>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> AgentDataImpl for T
where
    T: 'static + AgentData + Clone,
{
    fn clone_box(&self) -> Box<dyn AgentData> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn AgentData> {
    fn clone(&self) -> Box<dyn AgentData> {
        self.clone_box()
    }
}

impl AgentData for () {}

/// Where an agent's latest step ended up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub node: NodeID,
    /// Only set when the node was connected to the agent's previous node.
    pub result: Option<ConnectionResult>,
    /// False if the agent ended up back on the node it started the step from.
    pub moved: bool,
}

impl Placement {
    /// A plain new road to the requested point, or a first node with nothing to connect to.
    pub fn succeeded(&self) -> bool {
        self.result.map(|r| r.success).unwrap_or(true)
    }
}

/// Everything a strategy may touch while one agent takes its turn.
pub struct GrowthCtx<'a> {
    pub network: &'a mut RoadNetwork,
    pub rng: &'a mut XorShiftRng,
    next_agent_id: &'a mut usize,
}

impl<'a> GrowthCtx<'a> {
    pub fn new(
        network: &'a mut RoadNetwork,
        rng: &'a mut XorShiftRng,
        next_agent_id: &'a mut usize,
    ) -> GrowthCtx<'a> {
        GrowthCtx {
            network,
            rng,
            next_agent_id,
        }
    }

    pub fn new_agent_id(&mut self) -> AgentID {
        let id = AgentID(*self.next_agent_id);
        *self.next_agent_id += 1;
        id
    }
}

/// Something wandering around the map, laying down road as it goes. All behavior lives in the
/// shared `Strategy`; the agent only carries state.
#[derive(Clone)]
pub struct Agent {
    pub id: AgentID,
    pub pos: Pt2D,
    pub dir: Angle,
    /// Higher goes first.
    pub priority: f64,
    pub step_count: usize,
    /// How many generations of branching produced this agent.
    pub branch_count: usize,
    /// A strategy can set this during `start` or `work` to finish the agent after this step,
    /// regardless of `should_die`.
    pub terminated: bool,
    pub started: bool,
    /// The last node this agent placed. The next road starts here.
    pub prev_node: Option<NodeID>,
    pub config: AgentConfig,
    data: Box<dyn AgentData>,
    strategy: Rc<dyn Strategy>,
}

impl Agent {
    pub fn new(
        id: AgentID,
        pos: Pt2D,
        dir: Angle,
        config: AgentConfig,
        strategy: Rc<dyn Strategy>,
    ) -> Agent {
        Agent {
            id,
            pos,
            dir,
            priority: 0.0,
            step_count: 0,
            branch_count: 0,
            terminated: false,
            started: false,
            prev_node: None,
            config,
            data: Box::new(()),
            strategy,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Agent {
        self.priority = priority;
        self
    }

    pub fn with_data<T: 'static + AgentData + Clone>(mut self, data: T) -> Agent {
        self.data = Box::new(data);
        self
    }

    /// Start from an existing node instead of placing a new one.
    pub fn starting_from(mut self, node: NodeID) -> Agent {
        self.prev_node = Some(node);
        self
    }

    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    pub fn data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.as_any_mut().downcast_mut::<T>()
    }

    pub fn strategy(&self) -> &Rc<dyn Strategy> {
        &self.strategy
    }

    /// A copy of this agent continuing from its current node in a new direction, one generation
    /// further down. The copy has a fresh step budget.
    pub fn clone_for_branch(&self, id: AgentID, dir: Angle) -> Agent {
        let mut child = self.clone();
        child.id = id;
        child.dir = dir;
        child.step_count = 0;
        child.branch_count = self.branch_count + 1;
        child.terminated = false;
        child
    }

    /// A new agent of a different kind starting at this agent's current node, one generation
    /// further down.
    pub fn spawn(
        &self,
        id: AgentID,
        dir: Angle,
        config: AgentConfig,
        strategy: Rc<dyn Strategy>,
    ) -> Agent {
        let mut child = Agent::new(id, self.pos, dir, config, strategy);
        child.branch_count = self.branch_count + 1;
        child.prev_node = self.prev_node;
        child
    }

    /// Room for another generation, and steps left to grow it from?
    pub fn can_branch(&self) -> bool {
        self.branch_count < self.config.max_branch_count && !self.out_of_steps()
    }

    pub fn out_of_steps(&self) -> bool {
        self.config.max_step_count > 0 && self.step_count >= self.config.max_step_count
    }

    /// Put down a node at `pt`, connected to the previous node when there is one, and move there.
    /// The node might not be at `pt`; existing roads nearby are reused.
    pub fn place_node(&mut self, pt: Pt2D, ctx: &mut GrowthCtx) -> Placement {
        let placement = match self.prev_node {
            Some(prev) if self.config.connection_type != ConnectionType::None => {
                let result = ctx.network.connect_with_intersection_handling(
                    prev,
                    pt,
                    self.config.node_type,
                    self.config.snap_radius,
                    self.config.connection_type,
                );
                Placement {
                    node: result.node,
                    result: Some(result),
                    moved: result.node != prev,
                }
            }
            // Unconnected nodes never merge into the agent's own trail
            Some(_) => Placement {
                node: ctx.network.add_node(pt, self.config.node_type),
                result: None,
                moved: true,
            },
            None => {
                let node =
                    ctx.network
                        .add_node_nearby(pt, self.config.node_type, self.config.snap_radius);
                Placement {
                    node,
                    result: None,
                    moved: true,
                }
            }
        };
        self.prev_node = Some(placement.node);
        self.pos = ctx.network.get_n(placement.node).pt;
        placement
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("strategy", &self.strategy.name())
            .field("pos", &self.pos)
            .field("dir", &self.dir)
            .field("priority", &self.priority)
            .field("step_count", &self.step_count)
            .field("branch_count", &self.branch_count)
            .field("prev_node", &self.prev_node)
            .field("data", &self.data)
            .finish()
    }
}
