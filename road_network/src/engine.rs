use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

use abstutil::{prettyprint_usize, PriorityQueueItem};

use crate::{Agent, AgentID, GrowthCtx, RoadNetwork};

/// Global limits on one run, so runaway branching can't grow forever.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    pub max_total_steps: usize,
    /// Agents beyond this are never queued.
    pub max_agents: usize,
    pub max_nodes: usize,
}

impl Default for Budget {
    fn default() -> Budget {
        Budget {
            max_total_steps: 50_000,
            max_agents: 10_000,
            max_nodes: 20_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetLimit {
    TotalSteps,
    Nodes,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineStats {
    pub steps: usize,
    pub agents_added: usize,
    /// Agents that died or finished their single step.
    pub agents_finished: usize,
    /// Agents turned away because of `max_agents`.
    pub agents_rejected: usize,
    /// Set once a budget stops the run early.
    pub tripped: Option<BudgetLimit>,
}

/// A queued agent, ordered by its own strategy.
struct Scheduled(Agent);

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.strategy().compare(&self.0, &other.0)
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

/// Runs agents one step at a time. The agent that goes next is the one its strategy ranks first
/// (by default, highest priority and then fewest steps), with ties going to the older agent.
pub struct AgentEngine {
    queue: BinaryHeap<PriorityQueueItem<Scheduled, AgentID>>,
    rng: XorShiftRng,
    next_agent_id: usize,
    budget: Budget,
    stats: EngineStats,
}

impl AgentEngine {
    pub fn new(seed: u64, budget: Budget) -> AgentEngine {
        AgentEngine {
            queue: BinaryHeap::new(),
            rng: XorShiftRng::seed_from_u64(seed),
            next_agent_id: 0,
            budget,
            stats: EngineStats::default(),
        }
    }

    pub fn new_agent_id(&mut self) -> AgentID {
        let id = AgentID(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    /// Lets agent factories share the engine's randomness.
    pub fn rng(&mut self) -> &mut XorShiftRng {
        &mut self.rng
    }

    /// Queue an agent. Returns false if the agent budget is used up.
    pub fn add_agent(&mut self, agent: Agent) -> bool {
        if self.stats.agents_added >= self.budget.max_agents {
            if self.stats.agents_rejected == 0 {
                warn!(
                    "Hit the limit of {} agents; dropping any more",
                    prettyprint_usize(self.budget.max_agents)
                );
            }
            self.stats.agents_rejected += 1;
            return false;
        }
        self.stats.agents_added += 1;
        // Factories might hand out IDs some other way
        self.next_agent_id = self.next_agent_id.max(agent.id.0 + 1);
        let id = agent.id;
        self.queue.push(PriorityQueueItem {
            cost: Scheduled(agent),
            value: id,
        });
        true
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn num_queued(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The agent that'll go next, if any.
    pub fn peek(&self) -> Option<&Agent> {
        self.queue.peek().map(|item| &item.cost.0)
    }

    /// Run one agent for one step. Returns false when there's nothing left to do, either because
    /// the queue is empty or a budget ran out.
    pub fn step(&mut self, map: &mut RoadNetwork) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        if self.stats.steps >= self.budget.max_total_steps {
            self.trip(BudgetLimit::TotalSteps);
            return false;
        }
        if map.node_count() >= self.budget.max_nodes {
            self.trip(BudgetLimit::Nodes);
            return false;
        }

        let mut agent = match self.queue.pop() {
            Some(item) => item.cost.0,
            None => return false,
        };
        let strategy = agent.strategy().clone();
        let mut ctx = GrowthCtx::new(map, &mut self.rng, &mut self.next_agent_id);

        if !agent.started {
            strategy.start(&mut agent, &mut ctx);
            agent.started = true;
            trace!("{} ({}) starts at {}", agent.id, strategy.name(), agent.pos);
        }
        let placement = strategy.work(&mut agent, &mut ctx);
        agent.step_count += 1;
        self.stats.steps += 1;

        if agent.terminated || strategy.should_die(&agent, placement.as_ref(), ctx.network) {
            agent.terminated = true;
            self.stats.agents_finished += 1;
            trace!(
                "{} ({}) dies after {} steps at {}",
                agent.id,
                strategy.name(),
                agent.step_count,
                agent.pos
            );
            return true;
        }

        let children = match placement {
            Some(ref placement) => strategy.branch(&agent, placement, &mut ctx),
            None => Vec::new(),
        };
        for child in children {
            trace!("{} branches into {}", agent.id, child.id);
            self.add_agent(child);
        }

        if agent.config.requeue {
            let id = agent.id;
            self.queue.push(PriorityQueueItem {
                cost: Scheduled(agent),
                value: id,
            });
        } else {
            self.stats.agents_finished += 1;
        }
        true
    }

    /// Step until every agent is done or a budget runs out.
    pub fn run_to_completion(&mut self, map: &mut RoadNetwork) -> EngineStats {
        while self.step(map) {}
        info!(
            "Agents ran {} steps total. {} agents were added, {} finished, {} still queued. The \
             network has {} nodes and {} edges",
            prettyprint_usize(self.stats.steps),
            prettyprint_usize(self.stats.agents_added),
            prettyprint_usize(self.stats.agents_finished),
            prettyprint_usize(self.queue.len()),
            prettyprint_usize(map.node_count()),
            prettyprint_usize(map.edge_count())
        );
        self.stats.clone()
    }

    fn trip(&mut self, limit: BudgetLimit) {
        if self.stats.tripped.is_none() {
            warn!(
                "Stopping early: hit the {:?} budget with {} agents still queued",
                limit,
                prettyprint_usize(self.queue.len())
            );
            self.stats.tripped = Some(limit);
        }
    }
}
