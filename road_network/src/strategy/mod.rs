//! How agents decide where to go. Each strategy is a stateless object shared by every agent that
//! uses it; all per-agent state lives in the agent and its `AgentData`.

mod highway;
mod manhattan;
mod paris;
mod street;

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use rand::Rng;
use rand_xorshift::XorShiftRng;

use geom::Angle;

pub use self::highway::{HighwayData, HighwayStrategy};
pub use self::manhattan::{ManhattanData, ManhattanStrategy};
pub use self::paris::{ParisData, ParisStrategy};
pub use self::street::StreetStrategy;
use crate::{Agent, GrowthCtx, Placement, RoadNetwork};

pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Called once, before the first `work`. By default, puts down the first node (reusing a
    /// nearby one) unless the agent already continues from an existing node.
    fn start(&self, agent: &mut Agent, ctx: &mut GrowthCtx) {
        if agent.prev_node.is_none() {
            agent.place_node(agent.pos, ctx);
        }
    }

    /// Take one step. `None` means the agent has nothing left to do.
    fn work(&self, agent: &mut Agent, ctx: &mut GrowthCtx) -> Option<Placement>;

    /// Checked after every step. By default, agents die when they're out of steps, leave the
    /// map, stop making progress, or had nothing to do.
    fn should_die(
        &self,
        agent: &Agent,
        placement: Option<&Placement>,
        map: &RoadNetwork,
    ) -> bool {
        default_should_die(agent, placement, map)
    }

    /// Checked after every step the agent survives. Returns new agents to enqueue.
    fn branch(
        &self,
        _agent: &Agent,
        _placement: &Placement,
        _ctx: &mut GrowthCtx,
    ) -> Vec<Agent> {
        Vec::new()
    }

    /// `Less` if `a` should go before `b`. By default, higher priority first, then the agent with
    /// fewer steps so far.
    fn compare(&self, a: &Agent, b: &Agent) -> Ordering {
        OrderedFloat(b.priority)
            .cmp(&OrderedFloat(a.priority))
            .then_with(|| a.step_count.cmp(&b.step_count))
    }
}

pub fn default_should_die(
    agent: &Agent,
    placement: Option<&Placement>,
    map: &RoadNetwork,
) -> bool {
    let placement = match placement {
        Some(p) => p,
        None => return true,
    };
    if agent.config.max_step_count > 0 && agent.step_count > agent.config.max_step_count {
        return true;
    }
    !placement.moved || !map.bounds().contains(agent.pos)
}

/// True with the given probability.
pub(crate) fn roll(rng: &mut XorShiftRng, probability: f64) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        return false;
    }
    rng.gen_bool(probability.min(1.0))
}

/// Randomly turn left or right by 90 degrees.
pub(crate) fn perpendicular(rng: &mut XorShiftRng, dir: Angle) -> Angle {
    if rng.gen_bool(0.5) {
        dir.rotate_degs(90.0)
    } else {
        dir.rotate_degs(-90.0)
    }
}

/// A random wobble within `max_degrees` either way.
pub(crate) fn jitter(rng: &mut XorShiftRng, max_degrees: f64) -> f64 {
    if max_degrees > 0.0 {
        rng.gen_range(-max_degrees..=max_degrees)
    } else {
        0.0
    }
}
