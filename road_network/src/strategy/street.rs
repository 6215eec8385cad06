use crate::strategy::{default_should_die, jitter, roll, Strategy};
use crate::{Agent, GrowthCtx, Placement, RoadNetwork};

/// Short local roads. They wiggle a little, branch often, and stop as soon as they run into
/// anything already built.
pub struct StreetStrategy;

impl Strategy for StreetStrategy {
    fn name(&self) -> &'static str {
        "street"
    }

    fn work(&self, agent: &mut Agent, ctx: &mut GrowthCtx) -> Option<Placement> {
        agent.dir = agent
            .dir
            .rotate_degs(jitter(ctx.rng, agent.config.max_turn_degrees));
        let target = agent.pos.project_away(agent.config.step_size, agent.dir);
        Some(agent.place_node(target, ctx))
    }

    fn should_die(
        &self,
        agent: &Agent,
        placement: Option<&Placement>,
        map: &RoadNetwork,
    ) -> bool {
        // Joining an existing road finishes the street
        default_should_die(agent, placement, map) || placement.map_or(false, |p| !p.succeeded())
    }

    fn branch(&self, agent: &Agent, _: &Placement, ctx: &mut GrowthCtx) -> Vec<Agent> {
        let mut children = Vec::new();
        if !agent.can_branch() {
            return children;
        }
        for turn in [90.0, -90.0] {
            if roll(ctx.rng, agent.config.branch_probability) {
                let id = ctx.new_agent_id();
                children.push(agent.clone_for_branch(id, agent.dir.rotate_degs(turn)));
            }
        }
        children
    }
}
