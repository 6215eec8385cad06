use std::rc::Rc;

use crate::strategy::{default_should_die, jitter, perpendicular, roll, StreetStrategy, Strategy};
use crate::{Agent, AgentConfig, AgentData, GrowthCtx, Placement, RoadNetwork};

/// What a highway needs to know to spawn streets.
#[derive(Clone, Debug, PartialEq)]
pub struct HighwayData {
    pub street: AgentConfig,
    /// Of the branches a highway makes, the share that become streets instead of more highway.
    pub street_share: f64,
}

impl AgentData for HighwayData {}

/// Long roads climbing towards denser parts of the map. Each step turns towards the density
/// slope, but never by more than the agent's turn limit.
pub struct HighwayStrategy;

impl Strategy for HighwayStrategy {
    fn name(&self) -> &'static str {
        "highway"
    }

    fn work(&self, agent: &mut Agent, ctx: &mut GrowthCtx) -> Option<Placement> {
        let max_turn = agent.config.max_turn_degrees;
        let uphill = ctx
            .network
            .density()
            .slope_at(agent.pos.x(), agent.pos.y())
            .map(|slope| agent.dir.shortest_rotation_towards(slope))
            .unwrap_or(0.0);
        let turn = (uphill + jitter(ctx.rng, max_turn / 2.0))
            .max(-max_turn)
            .min(max_turn);
        agent.dir = agent.dir.rotate_degs(turn);

        let target = agent.pos.project_away(agent.config.step_size, agent.dir);
        Some(agent.place_node(target, ctx))
    }

    fn should_die(
        &self,
        agent: &Agent,
        placement: Option<&Placement>,
        map: &RoadNetwork,
    ) -> bool {
        // Crossing another road is fine, but merging into an existing node ends the highway
        default_should_die(agent, placement, map)
            || placement
                .and_then(|p| p.result)
                .map_or(false, |r| r.did_snap)
    }

    fn branch(&self, agent: &Agent, _: &Placement, ctx: &mut GrowthCtx) -> Vec<Agent> {
        if !agent.can_branch() || !roll(ctx.rng, agent.config.branch_probability) {
            return Vec::new();
        }
        let dir = perpendicular(ctx.rng, agent.dir);
        let id = ctx.new_agent_id();
        match agent.data::<HighwayData>() {
            Some(data) if roll(ctx.rng, data.street_share) => {
                let street = agent
                    .spawn(id, dir, data.street.clone(), Rc::new(StreetStrategy))
                    .with_priority(agent.priority - 1.0);
                vec![street]
            }
            _ => vec![agent.clone_for_branch(id, dir)],
        }
    }
}
