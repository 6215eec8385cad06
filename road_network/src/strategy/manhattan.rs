use std::rc::Rc;

use crate::strategy::{perpendicular, roll, HighwayData, HighwayStrategy, Strategy};
use crate::{Agent, AgentConfig, AgentData, GrowthCtx, Placement};

#[derive(Clone, Debug, PartialEq)]
pub struct ManhattanData {
    /// Used when the grid hands off to a highway.
    pub highway: AgentConfig,
    pub street: AgentConfig,
    /// The chance of continuing as a highway once the grid agent runs out of steps.
    pub handoff_probability: f64,
}

impl AgentData for ManhattanData {}

/// The downtown grid: straight roads along the axes, with perpendicular side roads.
pub struct ManhattanStrategy;

impl Strategy for ManhattanStrategy {
    fn name(&self) -> &'static str {
        "manhattan"
    }

    fn work(&self, agent: &mut Agent, ctx: &mut GrowthCtx) -> Option<Placement> {
        agent.dir = agent.dir.snap_degs(90.0);
        let target = agent.pos.project_away(agent.config.step_size, agent.dir);
        Some(agent.place_node(target, ctx))
    }

    fn branch(&self, agent: &Agent, _: &Placement, ctx: &mut GrowthCtx) -> Vec<Agent> {
        if agent.out_of_steps() {
            return handoff(agent, ctx).into_iter().collect();
        }
        if !agent.can_branch() || !roll(ctx.rng, agent.config.branch_probability) {
            return Vec::new();
        }
        let id = ctx.new_agent_id();
        vec![agent.clone_for_branch(id, perpendicular(ctx.rng, agent.dir))]
    }
}

/// Maybe keep going past the edge of the grid as a higher priority highway.
fn handoff(agent: &Agent, ctx: &mut GrowthCtx) -> Option<Agent> {
    let data = agent.data::<ManhattanData>()?;
    if !roll(ctx.rng, data.handoff_probability) {
        return None;
    }
    let id = ctx.new_agent_id();
    let highway = agent
        .spawn(id, agent.dir, data.highway.clone(), Rc::new(HighwayStrategy))
        .with_priority(agent.priority + 1.0)
        .with_data(HighwayData {
            street: data.street.clone(),
            street_share: 0.7,
        });
    trace!("{} hands off to highway {}", agent.id, id);
    Some(highway)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use geom::{Angle, Pt2D};

    use super::*;
    use crate::{AgentID, RoadNetwork};

    fn grid_agent(max_step_count: usize) -> Agent {
        let config = AgentConfig {
            max_step_count,
            branch_probability: 0.0,
            ..AgentConfig::manhattan()
        };
        Agent::new(
            AgentID(0),
            Pt2D::new(100.0, 100.0),
            Angle::degrees(3.0),
            config,
            Rc::new(ManhattanStrategy),
        )
        .with_data(ManhattanData {
            highway: AgentConfig::highway(),
            street: AgentConfig::street(),
            handoff_probability: 1.0,
        })
    }

    #[test]
    fn grid_roads_stay_on_axis() {
        let mut network = RoadNetwork::flat(1000.0, 1000.0);
        let mut rng = XorShiftRng::seed_from_u64(2);
        let mut next_id = 1;
        let mut ctx = GrowthCtx::new(&mut network, &mut rng, &mut next_id);
        let strategy = ManhattanStrategy;
        let mut agent = grid_agent(40);
        strategy.start(&mut agent, &mut ctx);
        for _ in 0..3 {
            strategy.work(&mut agent, &mut ctx);
        }
        assert!(agent.pos.approx_eq(Pt2D::new(160.0, 100.0), 1e-9));
    }

    #[test]
    fn exhausted_grid_agents_become_highways() {
        let mut network = RoadNetwork::flat(1000.0, 1000.0);
        let mut rng = XorShiftRng::seed_from_u64(2);
        let mut next_id = 1;
        let mut ctx = GrowthCtx::new(&mut network, &mut rng, &mut next_id);
        let strategy = ManhattanStrategy;
        let mut agent = grid_agent(1);
        strategy.start(&mut agent, &mut ctx);
        let placement = strategy.work(&mut agent, &mut ctx).unwrap();
        agent.step_count += 1;

        let children = strategy.branch(&agent, &placement, &mut ctx);
        assert_eq!(1, children.len());
        let highway = &children[0];
        assert_eq!("highway", highway.strategy().name());
        assert_eq!(agent.prev_node, highway.prev_node);
        assert_eq!(1, highway.branch_count);
        assert!(highway.priority > agent.priority);
        assert!(highway.data::<HighwayData>().is_some());
    }
}
