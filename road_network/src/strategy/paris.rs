use std::rc::Rc;

use geom::{Angle, Pt2D};

use crate::strategy::{default_should_die, roll, StreetStrategy, Strategy};
use crate::{Agent, AgentConfig, AgentData, GrowthCtx, Placement, RoadNetwork};

/// A ring road around a center.
#[derive(Clone, Debug, PartialEq)]
pub struct ParisData {
    pub center: Pt2D,
    pub radius: f64,
    /// Where on the ring the agent started.
    pub start_degrees: f64,
    /// How far around the ring the agent has gone so far.
    pub swept_degrees: f64,
    /// For the radial streets spawned outwards.
    pub street: AgentConfig,
}

impl AgentData for ParisData {}

/// Walk once around a circle, spawning streets that lead away from the center.
pub struct ParisStrategy;

impl Strategy for ParisStrategy {
    fn name(&self) -> &'static str {
        "paris"
    }

    fn work(&self, agent: &mut Agent, ctx: &mut GrowthCtx) -> Option<Placement> {
        let data = agent.data::<ParisData>()?.clone();
        if data.radius <= 0.0 {
            return None;
        }
        let step = (agent.config.step_size / data.radius)
            .to_degrees()
            .min(360.0 - data.swept_degrees);
        if step <= 0.0 {
            return None;
        }
        // Positions come from the angle swept so far, so snapping doesn't make the ring drift
        let angle = Angle::degrees(data.start_degrees + data.swept_degrees + step);
        let target = data.center.project_away(data.radius, angle);
        agent.dir = agent.pos.angle_to(target);
        let placement = agent.place_node(target, ctx);
        agent.data_mut::<ParisData>()?.swept_degrees += step;
        Some(placement)
    }

    fn should_die(
        &self,
        agent: &Agent,
        placement: Option<&Placement>,
        map: &RoadNetwork,
    ) -> bool {
        let closed = agent
            .data::<ParisData>()
            .map_or(true, |data| data.swept_degrees >= 360.0 - 1e-9);
        closed || default_should_die(agent, placement, map)
    }

    fn branch(&self, agent: &Agent, _: &Placement, ctx: &mut GrowthCtx) -> Vec<Agent> {
        let data = match agent.data::<ParisData>() {
            Some(data) => data,
            None => return Vec::new(),
        };
        if agent.branch_count >= agent.config.max_branch_count
            || !roll(ctx.rng, agent.config.branch_probability)
        {
            return Vec::new();
        }
        let id = ctx.new_agent_id();
        let outwards = data.center.angle_to(agent.pos);
        let street = agent
            .spawn(id, outwards, data.street.clone(), Rc::new(StreetStrategy))
            .with_priority(agent.priority - 1.0);
        vec![street]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::AgentID;

    #[test]
    fn rings_close() {
        let mut network = RoadNetwork::flat(1000.0, 1000.0);
        let mut rng = XorShiftRng::seed_from_u64(9);
        let mut next_id = 1;
        let mut ctx = GrowthCtx::new(&mut network, &mut rng, &mut next_id);
        let center = Pt2D::new(500.0, 500.0);
        let config = AgentConfig {
            step_size: 20.0,
            snap_radius: 2.0,
            max_step_count: 0,
            branch_probability: 0.0,
            ..AgentConfig::default()
        };
        let strategy = ParisStrategy;
        let mut agent = Agent::new(
            AgentID(0),
            center.project_away(100.0, Angle::ZERO),
            Angle::degrees(90.0),
            config,
            Rc::new(ParisStrategy),
        )
        .with_data(ParisData {
            center,
            radius: 100.0,
            start_degrees: 0.0,
            swept_degrees: 0.0,
            street: AgentConfig::street(),
        });
        strategy.start(&mut agent, &mut ctx);

        let mut steps = 0;
        loop {
            let placement = strategy.work(&mut agent, &mut ctx);
            agent.step_count += 1;
            steps += 1;
            if strategy.should_die(&agent, placement.as_ref(), ctx.network) {
                break;
            }
            assert!(steps < 100);
        }
        // 20m steps around a ring of radius 100 take 32 steps, the last one closing the loop
        assert_eq!(32, steps);
        assert_eq!(32, ctx.network.node_count());
        assert_eq!(32, ctx.network.edge_count());
        for node in ctx.network.all_nodes() {
            assert_eq!(2, node.edges().len());
            assert!((node.pt.dist_to(center) - 100.0).abs() < 1e-6);
        }
        ctx.network.check_invariants().unwrap();
    }
}
