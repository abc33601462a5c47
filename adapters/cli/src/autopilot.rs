//! Scripted player input for headless runs.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use matrix_maze_core::Ray;
use matrix_maze_session::FrameInput;
use matrix_maze_world::{query, World};

/// Frames between voluntary turns into side corridors.
const WANDER_PERIOD: u64 = 90;
/// Furthest agent the autopilot engages.
const ENGAGE_DISTANCE: f32 = 200.0;

/// Walks the corridors, shoots visible agents and heads for the exit once it
/// opens.
#[derive(Debug)]
pub(crate) struct Autopilot {
    yaw: f32,
    frame: u64,
    prefer_left: bool,
}

impl Autopilot {
    pub(crate) fn new(world: &World) -> Self {
        Self {
            yaw: query::player(world).yaw,
            frame: 0,
            prefer_left: true,
        }
    }

    pub(crate) fn input(&mut self, world: &World) -> FrameInput {
        self.frame = self.frame.wrapping_add(1);
        let player = query::player(world);
        let mut input = FrameInput {
            reload: player.rounds == 0 && player.reload_remaining.is_none(),
            ..FrameInput::default()
        };

        if let Some(target) = visible_agent(world) {
            input.yaw = yaw_towards(target - player.eye);
            input.fire = player.rounds > 0;
            return input;
        }

        if let Some(exit) = query::exit_marker(world) {
            input.yaw = yaw_towards(exit - player.eye);
            input.forward = true;
            return input;
        }

        self.explore(world, player.eye);
        input.yaw = self.yaw;
        input.forward = true;
        input
    }

    fn explore(&mut self, world: &World, eye: Vec3) {
        self.yaw = (self.yaw / FRAC_PI_2).round() * FRAC_PI_2;
        let span = query::navigation(world).cell_span();
        let clearance = |yaw: f32| {
            query::wall_distance(world, &Ray::towards(eye, forward(yaw))).unwrap_or(f32::INFINITY)
        };

        let (first, second) = if self.prefer_left {
            (FRAC_PI_2, -FRAC_PI_2)
        } else {
            (-FRAC_PI_2, FRAC_PI_2)
        };

        if clearance(self.yaw) < span * 0.6 {
            let turn = [first, second, PI]
                .into_iter()
                .max_by(|a, b| clearance(self.yaw + a).total_cmp(&clearance(self.yaw + b)))
                .unwrap_or(PI);
            self.yaw += turn;
            return;
        }

        if self.frame % WANDER_PERIOD == 0 && clearance(self.yaw + first) > span {
            self.yaw += first;
            self.prefer_left = !self.prefer_left;
        }
    }
}

fn visible_agent(world: &World) -> Option<Vec3> {
    let eye = query::player(world).eye;
    query::agent_view(world)
        .iter()
        .map(|agent| Vec3::new(agent.position.x, eye.y, agent.position.z))
        .filter(|target| {
            let distance = target.distance(eye);
            distance < ENGAGE_DISTANCE
                && query::wall_distance(world, &Ray::towards(eye, *target - eye))
                    .map_or(true, |hit| hit >= distance)
        })
        .min_by(|a, b| a.distance(eye).total_cmp(&b.distance(eye)))
}

fn forward(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

fn yaw_towards(offset: Vec3) -> f32 {
    (-offset.x).atan2(-offset.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_maze_core::{CellCoord, Command, SimulationConfig};
    use matrix_maze_world::{self as world, NavigationGrid};

    const ELBOW: &str = "
        #####
        #...#
        #.###
        #####
    ";

    fn elbow() -> World {
        let grid = NavigationGrid::from_ascii(ELBOW, 2, 10.0).expect("layout parses");
        World::with_grid(SimulationConfig::default(), grid)
    }

    #[test]
    fn yaw_points_the_view_at_the_offset() {
        for offset in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z] {
            assert!(forward(yaw_towards(offset)).distance(offset) < 1e-5);
        }
    }

    #[test]
    fn visible_agent_is_engaged() {
        let mut world = elbow();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SpawnAgent {
                cell: CellCoord::new(3, 1),
            },
            &mut events,
        );
        let mut autopilot = Autopilot::new(&world);

        let input = autopilot.input(&world);

        assert!(input.fire);
        assert!(!input.forward);
        assert!((forward(input.yaw) - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn dead_end_turns_towards_open_corridor() {
        let mut world = elbow();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SetPlayerView {
                yaw: 0.0,
                pitch: 0.0,
            },
            &mut events,
        );
        let mut autopilot = Autopilot::new(&world);

        let input = autopilot.input(&world);

        assert!(input.forward);
        let heading = forward(input.yaw);
        let open = heading.distance(Vec3::X) < 1e-4 || heading.distance(Vec3::Z) < 1e-4;
        assert!(open, "turned into a wall: {heading:?}");
    }
}
