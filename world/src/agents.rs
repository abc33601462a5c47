//! Authoritative agent records owned by the world.

use std::time::Duration;

use glam::Vec3;
use matrix_maze_core::{
    AgentBody, AgentId, AgentSnapshot, AgentState, AgentTuning, ArmPose, Aabb, CellCoord,
    ColliderHandle, Countdown, Direction, Health, PartKind,
};
use rand::Rng;

use crate::geometry;

/// Distance below which a mover counts as standing on its target.
const ARRIVAL_EPSILON: f32 = 0.05;

#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) state: AgentState,
    pub(crate) health: Health,
    pub(crate) cell: CellCoord,
    pub(crate) goal: CellCoord,
    pub(crate) position: Vec3,
    pub(crate) target_position: Vec3,
    pub(crate) direction: Option<Direction>,
    pub(crate) yaw: f32,
    pub(crate) moving: bool,
    pub(crate) arms: ArmPose,
    pub(crate) can_see_player: bool,
    pub(crate) time_since_seen: Duration,
    pub(crate) last_known_player: Option<Vec3>,
    pub(crate) sight_timer: Countdown,
    pub(crate) fire_cooldown: Countdown,
    pub(crate) melee_cooldown: Countdown,
    pub(crate) melee_strikes_remaining: u8,
    pub(crate) melee_strike_timer: Countdown,
    pub(crate) retarget_timer: Countdown,
    pub(crate) search_timer: Countdown,
    pub(crate) turn_timer: Countdown,
    pub(crate) stalled_for: Duration,
    pub(crate) hit_flash: Countdown,
    pub(crate) health_bar: Countdown,
    pub(crate) parts: [(PartKind, ColliderHandle); 5],
}

impl Agent {
    /// Creates an agent standing on the centre of `cell`.
    ///
    /// Sight, fire and turn timers start at random offsets so a squad spawned
    /// together does not act in lockstep.
    pub(crate) fn spawn<R>(
        id: AgentId,
        cell: CellCoord,
        position: Vec3,
        tuning: &AgentTuning,
        parts: [(PartKind, ColliderHandle); 5],
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let sight = tuning.sight_interval().mul_f32(rng.gen::<f32>());
        let fire = tuning.fire_interval().mul_f32(rng.gen::<f32>());
        let turn = tuning.turn_delay().mul_f32(rng.gen::<f32>());

        Self {
            id,
            state: AgentState::Patrolling,
            health: Health::new(tuning.max_health),
            cell,
            goal: cell,
            position,
            target_position: position,
            direction: None,
            yaw: 0.0,
            moving: false,
            arms: ArmPose::default(),
            can_see_player: false,
            time_since_seen: Duration::ZERO,
            last_known_player: None,
            sight_timer: Countdown::new(sight),
            fire_cooldown: Countdown::new(fire),
            melee_cooldown: Countdown::expired(),
            melee_strikes_remaining: 0,
            melee_strike_timer: Countdown::expired(),
            retarget_timer: Countdown::expired(),
            search_timer: Countdown::expired(),
            turn_timer: Countdown::new(turn),
            stalled_for: Duration::ZERO,
            hit_flash: Countdown::expired(),
            health_bar: Countdown::expired(),
            parts,
        }
    }

    pub(crate) fn tick(&mut self, dt: Duration, stall_distance: f32) {
        for timer in [
            &mut self.sight_timer,
            &mut self.fire_cooldown,
            &mut self.melee_cooldown,
            &mut self.melee_strike_timer,
            &mut self.retarget_timer,
            &mut self.search_timer,
            &mut self.turn_timer,
            &mut self.hit_flash,
            &mut self.health_bar,
        ] {
            timer.advance(dt);
        }

        if !self.can_see_player {
            self.time_since_seen = self.time_since_seen.saturating_add(dt);
        }

        let far = planar_distance(self.position, self.target_position) > stall_distance;
        if self.direction.is_some() && far {
            self.stalled_for = self.stalled_for.saturating_add(dt);
        } else {
            self.stalled_for = Duration::ZERO;
        }
    }

    /// Switches state, returning the previous state when it changed.
    pub(crate) fn enter(&mut self, to: AgentState, tuning: &AgentTuning) -> Option<AgentState> {
        let from = self.state;
        if from == to {
            return None;
        }

        self.state = to;
        self.direction = None;
        match to {
            AgentState::Searching => {
                self.search_timer.reset(tuning.search());
                self.retarget_timer = Countdown::expired();
            }
            AgentState::Patrolling => self.turn_timer = Countdown::expired(),
            AgentState::Melee => {
                self.melee_strikes_remaining = 0;
                self.melee_strike_timer = Countdown::expired();
                self.retarget_timer = Countdown::expired();
            }
            AgentState::Attacking => self.retarget_timer = Countdown::expired(),
            AgentState::Teleporting => {}
        }
        Some(from)
    }

    /// Moves toward the target position by at most `distance`.
    pub(crate) fn advance(&mut self, distance: f32) {
        self.moving = approach(
            &mut self.position,
            self.target_position,
            &mut self.direction,
            distance,
        );
    }

    pub(crate) fn snapshot(&self, tuning: &AgentTuning) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            state: self.state,
            health: self.health,
            cell: self.cell,
            goal: self.goal,
            position: self.position,
            target_position: self.target_position,
            direction: self.direction,
            yaw: self.yaw,
            moving: self.moving,
            arms: self.arms,
            can_see_player: self.can_see_player,
            time_since_seen: self.time_since_seen,
            last_known_player: self.last_known_player,
            sight_timer: self.sight_timer,
            fire_cooldown: self.fire_cooldown,
            melee_cooldown: self.melee_cooldown,
            melee_strikes_remaining: self.melee_strikes_remaining,
            melee_strike_timer: self.melee_strike_timer,
            retarget_timer: self.retarget_timer,
            search_timer: self.search_timer,
            turn_timer: self.turn_timer,
            stalled_for: self.stalled_for,
            hit_flash: self.hit_flash,
            health_bar: self.health_bar,
            head: geometry::head_point(tuning, self.position),
            muzzle: geometry::muzzle_point(tuning, self.position, self.yaw, self.arms),
        }
    }

    pub(crate) fn body(&self, tuning: &AgentTuning) -> AgentBody {
        let parts = geometry::body_parts(tuning, self.position, self.yaw, self.arms, &self.parts);
        let bounds = parts
            .iter()
            .map(|part| part.bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb::new(self.position, self.position));
        AgentBody {
            agent: self.id,
            bounds,
            parts,
        }
    }
}

/// Moves `position` toward `target`, snapping and clearing `direction` on arrival.
///
/// Returns whether the position changed. Nothing moves without a direction.
pub(crate) fn approach(
    position: &mut Vec3,
    target: Vec3,
    direction: &mut Option<Direction>,
    distance: f32,
) -> bool {
    if direction.is_none() {
        return false;
    }

    let offset = target - *position;
    let remaining = offset.length();
    if remaining <= ARRIVAL_EPSILON || distance >= remaining {
        *position = target;
        *direction = None;
        return remaining > ARRIVAL_EPSILON;
    }

    let step = distance.max(0.0);
    *position += offset / remaining * step;
    step > 0.0
}

/// Distance between two points ignoring height.
pub(crate) fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let offset = b - a;
    offset.x.hypot(offset.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agent() -> Agent {
        let tuning = AgentTuning::default();
        let parts = geometry::PART_KINDS
            .map(|kind| (kind, ColliderHandle::new(0)));
        Agent::spawn(
            AgentId::new(1),
            CellCoord::new(1, 1),
            Vec3::ZERO,
            &tuning,
            parts,
            &mut ChaCha8Rng::seed_from_u64(0),
        )
    }

    #[test]
    fn spawn_jitters_timers_within_their_period() {
        let tuning = AgentTuning::default();
        let agent = agent();
        assert!(agent.sight_timer.remaining() <= tuning.sight_interval());
        assert!(agent.fire_cooldown.remaining() <= tuning.fire_interval());
        assert!(agent.turn_timer.remaining() <= tuning.turn_delay());
        assert_eq!(agent.health, Health::new(tuning.max_health));
    }

    #[test]
    fn entering_a_state_clears_direction_and_resets_timers() {
        let tuning = AgentTuning::default();
        let mut agent = agent();
        agent.direction = Some(Direction::East);
        agent.melee_strikes_remaining = 3;

        assert_eq!(agent.enter(AgentState::Melee, &tuning), Some(AgentState::Patrolling));
        assert_eq!(agent.direction, None);
        assert_eq!(agent.melee_strikes_remaining, 0);

        assert_eq!(agent.enter(AgentState::Searching, &tuning), Some(AgentState::Melee));
        assert_eq!(agent.search_timer.remaining(), tuning.search());
        assert_eq!(agent.enter(AgentState::Searching, &tuning), None);
    }

    #[test]
    fn advance_snaps_on_arrival() {
        let mut agent = agent();
        agent.direction = Some(Direction::East);
        agent.target_position = Vec3::new(10.0, 0.0, 0.0);

        agent.advance(4.0);
        assert!((agent.position.x - 4.0).abs() < 1e-5);
        assert!(agent.moving);

        agent.advance(100.0);
        assert_eq!(agent.position, agent.target_position);
        assert_eq!(agent.direction, None);

        agent.advance(5.0);
        assert!(!agent.moving);
    }

    #[test]
    fn stalling_accumulates_only_while_heading_somewhere_far() {
        let mut agent = agent();
        agent.target_position = Vec3::new(20.0, 0.0, 0.0);
        agent.tick(Duration::from_millis(500), 5.0);
        assert_eq!(agent.stalled_for, Duration::ZERO);

        agent.direction = Some(Direction::East);
        agent.tick(Duration::from_millis(500), 5.0);
        agent.tick(Duration::from_millis(500), 5.0);
        assert_eq!(agent.stalled_for, Duration::from_secs(1));
    }
}
