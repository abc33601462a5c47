#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-agent behaviour for the Matrix Maze hunters.
//!
//! Every tick each agent perceives the player, evaluates its state machine,
//! picks its next corridor step and performs combat actions. The system only
//! reads snapshots and emits commands; the world validates and applies them.

use std::{
    f32::consts::{PI, TAU},
    time::Duration,
};

use glam::{EulerRot, Quat, Vec3};
use matrix_maze_core::{
    AgentId, AgentSnapshot, AgentState, AgentTuning, AgentView, ArmPose, Command, Direction, Event,
    PlayerSnapshot, Ray,
};
use matrix_maze_world::{pursue_step, rng_stream, wander_step, NavigationGrid};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const AI_STREAM: u64 = 4;
const ARM_BLEND_RATE: f32 = 10.0;

/// Configuration parameters required to construct the agent AI.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: AgentTuning,
    sight_buffer: f32,
    seed: u64,
}

impl Config {
    /// Creates a configuration from agent tuning, the player radius used to pad
    /// sight lines and the session seed.
    #[must_use]
    pub fn new(tuning: AgentTuning, sight_buffer: f32, seed: u64) -> Self {
        Self {
            tuning,
            sight_buffer,
            seed,
        }
    }
}

/// Pure system that drives every living agent.
#[derive(Debug)]
pub struct AgentAi {
    tuning: AgentTuning,
    sight_buffer: f32,
    rng: ChaCha8Rng,
    clock: Duration,
}

/// Observations feeding one evaluation of the agent state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    /// Whether the agent currently has line of sight to the player.
    pub can_see: bool,
    /// Time since the player was last seen.
    pub time_since_seen: Duration,
    /// Floor-plane distance to the player.
    pub player_distance: f32,
    /// Whether the search countdown has run out.
    pub search_expired: bool,
    /// Whether the agent stands in its goal cell.
    pub reached_goal: bool,
    /// Whether the melee cooldown elapsed and no burst is running.
    pub melee_ready: bool,
}

/// Evaluates one transition of the agent state machine.
#[must_use]
pub fn next_state(state: AgentState, signals: &Signals, tuning: &AgentTuning) -> AgentState {
    let lost = !signals.can_see && signals.time_since_seen > tuning.lose_target();
    let in_reach = signals.player_distance < tuning.melee_range;

    match state {
        AgentState::Patrolling if signals.can_see => AgentState::Attacking,
        AgentState::Attacking if lost => AgentState::Searching,
        AgentState::Attacking if signals.can_see && in_reach => AgentState::Melee,
        AgentState::Searching if signals.can_see => AgentState::Attacking,
        AgentState::Searching if signals.search_expired || signals.reached_goal => {
            AgentState::Patrolling
        }
        AgentState::Melee if signals.melee_ready && signals.can_see && !in_reach => {
            AgentState::Attacking
        }
        AgentState::Melee if lost => AgentState::Searching,
        AgentState::Teleporting => AgentState::Patrolling,
        other => other,
    }
}

/// Whether `eye` is visible from `head` within `view_distance`.
///
/// A wall hit only blocks the view when it lies closer than the target minus
/// `buffer`.
pub fn line_of_sight<F>(
    head: Vec3,
    eye: Vec3,
    view_distance: f32,
    buffer: f32,
    wall_distance: F,
) -> bool
where
    F: Fn(&Ray) -> Option<f32>,
{
    let offset = eye - head;
    let distance = offset.length();
    if distance > view_distance {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }

    wall_distance(&Ray::towards(head, offset)).map_or(true, |hit| hit >= distance - buffer)
}

/// Yaw an agent needs to face along `offset`; zero faces +Z.
#[must_use]
pub fn facing_yaw(offset: Vec3) -> Option<f32> {
    let planar = Vec3::new(offset.x, 0.0, offset.z);
    (planar.length_squared() > 1e-4).then(|| planar.x.atan2(planar.z))
}

/// Rotates `current` toward `desired` by at most `max_step` radians.
#[must_use]
pub fn turn_towards(current: f32, desired: f32, max_step: f32) -> f32 {
    let mut delta = (desired - current) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }

    if delta.abs() <= max_step.max(0.0) {
        desired
    } else {
        current + delta.signum() * max_step
    }
}

/// Next arm pose for an agent in `state`.
///
/// Combat states raise the firing arm to the aim angle. Patrolling agents sway
/// both arms while moving. Everything else relaxes toward neutral.
#[must_use]
pub fn arm_pose(
    current: ArmPose,
    state: AgentState,
    moving: bool,
    clock: Duration,
    dt: Duration,
    tuning: &AgentTuning,
) -> ArmPose {
    let blend = (dt.as_secs_f32() * ARM_BLEND_RATE).min(1.0);
    let lerp = |from: f32, to: f32| from + (to - from) * blend;

    match state {
        AgentState::Attacking | AgentState::Melee => ArmPose {
            left: lerp(current.left, 0.0),
            right: lerp(current.right, tuning.aim_angle),
        },
        AgentState::Patrolling if moving => {
            let swing = (clock.as_secs_f32() * tuning.sway_speed).sin() * tuning.sway_amplitude;
            ArmPose {
                left: swing,
                right: -swing,
            }
        }
        _ => ArmPose {
            left: lerp(current.left, 0.0),
            right: lerp(current.right, 0.0),
        },
    }
}

impl AgentAi {
    /// Creates the AI using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            sight_buffer: config.sight_buffer,
            rng: rng_stream(config.seed, AI_STREAM),
            clock: Duration::ZERO,
        }
    }

    /// Consumes world events and immutable views to emit agent commands.
    ///
    /// Agents only act on batches that advanced time.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        player: &PlayerSnapshot,
        grid: &NavigationGrid,
        wall_distance: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(&Ray) -> Option<f32>,
    {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }
        if dt.is_zero() {
            return;
        }
        self.clock = self.clock.saturating_add(dt);

        for agent in agents.iter() {
            self.drive(agent, dt, player, grid, &wall_distance, out);
        }
    }

    fn drive<F>(
        &mut self,
        agent: &AgentSnapshot,
        dt: Duration,
        player: &PlayerSnapshot,
        grid: &NavigationGrid,
        wall_distance: &F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(&Ray) -> Option<f32>,
    {
        let id = agent.id;
        if !grid.is_path(agent.cell) {
            out.push(Command::TeleportAgent { agent: id });
            return;
        }

        let mut can_see = agent.can_see_player;
        let mut time_since_seen = agent.time_since_seen;
        let mut last_known = agent.last_known_player;
        if agent.state.is_pursuing() || agent.sight_timer.is_elapsed() {
            can_see = player.alive
                && line_of_sight(
                    agent.head,
                    player.eye,
                    self.tuning.view_distance,
                    self.sight_buffer,
                    wall_distance,
                );
            if can_see {
                time_since_seen = Duration::ZERO;
                last_known = Some(player.eye);
            }
            out.push(Command::RecordSighting {
                agent: id,
                player_eye: can_see.then_some(player.eye),
            });
        }

        let near_target =
            planar_distance(agent.position, agent.target_position) < grid.cell_size() * 0.5;
        let signals = Signals {
            can_see,
            time_since_seen,
            player_distance: planar_distance(agent.position, player.eye),
            search_expired: agent.search_timer.is_elapsed(),
            reached_goal: agent.cell == agent.goal && near_target,
            melee_ready: agent.melee_cooldown.is_elapsed() && agent.melee_strikes_remaining == 0,
        };
        let state = next_state(agent.state, &signals, &self.tuning);
        let entered = state != agent.state;
        if entered {
            out.push(Command::TransitionAgent { agent: id, to: state });
        }

        let mut heading = if entered { None } else { agent.direction };
        if state != AgentState::Teleporting
            && heading.is_some()
            && agent.stalled_for > self.tuning.stuck_timeout()
        {
            out.push(Command::TeleportAgent { agent: id });
            return;
        }

        let secs = dt.as_secs_f32();
        let speed = match state {
            AgentState::Patrolling | AgentState::Teleporting => self.tuning.patrol_speed,
            _ => self.tuning.pursuit_speed,
        };

        let mut yaw = agent.yaw;
        match state {
            AgentState::Teleporting => {}
            AgentState::Patrolling => {
                if heading.is_none() || near_target || agent.turn_timer.is_elapsed() {
                    let moves = grid.open_moves(agent.cell);
                    let step = wander_step(&moves, heading, heading.is_none(), &mut self.rng);
                    heading = commit_step(id, heading, step.map(|step| step.direction), out);
                }
                if let Some(direction) = heading {
                    yaw = turn_towards(yaw, direction_yaw(direction), self.tuning.turn_rate * secs);
                }
            }
            AgentState::Attacking | AgentState::Searching | AgentState::Melee => {
                let desired = last_known.and_then(|target| facing_yaw(target - agent.position));
                if let Some(desired) = desired {
                    yaw = turn_towards(yaw, desired, self.tuning.turn_rate * secs);
                }

                let mut goal = agent.goal;
                if entered || agent.retarget_timer.is_elapsed() {
                    if let Some(cell) = last_known.and_then(|target| grid.cell_at(target)) {
                        out.push(Command::SetAgentGoal { agent: id, goal: cell });
                        goal = cell;
                        heading = None;
                    }
                }
                if heading.is_none() || near_target {
                    let moves = grid.open_moves(agent.cell);
                    let step = pursue_step(&moves, heading, goal);
                    heading = commit_step(id, heading, step.map(|step| step.direction), out);
                }

                if state == AgentState::Attacking {
                    self.attempt_fire(agent, entered, can_see, player, out);
                }
                if state == AgentState::Melee {
                    self.attempt_melee(agent, entered, out);
                }
            }
        }

        if yaw != agent.yaw {
            out.push(Command::TurnAgent { agent: id, yaw });
        }
        out.push(Command::AdvanceAgent {
            agent: id,
            distance: speed * secs,
        });

        let moving = heading.is_some() && speed > 0.0;
        let pose = arm_pose(agent.arms, state, moving, self.clock, dt, &self.tuning);
        if pose != agent.arms {
            out.push(Command::PoseAgentArms { agent: id, pose });
        }
    }

    fn attempt_fire(
        &mut self,
        agent: &AgentSnapshot,
        entered: bool,
        can_see: bool,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) {
        let bursting = !entered && agent.melee_strikes_remaining > 0;
        if !can_see || bursting || !agent.fire_cooldown.is_elapsed() {
            return;
        }

        let facing = Vec3::new(agent.yaw.sin(), 0.0, agent.yaw.cos());
        let aim = (player.eye - agent.muzzle).try_normalize().unwrap_or(facing);
        let spread = self.tuning.spread;
        let pitch = (self.rng.gen::<f32>() - 0.5) * spread * 2.0;
        let turn = (self.rng.gen::<f32>() - 0.5) * spread * 2.0;
        let direction = Quat::from_euler(EulerRot::XYZ, pitch, turn, 0.0) * aim;
        out.push(Command::FireAgentWeapon {
            agent: agent.id,
            direction,
        });
    }

    fn attempt_melee(&mut self, agent: &AgentSnapshot, entered: bool, out: &mut Vec<Command>) {
        let (mut strikes, mut strike_ready) = if entered {
            (0, true)
        } else {
            (
                agent.melee_strikes_remaining,
                agent.melee_strike_timer.is_elapsed(),
            )
        };

        if strikes == 0 && agent.melee_cooldown.is_elapsed() {
            let low = self.tuning.melee_burst_min.min(self.tuning.melee_burst_max);
            let high = self.tuning.melee_burst_max.max(low);
            strikes = self.rng.gen_range(low..=high).max(1);
            strike_ready = true;
            out.push(Command::BeginMeleeBurst {
                agent: agent.id,
                strikes,
            });
        }

        if strikes > 0 && strike_ready {
            out.push(Command::MeleeStrike { agent: agent.id });
        }
    }
}

/// Emits the chosen step, or clears a stale heading when no move exists.
fn commit_step(
    agent: AgentId,
    heading: Option<Direction>,
    step: Option<Direction>,
    out: &mut Vec<Command>,
) -> Option<Direction> {
    match step {
        Some(direction) => {
            out.push(Command::StepAgent { agent, direction });
            Some(direction)
        }
        None => {
            if heading.is_some() {
                out.push(Command::ClearAgentDirection { agent });
            }
            None
        }
    }
}

fn direction_yaw(direction: Direction) -> f32 {
    let (dx, dz) = direction.offset();
    (dx as f32).atan2(dz as f32)
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let offset = b - a;
    offset.x.hypot(offset.z)
}
