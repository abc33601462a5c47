#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player movement clamped against wall geometry.
//!
//! Four horizontal probes (forward, backward, left, right) are cast from body
//! height. Movement components heading into a blocked probe are removed, which
//! lets the player slide along walls. A second pass with a shorter radius
//! pushes the player back out of any wall it still overlaps.

use std::time::Duration;

use glam::Vec3;
use matrix_maze_core::{Command, Event, PlayerSnapshot, PlayerTuning, Ray};

/// Movement keys held during a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveIntent {
    /// Move along the view direction.
    pub forward: bool,
    /// Move against the view direction.
    pub backward: bool,
    /// Strafe left.
    pub left: bool,
    /// Strafe right.
    pub right: bool,
    /// Use the run speed instead of the walk speed.
    pub run: bool,
}

impl MoveIntent {
    /// Whether any movement key is held.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right)
    }

    /// Floor-plane displacement of length `distance` for the held keys.
    #[must_use]
    pub fn displacement(&self, forward: Vec3, distance: f32) -> Vec3 {
        let (forward, right) = basis(forward);
        let axis = |positive: bool, negative: bool| {
            f32::from(u8::from(positive)) - f32::from(u8::from(negative))
        };
        let wish =
            forward * axis(self.forward, self.backward) + right * axis(self.right, self.left);
        wish.normalize_or_zero() * distance
    }
}

/// Configuration parameters required to construct the collision probe.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: PlayerTuning,
}

impl Config {
    /// Creates a configuration from the player tuning table.
    #[must_use]
    pub const fn new(tuning: PlayerTuning) -> Self {
        Self { tuning }
    }
}

/// Pure system that turns movement intent into clamped player displacement.
#[derive(Debug)]
pub struct CollisionProbe {
    tuning: PlayerTuning,
}

impl CollisionProbe {
    /// Creates the probe using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
        }
    }

    /// Consumes world events and the player view to emit movement commands.
    pub fn handle<W>(
        &mut self,
        events: &[Event],
        intent: MoveIntent,
        player: &PlayerSnapshot,
        wall_distance: W,
        out: &mut Vec<Command>,
    ) where
        W: Fn(&Ray) -> Option<f32>,
    {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }
        if dt.is_zero() || !player.alive {
            return;
        }

        let speed = if intent.run {
            self.tuning.run_speed
        } else {
            self.tuning.walk_speed
        };
        let forward = player.forward();
        let origin = self.probe_origin(player.eye);
        let desired = intent.displacement(forward, speed * dt.as_secs_f32());

        let allowed = self.plan_move(origin, forward, desired, &wall_distance);
        if allowed != Vec3::ZERO {
            out.push(Command::MovePlayer {
                displacement: allowed,
            });
        }

        let correction = self.resolve_penetration(origin + allowed, forward, &wall_distance);
        if correction != Vec3::ZERO {
            out.push(Command::NudgePlayer { correction });
        }
    }

    /// Removes the components of `desired` that head into a blocked probe.
    pub fn plan_move<W>(
        &self,
        origin: Vec3,
        forward: Vec3,
        desired: Vec3,
        wall_distance: &W,
    ) -> Vec3
    where
        W: Fn(&Ray) -> Option<f32>,
    {
        if !desired.is_finite() {
            return Vec3::ZERO;
        }
        let (forward, right) = basis(forward);
        let buffer = self.tuning.probe_buffer();
        let blocked = |direction: Vec3| {
            wall_distance(&Ray::towards(origin, direction))
                .is_some_and(|distance| distance < buffer)
        };

        let mut allowed = Vec3::new(desired.x, 0.0, desired.z);
        let along = allowed.dot(forward);
        let across = allowed.dot(right);
        if (along > 0.0 && blocked(forward)) || (along < 0.0 && blocked(-forward)) {
            allowed -= forward * along;
        }
        if (across > 0.0 && blocked(right)) || (across < 0.0 && blocked(-right)) {
            allowed -= right * across;
        }
        allowed
    }

    /// Push-out correction for walls closer than the penetration radius.
    pub fn resolve_penetration<W>(&self, origin: Vec3, forward: Vec3, wall_distance: &W) -> Vec3
    where
        W: Fn(&Ray) -> Option<f32>,
    {
        let (forward, right) = basis(forward);
        let radius = self.tuning.penetration_radius();
        let push = self.tuning.penetration_push_factor;

        [forward, -forward, -right, right]
            .into_iter()
            .filter_map(|direction| {
                let distance = wall_distance(&Ray::towards(origin, direction))?;
                (distance < radius).then(|| -direction * (radius - distance) * push)
            })
            .sum()
    }

    fn probe_origin(&self, eye: Vec3) -> Vec3 {
        let floor = eye.y - self.tuning.eye_height;
        Vec3::new(eye.x, floor + self.tuning.probe_height(), eye.z)
    }
}

/// Horizontal forward and right unit vectors for a facing direction.
fn basis(forward: Vec3) -> (Vec3, Vec3) {
    let forward = Vec3::new(forward.x, 0.0, forward.z)
        .try_normalize()
        .unwrap_or(Vec3::NEG_Z);
    (forward, Vec3::new(-forward.z, 0.0, forward.x))
}
