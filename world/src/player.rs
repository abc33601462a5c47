//! Player body, health and weapon state.

use std::{f32::consts::FRAC_PI_2, time::Duration};

use glam::Vec3;
use matrix_maze_core::{Countdown, Health, PlayerSnapshot, WeaponTuning};

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) eye: Vec3,
    pub(crate) yaw: f32,
    pub(crate) pitch: f32,
    pub(crate) health: Health,
    pub(crate) max_health: Health,
    pub(crate) rounds: u32,
    pub(crate) clip_size: u32,
    pub(crate) reload: Option<Countdown>,
    pub(crate) fire_cooldown: Countdown,
}

/// Weapon state change produced by a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WeaponTick {
    Idle,
    Reloaded(u32),
}

impl Player {
    pub(crate) fn new(eye: Vec3, yaw: f32, max_health: u32, weapon: &WeaponTuning) -> Self {
        Self {
            eye,
            yaw,
            pitch: 0.0,
            health: Health::new(max_health),
            max_health: Health::new(max_health),
            rounds: weapon.clip_size,
            clip_size: weapon.clip_size,
            reload: None,
            fire_cooldown: Countdown::expired(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }

    pub(crate) fn tick(&mut self, dt: Duration) -> WeaponTick {
        self.fire_cooldown.advance(dt);
        let Some(reload) = self.reload.as_mut() else {
            return WeaponTick::Idle;
        };
        reload.advance(dt);
        if !reload.is_elapsed() {
            return WeaponTick::Idle;
        }

        self.reload = None;
        self.rounds = self.clip_size;
        WeaponTick::Reloaded(self.rounds)
    }

    pub(crate) fn look(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.yaw = yaw;
        }
        if pitch.is_finite() {
            self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
    }

    /// Starts a reload unless one is running or the magazine is full.
    pub(crate) fn start_reload(&mut self, weapon: &WeaponTuning) -> bool {
        if self.reload.is_some() || self.rounds >= self.clip_size {
            return false;
        }
        self.reload = Some(Countdown::new(weapon.reload_time()));
        true
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            eye: self.eye,
            yaw: self.yaw,
            pitch: self.pitch,
            health: self.health,
            max_health: self.max_health,
            alive: self.is_alive(),
            rounds: self.rounds,
            clip_size: self.clip_size,
            reload_remaining: self.reload.map(|reload| reload.remaining()),
            fire_cooldown: self.fire_cooldown,
        }
    }
}

/// Yaw that makes the player face along `direction` on the floor plane.
pub(crate) fn yaw_facing(direction: Vec3) -> f32 {
    (-direction.x).atan2(-direction.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_refills_after_its_duration() {
        let weapon = WeaponTuning::default();
        let mut player = Player::new(Vec3::ZERO, 0.0, 100, &weapon);
        assert!(!player.start_reload(&weapon), "full magazine needs no reload");

        player.rounds = 3;
        assert!(player.start_reload(&weapon));
        assert!(!player.start_reload(&weapon), "reload already running");
        assert_eq!(player.tick(Duration::from_secs(1)), WeaponTick::Idle);
        assert_eq!(player.tick(Duration::from_secs(1)), WeaponTick::Reloaded(12));
        assert_eq!(player.rounds, 12);
        assert!(player.reload.is_none());
    }

    #[test]
    fn pitch_is_clamped_and_nan_is_ignored() {
        let mut player = Player::new(Vec3::ZERO, 0.0, 100, &WeaponTuning::default());
        player.look(f32::NAN, 10.0);
        assert_eq!(player.yaw, 0.0);
        assert!(player.pitch < FRAC_PI_2);
    }

    #[test]
    fn yaw_facing_inverts_forward() {
        for direction in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z] {
            let yaw = yaw_facing(direction);
            let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
            assert!((forward - direction).length() < 1e-5, "{direction:?}");
        }
    }
}
