//! In-flight projectiles.

use std::time::Duration;

use glam::Vec3;
use matrix_maze_core::{ProjectileId, ProjectileOwner, ProjectileSnapshot};

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) owner: ProjectileOwner,
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) radius: f32,
    pub(crate) damage: u32,
    pub(crate) remaining: Duration,
}

impl Projectile {
    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            owner: self.owner,
            position: self.position,
            velocity: self.velocity,
            radius: self.radius,
            damage: self.damage,
            remaining: self.remaining,
        }
    }
}
