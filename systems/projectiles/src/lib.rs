#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Projectile flight and hit resolution.
//!
//! Each tick a projectile travels one segment. The segment is tested against
//! the walls first, then against agent body parts (player shots) or the player
//! sphere (agent shots). At most one outcome is reported per projectile.

use std::time::Duration;

use glam::Vec3;
use matrix_maze_core::{
    Aabb, AgentBody, AgentId, ColliderHandle, ColliderOwner, Command, Event, PlayerSnapshot,
    ProjectileOutcome, ProjectileOwner, ProjectileSnapshot, Ray,
};

/// Player sphere inflation applied to agent shots.
const PLAYER_SPHERE_FACTOR: f32 = 1.1;

/// Configuration parameters required to construct the projectile system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    player_radius: f32,
    part_margin: f32,
}

impl Config {
    /// Creates a configuration from the player radius and the extra reach
    /// granted when testing agent body parts.
    #[must_use]
    pub const fn new(player_radius: f32, part_margin: f32) -> Self {
        Self {
            player_radius,
            part_margin,
        }
    }
}

/// Pure system that advances projectiles and reports their outcomes.
#[derive(Debug)]
pub struct Projectiles {
    player_radius: f32,
    part_margin: f32,
}

impl Projectiles {
    /// Creates the system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            player_radius: config.player_radius,
            part_margin: config.part_margin,
        }
    }

    /// Consumes world events and immutable views to emit projectile commands.
    pub fn handle<W, O>(
        &mut self,
        events: &[Event],
        projectiles: &[ProjectileSnapshot],
        bodies: &[AgentBody],
        player: &PlayerSnapshot,
        wall_distance: W,
        collider_owner: O,
        out: &mut Vec<Command>,
    ) where
        W: Fn(&Ray) -> Option<f32>,
        O: Fn(ColliderHandle) -> Option<ColliderOwner>,
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

        for projectile in projectiles {
            let next = projectile.position + projectile.velocity * dt.as_secs_f32();
            out.push(Command::AdvanceProjectile {
                projectile: projectile.id,
                position: next,
                elapsed: dt,
            });

            let outcome = self
                .trace(projectile, next, bodies, player, &wall_distance, &collider_owner)
                .or_else(|| (projectile.remaining <= dt).then_some(ProjectileOutcome::Expired));
            if let Some(outcome) = outcome {
                out.push(Command::ResolveProjectile {
                    projectile: projectile.id,
                    outcome,
                });
            }
        }
    }

    fn trace<W, O>(
        &self,
        projectile: &ProjectileSnapshot,
        next: Vec3,
        bodies: &[AgentBody],
        player: &PlayerSnapshot,
        wall_distance: &W,
        collider_owner: &O,
    ) -> Option<ProjectileOutcome>
    where
        W: Fn(&Ray) -> Option<f32>,
        O: Fn(ColliderHandle) -> Option<ColliderOwner>,
    {
        let segment = next - projectile.position;
        let length = segment.length();
        if length <= f32::EPSILON {
            return None;
        }
        let ray = Ray::towards(projectile.position, segment);
        let radius = projectile.radius;

        if wall_distance(&ray).is_some_and(|distance| distance <= length + radius) {
            return Some(ProjectileOutcome::HitWall);
        }

        match projectile.owner {
            ProjectileOwner::Player => {
                let reach = length + radius + self.part_margin;
                struck_agent(&ray, reach, bodies, collider_owner)
                    .map(|agent| ProjectileOutcome::HitAgent { agent })
            }
            ProjectileOwner::Agent(_) => {
                if !player.alive {
                    return None;
                }
                let sphere = self.player_radius * PLAYER_SPHERE_FACTOR + radius;
                let reach = length + radius + self.player_radius;
                ray.intersect_sphere(player.eye, sphere)
                    .filter(|distance| *distance <= reach)
                    .map(|_| ProjectileOutcome::HitPlayer)
            }
        }
    }
}

/// Nearest agent whose body part lies within `reach` along the ray.
///
/// Bodies whose overall bounds the ray misses are skipped without testing
/// their parts. Parts whose collider no longer maps to an agent are ignored.
fn struck_agent<O>(
    ray: &Ray,
    reach: f32,
    bodies: &[AgentBody],
    collider_owner: &O,
) -> Option<AgentId>
where
    O: Fn(ColliderHandle) -> Option<ColliderOwner>,
{
    let mut nearest = None;
    for body in bodies {
        if box_distance(ray, &body.bounds).is_none() {
            continue;
        }
        for part in &body.parts {
            let Some(distance) = box_distance(ray, &part.bounds) else {
                continue;
            };
            if distance > reach {
                continue;
            }
            let Some(ColliderOwner::Agent { agent, .. }) = collider_owner(part.handle) else {
                continue;
            };
            if nearest.map_or(true, |(closest, _)| distance < closest) {
                nearest = Some((distance, agent));
            }
        }
    }
    nearest.map(|(_, agent)| agent)
}

fn box_distance(ray: &Ray, bounds: &Aabb) -> Option<f32> {
    if bounds.contains(ray.origin()) {
        return Some(0.0);
    }
    ray.intersect_aabb(bounds)
}
