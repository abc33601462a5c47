//! Tunable parameters for every simulation component, loadable from TOML.

use std::{f32::consts, time::Duration};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Maze dimensions must be odd so walls and corridors alternate.
    #[error("maze dimensions must be odd and at least 5, got {width}x{height}")]
    MazeDimensions {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
    },
    /// A size, speed or scale was zero, negative or not finite.
    #[error("`{field}` must be positive and finite, got {value}")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// A duration or distance was negative or not finite.
    #[error("`{field}` must be finite and non-negative, got {value}")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// A probability fell outside the unit interval.
    #[error("`{field}` must lie within [0, 1], got {value}")]
    Probability {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// The melee burst range does not contain any strike count.
    #[error("melee burst range {min}..={max} must be non-empty and start above zero")]
    MeleeBurst {
        /// Smallest burst length.
        min: u8,
        /// Largest burst length.
        max: u8,
    },
}

/// Every tunable of a simulation session.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed from which every random stream is derived.
    pub seed: u64,
    /// Maze layout and wall geometry.
    pub maze: MazeTuning,
    /// Player body and movement.
    pub player: PlayerTuning,
    /// Player weapon.
    pub weapon: WeaponTuning,
    /// Projectile flight.
    pub projectile: ProjectileTuning,
    /// Agent body, perception and combat.
    pub agent: AgentTuning,
    /// Wandering pickups.
    pub pickup: PickupTuning,
    /// Session-level rules.
    pub session: SessionTuning,
}

impl SimulationConfig {
    /// Parses a TOML document and validates the result.
    ///
    /// Tables and fields absent from the document keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy of the configuration using the provided seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that every tunable lies within its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let maze = &self.maze;
        if maze.width < 5 || maze.height < 5 || maze.width % 2 == 0 || maze.height % 2 == 0 {
            return Err(ConfigError::MazeDimensions {
                width: maze.width,
                height: maze.height,
            });
        }
        if maze.grid_scale == 0 {
            return Err(ConfigError::NotPositive {
                field: "maze.grid_scale",
                value: 0.0,
            });
        }

        for (field, value) in [
            ("maze.cell_size", maze.cell_size),
            ("maze.wall_height", maze.wall_height),
            ("maze.short_wall_height", maze.short_wall_height),
            ("player.eye_height", self.player.eye_height),
            ("player.radius", self.player.radius),
            ("projectile.speed", self.projectile.speed),
            ("projectile.player_size", self.projectile.player_size),
            ("projectile.agent_size", self.projectile.agent_size),
            ("agent.body_width", self.agent.body_width),
            ("agent.body_height", self.agent.body_height),
            ("agent.head_size", self.agent.head_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("player.walk_speed", self.player.walk_speed),
            ("player.run_speed", self.player.run_speed),
            ("weapon.reload_secs", self.weapon.reload_secs),
            ("weapon.fire_interval_secs", self.weapon.fire_interval_secs),
            ("projectile.lifetime_secs", self.projectile.lifetime_secs),
            ("agent.patrol_speed", self.agent.patrol_speed),
            ("agent.pursuit_speed", self.agent.pursuit_speed),
            ("agent.turn_delay_secs", self.agent.turn_delay_secs),
            ("agent.stuck_timeout_secs", self.agent.stuck_timeout_secs),
            ("agent.sight_interval_secs", self.agent.sight_interval_secs),
            ("agent.view_distance", self.agent.view_distance),
            ("agent.lose_target_secs", self.agent.lose_target_secs),
            ("agent.search_secs", self.agent.search_secs),
            ("agent.turn_rate", self.agent.turn_rate),
            ("agent.fire_interval_secs", self.agent.fire_interval_secs),
            ("agent.spread", self.agent.spread),
            ("agent.melee_range", self.agent.melee_range),
            ("agent.melee_cooldown_secs", self.agent.melee_cooldown_secs),
            (
                "agent.melee_strike_interval_secs",
                self.agent.melee_strike_interval_secs,
            ),
            ("agent.retarget_secs", self.agent.retarget_secs),
            ("agent.contact_distance", self.agent.contact_distance),
            ("pickup.lifetime_secs", self.pickup.lifetime_secs),
            ("pickup.spawn_interval_secs", self.pickup.spawn_interval_secs),
            ("pickup.reveal_secs", self.pickup.reveal_secs),
            ("pickup.collect_distance", self.pickup.collect_distance),
            ("pickup.speed", self.pickup.speed),
            ("pickup.stuck_timeout_secs", self.pickup.stuck_timeout_secs),
            ("pickup.turn_delay_secs", self.pickup.turn_delay_secs),
            ("session.exit_reach_distance", self.session.exit_reach_distance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("maze.short_wall_chance", maze.short_wall_chance),
            ("maze.cross_connection_chance", maze.cross_connection_chance),
            ("pickup.arrival_fraction", self.pickup.arrival_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { field, value });
            }
        }

        let agent = &self.agent;
        if agent.melee_burst_min == 0 || agent.melee_burst_min > agent.melee_burst_max {
            return Err(ConfigError::MeleeBurst {
                min: agent.melee_burst_min,
                max: agent.melee_burst_max,
            });
        }

        Ok(())
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

/// Maze layout and wall geometry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MazeTuning {
    /// Number of maze cells along the X axis. Must be odd.
    pub width: u32,
    /// Number of maze cells along the Z axis. Must be odd.
    pub height: u32,
    /// Wall blocks per maze cell edge.
    pub grid_scale: u32,
    /// Edge length of a single wall block in world units.
    pub cell_size: f32,
    /// Height of a regular wall block.
    pub wall_height: f32,
    /// Height of a short wall block.
    pub short_wall_height: f32,
    /// Probability that an interior wall block is short.
    pub short_wall_chance: f32,
    /// Probability of carving an extra corridor between visited cells.
    pub cross_connection_chance: f32,
}

impl Default for MazeTuning {
    fn default() -> Self {
        Self {
            width: 17,
            height: 17,
            grid_scale: 2,
            cell_size: 10.0,
            wall_height: 24.0,
            short_wall_height: 8.0,
            short_wall_chance: 0.08,
            cross_connection_chance: 0.25,
        }
    }
}

impl MazeTuning {
    /// Edge length of a maze cell in world units.
    #[must_use]
    pub fn cell_span(&self) -> f32 {
        self.grid_scale as f32 * self.cell_size
    }
}

/// Player body and movement.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerTuning {
    /// Height of the eye above the floor.
    pub eye_height: f32,
    /// Radius of the player's body.
    pub radius: f32,
    /// Hit points at the start of a session.
    pub max_health: u32,
    /// Movement speed while walking.
    pub walk_speed: f32,
    /// Movement speed while running.
    pub run_speed: f32,
    /// Fraction of the eye height that collision probes are cast from.
    pub probe_height_factor: f32,
    /// Multiple of the radius within which a wall blocks movement.
    pub probe_buffer_factor: f32,
    /// Multiple of the radius within which a wall pushes the player out.
    pub penetration_radius_factor: f32,
    /// Amplification applied to penetration push-outs.
    pub penetration_push_factor: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            eye_height: 12.0,
            radius: 5.0,
            max_health: 100,
            walk_speed: 25.0,
            run_speed: 50.0,
            probe_height_factor: 0.5,
            probe_buffer_factor: 1.2,
            penetration_radius_factor: 0.95,
            penetration_push_factor: 1.1,
        }
    }
}

impl PlayerTuning {
    /// Height above the floor that collision probes are cast from.
    #[must_use]
    pub fn probe_height(&self) -> f32 {
        self.eye_height * self.probe_height_factor
    }

    /// Distance within which a wall blocks movement along a probe.
    #[must_use]
    pub fn probe_buffer(&self) -> f32 {
        self.radius * self.probe_buffer_factor
    }

    /// Distance within which a wall pushes the player out.
    #[must_use]
    pub fn penetration_radius(&self) -> f32 {
        self.radius * self.penetration_radius_factor
    }
}

/// Player weapon.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaponTuning {
    /// Rounds in a full magazine.
    pub clip_size: u32,
    /// Seconds needed to refill the magazine.
    pub reload_secs: f32,
    /// Minimum seconds between shots.
    pub fire_interval_secs: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            clip_size: 12,
            reload_secs: 1.5,
            fire_interval_secs: 0.15,
        }
    }
}

impl WeaponTuning {
    /// Time needed to refill the magazine.
    #[must_use]
    pub fn reload_time(&self) -> Duration {
        seconds(self.reload_secs)
    }

    /// Minimum time between shots.
    #[must_use]
    pub fn fire_interval(&self) -> Duration {
        seconds(self.fire_interval_secs)
    }
}

/// Projectile flight.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectileTuning {
    /// Speed in world units per second.
    pub speed: f32,
    /// Seconds a projectile survives without hitting anything.
    pub lifetime_secs: f32,
    /// Diameter of player projectiles.
    pub player_size: f32,
    /// Diameter of agent projectiles.
    pub agent_size: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 800.0,
            lifetime_secs: 2.0,
            player_size: 0.08,
            agent_size: 0.144,
        }
    }
}

impl ProjectileTuning {
    /// Time a projectile survives without hitting anything.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        seconds(self.lifetime_secs)
    }

    /// Collision radius of player projectiles.
    #[must_use]
    pub fn player_radius(&self) -> f32 {
        self.player_size * 0.5
    }

    /// Collision radius of agent projectiles.
    #[must_use]
    pub fn agent_radius(&self) -> f32 {
        self.agent_size * 0.5
    }
}

/// Agent body, perception and combat.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentTuning {
    /// Agents spawned at the start of a session.
    pub count: u32,
    /// Hit points of a fresh agent.
    pub max_health: u32,
    /// Movement speed while patrolling.
    pub patrol_speed: f32,
    /// Movement speed in every pursuing state.
    pub pursuit_speed: f32,
    /// Torso width.
    pub body_width: f32,
    /// Torso height.
    pub body_height: f32,
    /// Torso depth as a fraction of its width.
    pub body_depth_factor: f32,
    /// Edge length of the head cube.
    pub head_size: f32,
    /// Length of an arm.
    pub arm_length: f32,
    /// Thickness of an arm.
    pub arm_width: f32,
    /// Lateral distance of each shoulder from the centre line.
    pub arm_offset_x: f32,
    /// Height of the shoulder pivot.
    pub arm_pivot_y: f32,
    /// Distance past the hand where projectiles leave the weapon.
    pub muzzle_offset: f32,
    /// Seconds between direction re-rolls while patrolling.
    pub turn_delay_secs: f32,
    /// Seconds without reaching a target before the agent is recovered.
    pub stuck_timeout_secs: f32,
    /// Distance to the player eye at which touching an agent is fatal.
    pub contact_distance: f32,
    /// Seconds an agent flashes after being hit.
    pub hit_flash_secs: f32,
    /// Seconds the floating health bar stays visible after a hit.
    pub health_bar_secs: f32,
    /// Seconds between sight checks while patrolling.
    pub sight_interval_secs: f32,
    /// Furthest distance at which the player can be seen.
    pub view_distance: f32,
    /// Seconds without sight before an attacker gives up.
    pub lose_target_secs: f32,
    /// Seconds a search lasts.
    pub search_secs: f32,
    /// Maximum facing change in radians per second.
    pub turn_rate: f32,
    /// Minimum seconds between ranged shots.
    pub fire_interval_secs: f32,
    /// Damage dealt by an agent projectile.
    pub bullet_damage: u32,
    /// Maximum aim error in radians on each axis.
    pub spread: f32,
    /// Horizontal distance within which the agent switches to melee.
    pub melee_range: f32,
    /// Damage dealt by a landed melee strike.
    pub melee_damage: u32,
    /// Seconds between melee bursts.
    pub melee_cooldown_secs: f32,
    /// Fewest strikes in a burst.
    pub melee_burst_min: u8,
    /// Most strikes in a burst.
    pub melee_burst_max: u8,
    /// Seconds between strikes within a burst.
    pub melee_strike_interval_secs: f32,
    /// Multiple of the melee range within which a strike still lands.
    pub melee_reach_factor: f32,
    /// Seconds between pursuit goal updates.
    pub retarget_secs: f32,
    /// Right arm rotation while aiming.
    pub aim_angle: f32,
    /// Peak arm rotation while walking.
    pub sway_amplitude: f32,
    /// Angular speed of the walking sway.
    pub sway_speed: f32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            count: 5,
            max_health: 3,
            patrol_speed: 15.0,
            pursuit_speed: 40.0,
            body_width: 4.0,
            body_height: 10.8,
            body_depth_factor: 0.5,
            head_size: 3.5,
            arm_length: 5.94,
            arm_width: 1.0,
            arm_offset_x: 2.5,
            arm_pivot_y: 9.18,
            muzzle_offset: 1.8,
            turn_delay_secs: 1.0,
            stuck_timeout_secs: 2.0,
            contact_distance: 8.2,
            hit_flash_secs: 0.15,
            health_bar_secs: 3.0,
            sight_interval_secs: 0.25,
            view_distance: 180.0,
            lose_target_secs: 1.5,
            search_secs: 6.0,
            turn_rate: consts::TAU,
            fire_interval_secs: 0.7,
            bullet_damage: 25,
            spread: 0.04,
            melee_range: 12.2,
            melee_damage: 20,
            melee_cooldown_secs: 1.5,
            melee_burst_min: 2,
            melee_burst_max: 4,
            melee_strike_interval_secs: 0.2,
            melee_reach_factor: 1.1,
            retarget_secs: 0.5,
            aim_angle: -consts::FRAC_PI_2,
            sway_amplitude: consts::PI / 10.0,
            sway_speed: 5.0,
        }
    }
}

impl AgentTuning {
    /// Time between direction re-rolls while patrolling.
    #[must_use]
    pub fn turn_delay(&self) -> Duration {
        seconds(self.turn_delay_secs)
    }

    /// Time without reaching a target before the agent is recovered.
    #[must_use]
    pub fn stuck_timeout(&self) -> Duration {
        seconds(self.stuck_timeout_secs)
    }

    /// Duration of the hit flash.
    #[must_use]
    pub fn hit_flash(&self) -> Duration {
        seconds(self.hit_flash_secs)
    }

    /// Duration the floating health bar stays visible.
    #[must_use]
    pub fn health_bar(&self) -> Duration {
        seconds(self.health_bar_secs)
    }

    /// Time between sight checks while patrolling.
    #[must_use]
    pub fn sight_interval(&self) -> Duration {
        seconds(self.sight_interval_secs)
    }

    /// Time without sight before an attacker gives up.
    #[must_use]
    pub fn lose_target(&self) -> Duration {
        seconds(self.lose_target_secs)
    }

    /// Duration of a search.
    #[must_use]
    pub fn search(&self) -> Duration {
        seconds(self.search_secs)
    }

    /// Minimum time between ranged shots.
    #[must_use]
    pub fn fire_interval(&self) -> Duration {
        seconds(self.fire_interval_secs)
    }

    /// Time between melee bursts.
    #[must_use]
    pub fn melee_cooldown(&self) -> Duration {
        seconds(self.melee_cooldown_secs)
    }

    /// Time between strikes within a burst.
    #[must_use]
    pub fn melee_strike_interval(&self) -> Duration {
        seconds(self.melee_strike_interval_secs)
    }

    /// Time between pursuit goal updates.
    #[must_use]
    pub fn retarget(&self) -> Duration {
        seconds(self.retarget_secs)
    }

    /// Height of the point agents look from.
    #[must_use]
    pub fn head_height(&self) -> f32 {
        self.body_height + self.head_size * 0.5
    }
}

/// Wandering pickups.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PickupTuning {
    /// Most pickups alive at once.
    pub max_active: u32,
    /// Seconds a pickup survives uncollected.
    pub lifetime_secs: f32,
    /// Seconds between spawn attempts.
    pub spawn_interval_secs: f32,
    /// Seconds the map stays revealed after a collection.
    pub reveal_secs: f32,
    /// Distance to the player eye within which a pickup is collected.
    pub collect_distance: f32,
    /// Movement speed.
    pub speed: f32,
    /// Seconds without reaching a target before the pickup is recovered.
    pub stuck_timeout_secs: f32,
    /// Seconds between direction re-rolls.
    pub turn_delay_secs: f32,
    /// Peak height of the bounce.
    pub bounce_height: f32,
    /// Angular speed of the bounce.
    pub bounce_speed: f32,
    /// Random cells tried before a spawn is abandoned.
    pub spawn_attempts: u32,
    /// Fraction of a cell from the target within which a pickup counts as
    /// arrived.
    pub arrival_fraction: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            max_active: 10,
            lifetime_secs: 20.0,
            spawn_interval_secs: 3.0,
            reveal_secs: 3.0,
            collect_distance: 8.6,
            speed: 8.0,
            stuck_timeout_secs: 2.5,
            turn_delay_secs: 1.5,
            bounce_height: 3.0,
            bounce_speed: 5.0,
            spawn_attempts: 50,
            arrival_fraction: 0.1,
        }
    }
}

impl PickupTuning {
    /// Time a pickup survives uncollected.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        seconds(self.lifetime_secs)
    }

    /// Time between spawn attempts.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        seconds(self.spawn_interval_secs)
    }

    /// Time the map stays revealed after a collection.
    #[must_use]
    pub fn reveal(&self) -> Duration {
        seconds(self.reveal_secs)
    }

    /// Time without reaching a target before the pickup is recovered.
    #[must_use]
    pub fn stuck_timeout(&self) -> Duration {
        seconds(self.stuck_timeout_secs)
    }

    /// Time between direction re-rolls.
    #[must_use]
    pub fn turn_delay(&self) -> Duration {
        seconds(self.turn_delay_secs)
    }

    /// Distance from the target within which a pickup counts as arrived.
    #[must_use]
    pub fn arrival_distance(&self, cell_size: f32) -> f32 {
        cell_size * self.arrival_fraction
    }
}

/// Session-level rules.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionTuning {
    /// Distance to the exit marker that ends the session in victory.
    pub exit_reach_distance: f32,
    /// Height of the exit marker above the floor.
    pub exit_marker_height: f32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            exit_reach_distance: 12.0,
            exit_marker_height: 14.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SimulationConfig::default()
            .validate()
            .expect("defaults are valid");
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 99

            [maze]
            width = 11

            [agent]
            count = 2
            "#,
        )
        .expect("document parses");

        assert_eq!(config.seed, 99);
        assert_eq!(config.maze.width, 11);
        assert_eq!(config.maze.height, 17);
        assert_eq!(config.agent.count, 2);
        assert_eq!(config.weapon, WeaponTuning::default());
    }

    #[test]
    fn even_maze_is_rejected() {
        let error = SimulationConfig::from_toml_str("[maze]\nwidth = 16\n")
            .expect_err("even width is invalid");
        assert!(matches!(
            error,
            ConfigError::MazeDimensions {
                width: 16,
                height: 17
            }
        ));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let error = SimulationConfig::from_toml_str("[agent]\nlaser = true\n")
            .expect_err("unknown field is rejected");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let mut config = SimulationConfig::default();
        config.maze.cross_connection_chance = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Probability {
                field: "maze.cross_connection_chance",
                ..
            })
        ));
    }

    #[test]
    fn empty_melee_burst_is_rejected() {
        let mut config = SimulationConfig::default();
        config.agent.melee_burst_min = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MeleeBurst { min: 5, max: 4 })
        ));
    }

    #[test]
    fn derived_distances_follow_radius() {
        let player = PlayerTuning::default();
        assert!((player.probe_buffer() - 6.0).abs() < 1e-5);
        assert!((player.penetration_radius() - 4.75).abs() < 1e-5);
        assert!((player.probe_height() - 6.0).abs() < 1e-5);
        let interval = WeaponTuning::default().fire_interval().as_secs_f32();
        assert!((interval - 0.15).abs() < 1e-4);
    }
}
