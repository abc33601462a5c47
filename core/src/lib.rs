#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Matrix Maze simulation.
//!
//! This crate defines the message surface that connects the session adapter,
//! the authoritative world, and the pure systems. Systems read immutable
//! snapshots, submit [`Command`] values describing desired mutations, and the
//! world executes those commands through its `apply` entry point before
//! broadcasting [`Event`] values that the next system in the tick reacts to.

mod geometry;
mod tuning;

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use geometry::{Aabb, Ray};
pub use tuning::{
    AgentTuning, ConfigError, MazeTuning, PickupTuning, PlayerTuning, ProjectileTuning,
    SessionTuning, SimulationConfig, WeaponTuning,
};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Updates the player's view orientation as reported by the input collaborator.
    SetPlayerView {
        /// Rotation around the vertical axis in radians. Zero faces negative Z.
        yaw: f32,
        /// Rotation around the lateral axis in radians. Positive values look up.
        pitch: f32,
    },
    /// Translates the player by a displacement already clamped against walls.
    MovePlayer {
        /// World-space displacement applied to the player's eye position.
        displacement: Vec3,
    },
    /// Pushes the player out of geometry it overlaps.
    NudgePlayer {
        /// World-space correction applied to the player's eye position.
        correction: Vec3,
    },
    /// Requests that the player weapon discharge a round along the view direction.
    FirePlayerWeapon,
    /// Requests that the player weapon begin reloading.
    ReloadPlayerWeapon,
    /// Resolves end-of-tick contact with agents and the exit marker.
    ResolvePlayerContacts,
    /// Requests that a new agent be created at the provided path cell.
    SpawnAgent {
        /// Maze cell the agent should occupy.
        cell: CellCoord,
    },
    /// Records the outcome of an agent's line-of-sight check.
    RecordSighting {
        /// Agent that performed the check.
        agent: AgentId,
        /// Player eye position when visible, `None` when the view is blocked.
        player_eye: Option<Vec3>,
    },
    /// Moves an agent into a new behavioural state.
    TransitionAgent {
        /// Agent changing state.
        agent: AgentId,
        /// State the agent should enter.
        to: AgentState,
    },
    /// Requests that an agent head toward the adjacent cell in the provided direction.
    StepAgent {
        /// Agent attempting to move.
        agent: AgentId,
        /// Direction of the adjacent cell.
        direction: Direction,
    },
    /// Clears an agent's movement direction so it re-plans on the next tick.
    ClearAgentDirection {
        /// Agent whose direction is cleared.
        agent: AgentId,
    },
    /// Assigns the cell an agent pursues and restarts its retarget countdown.
    SetAgentGoal {
        /// Agent being retargeted.
        agent: AgentId,
        /// Cell the agent should pursue.
        goal: CellCoord,
    },
    /// Moves an agent toward its target position by at most the provided distance.
    AdvanceAgent {
        /// Agent being moved.
        agent: AgentId,
        /// Maximum distance travelled this tick in world units.
        distance: f32,
    },
    /// Sets an agent's facing.
    TurnAgent {
        /// Agent being rotated.
        agent: AgentId,
        /// Rotation around the vertical axis in radians. Zero faces positive Z.
        yaw: f32,
    },
    /// Snaps a stuck agent back to the centre of its current cell.
    TeleportAgent {
        /// Agent being recovered.
        agent: AgentId,
    },
    /// Requests that an agent discharge a projectile along the provided direction.
    FireAgentWeapon {
        /// Agent firing the projectile.
        agent: AgentId,
        /// Direction of travel for the projectile.
        direction: Vec3,
    },
    /// Starts a melee burst consisting of the provided number of strikes.
    BeginMeleeBurst {
        /// Agent starting the burst.
        agent: AgentId,
        /// Number of strikes in the burst.
        strikes: u8,
    },
    /// Requests the next strike of an agent's melee burst.
    MeleeStrike {
        /// Agent performing the strike.
        agent: AgentId,
    },
    /// Updates an agent's cosmetic arm rotation.
    PoseAgentArms {
        /// Agent being posed.
        agent: AgentId,
        /// Arm rotation applied to the agent.
        pose: ArmPose,
    },
    /// Moves a projectile along its trajectory and consumes lifetime.
    AdvanceProjectile {
        /// Projectile being moved.
        projectile: ProjectileId,
        /// World-space position after the move.
        position: Vec3,
        /// Lifetime consumed by the move.
        elapsed: Duration,
    },
    /// Removes a projectile and applies the consequences of its outcome.
    ResolveProjectile {
        /// Projectile being removed.
        projectile: ProjectileId,
        /// Reason the projectile stopped.
        outcome: ProjectileOutcome,
    },
    /// Requests that a wandering pickup be created at the provided path cell.
    SpawnPickup {
        /// Maze cell the pickup should occupy.
        cell: CellCoord,
    },
    /// Requests that a pickup head toward the adjacent cell in the provided direction.
    StepPickup {
        /// Pickup attempting to move.
        pickup: PickupId,
        /// Direction of the adjacent cell.
        direction: Direction,
    },
    /// Clears a pickup's movement direction so it re-plans on the next tick.
    ClearPickupDirection {
        /// Pickup whose direction is cleared.
        pickup: PickupId,
    },
    /// Moves a pickup toward its target position by at most the provided distance.
    AdvancePickup {
        /// Pickup being moved.
        pickup: PickupId,
        /// Maximum distance travelled this tick in world units.
        distance: f32,
    },
    /// Snaps a stuck pickup back to the centre of its current cell.
    TeleportPickup {
        /// Pickup being recovered.
        pickup: PickupId,
    },
    /// Removes a pickup collected by the player and starts the map reveal.
    CollectPickup {
        /// Pickup being collected.
        pickup: PickupId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the player's eye position changed.
    PlayerMoved {
        /// Eye position before the move.
        from: Vec3,
        /// Eye position after the move.
        to: Vec3,
    },
    /// Reports that the player lost health.
    PlayerDamaged {
        /// Health removed by the hit.
        amount: u32,
        /// Health left after the hit.
        remaining: Health,
        /// What dealt the damage.
        source: DamageSource,
    },
    /// Confirms that the player weapon discharged a round.
    WeaponFired {
        /// Projectile created by the shot.
        projectile: ProjectileId,
        /// Rounds left in the magazine.
        rounds_remaining: u32,
    },
    /// Reports that a fire request was refused.
    WeaponFireRejected {
        /// Reason the weapon could not fire.
        reason: FireRejection,
    },
    /// Announces that the player weapon started reloading.
    ReloadStarted {
        /// Time until the magazine is refilled.
        duration: Duration,
    },
    /// Announces that the player weapon finished reloading.
    ReloadCompleted {
        /// Rounds loaded into the magazine.
        rounds: u32,
    },
    /// Confirms that an agent entered the maze.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Cell the agent occupies.
        cell: CellCoord,
    },
    /// Reports that an agent changed behavioural state.
    AgentStateChanged {
        /// Agent that changed state.
        agent: AgentId,
        /// State before the transition.
        from: AgentState,
        /// State after the transition.
        to: AgentState,
    },
    /// Confirms that an agent committed to moving into an adjacent cell.
    AgentStepped {
        /// Agent that stepped.
        agent: AgentId,
        /// Cell the agent left.
        from: CellCoord,
        /// Cell the agent now heads toward.
        to: CellCoord,
    },
    /// Reports that an agent asked for a step through a wall.
    AgentStepRejected {
        /// Agent whose step was refused.
        agent: AgentId,
        /// Direction that was refused.
        direction: Direction,
    },
    /// Reports that a stuck agent was recovered to the centre of its cell.
    AgentTeleported {
        /// Agent that was recovered.
        agent: AgentId,
        /// Cell the agent was placed in.
        cell: CellCoord,
    },
    /// Confirms that an agent discharged a projectile.
    AgentFired {
        /// Agent that fired.
        agent: AgentId,
        /// Projectile created by the shot.
        projectile: ProjectileId,
    },
    /// Reports the result of a single melee strike.
    MeleeStruck {
        /// Agent that struck.
        agent: AgentId,
        /// Whether the player was still within reach.
        landed: bool,
    },
    /// Reports that an agent lost health but survived.
    AgentDamaged {
        /// Agent that was hit.
        agent: AgentId,
        /// Health left after the hit.
        remaining: Health,
    },
    /// Reports that an agent was destroyed.
    AgentDied {
        /// Agent that was destroyed.
        agent: AgentId,
        /// World-space position at the moment of death.
        position: Vec3,
        /// Agents still alive after the death.
        agents_remaining: u32,
    },
    /// Announces that the level exit appeared.
    ExitOpened {
        /// World-space position of the exit marker.
        position: Vec3,
    },
    /// Confirms that a projectile entered the world.
    ProjectileSpawned {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Who fired the projectile.
        owner: ProjectileOwner,
    },
    /// Confirms that a projectile left the world.
    ProjectileRemoved {
        /// Projectile that was removed.
        projectile: ProjectileId,
        /// Who fired the projectile.
        owner: ProjectileOwner,
        /// Reason the projectile stopped.
        outcome: ProjectileOutcome,
    },
    /// Confirms that a pickup entered the maze.
    PickupSpawned {
        /// Identifier assigned to the pickup.
        pickup: PickupId,
        /// Cell the pickup occupies.
        cell: CellCoord,
    },
    /// Reports that a stuck pickup was recovered to the centre of its cell.
    PickupTeleported {
        /// Pickup that was recovered.
        pickup: PickupId,
        /// Cell the pickup was placed in.
        cell: CellCoord,
    },
    /// Reports that a pickup's lifetime ran out.
    PickupExpired {
        /// Pickup that expired.
        pickup: PickupId,
    },
    /// Reports that the player collected a pickup.
    PickupCollected {
        /// Pickup that was collected.
        pickup: PickupId,
    },
    /// Signals that the map display should become visible.
    MapRevealStarted {
        /// How long the map remains visible.
        duration: Duration,
    },
    /// Signals that the map display should be hidden again.
    MapRevealEnded,
    /// Announces the terminal outcome of the session.
    SessionEnded {
        /// How the session ended.
        outcome: SessionOutcome,
    },
}

impl Event {
    /// Audio cue the audio collaborator should play in response to the event.
    #[must_use]
    pub fn audio_cue(&self) -> Option<AudioCue> {
        match self {
            Self::WeaponFired { .. } | Self::AgentFired { .. } => Some(AudioCue::Shoot),
            Self::ProjectileRemoved {
                outcome: ProjectileOutcome::HitAgent { .. },
                ..
            } => Some(AudioCue::HitAgent),
            Self::AgentDied { .. } => Some(AudioCue::AgentDeath),
            Self::PlayerDamaged {
                source: DamageSource::Projectile,
                ..
            } => Some(AudioCue::PlayerHit),
            Self::MeleeStruck { landed: true, .. } => Some(AudioCue::MeleeHit),
            Self::ReloadStarted { .. } => Some(AudioCue::Reload),
            Self::PickupCollected { .. } => Some(AudioCue::Pickup),
            Self::SessionEnded { outcome } => Some(match outcome {
                SessionOutcome::Eliminated { .. } => AudioCue::GameOver,
                SessionOutcome::Escaped => AudioCue::GameWin,
            }),
            _ => None,
        }
    }
}

/// Fire-and-forget sound requests forwarded to the audio collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// A weapon discharged.
    Shoot,
    /// A player projectile struck an agent.
    HitAgent,
    /// An agent was destroyed.
    AgentDeath,
    /// An agent projectile struck the player.
    PlayerHit,
    /// A melee strike landed on the player.
    MeleeHit,
    /// The player weapon started reloading.
    Reload,
    /// The player was eliminated.
    GameOver,
    /// The player reached the exit.
    GameWin,
    /// The player collected a pickup.
    Pickup,
}

/// Behavioural state of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Wandering the corridors without knowledge of the player.
    #[default]
    Patrolling,
    /// Pursuing and shooting at a visible player.
    Attacking,
    /// Heading to the last known player position after losing sight.
    Searching,
    /// Close enough to strike the player.
    Melee,
    /// Recovering from a stuck position; reverts to patrolling next tick.
    Teleporting,
}

impl AgentState {
    /// Whether the state pursues the player rather than wandering.
    #[must_use]
    pub const fn is_pursuing(self) -> bool {
        matches!(self, Self::Attacking | Self::Searching | Self::Melee)
    }
}

/// Reason the player weapon refused to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FireRejection {
    /// The weapon fired too recently.
    Cooldown,
    /// The magazine is being refilled.
    Reloading,
    /// The magazine is empty; a reload was started instead.
    Empty,
    /// The session already ended.
    SessionOver,
}

/// What dealt damage to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageSource {
    /// An agent projectile.
    Projectile,
    /// An agent melee strike.
    Melee,
    /// Touching an agent.
    Contact,
}

/// Terminal outcome of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionOutcome {
    /// The player was killed.
    Eliminated {
        /// What finished the player off.
        cause: DamageSource,
    },
    /// The player reached the exit marker.
    Escaped,
}

/// Who fired a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileOwner {
    /// The player weapon.
    Player,
    /// An agent weapon.
    Agent(AgentId),
}

/// Reason a projectile stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileOutcome {
    /// Lifetime ran out without a hit.
    Expired,
    /// A wall block was struck.
    HitWall,
    /// An agent was struck.
    HitAgent {
        /// Agent that was struck.
        agent: AgentId,
    },
    /// The player was struck.
    HitPlayer,
}

/// Cardinal directions used to describe movement between maze cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing rows (the top of the maze).
    North,
    /// Toward increasing columns (the right of the maze).
    East,
    /// Toward increasing rows (the bottom of the maze).
    South,
    /// Toward decreasing columns (the left of the maze).
    West,
}

impl Direction {
    /// Every direction in the order neighbours are enumerated.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Column and row offsets of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a wandering pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle naming a piece of collision geometry owned by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderHandle(u32);

impl ColliderHandle {
    /// Creates a new handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Entity that owns a piece of collision geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColliderOwner {
    /// A wall block belonging to the provided maze cell.
    Wall {
        /// Maze cell the block was built for.
        cell: CellCoord,
    },
    /// A body part of a living agent.
    Agent {
        /// Agent that owns the part.
        agent: AgentId,
        /// Which part the collider represents.
        part: PartKind,
    },
}

/// Constituent parts of an agent's body used for hit tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartKind {
    /// Torso block.
    Body,
    /// Head block.
    Head,
    /// Arm on the agent's left side.
    LeftArm,
    /// Arm on the agent's right side, holding the weapon.
    RightArm,
    /// Weapon held in the right hand.
    Gun,
}

/// Nearest intersection between a ray and a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Collider that was struck.
    pub handle: ColliderHandle,
    /// Distance along the ray to the intersection.
    pub distance: f32,
}

/// Location of a single maze cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Cell reached by moving `distance` cells in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    #[must_use]
    pub fn offset(self, direction: Direction, distance: u32) -> Option<Self> {
        let (dx, dy) = direction.offset();
        let column = shift(self.column, dx, distance)?;
        let row = shift(self.row, dy, distance)?;
        Some(Self::new(column, row))
    }

    /// Squared straight-line distance between two cells measured in cells.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u64 {
        let dx = u64::from(self.column.abs_diff(other.column));
        let dy = u64::from(self.row.abs_diff(other.row));
        dx * dx + dy * dy
    }
}

fn shift(value: u32, delta: i32, distance: u32) -> Option<u32> {
    match delta.signum() {
        0 => Some(value),
        1 => value.checked_add(distance),
        _ => value.checked_sub(distance),
    }
}

/// Integer hit points that never increase once assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the raw hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Health left after removing the provided amount, floored at zero.
    #[must_use]
    pub const fn saturating_sub(self, amount: u32) -> Self {
        Self(self.0.saturating_sub(amount))
    }
}

/// Countdown timer decremented by elapsed simulation time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Countdown {
    remaining: Duration,
}

impl Countdown {
    /// Countdown that has already elapsed.
    #[must_use]
    pub const fn expired() -> Self {
        Self {
            remaining: Duration::ZERO,
        }
    }

    /// Countdown that elapses after the provided duration.
    #[must_use]
    pub const fn new(remaining: Duration) -> Self {
        Self { remaining }
    }

    /// Time left before the countdown elapses.
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether the countdown reached zero.
    #[must_use]
    pub const fn is_elapsed(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Decrements the countdown, saturating at zero.
    pub fn advance(&mut self, dt: Duration) {
        self.remaining = self.remaining.saturating_sub(dt);
    }

    /// Restarts the countdown with the provided duration.
    pub fn reset(&mut self, duration: Duration) {
        self.remaining = duration;
    }
}

/// Cosmetic arm rotation of an agent, expressed in radians around the lateral axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ArmPose {
    /// Rotation of the left arm. Zero hangs straight down.
    pub left: f32,
    /// Rotation of the right arm. Negative values raise the arm forward.
    pub right: f32,
}

/// Read-only snapshot of an agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Behavioural state.
    pub state: AgentState,
    /// Hit points left.
    pub health: Health,
    /// Cell the agent occupies or heads toward.
    pub cell: CellCoord,
    /// Cell the agent pursues while in a pursuing state.
    pub goal: CellCoord,
    /// World-space position of the agent's feet.
    pub position: Vec3,
    /// World-space centre of the cell the agent heads toward.
    pub target_position: Vec3,
    /// Direction of the current step, if any.
    pub direction: Option<Direction>,
    /// Facing around the vertical axis. Zero faces positive Z.
    pub yaw: f32,
    /// Whether the agent moved during the previous tick.
    pub moving: bool,
    /// Current arm rotation.
    pub arms: ArmPose,
    /// Whether the latest sight check saw the player.
    pub can_see_player: bool,
    /// Time since the player was last seen.
    pub time_since_seen: Duration,
    /// Player eye position recorded by the latest successful sight check.
    pub last_known_player: Option<Vec3>,
    /// Countdown until the next sight check.
    pub sight_timer: Countdown,
    /// Countdown until the next ranged shot is permitted.
    pub fire_cooldown: Countdown,
    /// Countdown until the next melee burst is permitted.
    pub melee_cooldown: Countdown,
    /// Strikes left in the current melee burst.
    pub melee_strikes_remaining: u8,
    /// Countdown until the next strike in the current burst.
    pub melee_strike_timer: Countdown,
    /// Countdown until the pursuit goal is recomputed.
    pub retarget_timer: Countdown,
    /// Countdown until searching gives up.
    pub search_timer: Countdown,
    /// Countdown until patrolling re-rolls its direction.
    pub turn_timer: Countdown,
    /// Time spent far from the target position while a direction is set.
    pub stalled_for: Duration,
    /// Remaining time of the hit flash.
    pub hit_flash: Countdown,
    /// Remaining time the floating health bar is displayed.
    pub health_bar: Countdown,
    /// World-space point the agent looks from.
    pub head: Vec3,
    /// World-space point projectiles leave the agent's weapon.
    pub muzzle: Vec3,
}

/// Immutable representation of all agents ordered by identifier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a view from snapshots, ordering them by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the provided agent, if it is alive.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of agents captured in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the view contains no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Collision volume of a single agent part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyPart {
    /// Handle registered for the part.
    pub handle: ColliderHandle,
    /// Which part the volume represents.
    pub kind: PartKind,
    /// World-space bounds of the part.
    pub bounds: Aabb,
}

/// Collision volumes of a living agent.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentBody {
    /// Agent that owns the volumes.
    pub agent: AgentId,
    /// Bounds enclosing every part.
    pub bounds: Aabb,
    /// Individual parts.
    pub parts: Vec<BodyPart>,
}

/// Read-only snapshot of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// World-space eye position.
    pub eye: Vec3,
    /// Rotation around the vertical axis. Zero faces negative Z.
    pub yaw: f32,
    /// Rotation around the lateral axis. Positive values look up.
    pub pitch: f32,
    /// Hit points left.
    pub health: Health,
    /// Hit points at full health.
    pub max_health: Health,
    /// Whether the player is still alive.
    pub alive: bool,
    /// Rounds in the magazine.
    pub rounds: u32,
    /// Rounds in a full magazine.
    pub clip_size: u32,
    /// Remaining reload time while reloading.
    pub reload_remaining: Option<Duration>,
    /// Countdown until the weapon may fire again.
    pub fire_cooldown: Countdown,
}

impl PlayerSnapshot {
    /// Fraction of health left, between zero and one.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health.get() == 0 {
            return 0.0;
        }
        self.health.get() as f32 / self.max_health.get() as f32
    }

    /// Horizontal unit vector the player faces.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Unit vector the player looks along, including pitch.
    #[must_use]
    pub fn view_direction(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(
            -self.yaw.sin() * cos_pitch,
            sin_pitch,
            -self.yaw.cos() * cos_pitch,
        )
    }
}

/// Read-only snapshot of a projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Who fired the projectile.
    pub owner: ProjectileOwner,
    /// World-space position.
    pub position: Vec3,
    /// Velocity in world units per second.
    pub velocity: Vec3,
    /// Collision radius.
    pub radius: f32,
    /// Damage dealt to the player on impact.
    pub damage: u32,
    /// Lifetime left before the projectile expires.
    pub remaining: Duration,
}

/// Read-only snapshot of a wandering pickup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickupSnapshot {
    /// Identifier of the pickup.
    pub id: PickupId,
    /// Cell the pickup occupies or heads toward.
    pub cell: CellCoord,
    /// World-space position including the bounce offset.
    pub position: Vec3,
    /// World-space centre of the cell the pickup heads toward.
    pub target_position: Vec3,
    /// Direction of the current step, if any.
    pub direction: Option<Direction>,
    /// Lifetime left before the pickup expires.
    pub remaining: Duration,
    /// Countdown until the pickup re-rolls its direction.
    pub turn_timer: Countdown,
    /// Time spent far from the target position while a direction is set.
    pub stalled_for: Duration,
    /// Phase of the bounce animation in radians.
    pub bounce_phase: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_offset_refuses_negative_coordinates() {
        let origin = CellCoord::new(1, 1);
        assert_eq!(origin.offset(Direction::North, 2), None);
        assert_eq!(origin.offset(Direction::West, 1), Some(CellCoord::new(0, 1)));
        assert_eq!(origin.offset(Direction::South, 2), Some(CellCoord::new(1, 3)));
    }

    #[test]
    fn directions_are_their_opposites_opposite() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.offset();
            let (ox, oy) = direction.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn countdown_saturates_at_zero() {
        let mut countdown = Countdown::new(Duration::from_millis(100));
        countdown.advance(Duration::from_millis(60));
        assert!(!countdown.is_elapsed());
        countdown.advance(Duration::from_millis(60));
        assert!(countdown.is_elapsed());
        assert_eq!(countdown.remaining(), Duration::ZERO);
    }

    #[test]
    fn health_never_underflows() {
        let health = Health::new(3).saturating_sub(5);
        assert!(health.is_depleted());
        assert_eq!(health.get(), 0);
    }

    #[test]
    fn agent_view_orders_and_finds_by_id() {
        let template = AgentSnapshot {
            id: AgentId::new(0),
            state: AgentState::Patrolling,
            health: Health::new(3),
            cell: CellCoord::new(1, 1),
            goal: CellCoord::new(1, 1),
            position: Vec3::ZERO,
            target_position: Vec3::ZERO,
            direction: None,
            yaw: 0.0,
            moving: false,
            arms: ArmPose::default(),
            can_see_player: false,
            time_since_seen: Duration::ZERO,
            last_known_player: None,
            sight_timer: Countdown::expired(),
            fire_cooldown: Countdown::expired(),
            melee_cooldown: Countdown::expired(),
            melee_strikes_remaining: 0,
            melee_strike_timer: Countdown::expired(),
            retarget_timer: Countdown::expired(),
            search_timer: Countdown::expired(),
            turn_timer: Countdown::expired(),
            stalled_for: Duration::ZERO,
            hit_flash: Countdown::expired(),
            health_bar: Countdown::expired(),
            head: Vec3::ZERO,
            muzzle: Vec3::ZERO,
        };
        let view = AgentView::from_snapshots(vec![
            AgentSnapshot {
                id: AgentId::new(7),
                ..template.clone()
            },
            AgentSnapshot {
                id: AgentId::new(2),
                ..template
            },
        ]);

        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 7]);
        assert!(view.get(AgentId::new(7)).is_some());
        assert!(view.get(AgentId::new(3)).is_none());
    }

    #[test]
    fn session_outcomes_map_to_terminal_cues() {
        let lost = Event::SessionEnded {
            outcome: SessionOutcome::Eliminated {
                cause: DamageSource::Melee,
            },
        };
        let won = Event::SessionEnded {
            outcome: SessionOutcome::Escaped,
        };
        assert_eq!(lost.audio_cue(), Some(AudioCue::GameOver));
        assert_eq!(won.audio_cue(), Some(AudioCue::GameWin));
        assert_eq!(Event::MapRevealEnded.audio_cue(), None);
    }

    #[test]
    fn player_forward_matches_yaw_convention() {
        let mut player = PlayerSnapshot {
            eye: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            health: Health::new(100),
            max_health: Health::new(100),
            alive: true,
            rounds: 12,
            clip_size: 12,
            reload_remaining: None,
            fire_cooldown: Countdown::expired(),
        };
        assert!((player.forward() - Vec3::NEG_Z).length() < 1e-6);
        player.yaw = -std::f32::consts::FRAC_PI_2;
        assert!((player.forward() - Vec3::X).length() < 1e-6);
        assert!((player.health_fraction() - 1.0).abs() < f32::EPSILON);
    }
}
