#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Matrix Maze simulation.
//!
//! [`World`] is the single owned simulation context: the navigation grid, wall
//! geometry, collider registry, player, agents, projectiles and pickups all
//! live here. State changes only through [`apply`], which validates each
//! [`Command`] and reports what happened as [`Event`] values. Systems read the
//! state through the [`query`] module.

mod agents;
mod geometry;
mod maze;
mod navigation;
mod pickups;
mod player;
mod projectiles;

use std::time::Duration;

use glam::Vec3;
use log::{debug, info, warn};
use matrix_maze_core::{
    AgentId, AgentState, CellCoord, Command, Countdown, DamageSource, Direction, Event,
    FireRejection, PickupId, ProjectileId, ProjectileOutcome, ProjectileOwner, SessionOutcome,
    SimulationConfig,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    agents::{planar_distance, Agent},
    geometry::{ColliderRegistry, WallField},
    pickups::Pickup,
    player::{Player, WeaponTick},
    projectiles::Projectile,
};

pub use geometry::WallBlock;
pub use maze::{MazeGenerator, START_CELL};
pub use navigation::{
    pursue_step, wander_step, Cell, LayoutError, Move, Moves, NavigationGrid, Walls,
};

const MAZE_STREAM: u64 = 1;
const WALL_STREAM: u64 = 2;
const SPAWN_STREAM: u64 = 3;
const SPAWN_ATTEMPTS: u32 = 1_000;

/// Random stream derived from a session seed.
///
/// Every consumer of randomness picks its own stream number so adding draws in
/// one place never shifts the sequence seen by another.
#[must_use]
pub fn rng_stream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Represents the authoritative Matrix Maze session state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    grid: NavigationGrid,
    walls: WallField,
    colliders: ColliderRegistry,
    player: Player,
    agents: Vec<Agent>,
    projectiles: Vec<Projectile>,
    pickups: Vec<Pickup>,
    agents_remaining: u32,
    exit: Option<Vec3>,
    map_reveal: Countdown,
    outcome: Option<SessionOutcome>,
    spawn_rng: ChaCha8Rng,
    next_agent: u32,
    next_projectile: u32,
    next_pickup: u32,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Creates a session with a freshly carved maze and the configured agents.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let grid =
            MazeGenerator::new(&config.maze).generate(&mut rng_stream(config.seed, MAZE_STREAM));
        let mut world = Self::with_grid(config, grid);
        world.populate_agents();
        world
    }

    /// Creates a session on a prepared grid without any agents.
    ///
    /// The player stands on the path cell closest to [`START_CELL`] facing the
    /// first open corridor.
    #[must_use]
    pub fn with_grid(config: SimulationConfig, grid: NavigationGrid) -> Self {
        let mut colliders = ColliderRegistry::default();
        let walls = WallField::build(
            &grid,
            &config.maze,
            &mut rng_stream(config.seed, WALL_STREAM),
            &mut colliders,
        );

        let start = grid.nearest_path(START_CELL).unwrap_or(START_CELL);
        let eye = grid.cell_center(start) + Vec3::new(0.0, config.player.eye_height, 0.0);
        let player = Player::new(
            eye,
            initial_yaw(&grid, start),
            config.player.max_health,
            &config.weapon,
        );

        info!(
            "maze ready: {}x{} cells, {} path cells, {} wall blocks",
            grid.width(),
            grid.height(),
            grid.path_cells().count(),
            walls.blocks().len()
        );

        Self {
            spawn_rng: rng_stream(config.seed, SPAWN_STREAM),
            config,
            grid,
            walls,
            colliders,
            player,
            agents: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            agents_remaining: 0,
            exit: None,
            map_reveal: Countdown::expired(),
            outcome: None,
            next_agent: 0,
            next_projectile: 0,
            next_pickup: 0,
            tick_index: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn populate_agents(&mut self) {
        let mut discarded = Vec::new();
        for _ in 0..self.config.agent.count {
            let Some(cell) = self.random_agent_cell() else {
                warn!("no free path cell left; spawned {} agents", self.agents.len());
                break;
            };
            self.spawn_agent(cell, &mut discarded);
        }
    }

    fn random_agent_cell(&mut self) -> Option<CellCoord> {
        let player_cell = self.grid.cell_at(self.player.eye);
        let width = self.grid.width();
        let height = self.grid.height();

        if width >= 3 && height >= 3 {
            for _ in 0..SPAWN_ATTEMPTS {
                let cell = CellCoord::new(
                    self.spawn_rng.gen_range(1..width - 1),
                    self.spawn_rng.gen_range(1..height - 1),
                );
                if self.is_free_agent_cell(cell, player_cell) {
                    return Some(cell);
                }
            }
        }

        self.grid
            .path_cells()
            .find(|cell| self.is_free_agent_cell(*cell, player_cell))
    }

    fn is_free_agent_cell(&self, cell: CellCoord, player_cell: Option<CellCoord>) -> bool {
        self.grid.is_path(cell)
            && Some(cell) != player_cell
            && self.agents.iter().all(|agent| agent.cell != cell)
    }

    fn spawn_agent(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let id = AgentId::new(self.next_agent);
        self.next_agent = self.next_agent.wrapping_add(1);

        let parts = geometry::register_parts(&mut self.colliders, id);
        let position = self.grid.cell_center(cell);
        let agent = Agent::spawn(
            id,
            cell,
            position,
            &self.config.agent,
            parts,
            &mut self.spawn_rng,
        );
        self.agents.push(agent);
        self.agents_remaining = self.agents_remaining.saturating_add(1);
        out_events.push(Event::AgentSpawned { agent: id, cell });
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let index = self.agent_index(id)?;
        self.agents.get_mut(index)
    }

    fn agent_index(&self, id: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&id, |agent| agent.id).ok()
    }

    fn pickup_mut(&mut self, id: PickupId) -> Option<&mut Pickup> {
        self.pickups.iter_mut().find(|pickup| pickup.id == id)
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        if let WeaponTick::Reloaded(rounds) = self.player.tick(dt) {
            out_events.push(Event::ReloadCompleted { rounds });
        }

        let stall_distance = self.grid.cell_size() * 0.5;
        for agent in &mut self.agents {
            agent.tick(dt, stall_distance);
        }

        let tuning = &self.config.pickup;
        let arrival_distance = tuning.arrival_distance(self.grid.cell_size());
        for pickup in &mut self.pickups {
            pickup.tick(dt, tuning, arrival_distance);
        }
        self.pickups.retain(|pickup| {
            if pickup.lifetime.is_elapsed() {
                out_events.push(Event::PickupExpired { pickup: pickup.id });
                return false;
            }
            true
        });

        if !self.map_reveal.is_elapsed() {
            self.map_reveal.advance(dt);
            if self.map_reveal.is_elapsed() {
                out_events.push(Event::MapRevealEnded);
            }
        }
    }

    fn move_player(&mut self, displacement: Vec3, out_events: &mut Vec<Event>) {
        if !self.player.is_alive() || !displacement.is_finite() {
            return;
        }
        let planar = Vec3::new(displacement.x, 0.0, displacement.z);
        if planar == Vec3::ZERO {
            return;
        }

        let from = self.player.eye;
        self.player.eye += planar;
        out_events.push(Event::PlayerMoved {
            from,
            to: self.player.eye,
        });
    }

    fn fire_player_weapon(&mut self, out_events: &mut Vec<Event>) {
        let rejection = if self.outcome.is_some() || !self.player.is_alive() {
            Some(FireRejection::SessionOver)
        } else if self.player.reload.is_some() {
            Some(FireRejection::Reloading)
        } else if self.player.rounds == 0 {
            self.start_reload(out_events);
            Some(FireRejection::Empty)
        } else if !self.player.fire_cooldown.is_elapsed() {
            Some(FireRejection::Cooldown)
        } else {
            None
        };

        if let Some(reason) = rejection {
            out_events.push(Event::WeaponFireRejected { reason });
            return;
        }

        self.player.rounds -= 1;
        self.player
            .fire_cooldown
            .reset(self.config.weapon.fire_interval());

        let snapshot = self.player.snapshot();
        let projectile = self.spawn_projectile(
            ProjectileOwner::Player,
            snapshot.eye,
            snapshot.view_direction(),
            out_events,
        );
        out_events.push(Event::WeaponFired {
            projectile,
            rounds_remaining: self.player.rounds,
        });
    }

    fn start_reload(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.is_alive() {
            return;
        }
        if self.player.start_reload(&self.config.weapon) {
            out_events.push(Event::ReloadStarted {
                duration: self.config.weapon.reload_time(),
            });
        }
    }

    fn spawn_projectile(
        &mut self,
        owner: ProjectileOwner,
        origin: Vec3,
        direction: Vec3,
        out_events: &mut Vec<Event>,
    ) -> ProjectileId {
        let tuning = &self.config.projectile;
        let (radius, damage) = match owner {
            ProjectileOwner::Player => (tuning.player_radius(), 0),
            ProjectileOwner::Agent(_) => (tuning.agent_radius(), self.config.agent.bullet_damage),
        };

        let id = ProjectileId::new(self.next_projectile);
        self.next_projectile = self.next_projectile.wrapping_add(1);
        self.projectiles.push(Projectile {
            id,
            owner,
            position: origin,
            velocity: direction.try_normalize().unwrap_or(Vec3::NEG_Z) * tuning.speed,
            radius,
            damage,
            remaining: tuning.lifetime(),
        });
        out_events.push(Event::ProjectileSpawned {
            projectile: id,
            owner,
        });
        id
    }

    fn resolve_projectile(
        &mut self,
        id: ProjectileId,
        outcome: ProjectileOutcome,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self.projectiles.iter().position(|p| p.id == id) else {
            return;
        };
        let projectile = self.projectiles.remove(index);
        out_events.push(Event::ProjectileRemoved {
            projectile: id,
            owner: projectile.owner,
            outcome,
        });

        match (projectile.owner, outcome) {
            (ProjectileOwner::Player, ProjectileOutcome::HitAgent { agent }) => {
                self.damage_agent(agent, out_events);
            }
            (ProjectileOwner::Agent(_), ProjectileOutcome::HitPlayer) => {
                self.damage_player(projectile.damage, DamageSource::Projectile, out_events);
            }
            _ => {}
        }
    }

    fn damage_agent(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let tuning = &self.config.agent;
        let agent = &mut self.agents[index];
        agent.health = agent.health.saturating_sub(1);
        agent.hit_flash.reset(tuning.hit_flash());
        agent.health_bar.reset(tuning.health_bar());

        if !agent.health.is_depleted() {
            out_events.push(Event::AgentDamaged {
                agent: id,
                remaining: agent.health,
            });
            return;
        }

        let agent = self.agents.remove(index);
        for (_, handle) in agent.parts {
            self.colliders.release(handle);
        }
        self.agents_remaining = self.agents_remaining.saturating_sub(1);
        info!(
            "agent {} destroyed, {} remaining",
            id.get(),
            self.agents_remaining
        );
        out_events.push(Event::AgentDied {
            agent: id,
            position: agent.position,
            agents_remaining: self.agents_remaining,
        });

        if self.agents_remaining == 0 && self.exit.is_none() {
            let position = Vec3::new(
                agent.position.x,
                self.config.session.exit_marker_height,
                agent.position.z,
            );
            self.exit = Some(position);
            out_events.push(Event::ExitOpened { position });
        }
    }

    fn damage_player(&mut self, amount: u32, source: DamageSource, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() || !self.player.is_alive() {
            return;
        }

        self.player.health = self.player.health.saturating_sub(amount);
        out_events.push(Event::PlayerDamaged {
            amount,
            remaining: self.player.health,
            source,
        });

        if self.player.health.is_depleted() {
            self.end_session(SessionOutcome::Eliminated { cause: source }, out_events);
        }
    }

    fn end_session(&mut self, outcome: SessionOutcome, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        info!("session ended after {} ticks: {outcome:?}", self.tick_index);
        self.outcome = Some(outcome);
        out_events.push(Event::SessionEnded { outcome });
    }

    fn resolve_player_contacts(&mut self, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }

        let eye = self.player.eye;
        let reach = self.config.agent.contact_distance;
        let touched = self.agents.iter().any(|agent| {
            agent.state != AgentState::Teleporting && planar_distance(agent.position, eye) < reach
        });
        if touched {
            let remaining = self.player.health.get();
            self.damage_player(remaining, DamageSource::Contact, out_events);
            return;
        }

        let escaped = self
            .exit
            .is_some_and(|exit| {
                planar_distance(exit, eye) < self.config.session.exit_reach_distance
            });
        if escaped {
            self.end_session(SessionOutcome::Escaped, out_events);
        }
    }

    fn step_agent(&mut self, id: AgentId, direction: Direction, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let next = self.grid.can_traverse(self.agents[index].cell, direction);
        let target = next.map(|cell| self.grid.cell_center(cell));
        let turn_delay = self.config.agent.turn_delay();
        let agent = &mut self.agents[index];

        match (next, target) {
            (Some(next), Some(target)) => {
                let from = agent.cell;
                agent.cell = next;
                agent.target_position = target;
                agent.direction = Some(direction);
                agent.stalled_for = Duration::ZERO;
                agent.turn_timer.reset(turn_delay);
                out_events.push(Event::AgentStepped {
                    agent: id,
                    from,
                    to: next,
                });
            }
            _ => {
                debug!("agent {} cannot step {direction:?} from {:?}", id.get(), agent.cell);
                agent.direction = None;
                out_events.push(Event::AgentStepRejected {
                    agent: id,
                    direction,
                });
            }
        }
    }

    fn teleport_agent(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let current = self.agents[index].cell;
        let cell = self.grid.nearest_path(current).unwrap_or(current);
        let center = self.grid.cell_center(cell);
        let tuning = &self.config.agent;
        let agent = &mut self.agents[index];

        warn!(
            "agent {} stuck near {:?} for {:?}; recovering at {cell:?}",
            id.get(),
            agent.position,
            agent.stalled_for
        );
        agent.cell = cell;
        agent.position = center;
        agent.target_position = center;
        agent.stalled_for = Duration::ZERO;
        agent.moving = false;
        let previous = agent.enter(AgentState::Teleporting, tuning);
        agent.direction = None;
        agent.turn_timer = Countdown::expired();

        out_events.push(Event::AgentTeleported { agent: id, cell });
        if let Some(from) = previous {
            out_events.push(Event::AgentStateChanged {
                agent: id,
                from,
                to: AgentState::Teleporting,
            });
        }
    }

    fn fire_agent_weapon(&mut self, id: AgentId, direction: Vec3, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let tuning = &self.config.agent;
        let agent = &mut self.agents[index];
        if !agent.fire_cooldown.is_elapsed() {
            debug!("agent {} fired during cooldown", id.get());
            return;
        }
        agent.fire_cooldown.reset(tuning.fire_interval());

        let snapshot = agent.snapshot(tuning);
        let facing = Vec3::new(snapshot.yaw.sin(), 0.0, snapshot.yaw.cos());
        let direction = direction.try_normalize().unwrap_or(facing);
        let projectile = self.spawn_projectile(
            ProjectileOwner::Agent(id),
            snapshot.muzzle,
            direction,
            out_events,
        );
        out_events.push(Event::AgentFired {
            agent: id,
            projectile,
        });
    }

    fn begin_melee_burst(&mut self, id: AgentId, strikes: u8) {
        let tuning = &self.config.agent;
        let (min, max) = (tuning.melee_burst_min, tuning.melee_burst_max);
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        let ready = agent.state == AgentState::Melee
            && agent.melee_cooldown.is_elapsed()
            && agent.melee_strikes_remaining == 0;
        if !ready {
            return;
        }
        agent.melee_strikes_remaining = strikes.min(max).max(min).max(1);
        agent.melee_strike_timer = Countdown::expired();
    }

    fn melee_strike(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }
        let Some(index) = self.agent_index(id) else {
            return;
        };
        let tuning = &self.config.agent;
        let reach = tuning.melee_range * tuning.melee_reach_factor;
        let eye = self.player.eye;
        let agent = &mut self.agents[index];
        if agent.melee_strikes_remaining == 0 || !agent.melee_strike_timer.is_elapsed() {
            return;
        }

        let landed = planar_distance(agent.position, eye) < reach;
        agent.melee_strikes_remaining -= 1;
        agent.melee_strike_timer.reset(tuning.melee_strike_interval());
        if agent.melee_strikes_remaining == 0 {
            agent.melee_cooldown.reset(tuning.melee_cooldown());
        }

        let damage = tuning.melee_damage;
        out_events.push(Event::MeleeStruck { agent: id, landed });
        if landed {
            self.damage_player(damage, DamageSource::Melee, out_events);
        }
    }

    fn spawn_pickup(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let capacity = usize::try_from(self.config.pickup.max_active).unwrap_or(usize::MAX);
        if !self.grid.is_path(cell) || self.pickups.len() >= capacity {
            return;
        }

        let id = PickupId::new(self.next_pickup);
        self.next_pickup = self.next_pickup.wrapping_add(1);
        let position = self.grid.cell_center(cell);
        self.pickups
            .push(Pickup::spawn(id, cell, position, &self.config.pickup));
        out_events.push(Event::PickupSpawned { pickup: id, cell });
    }

    fn step_pickup(&mut self, id: PickupId, direction: Direction) {
        let Some(cell) = self.pickups.iter().find(|p| p.id == id).map(|p| p.cell) else {
            return;
        };
        let next = self.grid.can_traverse(cell, direction);
        let target = next.map(|cell| self.grid.cell_center(cell));
        let turn_delay = self.config.pickup.turn_delay();
        let Some(pickup) = self.pickup_mut(id) else {
            return;
        };

        match (next, target) {
            (Some(next), Some(target)) => {
                pickup.cell = next;
                pickup.target_position = target;
                pickup.direction = Some(direction);
                pickup.stalled_for = Duration::ZERO;
                pickup.turn_timer.reset(turn_delay);
            }
            _ => pickup.direction = None,
        }
    }

    fn teleport_pickup(&mut self, id: PickupId, out_events: &mut Vec<Event>) {
        let Some(current) = self.pickups.iter().find(|p| p.id == id).map(|p| p.cell) else {
            return;
        };
        let cell = self.grid.nearest_path(current).unwrap_or(current);
        let center = self.grid.cell_center(cell);
        let Some(pickup) = self.pickup_mut(id) else {
            return;
        };

        debug!("pickup {} stuck; recovering at {cell:?}", id.get());
        pickup.cell = cell;
        pickup.position = center;
        pickup.target_position = center;
        pickup.direction = None;
        pickup.stalled_for = Duration::ZERO;
        pickup.turn_timer = Countdown::expired();
        out_events.push(Event::PickupTeleported { pickup: id, cell });
    }

    fn collect_pickup(&mut self, id: PickupId, out_events: &mut Vec<Event>) {
        let Some(index) = self.pickups.iter().position(|p| p.id == id) else {
            return;
        };
        let _ = self.pickups.remove(index);
        let duration = self.config.pickup.reveal();
        self.map_reveal.reset(duration);
        out_events.push(Event::PickupCollected { pickup: id });
        out_events.push(Event::MapRevealStarted { duration });
    }
}

fn initial_yaw(grid: &NavigationGrid, start: CellCoord) -> f32 {
    [
        Direction::South,
        Direction::East,
        Direction::North,
        Direction::West,
    ]
    .into_iter()
    .find(|direction| grid.can_traverse(start, *direction).is_some())
    .map_or(0.0, |direction| {
        let (dx, dz) = direction.offset();
        player::yaw_facing(Vec3::new(dx as f32, 0.0, dz as f32))
    })
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetPlayerView { yaw, pitch } => {
            if world.player.is_alive() {
                world.player.look(yaw, pitch);
            }
        }
        Command::MovePlayer { displacement } => world.move_player(displacement, out_events),
        Command::NudgePlayer { correction } => world.move_player(correction, out_events),
        Command::FirePlayerWeapon => world.fire_player_weapon(out_events),
        Command::ReloadPlayerWeapon => world.start_reload(out_events),
        Command::ResolvePlayerContacts => world.resolve_player_contacts(out_events),
        Command::SpawnAgent { cell } => {
            if world.grid.is_path(cell) {
                world.spawn_agent(cell, out_events);
            } else {
                debug!("refused to spawn agent inside wall cell {cell:?}");
            }
        }
        Command::RecordSighting { agent, player_eye } => {
            let interval = world.config.agent.sight_interval();
            if let Some(agent) = world.agent_mut(agent) {
                agent.can_see_player = player_eye.is_some();
                if let Some(eye) = player_eye {
                    agent.time_since_seen = Duration::ZERO;
                    agent.last_known_player = Some(eye);
                }
                agent.sight_timer.reset(interval);
            }
        }
        Command::TransitionAgent { agent: id, to } => {
            let Some(index) = world.agent_index(id) else {
                return;
            };
            if let Some(from) = world.agents[index].enter(to, &world.config.agent) {
                debug!("agent {} {from:?} -> {to:?}", id.get());
                out_events.push(Event::AgentStateChanged { agent: id, from, to });
            }
        }
        Command::StepAgent { agent, direction } => world.step_agent(agent, direction, out_events),
        Command::ClearAgentDirection { agent } => {
            if let Some(agent) = world.agent_mut(agent) {
                agent.direction = None;
            }
        }
        Command::SetAgentGoal { agent, goal } => {
            let interval = world.config.agent.retarget();
            if let Some(agent) = world.agent_mut(agent) {
                agent.goal = goal;
                agent.direction = None;
                agent.retarget_timer.reset(interval);
            }
        }
        Command::AdvanceAgent { agent, distance } => {
            if let Some(agent) = world.agent_mut(agent) {
                agent.advance(distance);
            }
        }
        Command::TurnAgent { agent, yaw } => {
            if let Some(agent) = world.agent_mut(agent) {
                if yaw.is_finite() {
                    agent.yaw = yaw;
                }
            }
        }
        Command::TeleportAgent { agent } => world.teleport_agent(agent, out_events),
        Command::FireAgentWeapon { agent, direction } => {
            world.fire_agent_weapon(agent, direction, out_events);
        }
        Command::BeginMeleeBurst { agent, strikes } => world.begin_melee_burst(agent, strikes),
        Command::MeleeStrike { agent } => world.melee_strike(agent, out_events),
        Command::PoseAgentArms { agent, pose } => {
            if let Some(agent) = world.agent_mut(agent) {
                agent.arms = pose;
            }
        }
        Command::AdvanceProjectile {
            projectile,
            position,
            elapsed,
        } => {
            if let Some(projectile) = world.projectiles.iter_mut().find(|p| p.id == projectile) {
                projectile.position = position;
                projectile.remaining = projectile.remaining.saturating_sub(elapsed);
            }
        }
        Command::ResolveProjectile {
            projectile,
            outcome,
        } => world.resolve_projectile(projectile, outcome, out_events),
        Command::SpawnPickup { cell } => world.spawn_pickup(cell, out_events),
        Command::StepPickup { pickup, direction } => world.step_pickup(pickup, direction),
        Command::ClearPickupDirection { pickup } => {
            if let Some(pickup) = world.pickup_mut(pickup) {
                pickup.direction = None;
            }
        }
        Command::AdvancePickup { pickup, distance } => {
            if let Some(pickup) = world.pickup_mut(pickup) {
                pickup.advance(distance);
            }
        }
        Command::TeleportPickup { pickup } => world.teleport_pickup(pickup, out_events),
        Command::CollectPickup { pickup } => world.collect_pickup(pickup, out_events),
    }
}

/// Query functions that expose read-only views into the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec3;
    use matrix_maze_core::{
        AgentBody, AgentView, ColliderHandle, ColliderOwner, PickupSnapshot, PlayerSnapshot,
        ProjectileSnapshot, Ray, RayHit, SessionOutcome, SimulationConfig,
    };

    use super::{NavigationGrid, WallBlock, World};

    /// Configuration the session was created with.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Provides read-only access to the maze cells.
    #[must_use]
    pub fn navigation(world: &World) -> &NavigationGrid {
        &world.grid
    }

    /// Every wall block, for scene construction.
    #[must_use]
    pub fn wall_blocks(world: &World) -> &[WallBlock] {
        world.walls.blocks()
    }

    /// Nearest wall block struck by the ray.
    #[must_use]
    pub fn raycast_walls(world: &World, ray: &Ray) -> Option<RayHit> {
        world.walls.raycast(ray)
    }

    /// Distance to the nearest wall along the ray.
    #[must_use]
    pub fn wall_distance(world: &World, ray: &Ray) -> Option<f32> {
        world.walls.raycast(ray).map(|hit| hit.distance)
    }

    /// Entity that owns the provided collider, if it still exists.
    #[must_use]
    pub fn collider_owner(world: &World, handle: ColliderHandle) -> Option<ColliderOwner> {
        world.colliders.owner(handle)
    }

    /// Captures the player state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        world.player.snapshot()
    }

    /// Captures a read-only view of the living agents.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let tuning = &world.config.agent;
        AgentView::from_snapshots(
            world
                .agents
                .iter()
                .map(|agent| agent.snapshot(tuning))
                .collect(),
        )
    }

    /// Collision volumes of every living agent, ordered by identifier.
    #[must_use]
    pub fn agent_bodies(world: &World) -> Vec<AgentBody> {
        let tuning = &world.config.agent;
        world.agents.iter().map(|agent| agent.body(tuning)).collect()
    }

    /// Captures every projectile in flight, ordered by identifier.
    #[must_use]
    pub fn projectile_view(world: &World) -> Vec<ProjectileSnapshot> {
        let mut snapshots: Vec<ProjectileSnapshot> =
            world.projectiles.iter().map(|p| p.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Captures every pickup in the maze, ordered by identifier.
    #[must_use]
    pub fn pickup_view(world: &World) -> Vec<PickupSnapshot> {
        let tuning = &world.config.pickup;
        let mut snapshots: Vec<PickupSnapshot> =
            world.pickups.iter().map(|p| p.snapshot(tuning)).collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    /// Agents still alive.
    #[must_use]
    pub fn agents_remaining(world: &World) -> u32 {
        world.agents_remaining
    }

    /// Position of the exit marker once the last agent died.
    #[must_use]
    pub fn exit_marker(world: &World) -> Option<Vec3> {
        world.exit
    }

    /// Time left on the map reveal, if it is active.
    #[must_use]
    pub fn map_reveal_remaining(world: &World) -> Option<Duration> {
        (!world.map_reveal.is_elapsed()).then(|| world.map_reveal.remaining())
    }

    /// Terminal outcome, once the session ended.
    #[must_use]
    pub fn outcome(world: &World) -> Option<SessionOutcome> {
        world.outcome
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Simulated time elapsed so far.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }
}
