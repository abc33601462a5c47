#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wandering map-reveal pickups.
//!
//! Pickups appear on a fixed cadence, drift between corridor cells without
//! reversing unless cornered, recover when stuck and are collected when the
//! player walks close enough.

use std::time::Duration;

use glam::Vec3;
use log::debug;
use matrix_maze_core::{
    CellCoord, Command, Direction, Event, PickupId, PickupSnapshot, PickupTuning, PlayerSnapshot,
};
use matrix_maze_world::{rng_stream, wander_step, NavigationGrid};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const WANDER_STREAM: u64 = 5;

/// Configuration parameters required to construct the pickup system.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: PickupTuning,
    seed: u64,
}

impl Config {
    /// Creates a configuration from pickup tuning and the session seed.
    #[must_use]
    pub const fn new(tuning: PickupTuning, seed: u64) -> Self {
        Self { tuning, seed }
    }
}

/// Pure system that spawns, moves and collects wandering pickups.
#[derive(Debug)]
pub struct Wandering {
    tuning: PickupTuning,
    accumulator: Duration,
    rng: ChaCha8Rng,
}

impl Wandering {
    /// Creates the system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            accumulator: Duration::ZERO,
            rng: rng_stream(config.seed, WANDER_STREAM),
        }
    }

    /// Consumes world events and immutable views to emit pickup commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        pickups: &[PickupSnapshot],
        player: &PlayerSnapshot,
        grid: &NavigationGrid,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: step } = event {
                dt = dt.saturating_add(*step);
            }
        }
        if dt.is_zero() {
            return;
        }

        self.spawn(dt, pickups.len(), grid, out);
        for pickup in pickups {
            self.drive(pickup, dt, player, grid, out);
        }
    }

    fn spawn(
        &mut self,
        dt: Duration,
        active: usize,
        grid: &NavigationGrid,
        out: &mut Vec<Command>,
    ) {
        let interval = self.tuning.spawn_interval();
        if interval.is_zero() {
            return;
        }
        self.accumulator = self.accumulator.saturating_add(dt);

        let capacity = usize::try_from(self.tuning.max_active).unwrap_or(usize::MAX);
        let mut active = active;
        while self.accumulator >= interval {
            self.accumulator -= interval;
            if active >= capacity {
                continue;
            }
            match self.random_interior_cell(grid) {
                Some(cell) => {
                    out.push(Command::SpawnPickup { cell });
                    active += 1;
                }
                None => debug!(
                    "no path cell found after {} attempts; skipping pickup spawn",
                    self.tuning.spawn_attempts
                ),
            }
        }
    }

    fn random_interior_cell(&mut self, grid: &NavigationGrid) -> Option<CellCoord> {
        let width = grid.width();
        let height = grid.height();
        if width < 3 || height < 3 {
            return None;
        }
        (0..self.tuning.spawn_attempts)
            .map(|_| {
                CellCoord::new(
                    self.rng.gen_range(1..width - 1),
                    self.rng.gen_range(1..height - 1),
                )
            })
            .find(|cell| grid.is_path(*cell))
    }

    fn drive(
        &mut self,
        pickup: &PickupSnapshot,
        dt: Duration,
        player: &PlayerSnapshot,
        grid: &NavigationGrid,
        out: &mut Vec<Command>,
    ) {
        let id = pickup.id;
        let reach = planar_distance(pickup.position, player.eye);
        if player.alive && reach < self.tuning.collect_distance {
            out.push(Command::CollectPickup { pickup: id });
            return;
        }

        if !grid.is_path(pickup.cell) {
            out.push(Command::TeleportPickup { pickup: id });
            return;
        }

        let mut heading = pickup.direction;
        if heading.is_some() && pickup.stalled_for > self.tuning.stuck_timeout() {
            out.push(Command::TeleportPickup { pickup: id });
            return;
        }

        let arrival = self.tuning.arrival_distance(grid.cell_size());
        let near_target = planar_distance(pickup.position, pickup.target_position) < arrival;
        if heading.is_none() || near_target || pickup.turn_timer.is_elapsed() {
            let moves = grid.open_moves(pickup.cell);
            let step = wander_step(&moves, heading, heading.is_none(), &mut self.rng);
            heading = commit_step(id, heading, step.map(|step| step.direction), out);
        }

        if heading.is_some() {
            out.push(Command::AdvancePickup {
                pickup: id,
                distance: self.tuning.speed * dt.as_secs_f32(),
            });
        }
    }
}

fn commit_step(
    pickup: PickupId,
    heading: Option<Direction>,
    step: Option<Direction>,
    out: &mut Vec<Command>,
) -> Option<Direction> {
    match step {
        Some(direction) => {
            out.push(Command::StepPickup { pickup, direction });
            Some(direction)
        }
        None => {
            if heading.is_some() {
                out.push(Command::ClearPickupDirection { pickup });
            }
            None
        }
    }
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let offset = b - a;
    offset.x.hypot(offset.z)
}
