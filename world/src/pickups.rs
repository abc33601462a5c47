//! Wandering pickups that reveal the map when collected.

use std::{f32::consts::PI, time::Duration};

use glam::Vec3;
use matrix_maze_core::{CellCoord, Countdown, Direction, PickupId, PickupSnapshot, PickupTuning};

use crate::agents::{approach, planar_distance};

#[derive(Clone, Debug)]
pub(crate) struct Pickup {
    pub(crate) id: PickupId,
    pub(crate) cell: CellCoord,
    pub(crate) position: Vec3,
    pub(crate) target_position: Vec3,
    pub(crate) direction: Option<Direction>,
    pub(crate) lifetime: Countdown,
    pub(crate) turn_timer: Countdown,
    pub(crate) stalled_for: Duration,
    pub(crate) bounce_phase: f32,
}

impl Pickup {
    pub(crate) fn spawn(
        id: PickupId,
        cell: CellCoord,
        position: Vec3,
        tuning: &PickupTuning,
    ) -> Self {
        Self {
            id,
            cell,
            position,
            target_position: position,
            direction: None,
            lifetime: Countdown::new(tuning.lifetime()),
            turn_timer: Countdown::expired(),
            stalled_for: Duration::ZERO,
            bounce_phase: 0.0,
        }
    }

    pub(crate) fn tick(&mut self, dt: Duration, tuning: &PickupTuning, arrival_distance: f32) {
        self.lifetime.advance(dt);
        self.turn_timer.advance(dt);
        self.bounce_phase = (self.bounce_phase + dt.as_secs_f32() * tuning.bounce_speed) % PI;

        let far = planar_distance(self.position, self.target_position) > arrival_distance;
        if self.direction.is_some() && far {
            self.stalled_for = self.stalled_for.saturating_add(dt);
        } else {
            self.stalled_for = Duration::ZERO;
        }
    }

    pub(crate) fn advance(&mut self, distance: f32) {
        let _ = approach(
            &mut self.position,
            self.target_position,
            &mut self.direction,
            distance,
        );
    }

    pub(crate) fn snapshot(&self, tuning: &PickupTuning) -> PickupSnapshot {
        let lift = self.bounce_phase.sin().abs() * tuning.bounce_height;
        PickupSnapshot {
            id: self.id,
            cell: self.cell,
            position: self.position + Vec3::new(0.0, lift, 0.0),
            target_position: self.target_position,
            direction: self.direction,
            remaining: self.lifetime.remaining(),
            turn_timer: self.turn_timer,
            stalled_for: self.stalled_for,
            bounce_phase: self.bounce_phase,
        }
    }
}
