//! End-of-run statistics.

use std::fmt::Write as _;

use matrix_maze_core::{Event, ProjectileOutcome, SessionOutcome};
use matrix_maze_world::{query, World};

/// Counters accumulated from session events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    shots: u32,
    hits: u32,
    agent_shots: u32,
    agents_destroyed: u32,
    damage_taken: u32,
    pickups: u32,
}

impl Summary {
    pub(crate) fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::WeaponFired { .. } => self.shots += 1,
                Event::AgentFired { .. } => self.agent_shots += 1,
                Event::ProjectileRemoved {
                    outcome: ProjectileOutcome::HitAgent { .. },
                    ..
                } => self.hits += 1,
                Event::AgentDied { .. } => self.agents_destroyed += 1,
                Event::PlayerDamaged { amount, .. } => self.damage_taken += amount,
                Event::PickupCollected { .. } => self.pickups += 1,
                _ => {}
            }
        }
    }

    pub(crate) fn report(&self, world: &World, outcome: Option<SessionOutcome>) -> String {
        let outcome = match outcome {
            Some(SessionOutcome::Escaped) => "escaped".to_owned(),
            Some(SessionOutcome::Eliminated { cause }) => format!("eliminated ({cause:?})"),
            None => "unfinished".to_owned(),
        };

        let mut report = String::new();
        let _ = writeln!(report, "outcome:          {outcome}");
        let _ = writeln!(
            report,
            "simulated:        {} ticks, {:.1}s",
            query::tick_index(world),
            query::elapsed(world).as_secs_f32()
        );
        let _ = writeln!(report, "shots fired:      {} ({} hits)", self.shots, self.hits);
        let _ = writeln!(report, "agent shots:      {}", self.agent_shots);
        let _ = writeln!(
            report,
            "agents destroyed: {} ({} remaining)",
            self.agents_destroyed,
            query::agents_remaining(world)
        );
        let _ = writeln!(report, "damage taken:     {}", self.damage_taken);
        let _ = write!(report, "pickups:          {}", self.pickups);
        report
    }
}
