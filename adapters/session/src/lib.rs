#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame orchestration of a Matrix Maze session.
//!
//! [`Session`] owns the [`World`] and every system. Each call to
//! [`Session::step`] advances the clock, applies player input and runs the
//! systems in a fixed order before forwarding the resulting events to the
//! presentation collaborators.

use std::time::Duration;

use log::{info, warn};
use matrix_maze_core::{AudioCue, Command, Event, SessionOutcome, SimulationConfig};
use matrix_maze_system_agent_ai::{self as agent_ai, AgentAi};
use matrix_maze_system_collision::{self as collision, CollisionProbe, MoveIntent};
use matrix_maze_system_projectiles::{self as projectiles, Projectiles};
use matrix_maze_system_wandering::{self as wandering, Wandering};
use matrix_maze_world::{self as world, query, NavigationGrid, World};

/// Receives fire-and-forget sound requests.
pub trait AudioSink {
    /// Plays the provided cue.
    fn play(&mut self, cue: AudioCue);
}

/// Receives the heads-up display state once per frame.
pub trait HudSink {
    /// Presents the latest HUD values.
    fn present(&mut self, frame: &HudFrame);

    /// Shows or hides the map overlay.
    fn map_reveal(&mut self, active: bool, remaining: Duration);
}

/// Notified once when the session reaches a terminal outcome.
pub trait SessionObserver {
    /// Reports how the session ended.
    fn finished(&mut self, outcome: SessionOutcome);
}

/// Player input sampled for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// View rotation around the vertical axis. Zero faces negative Z.
    pub yaw: f32,
    /// View rotation around the lateral axis. Positive values look up.
    pub pitch: f32,
    /// Move along the view direction.
    pub forward: bool,
    /// Move against the view direction.
    pub backward: bool,
    /// Strafe left.
    pub left: bool,
    /// Strafe right.
    pub right: bool,
    /// Use the run speed.
    pub run: bool,
    /// Pull the trigger.
    pub fire: bool,
    /// Request a reload.
    pub reload: bool,
}

impl FrameInput {
    /// Movement keys of the frame.
    #[must_use]
    pub const fn intent(&self) -> MoveIntent {
        MoveIntent {
            forward: self.forward,
            backward: self.backward,
            left: self.left,
            right: self.right,
            run: self.run,
        }
    }
}

/// Values shown on the heads-up display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudFrame {
    /// Player health between zero and one.
    pub health_fraction: f32,
    /// Rounds left in the magazine.
    pub rounds: u32,
    /// Rounds in a full magazine.
    pub clip_size: u32,
    /// Reload completion between zero and one while reloading.
    pub reload_progress: Option<f32>,
    /// Agents still alive.
    pub agents_remaining: u32,
    /// Time left on the map reveal, if active.
    pub map_reveal_remaining: Option<Duration>,
}

impl HudFrame {
    /// Captures the HUD values from the world.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let player = query::player(world);
        let reload_time = query::config(world).weapon.reload_time();
        let reload_progress = player.reload_remaining.map(|remaining| {
            if reload_time.is_zero() {
                return 1.0;
            }
            (1.0 - remaining.as_secs_f32() / reload_time.as_secs_f32()).clamp(0.0, 1.0)
        });

        Self {
            health_fraction: player.health_fraction(),
            rounds: player.rounds,
            clip_size: player.clip_size,
            reload_progress,
            agents_remaining: query::agents_remaining(world),
            map_reveal_remaining: query::map_reveal_remaining(world),
        }
    }
}

#[derive(Default)]
struct Collaborators {
    audio: Option<Box<dyn AudioSink>>,
    hud: Option<Box<dyn HudSink>>,
    observer: Option<Box<dyn SessionObserver>>,
    warned_audio: bool,
    warned_hud: bool,
    warned_observer: bool,
}

impl Collaborators {
    fn dispatch(&mut self, events: &[Event], hud: &HudFrame) {
        for event in events {
            if let Some(cue) = event.audio_cue() {
                match self.audio.as_mut() {
                    Some(audio) => audio.play(cue),
                    None => warn_once(&mut self.warned_audio, "audio sink"),
                }
            }

            let reveal = match event {
                Event::MapRevealStarted { duration } => Some((true, *duration)),
                Event::MapRevealEnded => Some((false, Duration::ZERO)),
                _ => None,
            };
            if let Some((active, remaining)) = reveal {
                match self.hud.as_mut() {
                    Some(sink) => sink.map_reveal(active, remaining),
                    None => warn_once(&mut self.warned_hud, "HUD sink"),
                }
            }

            if let Event::SessionEnded { outcome } = event {
                match self.observer.as_mut() {
                    Some(observer) => observer.finished(*outcome),
                    None => warn_once(&mut self.warned_observer, "session observer"),
                }
            }
        }

        match self.hud.as_mut() {
            Some(sink) => sink.present(hud),
            None => warn_once(&mut self.warned_hud, "HUD sink"),
        }
    }
}

fn warn_once(warned: &mut bool, collaborator: &str) {
    if !*warned {
        *warned = true;
        warn!("no {collaborator} attached; its output is dropped");
    }
}

/// A running simulation session.
pub struct Session {
    world: World,
    agent_ai: AgentAi,
    projectiles: Projectiles,
    wandering: Wandering,
    collision: CollisionProbe,
    collaborators: Collaborators,
}

impl Session {
    /// Generates a maze from the configuration and starts a session in it.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self::from_world(World::new(config))
    }

    /// Starts a session on a prepared grid without spawning agents.
    #[must_use]
    pub fn with_grid(config: SimulationConfig, grid: NavigationGrid) -> Self {
        Self::from_world(World::with_grid(config, grid))
    }

    /// Wraps an existing world, building every system from its configuration.
    #[must_use]
    pub fn from_world(world: World) -> Self {
        let config = query::config(&world);
        let agent_ai = AgentAi::new(agent_ai::Config::new(
            config.agent.clone(),
            config.player.radius,
            config.seed,
        ));
        let projectiles = Projectiles::new(projectiles::Config::new(
            config.player.radius,
            config.agent.body_width * 0.5,
        ));
        let wandering = Wandering::new(wandering::Config::new(config.pickup.clone(), config.seed));
        let collision = CollisionProbe::new(collision::Config::new(config.player.clone()));
        info!(
            "session ready: {}x{} maze, {} agents",
            query::navigation(&world).width(),
            query::navigation(&world).height(),
            query::agents_remaining(&world)
        );

        Self {
            world,
            agent_ai,
            projectiles,
            wandering,
            collision,
            collaborators: Collaborators::default(),
        }
    }

    /// Attaches the audio collaborator.
    #[must_use]
    pub fn with_audio<A>(mut self, audio: A) -> Self
    where
        A: AudioSink + 'static,
    {
        self.collaborators.audio = Some(Box::new(audio));
        self
    }

    /// Attaches the HUD collaborator.
    #[must_use]
    pub fn with_hud<H>(mut self, hud: H) -> Self
    where
        H: HudSink + 'static,
    {
        self.collaborators.hud = Some(Box::new(hud));
        self
    }

    /// Attaches the session observer.
    #[must_use]
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: SessionObserver + 'static,
    {
        self.collaborators.observer = Some(Box::new(observer));
        self
    }

    /// Read-only access to the simulation state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Terminal outcome, once the session ended.
    #[must_use]
    pub fn outcome(&self) -> Option<SessionOutcome> {
        query::outcome(&self.world)
    }

    /// Applies a command outside the regular frame, for scripted setups.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        events
    }

    /// Advances the session by one frame and returns every event it produced.
    ///
    /// Order: clock, view and weapon input, projectiles, pickups, agents,
    /// player movement, contact and exit checks, collaborator dispatch. Once
    /// the session has an outcome this does nothing.
    pub fn step(&mut self, input: &FrameInput, dt: Duration) -> Vec<Event> {
        if self.outcome().is_some() {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut commands = vec![
            Command::Tick { dt },
            Command::SetPlayerView {
                yaw: input.yaw,
                pitch: input.pitch,
            },
        ];
        if input.reload {
            commands.push(Command::ReloadPlayerWeapon);
        }
        if input.fire {
            commands.push(Command::FirePlayerWeapon);
        }
        self.apply_all(commands, &mut events);

        let stages = [
            Stage::Projectiles,
            Stage::Pickups,
            Stage::Agents,
            Stage::Movement,
        ];
        for stage in stages {
            if self.outcome().is_some() {
                break;
            }
            let commands = self.run_stage(stage, &events, input);
            self.apply_all(commands, &mut events);
        }
        self.apply_all(vec![Command::ResolvePlayerContacts], &mut events);

        let hud = HudFrame::capture(&self.world);
        self.collaborators.dispatch(&events, &hud);
        events
    }

    fn run_stage(&mut self, stage: Stage, events: &[Event], input: &FrameInput) -> Vec<Command> {
        let view = &self.world;
        let player = query::player(view);
        let mut out = Vec::new();
        match stage {
            Stage::Projectiles => self.projectiles.handle(
                events,
                &query::projectile_view(view),
                &query::agent_bodies(view),
                &player,
                |ray| query::wall_distance(view, ray),
                |handle| query::collider_owner(view, handle),
                &mut out,
            ),
            Stage::Pickups => self.wandering.handle(
                events,
                &query::pickup_view(view),
                &player,
                query::navigation(view),
                &mut out,
            ),
            Stage::Agents => self.agent_ai.handle(
                events,
                &query::agent_view(view),
                &player,
                query::navigation(view),
                |ray| query::wall_distance(view, ray),
                &mut out,
            ),
            Stage::Movement => self.collision.handle(
                events,
                input.intent(),
                &player,
                |ray| query::wall_distance(view, ray),
                &mut out,
            ),
        }
        out
    }

    fn apply_all(&mut self, commands: Vec<Command>, events: &mut Vec<Event>) {
        for command in commands {
            world::apply(&mut self.world, command, events);
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Stage {
    Projectiles,
    Pickups,
    Agents,
    Movement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    const HALL: &str = "
        #######
        #.....#
        #######
    ";

    #[derive(Clone, Default)]
    struct Recorder {
        cues: Rc<RefCell<Vec<AudioCue>>>,
        frames: Rc<RefCell<Vec<HudFrame>>>,
    }

    impl AudioSink for Recorder {
        fn play(&mut self, cue: AudioCue) {
            self.cues.borrow_mut().push(cue);
        }
    }

    impl HudSink for Recorder {
        fn present(&mut self, frame: &HudFrame) {
            self.frames.borrow_mut().push(*frame);
        }

        fn map_reveal(&mut self, _active: bool, _remaining: Duration) {}
    }

    fn session() -> Session {
        let grid = NavigationGrid::from_ascii(HALL, 2, 10.0).expect("layout parses");
        let mut config = SimulationConfig::default();
        config.maze.short_wall_chance = 0.0;
        Session::with_grid(config, grid)
    }

    #[test]
    fn intent_copies_movement_keys() {
        let input = FrameInput {
            forward: true,
            left: true,
            run: true,
            ..FrameInput::default()
        };
        let intent = input.intent();
        assert!(intent.forward && intent.left && intent.run);
        assert!(!intent.backward && !intent.right);
    }

    #[test]
    fn firing_plays_a_cue_and_updates_the_hud() {
        let recorder = Recorder::default();
        let mut session = session()
            .with_audio(recorder.clone())
            .with_hud(recorder.clone());

        let input = FrameInput {
            yaw: -std::f32::consts::FRAC_PI_2,
            fire: true,
            ..FrameInput::default()
        };
        let events = session.step(&input, Duration::from_millis(16));

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WeaponFired { .. })));
        assert_eq!(recorder.cues.borrow().first(), Some(&AudioCue::Shoot));
        let frames = recorder.frames.borrow();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].rounds, frames[0].clip_size - 1);
        assert_eq!(frames[0].reload_progress, None);
    }

    #[test]
    fn reload_progress_reports_partial_refill() {
        let mut session = session();
        let fire = FrameInput {
            fire: true,
            ..FrameInput::default()
        };
        let _ = session.step(&fire, Duration::from_millis(10));
        let reload = FrameInput {
            reload: true,
            ..FrameInput::default()
        };
        let _ = session.step(&reload, Duration::from_millis(10));
        let _ = session.step(&FrameInput::default(), Duration::from_millis(500));

        let progress = HudFrame::capture(session.world())
            .reload_progress
            .expect("reloading");
        assert!(progress > 0.0 && progress < 1.0);
    }
}
