use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    f32::consts::FRAC_PI_2,
    hash::{Hash, Hasher},
    rc::Rc,
    time::Duration,
};

use glam::Vec3;
use matrix_maze_core::{
    AgentId, AgentState, CellCoord, Command, Event, SessionOutcome, SimulationConfig,
};
use matrix_maze_session::{FrameInput, Session, SessionObserver};
use matrix_maze_world::{query, NavigationGrid};

const FRAME: Duration = Duration::from_millis(20);
const SEALED: [(u32, u32); 4] = [(3, 7), (7, 7), (11, 7), (13, 13)];

/// 17x17 cells: an open corridor along row 1 and four sealed single cells.
fn arena() -> NavigationGrid {
    let layout = (0..17u32)
        .map(|row| {
            (0..17u32)
                .map(|column| {
                    let corridor = row == 1 && (1..16).contains(&column);
                    if corridor || SEALED.contains(&(column, row)) {
                        '.'
                    } else {
                        '#'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n");
    NavigationGrid::from_ascii(&layout, 2, 10.0).expect("layout parses")
}

fn stationary_agents() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.maze.short_wall_chance = 0.0;
    config.agent.patrol_speed = 0.0;
    config.agent.pursuit_speed = 0.0;
    config.agent.stuck_timeout_secs = 1_000.0;
    config.agent.fire_interval_secs = 1_000.0;
    config.pickup.spawn_interval_secs = 0.0;
    config
}

#[derive(Clone, Default)]
struct Outcomes(Rc<RefCell<Vec<SessionOutcome>>>);

impl SessionObserver for Outcomes {
    fn finished(&mut self, outcome: SessionOutcome) {
        self.0.borrow_mut().push(outcome);
    }
}

fn spawn(session: &mut Session, column: u32, row: u32) -> AgentId {
    let events = session.submit(Command::SpawnAgent {
        cell: CellCoord::new(column, row),
    });
    match events.as_slice() {
        [Event::AgentSpawned { agent, .. }] => *agent,
        other => panic!("unexpected events {other:?}"),
    }
}

fn east() -> FrameInput {
    FrameInput {
        yaw: -FRAC_PI_2,
        ..FrameInput::default()
    }
}

/// Fires twelve shots east, then lets them fly out.
fn fire_clip(session: &mut Session) -> Vec<Event> {
    let mut log = Vec::new();
    let mut fired = 0;
    for _ in 0..400 {
        let input = FrameInput {
            fire: fired < 12,
            ..east()
        };
        let events = session.step(&input, FRAME);
        fired += events
            .iter()
            .filter(|event| matches!(event, Event::WeaponFired { .. }))
            .count();
        log.extend(events);
        if fired >= 12 && query::projectile_view(session.world()).is_empty() {
            break;
        }
    }
    assert_eq!(fired, 12);
    log
}

fn count(log: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    log.iter().filter(|event| predicate(event)).count()
}

#[test]
fn twelve_shots_destroy_the_last_agent_and_open_one_exit() {
    let outcomes = Outcomes::default();
    let mut session =
        Session::with_grid(stationary_agents(), arena()).with_observer(outcomes.clone());
    let target = spawn(&mut session, 5, 1);

    let log = fire_clip(&mut session);

    assert_eq!(
        count(&log, |event| matches!(event, Event::AgentDamaged { agent, .. } if *agent == target)),
        2
    );
    let deaths: Vec<Vec3> = log
        .iter()
        .filter_map(|event| match event {
            Event::AgentDied { agent, position, .. } if *agent == target => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(deaths.len(), 1);
    let exits: Vec<Vec3> = log
        .iter()
        .filter_map(|event| match event {
            Event::ExitOpened { position } => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(exits.len(), 1);

    let height = query::config(session.world()).session.exit_marker_height;
    let expected = Vec3::new(deaths[0].x, height, deaths[0].z);
    assert!(exits[0].distance(expected) < 1e-4);
    assert_eq!(query::exit_marker(session.world()), Some(exits[0]));
    assert_eq!(query::agents_remaining(session.world()), 0);
    assert!(query::agent_view(session.world()).is_empty());

    let walk = FrameInput {
        forward: true,
        ..east()
    };
    for _ in 0..600 {
        let _ = session.step(&walk, FRAME);
        if session.outcome().is_some() {
            break;
        }
    }
    assert_eq!(session.outcome(), Some(SessionOutcome::Escaped));
    assert_eq!(*outcomes.0.borrow(), vec![SessionOutcome::Escaped]);
}

#[test]
fn killing_one_of_five_agents_leaves_the_exit_closed() {
    let mut session = Session::with_grid(stationary_agents(), arena());
    for (column, row) in SEALED {
        let _ = spawn(&mut session, column, row);
    }
    let target = spawn(&mut session, 5, 1);

    let log = fire_clip(&mut session);

    assert!(log.iter().any(|event| matches!(
        event,
        Event::AgentDied {
            agent,
            agents_remaining: 4,
            ..
        } if *agent == target
    )));
    assert_eq!(count(&log, |event| matches!(event, Event::ExitOpened { .. })), 0);
    assert_eq!(query::agents_remaining(session.world()), 4);
    assert_eq!(query::exit_marker(session.world()), None);
    assert_eq!(session.outcome(), None);
}

#[test]
fn agent_without_neighbours_idles_safely() {
    let mut session = Session::with_grid(SimulationConfig::default(), arena());
    let agent = spawn(&mut session, 13, 13);
    let start = query::navigation(session.world()).cell_center(CellCoord::new(13, 13));

    for _ in 0..300 {
        let _ = session.step(&FrameInput::default(), FRAME);
    }

    let snapshot = query::agent_view(session.world())
        .get(agent)
        .cloned()
        .expect("agent alive");
    assert_eq!(snapshot.cell, CellCoord::new(13, 13));
    assert_eq!(snapshot.position, start);
    assert_eq!(snapshot.direction, None);
    assert_eq!(snapshot.state, AgentState::Patrolling);
}

#[test]
fn session_stops_after_elimination() {
    let outcomes = Outcomes::default();
    let mut session =
        Session::with_grid(stationary_agents(), arena()).with_observer(outcomes.clone());
    let _ = spawn(&mut session, 1, 1);

    let events = session.step(&FrameInput::default(), FRAME);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::SessionEnded { .. })));
    assert!(matches!(
        session.outcome(),
        Some(SessionOutcome::Eliminated { .. })
    ));

    let ticks = query::tick_index(session.world());
    assert!(session.step(&FrameInput::default(), FRAME).is_empty());
    assert_eq!(query::tick_index(session.world()), ticks);
    assert_eq!(outcomes.0.borrow().len(), 1);
}

fn replay(seed: u64) -> u64 {
    let mut session = Session::new(SimulationConfig::default().with_seed(seed));
    let mut hasher = DefaultHasher::new();
    for frame in 0..300u32 {
        let input = FrameInput {
            yaw: frame as f32 * 0.05,
            forward: true,
            fire: frame % 3 == 0,
            ..FrameInput::default()
        };
        for event in session.step(&input, FRAME) {
            format!("{event:?}").hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[test]
fn same_seed_and_input_replay_identically() {
    assert_eq!(replay(7), replay(7));
    assert_ne!(replay(7), replay(8));
}
