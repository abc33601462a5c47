use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use matrix_maze_core::{
    AgentId, AgentState, CellCoord, Command, DamageSource, Event, SimulationConfig,
};
use matrix_maze_system_agent_ai::{AgentAi, Config};
use matrix_maze_world::{self as world, query, NavigationGrid, World};

const HALL: &str = "
    #########
    #.......#
    #.#####.#
    #.......#
    #########
";

const CELLS: &str = "
    #######
    #.#.#.#
    #######
";

const FRAME: Duration = Duration::from_millis(50);

fn world_from(layout: &str, config: SimulationConfig) -> World {
    let grid = NavigationGrid::from_ascii(layout, 2, 10.0).expect("layout parses");
    World::with_grid(config, grid)
}

fn quiet_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.maze.short_wall_chance = 0.0;
    config
}

fn ai_for(world: &World) -> AgentAi {
    let config = query::config(world);
    AgentAi::new(Config::new(
        config.agent.clone(),
        config.player.radius,
        config.seed,
    ))
}

fn spawn(world: &mut World, cell: CellCoord) -> AgentId {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnAgent { cell }, &mut events);
    match events.as_slice() {
        [Event::AgentSpawned { agent, .. }] => *agent,
        other => panic!("unexpected events {other:?}"),
    }
}

fn step(world: &mut World, ai: &mut AgentAi) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: FRAME }, &mut events);

    let mut commands = Vec::new();
    let view: &World = world;
    ai.handle(
        &events,
        &query::agent_view(view),
        &query::player(view),
        query::navigation(view),
        |ray| query::wall_distance(view, ray),
        &mut commands,
    );

    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

fn run(world: &mut World, ai: &mut AgentAi, frames: usize) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..frames {
        log.extend(step(world, ai));
    }
    log
}

#[test]
fn agent_in_plain_view_attacks_and_fires() {
    let mut world = world_from(HALL, quiet_config());
    let agent = spawn(&mut world, CellCoord::new(5, 1));
    let mut ai = ai_for(&world);

    let log = run(&mut world, &mut ai, 20);

    assert!(log.contains(&Event::AgentStateChanged {
        agent,
        from: AgentState::Patrolling,
        to: AgentState::Attacking,
    }));
    assert!(log
        .iter()
        .any(|event| matches!(
            event,
            Event::AgentFired { agent: shooter, .. } if *shooter == agent
        )));
}

#[test]
fn hidden_agent_keeps_patrolling() {
    let mut world = world_from(HALL, quiet_config());
    let agent = spawn(&mut world, CellCoord::new(4, 3));
    let mut ai = ai_for(&world);

    let log = run(&mut world, &mut ai, 10);

    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::AgentStateChanged { .. })));
    let snapshot = query::agent_view(&world)
        .get(agent)
        .cloned()
        .expect("agent alive");
    assert_eq!(snapshot.state, AgentState::Patrolling);
    assert!(!snapshot.can_see_player);
    assert!(snapshot.direction.is_some(), "patrol picks a corridor");
}

#[test]
fn agent_without_exits_waits_in_place() {
    let mut world = world_from(CELLS, quiet_config());
    let agent = spawn(&mut world, CellCoord::new(3, 1));
    let start = query::navigation(&world).cell_center(CellCoord::new(3, 1));
    let mut ai = ai_for(&world);

    let log = run(&mut world, &mut ai, 100);

    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::AgentStepped { .. } | Event::AgentTeleported { .. })));
    let snapshot = query::agent_view(&world)
        .get(agent)
        .cloned()
        .expect("agent alive");
    assert_eq!(snapshot.cell, CellCoord::new(3, 1));
    assert_eq!(snapshot.position, start);
    assert_eq!(snapshot.direction, None);
    assert_eq!(snapshot.state, AgentState::Patrolling);
}

#[test]
fn wedged_agent_is_teleported_then_resumes_patrol() {
    let mut config = quiet_config();
    config.agent.patrol_speed = 0.0;
    config.agent.turn_delay_secs = 30.0;
    let mut world = world_from(HALL, config);
    let agent = spawn(&mut world, CellCoord::new(5, 3));
    let mut ai = ai_for(&world);

    let log = run(&mut world, &mut ai, 80);

    let teleported = log
        .iter()
        .position(|event| {
            matches!(event, Event::AgentTeleported { agent: moved, .. } if *moved == agent)
        })
        .expect("stalled agent recovers");
    let recovered = log[teleported..].iter().any(|event| {
        matches!(
            event,
            Event::AgentStateChanged {
                from: AgentState::Teleporting,
                to: AgentState::Patrolling,
                ..
            }
        )
    });
    assert!(recovered, "teleporting must revert to patrolling");

    let snapshot = query::agent_view(&world)
        .get(agent)
        .cloned()
        .expect("agent alive");
    let grid = query::navigation(&world);
    assert!(grid.is_path(snapshot.cell));
}

#[test]
fn close_agent_lands_melee_strikes() {
    let mut world = world_from(HALL, quiet_config());
    let _agent = spawn(&mut world, CellCoord::new(3, 1));
    let mut ai = ai_for(&world);

    let log = run(&mut world, &mut ai, 80);

    assert!(log.iter().any(|event| matches!(
        event,
        Event::AgentStateChanged {
            to: AgentState::Melee,
            ..
        }
    )));
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::MeleeStruck { landed: true, .. })));
    assert!(log.iter().any(|event| matches!(
        event,
        Event::PlayerDamaged {
            source: DamageSource::Melee,
            ..
        }
    )));
}

#[test]
fn agents_never_leave_path_cells() {
    let mut world = World::new(quiet_config().with_seed(11));
    let mut ai = ai_for(&world);

    for _ in 0..400 {
        let _ = step(&mut world, &mut ai);
        let grid = query::navigation(&world);
        for agent in query::agent_view(&world).iter() {
            assert!(grid.is_path(agent.cell), "{:?} left the corridors", agent.id);
        }
    }
}

fn replay(seed: u64) -> u64 {
    let mut world = World::new(quiet_config().with_seed(seed));
    let mut ai = ai_for(&world);
    let mut hasher = DefaultHasher::new();
    for event in run(&mut world, &mut ai, 300) {
        format!("{event:?}").hash(&mut hasher);
    }
    hasher.finish()
}

#[test]
fn same_seed_replays_identically() {
    assert_eq!(replay(4), replay(4));
}
