use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use matrix_maze_core::{CellCoord, Command, Event, SimulationConfig};
use matrix_maze_system_wandering::{Config, Wandering};
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
    config.agent.count = 0;
    config
}

fn system_for(world: &World) -> Wandering {
    let config = query::config(world);
    Wandering::new(Config::new(config.pickup.clone(), config.seed))
}

fn apply(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn frame(world: &mut World, wandering: &mut Wandering) -> Vec<Event> {
    let mut events = apply(world, Command::Tick { dt: FRAME });

    let mut commands = Vec::new();
    let view: &World = world;
    wandering.handle(
        &events,
        &query::pickup_view(view),
        &query::player(view),
        query::navigation(view),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

#[test]
fn pickup_at_the_player_is_collected_and_reveals_the_map() {
    let mut world = world_from(HALL, quiet_config());
    let mut wandering = system_for(&world);
    let spawned = apply(
        &mut world,
        Command::SpawnPickup {
            cell: CellCoord::new(1, 1),
        },
    );
    assert!(matches!(spawned.as_slice(), [Event::PickupSpawned { .. }]));

    let events = frame(&mut world, &mut wandering);

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::PickupCollected { .. })));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::MapRevealStarted { .. })));
    assert!(query::pickup_view(&world).is_empty());
    assert!(query::map_reveal_remaining(&world).is_some());
}

#[test]
fn boxed_in_pickup_waits_and_expires() {
    let mut config = quiet_config();
    config.pickup.lifetime_secs = 1.0;
    config.pickup.spawn_interval_secs = 0.0;
    let mut world = world_from(CELLS, config);
    let mut wandering = system_for(&world);
    let _ = apply(
        &mut world,
        Command::SpawnPickup {
            cell: CellCoord::new(5, 1),
        },
    );
    let start = query::pickup_view(&world)[0].target_position;

    let mut log = Vec::new();
    for _ in 0..10 {
        log.extend(frame(&mut world, &mut wandering));
    }
    let pickup = query::pickup_view(&world)[0].clone();
    assert_eq!(pickup.cell, CellCoord::new(5, 1));
    assert_eq!(pickup.target_position, start);
    assert_eq!(pickup.direction, None);

    for _ in 0..20 {
        log.extend(frame(&mut world, &mut wandering));
    }
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::PickupExpired { .. })));
    assert!(query::pickup_view(&world).is_empty());
}

#[test]
fn wandering_pickups_stay_in_corridors() {
    let mut world = World::new(quiet_config().with_seed(21));
    let mut wandering = system_for(&world);

    let mut spawned = 0;
    for _ in 0..600 {
        spawned += frame(&mut world, &mut wandering)
            .iter()
            .filter(|event| matches!(event, Event::PickupSpawned { .. }))
            .count();
        let grid = query::navigation(&world);
        let capacity = query::config(&world).pickup.max_active as usize;
        let pickups = query::pickup_view(&world);
        assert!(pickups.len() <= capacity);
        for pickup in &pickups {
            assert!(grid.is_path(pickup.cell), "{:?} left the corridors", pickup.id);
        }
    }
    assert!(spawned >= 5, "a pickup spawns every few seconds");
}

fn replay(seed: u64) -> u64 {
    let mut world = World::new(quiet_config().with_seed(seed));
    let mut wandering = system_for(&world);
    let mut hasher = DefaultHasher::new();
    for _ in 0..300 {
        let _ = frame(&mut world, &mut wandering);
    }
    for pickup in query::pickup_view(&world) {
        pickup.id.hash(&mut hasher);
        pickup.cell.hash(&mut hasher);
        pickup.position.x.to_bits().hash(&mut hasher);
        pickup.position.z.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[test]
fn same_seed_replays_identically() {
    assert_eq!(replay(8), replay(8));
}
