use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::Vec3;
use matrix_maze_core::{Command, Ray, SimulationConfig};
use matrix_maze_system_collision::{CollisionProbe, Config, MoveIntent};
use matrix_maze_world::{self as world, query, NavigationGrid, World};

const HALL: &str = "
    #########
    #.......#
    #.#####.#
    #.......#
    #########
";

const FRAME: Duration = Duration::from_millis(50);

fn hall() -> World {
    let grid = NavigationGrid::from_ascii(HALL, 2, 10.0).expect("layout parses");
    let mut config = SimulationConfig::default();
    config.maze.short_wall_chance = 0.0;
    World::with_grid(config, grid)
}

fn face_north(world: &mut World) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SetPlayerView {
            yaw: 0.0,
            pitch: 0.0,
        },
        &mut events,
    );
}

fn frame(world: &mut World, probe: &mut CollisionProbe, intent: MoveIntent) {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: FRAME }, &mut events);

    let mut commands = Vec::new();
    let view: &World = world;
    probe.handle(
        &events,
        intent,
        &query::player(view),
        |ray| query::wall_distance(view, ray),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
}

fn probe_for(world: &World) -> CollisionProbe {
    CollisionProbe::new(Config::new(query::config(world).player.clone()))
}

fn north_clearance(world: &World) -> f32 {
    let tuning = &query::config(world).player;
    let eye = query::player(world).eye;
    let origin = Vec3::new(eye.x, eye.y - tuning.eye_height + tuning.probe_height(), eye.z);
    query::wall_distance(world, &Ray::towards(origin, Vec3::NEG_Z)).expect("north wall")
}

#[test]
fn running_into_a_wall_never_penetrates_it() {
    let mut world = hall();
    let mut probe = probe_for(&world);
    face_north(&mut world);
    let radius = query::config(&world).player.penetration_radius();
    let intent = MoveIntent {
        forward: true,
        run: true,
        ..MoveIntent::default()
    };

    assert!((north_clearance(&world) - 10.0).abs() < 1e-3);
    for _ in 0..60 {
        frame(&mut world, &mut probe, intent);
        assert!(north_clearance(&world) >= radius - 1e-3);
    }
    assert!(north_clearance(&world) < 10.0, "the player moved towards the wall");
}

#[test]
fn diagonal_motion_slides_along_the_wall() {
    let mut world = hall();
    let mut probe = probe_for(&world);
    face_north(&mut world);
    let radius = query::config(&world).player.penetration_radius();
    let start = query::player(&world).eye;
    let intent = MoveIntent {
        forward: true,
        right: true,
        ..MoveIntent::default()
    };

    for _ in 0..40 {
        frame(&mut world, &mut probe, intent);
        assert!(north_clearance(&world) >= radius - 1e-3);
    }

    let eye = query::player(&world).eye;
    assert!(eye.x > start.x + 20.0, "slid east along the corridor");
    assert!((eye.y - start.y).abs() < 1e-4);
}

#[test]
fn idle_intent_leaves_the_player_in_place() {
    let mut world = hall();
    let mut probe = probe_for(&world);
    let start = query::player(&world).eye;

    for _ in 0..10 {
        frame(&mut world, &mut probe, MoveIntent::default());
    }

    assert_eq!(query::player(&world).eye, start);
}

fn replay() -> u64 {
    let mut world = hall();
    let mut probe = probe_for(&world);
    let mut hasher = DefaultHasher::new();
    for index in 0..200u32 {
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::SetPlayerView {
                yaw: index as f32 * 0.07,
                pitch: 0.0,
            },
            &mut events,
        );
        let intent = MoveIntent {
            forward: true,
            left: index % 40 < 20,
            run: index % 3 == 0,
            ..MoveIntent::default()
        };
        frame(&mut world, &mut probe, intent);
        let eye = query::player(&world).eye;
        for value in [eye.x, eye.y, eye.z] {
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[test]
fn replays_identically() {
    assert_eq!(replay(), replay());
}
