use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_matrix-maze"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch matrix-maze")
}

#[test]
fn headless_run_prints_a_summary() {
    let output = run(&["--seed", "5", "--ticks", "120", "--agents", "1"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("outcome:"), "{stdout}");
    assert!(stdout.contains("shots fired:"), "{stdout}");
}

#[test]
fn demo_config_and_maze_print() {
    let config = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/small_maze.toml");
    let output = run(&["--config", config, "--ticks", "30", "--print-maze"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let maze: Vec<&str> = stdout.lines().take(11).collect();
    assert_eq!(maze.len(), 11);
    assert!(maze.iter().all(|row| row.len() == 11));
    assert!(maze[0].chars().all(|cell| cell == '#'));
}

#[test]
fn missing_config_file_is_reported() {
    let output = run(&["--config", "does/not/exist.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config file"), "{stderr}");
}

#[test]
fn zero_fps_is_rejected() {
    let output = run(&["--fps", "0"]);

    assert!(!output.status.success());
}
