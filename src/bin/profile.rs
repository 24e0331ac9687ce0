use std::sync::Arc;
use std::time::Instant;

use mazebot::drivers::{RobotDriver, Wizard};
use mazebot::generators::{GenerationConfig, Generator, generate_maze};
use mazebot::robot::Robot;

/// Times generation plus a wizard run for each algorithm, without any
/// rendering. Usage: profile [size] [iterations]
fn main() {
    let mut args = std::env::args();
    args.next(); // Skip executable name
    let size = args.next().and_then(|s| s.parse::<u8>().ok()).unwrap_or(64);
    let iterations = args.next().and_then(|s| s.parse::<usize>().ok()).unwrap_or(10);

    for generator in [Generator::Dfs, Generator::Prim, Generator::Boruvka] {
        let started = Instant::now();
        for i in 0..iterations {
            let config = GenerationConfig::perfect(size, size, Some(i as u64));
            let maze = generate_maze(&config, generator, None).expect("generation failed");
            let mut robot = Robot::with_reliable_sensors(Arc::new(maze));
            // Large mazes need more than the standard battery.
            robot.set_battery_level(f32::MAX);
            Wizard::new().drive_to_exit(&mut robot).expect("wizard failed");
        }
        println!(
            "{generator}: {iterations} runs of {size}x{size} in {:?}",
            started.elapsed()
        );
    }
}
