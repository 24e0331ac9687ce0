use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use mazebot::drivers::{RobotDriver, WallFollower, Wizard};
use mazebot::generators::{GenerationConfig, Generator, generate_maze};
use mazebot::maze::Maze;
use mazebot::render::Renderer;
use mazebot::robot::{RelativeDirection, Robot, UnreliableSensor};

/// How long an unreliable sensor works before breaking down.
const SENSOR_MTBF: Duration = Duration::from_millis(4000);
/// How long a repair takes.
const SENSOR_MTTR: Duration = Duration::from_millis(2000);
/// Stagger between starting the four failure processes, so the sensors
/// never all break at once.
const SENSOR_STAGGER: Duration = Duration::from_millis(500);

/// Logs go to a file since the terminal is busy drawing the maze.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::never(".", "mazebot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mazebot=info".parse().expect("valid directive")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

fn read_line() -> std::io::Result<String> {
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn ask_maze() -> std::io::Result<Option<Maze>> {
    println!(
        "Enter maze dimensions (width height, maximum 255x255), or the path of a saved maze:"
    );
    let input = read_line()?;

    let dims = input
        .split_whitespace()
        .take(2)
        .filter_map(|s| s.parse::<u8>().ok())
        .collect::<Vec<_>>();
    if dims.len() != 2 {
        // Not a pair of numbers, try it as a file path.
        let Ok(text) = std::fs::read_to_string(&input) else {
            eprintln!("Please enter two valid numbers, or the path of an existing file.");
            return Ok(None);
        };
        return match Maze::load(&text) {
            Ok(maze) => {
                println!("Loaded a {}x{} maze from {}.", maze.width(), maze.height(), input);
                Ok(Some(maze))
            }
            Err(e) => {
                eprintln!("Could not parse {input}: {e}");
                Ok(None)
            }
        };
    }
    let (width, height) = (dims[0], dims[1]);
    if width < 2 || height < 2 {
        eprintln!("Width and height must be at least 2.");
        return Ok(None);
    }

    println!("Select maze generation algorithm:");
    println!("1. {}", Generator::Dfs);
    println!("2. {}", Generator::Prim);
    println!("3. {}", Generator::Boruvka);
    let generator = match read_line()?.as_str() {
        "1" => Generator::Dfs,
        "2" => Generator::Prim,
        "3" => Generator::Boruvka,
        _ => {
            eprintln!("Invalid selection.");
            return Ok(None);
        }
    };

    println!("Enter room skill 0-9 (0 for a perfect maze without rooms):");
    let Ok(skill) = read_line()?.parse::<u8>() else {
        eprintln!("Please enter a number between 0 and 9.");
        return Ok(None);
    };

    println!("Enter a seed for reproducible generation (leave blank for a random maze):");
    let seed_input = read_line()?;
    let seed = if seed_input.is_empty() {
        None
    } else {
        match seed_input.parse::<u64>() {
            Ok(seed) => Some(seed),
            Err(_) => {
                eprintln!("Seed must be a number.");
                return Ok(None);
            }
        }
    };

    let config = if skill == 0 {
        GenerationConfig::perfect(width, height, seed)
    } else {
        GenerationConfig::with_rooms(width, height, skill, seed)
    };

    // Generate in the background and show progress on this thread.
    let (progress_tx, progress_rx) = std::sync::mpsc::channel();
    let compute_thread_handle =
        std::thread::spawn(move || generate_maze(&config, generator, Some(&progress_tx)));
    for percent in progress_rx {
        print!("\rGenerating... {percent:>3}%");
        std::io::stdout().flush()?;
    }
    println!();

    match compute_thread_handle.join().expect("Compute thread panicked") {
        Ok(maze) => Ok(Some(maze)),
        Err(e) => {
            eprintln!("Generation failed: {e}");
            Ok(None)
        }
    }
}

fn main() -> std::io::Result<()> {
    let _guard = init_logging();

    let Some(maze) = ask_maze()? else {
        return Ok(());
    };

    println!("Save the maze to a file? Enter a path, or leave blank to skip:");
    let save_path = read_line()?;
    if !save_path.is_empty() {
        std::fs::write(&save_path, maze.save())?;
        println!("Saved to {save_path}.");
    }

    println!("Select a driver:");
    println!("1. Wizard (knows the maze)");
    println!("2. Wall follower (reliable sensors)");
    println!("3. Wall follower (sensors that break down and get repaired)");
    let choice = read_line()?;
    let maze = Arc::new(maze);
    let mut robot = Robot::with_reliable_sensors(Arc::clone(&maze));
    let mut unreliable = false;
    let (mut driver, driver_name): (Box<dyn RobotDriver>, &str) = match choice.as_str() {
        "1" => (Box::new(Wizard::new()), "Wizard"),
        "2" => (Box::new(WallFollower::new()), "Wall follower"),
        "3" => {
            unreliable = true;
            robot = Robot::new(Arc::clone(&maze));
            for mount in RelativeDirection::ALL {
                robot.add_sensor(mount, Box::new(UnreliableSensor::new(Arc::clone(&maze))));
            }
            for mount in RelativeDirection::ALL {
                robot
                    .start_sensor_failure_process(mount, SENSOR_MTBF, SENSOR_MTTR)
                    .expect("freshly mounted sensor accepts a failure process");
                std::thread::sleep(SENSOR_STAGGER);
            }
            (Box::new(WallFollower::new()), "Wall follower")
        }
        _ => {
            eprintln!("Invalid selection.");
            return Ok(());
        }
    };

    let mut renderer = Renderer::new(Duration::from_millis(80));
    renderer.enter()?;
    let outcome = loop {
        let status = format!(
            "{driver_name} | battery {:>6.0} | traveled {:>4} | at {:?}",
            robot.battery_level(),
            robot.odometer(),
            robot.position(),
        );
        renderer.draw(&maze, Some(&robot), &status)?;
        match driver.drive_one_step(&mut robot) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };
    renderer.draw(&maze, Some(&robot), "")?;
    renderer.finish(&maze)?;

    if unreliable {
        for mount in RelativeDirection::ALL {
            robot.stop_sensor_failure_process(mount).ok();
        }
    }

    match outcome {
        Ok(()) => println!(
            "The robot reached the exit! Traveled {} cells with {:.0} energy to spare.",
            robot.odometer(),
            robot.battery_level()
        ),
        Err(e) => println!("The robot did not make it: {e}"),
    }
    Ok(())
}
