use rand::{SeedableRng, rngs::StdRng};
use std::sync::mpsc::Sender;
use thiserror::Error;

mod boruvka;
mod dfs;
mod prim;
mod rooms;

use crate::maze::{Floorplan, Maze};

/// Get a random number generator, optionally seeded for reproducibility.
/// Everything that shapes the maze topology draws from this one rng, so a
/// fixed seed reproduces the maze exactly.
fn get_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Dfs,
    Prim,
    Boruvka,
}

impl std::fmt::Display for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generator::Dfs => write!(f, "Randomized Depth-First Search (DFS)"),
            Generator::Prim => write!(f, "Prim's Algorithm"),
            Generator::Boruvka => write!(f, "Boruvka's Algorithm"),
        }
    }
}

/// What to build: dimensions, perfection, room sizing skill and seed.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub width: u8,
    pub height: u8,
    /// A perfect maze is exactly a spanning tree: no rooms, no cycles.
    pub perfect: bool,
    /// Scales room count and size for imperfect mazes. Skill 0 never carves
    /// rooms even when `perfect` is false.
    pub skill: u8,
    /// Fixed seed for reproducible generation, or None for an OS seed.
    pub seed: Option<u64>,
}

impl GenerationConfig {
    pub fn perfect(width: u8, height: u8, seed: Option<u64>) -> Self {
        GenerationConfig {
            width,
            height,
            perfect: true,
            skill: 0,
            seed,
        }
    }

    pub fn with_rooms(width: u8, height: u8, skill: u8, seed: Option<u64>) -> Self {
        GenerationConfig {
            width,
            height,
            perfect: false,
            skill,
            seed,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("maze dimensions {0}x{1} are invalid, both sides must be at least 1")]
    InvalidSize(u8, u8),
    #[error("no valid edge left while {0} components remain")]
    NoValidEdge(usize),
    #[error("generated maze is not fully connected")]
    Disconnected,
    #[error("could not place any room without disconnecting the maze")]
    RoomPlacement,
}

/// Sends a progress percentage if anyone is listening. A dropped receiver is
/// ignored; progress is a best-effort side channel only.
fn report_progress(progress: Option<&Sender<u8>>, percent: u8) {
    if let Some(tx) = progress {
        let _ = tx.send(percent);
    }
}

/// Runs the chosen generation algorithm and wraps the result into a
/// [`Maze`]. The topology is a pure function of `(width, height, seed)` and
/// the algorithm; the optional channel receives rough progress percentages.
///
/// A maze is only returned when every cell can reach the single exit;
/// anything else is a generation error, never a partial maze.
pub fn generate_maze(
    config: &GenerationConfig,
    generator: Generator,
    progress: Option<&Sender<u8>>,
) -> Result<Maze, GenerationError> {
    if config.width == 0 || config.height == 0 {
        return Err(GenerationError::InvalidSize(config.width, config.height));
    }
    tracing::info!(
        "[generate] {}x{} {} maze with {}",
        config.width,
        config.height,
        if config.perfect { "perfect" } else { "imperfect" },
        generator
    );

    let mut rng = get_rng(config.seed);
    let mut floorplan = Floorplan::new(config.width, config.height);
    floorplan.initialize();
    report_progress(progress, 0);

    match generator {
        Generator::Dfs => dfs::carve(&mut floorplan, &mut rng, progress),
        Generator::Prim => prim::carve(&mut floorplan, &mut rng, progress),
        Generator::Boruvka => boruvka::carve(&mut floorplan, &mut rng, progress)?,
    }

    if !config.perfect && config.skill > 0 {
        rooms::carve_rooms(&mut floorplan, config.skill, &mut rng)?;
    }

    let exit = pick_exit_cell(&floorplan, &mut rng);
    floorplan.set_exit_position(exit.0, exit.1);

    let maze = Maze::new(floorplan, exit);
    if !maze.is_fully_connected() {
        return Err(GenerationError::Disconnected);
    }
    report_progress(progress, 100);
    tracing::info!(
        "[generate] done, exit at {:?} facing {}, start at {:?}",
        maze.exit_position(),
        maze.exit_direction(),
        maze.start_position()
    );
    Ok(maze)
}

/// Picks a uniformly random boundary cell to host the exit opening.
fn pick_exit_cell(floorplan: &Floorplan, rng: &mut StdRng) -> (u8, u8) {
    use rand::Rng;

    let (width, height) = (floorplan.width(), floorplan.height());
    let mut border_cells = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                border_cells.push((x, y));
            }
        }
    }
    border_cells[rng.random_range(0..border_cells.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::CardinalDirection;

    const ALGORITHMS: [Generator; 3] = [Generator::Dfs, Generator::Prim, Generator::Boruvka];

    /// Counts torn-down interior walls, each physical wall once.
    fn torn_down_interior_walls(maze: &Maze) -> u32 {
        let floorplan = maze.floorplan();
        let mut count = 0;
        for y in 0..maze.height() {
            for x in 0..maze.width() {
                for dir in [CardinalDirection::South, CardinalDirection::East] {
                    if floorplan.neighbor(x, y, dir).is_some() && floorplan.has_no_wall(x, y, dir)
                    {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    fn any_room_cell(maze: &Maze) -> bool {
        (0..maze.height()).any(|y| (0..maze.width()).any(|x| maze.is_in_room(x, y).unwrap()))
    }

    #[test]
    fn test_perfect_mazes_are_spanning_trees() {
        for generator in ALGORITHMS {
            for (w, h) in [(1u8, 1u8), (1, 6), (5, 5), (12, 7)] {
                let config = GenerationConfig::perfect(w, h, Some(42));
                let maze = generate_maze(&config, generator, None).unwrap();
                let cells = w as u32 * h as u32;
                assert_eq!(
                    torn_down_interior_walls(&maze),
                    cells - 1,
                    "{generator} on {w}x{h}: wrong spanning tree edge count"
                );
                assert_eq!(maze.floorplan().boundary_openings(), 1);
                assert!(maze.is_fully_connected());
                assert!(!any_room_cell(&maze));
            }
        }
    }

    #[test]
    fn test_every_cell_has_a_closer_neighbor() {
        for generator in ALGORITHMS {
            let config = GenerationConfig::perfect(9, 9, Some(7));
            let maze = generate_maze(&config, generator, None).unwrap();
            let exit = maze.exit_position();
            for y in 0..9 {
                for x in 0..9 {
                    if (x, y) == exit {
                        continue;
                    }
                    assert!(
                        maze.neighbor_closer_to_exit(x, y).is_some(),
                        "{generator}: cell ({x},{y}) has no way toward the exit"
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_maze() {
        for generator in ALGORITHMS {
            let config = GenerationConfig::perfect(8, 8, Some(99));
            let a = generate_maze(&config, generator, None).unwrap();
            let b = generate_maze(&config, generator, None).unwrap();
            assert_eq!(a.save(), b.save(), "{generator} is not deterministic");
        }
    }

    #[test]
    fn test_imperfect_maze_carves_rooms() {
        for generator in ALGORITHMS {
            let config = GenerationConfig::with_rooms(16, 16, 4, Some(3));
            let maze = generate_maze(&config, generator, None).unwrap();
            assert!(any_room_cell(&maze), "{generator}: no room carved");
            assert_eq!(maze.floorplan().boundary_openings(), 1);
            assert!(maze.is_fully_connected());
        }
    }

    #[test]
    fn test_skill_zero_never_carves_rooms() {
        let config = GenerationConfig::with_rooms(16, 16, 0, Some(3));
        let maze = generate_maze(&config, Generator::Dfs, None).unwrap();
        assert!(!any_room_cell(&maze));
    }

    #[test]
    fn test_zero_size_is_a_configuration_error() {
        let config = GenerationConfig::perfect(0, 5, None);
        assert!(matches!(
            generate_maze(&config, Generator::Prim, None),
            Err(GenerationError::InvalidSize(0, 5))
        ));
    }

    #[test]
    fn test_progress_reaches_completion() {
        let (tx, rx) = std::sync::mpsc::channel();
        let config = GenerationConfig::perfect(10, 10, Some(5));
        generate_maze(&config, Generator::Boruvka, Some(&tx)).unwrap();
        drop(tx);
        let reports: Vec<u8> = rx.iter().collect();
        assert_eq!(reports.first(), Some(&0));
        assert_eq!(reports.last(), Some(&100));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    }
}
