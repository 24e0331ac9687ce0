pub mod direction;
pub mod floorplan;

use std::collections::VecDeque;

pub use direction::CardinalDirection;
pub use floorplan::{Floorplan, Wallboard};

use thiserror::Error;

pub(crate) const UNREACHABLE: u32 = u32::MAX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("coordinate ({0}, {1}) is outside the {2}x{3} maze")]
    OutOfBounds(u8, u8, u8, u8),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeParseError {
    #[error("missing or unrecognized header line")]
    BadHeader,
    #[error("malformed {0} line")]
    BadField(&'static str),
    #[error("expected {expected} cell values, found {found}")]
    WrongCellCount { expected: usize, found: usize },
    #[error("cell value '{0}' is not valid hex")]
    BadCell(String),
    #[error("saved exit position ({0}, {1}) has no boundary opening")]
    NoExitOpening(u8, u8),
    #[error("saved start position ({0}, {1}) lies outside the grid")]
    StartOutOfBounds(u8, u8),
}

const SAVE_HEADER: &str = "mazebot v1";

/// The immutable result of a generation run: a carved floorplan, the start
/// and exit positions, and a distance-to-exit table over all cells. Drivers
/// share it read-only.
pub struct Maze {
    floorplan: Floorplan,
    exit: (u8, u8),
    start: (u8, u8),
    dists: Box<[u32]>,
}

impl Maze {
    /// Wraps a finalized floorplan whose exit has already been opened via
    /// [`Floorplan::set_exit_position`]. The start position is the cell
    /// farthest from the exit by path distance.
    pub fn new(floorplan: Floorplan, exit: (u8, u8)) -> Self {
        let dists = compute_distances(&floorplan, exit);
        let start = farthest_cell(&dists, floorplan.width());
        Maze {
            floorplan,
            exit,
            start,
            dists,
        }
    }

    /// Same as [`Maze::new`] but with an explicitly chosen start position.
    pub fn with_start(floorplan: Floorplan, exit: (u8, u8), start: (u8, u8)) -> Self {
        let dists = compute_distances(&floorplan, exit);
        Maze {
            floorplan,
            exit,
            start,
            dists,
        }
    }

    pub fn width(&self) -> u8 {
        self.floorplan.width()
    }

    pub fn height(&self) -> u8 {
        self.floorplan.height()
    }

    pub fn floorplan(&self) -> &Floorplan {
        &self.floorplan
    }

    pub fn exit_position(&self) -> (u8, u8) {
        self.exit
    }

    pub fn start_position(&self) -> (u8, u8) {
        self.start
    }

    /// The border side the single exit opening faces.
    pub fn exit_direction(&self) -> CardinalDirection {
        // The exit was opened during generation, so the opening exists.
        self.floorplan
            .exit_direction(self.exit.0, self.exit.1)
            .unwrap_or(CardinalDirection::North)
    }

    /// Checks if the given coordinate is within the bounds of the maze.
    pub fn is_in_bounds(&self, coord: (u8, u8)) -> bool {
        self.floorplan.is_in_bounds(coord)
    }

    /// Bounds-checked wall query, the entry point for sensors and drivers.
    /// Out-of-range coordinates are reported as an error, never clamped.
    pub fn has_wall(&self, x: u8, y: u8, dir: CardinalDirection) -> Result<bool, MazeError> {
        if !self.is_in_bounds((x, y)) {
            return Err(MazeError::OutOfBounds(x, y, self.width(), self.height()));
        }
        Ok(self.floorplan.has_wall(x, y, dir))
    }

    /// Whether the cell lies inside a carved room.
    pub fn is_in_room(&self, x: u8, y: u8) -> Result<bool, MazeError> {
        if !self.is_in_bounds((x, y)) {
            return Err(MazeError::OutOfBounds(x, y, self.width(), self.height()));
        }
        Ok(self.floorplan.is_in_room(x, y))
    }

    /// Path distance from `(x, y)` to the exit, `None` when unreachable.
    pub fn distance_to_exit(&self, x: u8, y: u8) -> Option<u32> {
        if !self.is_in_bounds((x, y)) {
            return None;
        }
        let dist = self.dists[y as usize * self.width() as usize + x as usize];
        (dist != UNREACHABLE).then_some(dist)
    }

    /// The adjacent, connected cell strictly closer to the exit. `None` at
    /// the exit itself or inside an enclosed region.
    pub fn neighbor_closer_to_exit(&self, x: u8, y: u8) -> Option<(u8, u8)> {
        let mine = self.distance_to_exit(x, y)?;
        for dir in CardinalDirection::ALL {
            if self.floorplan.has_wall(x, y, dir) {
                continue;
            }
            let Some((nx, ny)) = self.floorplan.neighbor(x, y, dir) else {
                continue;
            };
            if let Some(dist) = self.distance_to_exit(nx, ny)
                && dist < mine
            {
                return Some((nx, ny));
            }
        }
        None
    }

    /// Whether the exit is reachable from every cell. Generation refuses to
    /// hand out a maze for which this is false.
    pub fn is_fully_connected(&self) -> bool {
        self.dists.iter().all(|&d| d != UNREACHABLE)
    }

    /// Serializes the maze to a line-oriented text form: header, dimensions,
    /// start, exit, then one row of hex cell masks per grid row. The wall
    /// bitmask and exit survive a round trip cell-for-cell.
    pub fn save(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "{SAVE_HEADER}");
        let _ = writeln!(out, "{} {}", self.width(), self.height());
        let _ = writeln!(out, "{} {}", self.start.0, self.start.1);
        let _ = writeln!(out, "{} {}", self.exit.0, self.exit.1);
        for y in 0..self.height() {
            for x in 0..self.width() {
                if x > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{:04x}", self.floorplan.cell_mask(x, y));
            }
            out.push('\n');
        }
        out
    }

    /// Reconstructs a maze saved with [`Maze::save`]. Distances are
    /// recomputed, so `load(save(m))` matches `m` cell-for-cell.
    pub fn load(text: &str) -> Result<Maze, MazeParseError> {
        let mut lines = text.lines();
        if lines.next().map(str::trim) != Some(SAVE_HEADER) {
            return Err(MazeParseError::BadHeader);
        }
        let (width, height) = parse_pair(lines.next(), "dimensions")?;
        if width == 0 || height == 0 {
            return Err(MazeParseError::BadField("dimensions"));
        }
        let start = parse_pair(lines.next(), "start")?;
        let exit = parse_pair(lines.next(), "exit")?;

        let mut floorplan = Floorplan::new(width, height);
        let mut count = 0usize;
        let expected = width as usize * height as usize;
        for (y, line) in lines.take(height as usize).enumerate() {
            for (x, token) in line.split_whitespace().enumerate() {
                let mask = u16::from_str_radix(token, 16)
                    .map_err(|_| MazeParseError::BadCell(token.to_string()))?;
                if x >= width as usize {
                    return Err(MazeParseError::WrongCellCount {
                        expected,
                        found: count + 1,
                    });
                }
                floorplan.set_cell_mask(x as u8, y as u8, mask);
                count += 1;
            }
        }
        if count != expected {
            return Err(MazeParseError::WrongCellCount {
                expected,
                found: count,
            });
        }
        if !floorplan.is_in_bounds(exit) || !floorplan.is_exit_position(exit.0, exit.1) {
            return Err(MazeParseError::NoExitOpening(exit.0, exit.1));
        }
        if !floorplan.is_in_bounds(start) {
            return Err(MazeParseError::StartOutOfBounds(start.0, start.1));
        }
        Ok(Maze::with_start(floorplan, exit, start))
    }
}

fn parse_pair(line: Option<&str>, field: &'static str) -> Result<(u8, u8), MazeParseError> {
    let line = line.ok_or(MazeParseError::BadField(field))?;
    let mut it = line.split_whitespace().map(|t| t.parse::<u8>());
    match (it.next(), it.next()) {
        (Some(Ok(a)), Some(Ok(b))) => Ok((a, b)),
        _ => Err(MazeParseError::BadField(field)),
    }
}

/// Breadth-first distances from the exit over open walls.
pub(crate) fn compute_distances(floorplan: &Floorplan, exit: (u8, u8)) -> Box<[u32]> {
    let width = floorplan.width() as usize;
    let mut dists = vec![UNREACHABLE; width * floorplan.height() as usize].into_boxed_slice();
    if !floorplan.is_in_bounds(exit) {
        return dists;
    }
    let mut queue = VecDeque::new();
    dists[exit.1 as usize * width + exit.0 as usize] = 0;
    queue.push_back(exit);
    while let Some((x, y)) = queue.pop_front() {
        let here = dists[y as usize * width + x as usize];
        for dir in CardinalDirection::ALL {
            if floorplan.has_wall(x, y, dir) {
                continue;
            }
            let Some((nx, ny)) = floorplan.neighbor(x, y, dir) else {
                continue;
            };
            let slot = &mut dists[ny as usize * width + nx as usize];
            if *slot == UNREACHABLE {
                *slot = here + 1;
                queue.push_back((nx, ny));
            }
        }
    }
    dists
}

fn farthest_cell(dists: &[u32], width: u8) -> (u8, u8) {
    let mut best = (0usize, 0u32);
    for (idx, &dist) in dists.iter().enumerate() {
        if dist != UNREACHABLE && dist > best.1 {
            best = (idx, dist);
        }
    }
    (
        (best.0 % width as usize) as u8,
        (best.0 / width as usize) as u8,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 3x3 maze carved into a single snaking corridor with the exit
    /// opening on the south side of the corner cell (2, 2).
    pub(crate) fn corridor_maze() -> Maze {
        let mut floorplan = Floorplan::new(3, 3);
        floorplan.initialize();
        for wallboard in [
            Wallboard::new(0, 0, CardinalDirection::East),
            Wallboard::new(1, 0, CardinalDirection::East),
            Wallboard::new(2, 0, CardinalDirection::South),
            Wallboard::new(2, 1, CardinalDirection::West),
            Wallboard::new(1, 1, CardinalDirection::West),
            Wallboard::new(0, 1, CardinalDirection::South),
            Wallboard::new(0, 2, CardinalDirection::East),
            Wallboard::new(1, 2, CardinalDirection::East),
        ] {
            floorplan.delete_wallboard(wallboard);
        }
        floorplan.set_exit_position(2, 2);
        Maze::new(floorplan, (2, 2))
    }

    #[test]
    fn test_distances_follow_the_corridor() {
        let maze = corridor_maze();
        assert_eq!(maze.distance_to_exit(2, 2), Some(0));
        assert_eq!(maze.distance_to_exit(1, 2), Some(1));
        assert_eq!(maze.distance_to_exit(0, 2), Some(2));
        assert_eq!(maze.distance_to_exit(0, 1), Some(3));
        assert_eq!(maze.distance_to_exit(0, 0), Some(8));
        assert!(maze.is_fully_connected());
        // Start picked as the farthest cell
        assert_eq!(maze.start_position(), (0, 0));
    }

    #[test]
    fn test_neighbor_closer_to_exit() {
        let maze = corridor_maze();
        assert_eq!(maze.neighbor_closer_to_exit(0, 0), Some((1, 0)));
        assert_eq!(maze.neighbor_closer_to_exit(1, 2), Some((2, 2)));
        // The exit has no strictly closer neighbor
        assert_eq!(maze.neighbor_closer_to_exit(2, 2), None);
    }

    #[test]
    fn test_out_of_bounds_is_an_error_not_a_wall() {
        let maze = corridor_maze();
        assert_eq!(
            maze.has_wall(3, 0, CardinalDirection::North),
            Err(MazeError::OutOfBounds(3, 0, 3, 3))
        );
        assert!(maze.has_wall(0, 0, CardinalDirection::North).unwrap());
    }

    #[test]
    fn test_exit_direction() {
        let maze = corridor_maze();
        assert_eq!(maze.exit_position(), (2, 2));
        // On a corner cell the opening prefers the north/south side.
        assert_eq!(maze.exit_direction(), CardinalDirection::South);
    }

    #[test]
    fn test_save_load_round_trip() {
        let maze = corridor_maze();
        let text = maze.save();
        let loaded = Maze::load(&text).unwrap();
        assert_eq!(loaded.width(), maze.width());
        assert_eq!(loaded.height(), maze.height());
        assert_eq!(loaded.exit_position(), maze.exit_position());
        assert_eq!(loaded.start_position(), maze.start_position());
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(
                    loaded.floorplan().cell_mask(x, y),
                    maze.floorplan().cell_mask(x, y),
                    "cell ({x}, {y}) differs after round trip"
                );
            }
        }
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(
            Maze::load("not a maze"),
            Err(MazeParseError::BadHeader)
        ));
        let err = Maze::load("mazebot v1\n2 2\n0 0\n9 9\n000f 000f\n000f 000f");
        assert!(matches!(err, Err(MazeParseError::NoExitOpening(9, 9))));
        let err = Maze::load("mazebot v1\n2 2\n0 0\n0 0\n000f 000f\n000f");
        assert!(matches!(err, Err(MazeParseError::WrongCellCount { .. })));
    }

    /// A tampered save whose start cell lies off the grid must not load; a
    /// sensor query from that start would index out of bounds.
    #[test]
    fn test_load_rejects_an_out_of_bounds_start() {
        let text = corridor_maze().save().replace("\n0 0\n", "\n9 9\n");
        assert!(matches!(
            Maze::load(&text),
            Err(MazeParseError::StartOutOfBounds(9, 9))
        ));
    }
}
