use std::io::{Stdout, Write};
use std::time::Duration;

use crossterm::{
    QueueableCommand, cursor, queue,
    style::{self, Attribute, Color, Stylize},
    terminal::{self, ClearType},
};
use unicode_truncate::UnicodeTruncateStr;

use crate::maze::{CardinalDirection, Maze};
use crate::robot::Robot;

/// Width of one drawn tile in terminal columns.
pub const TILE_WIDTH: u16 = 2;

/// One tile of the lattice view. Each cell of the maze becomes one open tile
/// surrounded by wall tiles, so a `w x h` maze draws as `2w+1` by `2h+1`
/// tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tile {
    Wall,
    Open,
    Room,
    Start,
    Robot(CardinalDirection),
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tile::Wall => "██",
            Tile::Open => "  ",
            Tile::Room => "░░",
            Tile::Start => "⋅⋅",
            Tile::Robot(CardinalDirection::North) => "↑↑",
            Tile::Robot(CardinalDirection::South) => "↓↓",
            Tile::Robot(CardinalDirection::East) => "→→",
            Tile::Robot(CardinalDirection::West) => "←←",
        };
        debug_assert!(
            unicode_width::UnicodeWidthStr::width(s) == TILE_WIDTH as usize,
            "tile glyph '{s}' is not {TILE_WIDTH} columns wide"
        );
        write!(f, "{s}")
    }
}

/// Renders the maze as lines of text, top to bottom. The robot, when given,
/// is drawn as an arrow showing its facing direction; the exit shows up as
/// the single gap in the outer wall.
pub fn maze_lines(maze: &Maze, robot: Option<&Robot>) -> Vec<String> {
    let (width, height) = (maze.width() as usize, maze.height() as usize);
    let mut lines = Vec::with_capacity(2 * height + 1);
    for row in 0..=2 * height {
        let mut line = String::with_capacity((2 * width + 1) * TILE_WIDTH as usize);
        for col in 0..=2 * width {
            let tile = lattice_tile(maze, robot, col, row);
            line.push_str(&tile.to_string());
        }
        lines.push(line);
    }
    lines
}

fn lattice_tile(maze: &Maze, robot: Option<&Robot>, col: usize, row: usize) -> Tile {
    let floorplan = maze.floorplan();
    match (col % 2, row % 2) {
        // Wall posts at every lattice crossing.
        (0, 0) => Tile::Wall,
        // Cell interior.
        (1, 1) => {
            let (x, y) = ((col / 2) as u8, (row / 2) as u8);
            if let Some(robot) = robot
                && robot.position() == (x, y)
            {
                return Tile::Robot(robot.facing());
            }
            if maze.start_position() == (x, y) {
                Tile::Start
            } else if floorplan.is_in_room(x, y) {
                Tile::Room
            } else {
                Tile::Open
            }
        }
        // Vertical wall segment between two horizontally adjacent cells.
        (0, 1) => {
            let y = (row / 2) as u8;
            let has_wall = if col == 0 {
                floorplan.has_wall(0, y, CardinalDirection::West)
            } else {
                floorplan.has_wall((col / 2 - 1) as u8, y, CardinalDirection::East)
            };
            if has_wall { Tile::Wall } else { Tile::Open }
        }
        // Horizontal wall segment between two vertically adjacent cells.
        _ => {
            let x = (col / 2) as u8;
            let has_wall = if row == 0 {
                floorplan.has_wall(x, 0, CardinalDirection::North)
            } else {
                floorplan.has_wall(x, (row / 2 - 1) as u8, CardinalDirection::South)
            };
            if has_wall { Tile::Wall } else { Tile::Open }
        }
    }
}

/// Draws maze snapshots to the terminal. The caller decides when to redraw;
/// the renderer only owns the stdout handle and the frame pacing.
pub struct Renderer {
    stdout: Stdout,
    /// Time to wait after each frame to keep the animation watchable.
    frame_time: Duration,
}

impl Renderer {
    pub fn new(frame_time: Duration) -> Self {
        Renderer {
            stdout: std::io::stdout(),
            frame_time,
        }
    }

    /// Clears the screen and hides the cursor before the first frame.
    pub fn enter(&mut self) -> std::io::Result<()> {
        queue!(
            self.stdout,
            terminal::Clear(ClearType::All),
            cursor::Hide
        )?;
        self.stdout.flush()
    }

    /// Draws one frame: the maze, the robot and a status line underneath.
    /// When the terminal is too small for the maze a resize hint is shown
    /// instead.
    pub fn draw(
        &mut self,
        maze: &Maze,
        robot: Option<&Robot>,
        status: &str,
    ) -> std::io::Result<()> {
        let lines = maze_lines(maze, robot);
        let needed_width = (2 * maze.width() as u16 + 1) * TILE_WIDTH;
        let needed_height = 2 * maze.height() as u16 + 2;
        let (term_width, term_height) = terminal::size()?;
        if term_width < needed_width || term_height < needed_height {
            let msg = format!(
                "Terminal size is too small ({term_width}x{term_height}) for the maze ({needed_width}x{needed_height}). Please resize the terminal.\r\n"
            );
            queue!(
                self.stdout,
                terminal::Clear(ClearType::All),
                cursor::MoveTo(0, 0),
                style::PrintStyledContent(msg.with(Color::Yellow).attribute(Attribute::Bold))
            )?;
            self.stdout.flush()?;
            return Ok(());
        }

        self.stdout.queue(cursor::MoveTo(0, 0))?;
        for line in &lines {
            queue!(self.stdout, style::Print(line), style::Print("\r\n"))?;
        }
        let (truncated, _) = status.unicode_truncate(term_width as usize);
        queue!(
            self.stdout,
            terminal::Clear(ClearType::CurrentLine),
            style::PrintStyledContent(truncated.to_string().with(Color::Blue))
        )?;
        self.stdout.flush()?;
        std::thread::sleep(self.frame_time);
        Ok(())
    }

    /// Moves the cursor below the maze and shows it again.
    pub fn finish(&mut self, maze: &Maze) -> std::io::Result<()> {
        queue!(
            self.stdout,
            cursor::MoveTo(0, 2 * maze.height() as u16 + 2),
            cursor::Show
        )?;
        self.stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::tests::corridor_maze;
    use unicode_width::UnicodeWidthStr;

    #[test]
    fn test_lattice_dimensions() {
        let maze = corridor_maze();
        let lines = maze_lines(&maze, None);
        assert_eq!(lines.len(), 7);
        for line in &lines {
            assert_eq!(line.width(), 7 * TILE_WIDTH as usize);
        }
    }

    #[test]
    fn test_exit_opening_is_a_gap_in_the_outer_wall() {
        let maze = corridor_maze();
        // exit opens south of (2, 2): lattice column 5, bottom row 6
        assert_eq!(lattice_tile(&maze, None, 5, 6), Tile::Open);
        // the west boundary stays closed
        assert_eq!(lattice_tile(&maze, None, 0, 5), Tile::Wall);
    }

    #[test]
    fn test_robot_tile_overrides_the_cell() {
        let maze = std::sync::Arc::new(corridor_maze());
        let robot = Robot::new(std::sync::Arc::clone(&maze));
        // robot starts at (0, 0) facing East: lattice (1, 1)
        assert_eq!(
            lattice_tile(&maze, Some(&robot), 1, 1),
            Tile::Robot(CardinalDirection::East)
        );
        // without the robot the start marker shows
        assert_eq!(lattice_tile(&maze, None, 1, 1), Tile::Start);
    }

    #[test]
    fn test_all_tile_glyphs_are_two_columns() {
        for tile in [
            Tile::Wall,
            Tile::Open,
            Tile::Room,
            Tile::Start,
            Tile::Robot(CardinalDirection::North),
            Tile::Robot(CardinalDirection::South),
            Tile::Robot(CardinalDirection::East),
            Tile::Robot(CardinalDirection::West),
        ] {
            assert_eq!(tile.to_string().width(), TILE_WIDTH as usize);
        }
    }
}
