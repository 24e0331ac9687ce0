use std::sync::Arc;

use super::{DriverError, RobotDriver};
use crate::maze::CardinalDirection;
use crate::robot::{Robot, RobotError, Turn};

/// A driver with full knowledge of the maze. It reads the distance-to-exit
/// table and always steps to the connected neighbor closest to the exit, so
/// it travels exactly the tree path from start to exit. This is the baseline
/// every sensor-based driver gets compared against.
pub struct Wizard;

impl Wizard {
    pub fn new() -> Self {
        Wizard
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard::new()
    }
}

impl RobotDriver for Wizard {
    fn drive_one_step(&mut self, robot: &mut Robot) -> Result<bool, DriverError> {
        let maze = Arc::clone(robot.maze());
        if robot.is_at_exit() {
            // Line up with the opening so the run ends facing out of the
            // maze.
            turn_toward(robot, maze.exit_direction())?;
            return Ok(true);
        }
        let (x, y) = robot.position();
        let Some((nx, ny)) = maze.neighbor_closer_to_exit(x, y) else {
            return Err(DriverError::NoPathToExit((x, y)));
        };
        // The distance table never skips: the next cell is adjacent and
        // connected, so this lookup always finds a direction.
        let Some(dir) = direction_toward((x, y), (nx, ny)) else {
            return Err(DriverError::NoPathToExit((x, y)));
        };
        turn_toward(robot, dir)?;
        robot.move_forward(1)?;
        Ok(false)
    }
}

fn direction_toward(from: (u8, u8), to: (u8, u8)) -> Option<CardinalDirection> {
    CardinalDirection::ALL.into_iter().find(|dir| {
        let (dx, dy) = dir.delta();
        from.0 as i16 + dx == to.0 as i16 && from.1 as i16 + dy == to.1 as i16
    })
}

fn turn_toward(robot: &mut Robot, target: CardinalDirection) -> Result<(), RobotError> {
    let facing = robot.facing();
    if target == facing.left() {
        robot.rotate(Turn::Left)
    } else if target == facing.right() {
        robot.rotate(Turn::Right)
    } else if target == facing.opposite() {
        robot.rotate(Turn::Around)
    } else {
        Ok(())
    }
}
