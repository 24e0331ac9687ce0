use thiserror::Error;

use crate::robot::{Robot, RobotError};

pub mod wall_follower;
pub mod wizard;

pub use wall_follower::WallFollower;
pub use wizard::Wizard;

#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error("robot gave out while driving: {0}")]
    Robot(#[from] RobotError),
    #[error("no path from {0:?} to the exit")]
    NoPathToExit((u8, u8)),
    #[error("no operational sensor after {0} attempts")]
    SensorsUnavailable(u32),
}

/// What a successful run cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveStats {
    /// Cells traveled, steps and jumps alike.
    pub cells_traveled: u32,
    pub energy_consumed: f32,
}

/// A strategy that steers a robot from its current position to the maze
/// exit.
pub trait RobotDriver {
    /// Advances the robot by one decision. Returns true once the robot
    /// stands at the exit, lined up with the opening.
    fn drive_one_step(&mut self, robot: &mut Robot) -> Result<bool, DriverError>;

    /// Drives all the way to the exit and reports what the run cost.
    fn drive_to_exit(&mut self, robot: &mut Robot) -> Result<DriveStats, DriverError> {
        let start_battery = robot.battery_level();
        let start_odometer = robot.odometer();
        while !self.drive_one_step(robot)? {}
        Ok(DriveStats {
            cells_traveled: robot.odometer() - start_odometer,
            energy_consumed: start_battery - robot.battery_level(),
        })
    }
}
