use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::maze::{CardinalDirection, Maze};

pub mod sensor;

pub use sensor::{
    DistanceSensor, ReliableSensor, SensedDistance, SensorError, UnreliableSensor,
};

/// Battery charge a freshly placed robot starts with.
pub const INITIAL_BATTERY: f32 = 3500.0;
/// Energy for a full 360 degree rotation; a quarter turn costs a fourth.
pub const FULL_ROTATION_COST: f32 = 12.0;
pub const QUARTER_TURN_COST: f32 = FULL_ROTATION_COST / 4.0;
/// Energy for moving one cell forward.
pub const STEP_COST: f32 = 6.0;
/// Energy for jumping over a wall into the cell behind it.
pub const JUMP_COST: f32 = 40.0;
/// Energy one distance measurement drains.
pub const SENSE_COST: f32 = 1.0;

/// A rotation relative to the current facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
    Around,
}

/// A direction relative to where the robot currently faces. Sensors are
/// mounted at these positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDirection {
    Forward,
    Backward,
    Left,
    Right,
}

impl RelativeDirection {
    pub const ALL: [RelativeDirection; 4] = [
        RelativeDirection::Forward,
        RelativeDirection::Backward,
        RelativeDirection::Left,
        RelativeDirection::Right,
    ];

    /// The absolute direction this relative direction points at for a robot
    /// facing `facing`.
    pub fn to_absolute(self, facing: CardinalDirection) -> CardinalDirection {
        match self {
            RelativeDirection::Forward => facing,
            RelativeDirection::Backward => facing.opposite(),
            RelativeDirection::Left => facing.left(),
            RelativeDirection::Right => facing.right(),
        }
    }

    fn index(self) -> usize {
        match self {
            RelativeDirection::Forward => 0,
            RelativeDirection::Backward => 1,
            RelativeDirection::Left => 2,
            RelativeDirection::Right => 3,
        }
    }
}

impl std::fmt::Display for RelativeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelativeDirection::Forward => write!(f, "forward"),
            RelativeDirection::Backward => write!(f, "backward"),
            RelativeDirection::Left => write!(f, "left"),
            RelativeDirection::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RobotError {
    #[error("battery is exhausted")]
    OutOfEnergy,
    #[error("crashed into a wall")]
    CrashedIntoWall,
    #[error("jumped over the border wall out of the maze")]
    JumpedOverBorder,
    #[error("robot has already stopped")]
    AlreadyStopped,
    #[error("no sensor mounted {0}")]
    NoSensor(RelativeDirection),
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// A battery-powered robot placed at the maze's start position, facing East.
/// It can rotate, step forward, jump over interior walls and query mounted
/// distance sensors. Running out of energy, crashing into a wall or jumping
/// over the border stops the robot for good.
pub struct Robot {
    maze: Arc<Maze>,
    position: (u8, u8),
    facing: CardinalDirection,
    battery: f32,
    odometer: u32,
    stopped: bool,
    sensors: [Option<Box<dyn DistanceSensor>>; 4],
}

impl Robot {
    pub fn new(maze: Arc<Maze>) -> Self {
        let position = maze.start_position();
        Robot {
            maze,
            position,
            facing: CardinalDirection::East,
            battery: INITIAL_BATTERY,
            odometer: 0,
            stopped: false,
            sensors: [None, None, None, None],
        }
    }

    /// A robot with a [`ReliableSensor`] mounted in all four directions.
    pub fn with_reliable_sensors(maze: Arc<Maze>) -> Self {
        let mut robot = Robot::new(Arc::clone(&maze));
        for mount in RelativeDirection::ALL {
            robot.add_sensor(mount, Box::new(ReliableSensor::new(Arc::clone(&maze))));
        }
        robot
    }

    pub fn add_sensor(&mut self, mount: RelativeDirection, sensor: Box<dyn DistanceSensor>) {
        self.sensors[mount.index()] = Some(sensor);
    }

    pub fn maze(&self) -> &Arc<Maze> {
        &self.maze
    }

    pub fn position(&self) -> (u8, u8) {
        self.position
    }

    pub fn facing(&self) -> CardinalDirection {
        self.facing
    }

    pub fn battery_level(&self) -> f32 {
        self.battery
    }

    pub fn set_battery_level(&mut self, level: f32) {
        self.battery = level;
    }

    /// Cells traveled so far, steps and jumps both count one.
    pub fn odometer(&self) -> u32 {
        self.odometer
    }

    pub fn has_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_at_exit(&self) -> bool {
        self.position == self.maze.exit_position()
    }

    fn ensure_running(&self) -> Result<(), RobotError> {
        if self.stopped {
            Err(RobotError::AlreadyStopped)
        } else {
            Ok(())
        }
    }

    fn drain(&mut self, cost: f32) -> Result<(), RobotError> {
        if self.battery < cost {
            self.battery = 0.0;
            self.stopped = true;
            tracing::warn!("[robot] battery exhausted at {:?}", self.position);
            return Err(RobotError::OutOfEnergy);
        }
        self.battery -= cost;
        Ok(())
    }

    pub fn rotate(&mut self, turn: Turn) -> Result<(), RobotError> {
        self.ensure_running()?;
        let (cost, facing) = match turn {
            Turn::Left => (QUARTER_TURN_COST, self.facing.left()),
            Turn::Right => (QUARTER_TURN_COST, self.facing.right()),
            Turn::Around => (2.0 * QUARTER_TURN_COST, self.facing.opposite()),
        };
        self.drain(cost)?;
        self.facing = facing;
        Ok(())
    }

    /// Moves the given number of cells in the facing direction. Walking into
    /// a wall is a crash that stops the robot where it stands.
    pub fn move_forward(&mut self, steps: u32) -> Result<(), RobotError> {
        for _ in 0..steps {
            self.ensure_running()?;
            if self.maze.floorplan().has_wall(self.position.0, self.position.1, self.facing) {
                self.stopped = true;
                tracing::warn!(
                    "[robot] crashed into the {} wall at {:?}",
                    self.facing,
                    self.position
                );
                return Err(RobotError::CrashedIntoWall);
            }
            self.drain(STEP_COST)?;
            // No wall and in bounds, so the neighbor exists (the exit opening
            // is the one gap in the boundary and crossing it ends the run).
            if let Some(next) =
                self.maze
                    .floorplan()
                    .neighbor(self.position.0, self.position.1, self.facing)
            {
                self.position = next;
                self.odometer += 1;
            } else {
                // Stepping through the exit opening: stay on the exit cell,
                // the drivers treat reaching it as success.
                return Ok(());
            }
        }
        Ok(())
    }

    /// Jumps over the wall ahead into the cell behind it. Jumping the border
    /// wall would leave the maze and stops the robot instead.
    pub fn jump(&mut self) -> Result<(), RobotError> {
        self.ensure_running()?;
        let Some(next) =
            self.maze
                .floorplan()
                .neighbor(self.position.0, self.position.1, self.facing)
        else {
            self.stopped = true;
            tracing::warn!("[robot] jumped over the border at {:?}", self.position);
            return Err(RobotError::JumpedOverBorder);
        };
        self.drain(JUMP_COST)?;
        self.position = next;
        self.odometer += 1;
        Ok(())
    }

    pub fn has_operational_sensor(&self, mount: RelativeDirection) -> bool {
        self.sensors[mount.index()]
            .as_ref()
            .is_some_and(|s| s.is_operational())
    }

    /// Distance to the nearest wall as seen by the sensor mounted at
    /// `mount`. Draining the battery below the sensing cost stops the robot.
    pub fn distance_to_obstacle(
        &mut self,
        mount: RelativeDirection,
    ) -> Result<SensedDistance, RobotError> {
        self.ensure_running()?;
        let sensor = self.sensors[mount.index()]
            .as_ref()
            .ok_or(RobotError::NoSensor(mount))?;
        let absolute = mount.to_absolute(self.facing);
        match sensor.distance_to_obstacle(self.position, absolute, &mut self.battery) {
            Ok(distance) => Ok(distance),
            Err(SensorError::PowerFailure { .. }) => {
                self.battery = 0.0;
                self.stopped = true;
                Err(RobotError::OutOfEnergy)
            }
            Err(err) => Err(RobotError::Sensor(err)),
        }
    }

    /// Whether the gaze in the given relative direction leaves the maze
    /// through the exit opening.
    pub fn can_see_through_exit(&mut self, mount: RelativeDirection) -> Result<bool, RobotError> {
        Ok(self.distance_to_obstacle(mount)? == SensedDistance::Unbounded)
    }

    pub fn start_sensor_failure_process(
        &mut self,
        mount: RelativeDirection,
        mtbf: Duration,
        mttr: Duration,
    ) -> Result<(), RobotError> {
        let sensor = self.sensors[mount.index()]
            .as_mut()
            .ok_or(RobotError::NoSensor(mount))?;
        sensor.start_failure_and_repair_process(mtbf, mttr)?;
        Ok(())
    }

    pub fn stop_sensor_failure_process(
        &mut self,
        mount: RelativeDirection,
    ) -> Result<(), RobotError> {
        let sensor = self.sensors[mount.index()]
            .as_mut()
            .ok_or(RobotError::NoSensor(mount))?;
        sensor.stop_failure_and_repair_process()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::tests::corridor_maze;

    fn corridor_robot() -> Robot {
        Robot::with_reliable_sensors(Arc::new(corridor_maze()))
    }

    #[test]
    fn test_new_robot_starts_at_the_start_facing_east() {
        let robot = corridor_robot();
        assert_eq!(robot.position(), (0, 0));
        assert_eq!(robot.facing(), CardinalDirection::East);
        assert_eq!(robot.battery_level(), INITIAL_BATTERY);
        assert_eq!(robot.odometer(), 0);
        assert!(!robot.has_stopped());
    }

    #[test]
    fn test_rotation_costs_and_directions() {
        let mut robot = corridor_robot();
        robot.rotate(Turn::Left).unwrap();
        assert_eq!(robot.facing(), CardinalDirection::North);
        robot.rotate(Turn::Around).unwrap();
        assert_eq!(robot.facing(), CardinalDirection::South);
        robot.rotate(Turn::Right).unwrap();
        assert_eq!(robot.facing(), CardinalDirection::West);
        assert_eq!(
            robot.battery_level(),
            INITIAL_BATTERY - 4.0 * QUARTER_TURN_COST
        );
    }

    #[test]
    fn test_moving_down_the_corridor() {
        let mut robot = corridor_robot();
        robot.move_forward(2).unwrap();
        assert_eq!(robot.position(), (2, 0));
        assert_eq!(robot.odometer(), 2);
        assert_eq!(robot.battery_level(), INITIAL_BATTERY - 2.0 * STEP_COST);
    }

    #[test]
    fn test_crashing_into_a_wall_stops_the_robot() {
        let mut robot = corridor_robot();
        let err = robot.move_forward(3).unwrap_err();
        assert_eq!(err, RobotError::CrashedIntoWall);
        assert!(robot.has_stopped());
        // Crash leaves the robot where it was, two cells in.
        assert_eq!(robot.position(), (2, 0));
        assert_eq!(robot.move_forward(1), Err(RobotError::AlreadyStopped));
        assert_eq!(robot.rotate(Turn::Left), Err(RobotError::AlreadyStopped));
    }

    #[test]
    fn test_jump_crosses_a_wall() {
        let mut robot = corridor_robot();
        robot.rotate(Turn::Right).unwrap();
        // wall between (0, 0) and (0, 1)
        robot.jump().unwrap();
        assert_eq!(robot.position(), (0, 1));
        assert_eq!(robot.odometer(), 1);
        assert_eq!(
            robot.battery_level(),
            INITIAL_BATTERY - QUARTER_TURN_COST - JUMP_COST
        );
    }

    #[test]
    fn test_jumping_the_border_is_fatal() {
        let mut robot = corridor_robot();
        robot.rotate(Turn::Left).unwrap();
        // (0, 0) faces North, the grid border
        assert_eq!(robot.jump(), Err(RobotError::JumpedOverBorder));
        assert!(robot.has_stopped());
    }

    #[test]
    fn test_running_out_of_energy_stops_the_robot() {
        let mut robot = corridor_robot();
        robot.set_battery_level(STEP_COST + 1.0);
        robot.move_forward(1).unwrap();
        assert_eq!(robot.move_forward(1), Err(RobotError::OutOfEnergy));
        assert!(robot.has_stopped());
        assert_eq!(robot.battery_level(), 0.0);
    }

    #[test]
    fn test_sensing_through_mounted_sensors() {
        let mut robot = corridor_robot();
        assert_eq!(
            robot.distance_to_obstacle(RelativeDirection::Forward).unwrap(),
            SensedDistance::Steps(2)
        );
        assert_eq!(
            robot.distance_to_obstacle(RelativeDirection::Backward).unwrap(),
            SensedDistance::Steps(0)
        );
        assert!(!robot.can_see_through_exit(RelativeDirection::Forward).unwrap());
        assert_eq!(
            robot.battery_level(),
            INITIAL_BATTERY - 3.0 * SENSE_COST
        );
    }

    #[test]
    fn test_missing_sensor_is_reported() {
        let maze = Arc::new(corridor_maze());
        let mut robot = Robot::new(maze);
        assert_eq!(
            robot.distance_to_obstacle(RelativeDirection::Left),
            Err(RobotError::NoSensor(RelativeDirection::Left))
        );
    }
}
