use std::thread;
use std::time::Duration;

use super::{DriverError, RobotDriver};
use crate::robot::{RelativeDirection, Robot, RobotError, SensedDistance, SensorError, Turn};

/// Left-hand rule driver: hug the wall on the left, turn left whenever the
/// left side opens up, otherwise go straight, otherwise turn right. Needs
/// only the left and forward distance sensors; when one of those is broken
/// it borrows another operational sensor by rotating in place, and if every
/// sensor is down it waits for a repair.
///
/// Guaranteed to find the exit in any maze without loops; in a maze with
/// rooms it can circle forever, in which case the battery is the limit.
pub struct WallFollower {
    max_sense_attempts: u32,
    repair_wait: Duration,
}

impl WallFollower {
    pub fn new() -> Self {
        WallFollower {
            max_sense_attempts: 300,
            repair_wait: Duration::from_millis(20),
        }
    }

    /// Caps how long a run waits on broken sensors. Mostly for tests.
    pub fn with_sense_attempts(max_sense_attempts: u32) -> Self {
        WallFollower {
            max_sense_attempts,
            ..WallFollower::new()
        }
    }

    /// Measures toward `mount`, working around broken sensors. Tries the
    /// mounted sensor first, then any other operational sensor rotated into
    /// place, and finally waits for a repair before giving up.
    fn sense(
        &self,
        robot: &mut Robot,
        mount: RelativeDirection,
    ) -> Result<SensedDistance, DriverError> {
        for _ in 0..self.max_sense_attempts {
            if robot.has_operational_sensor(mount) {
                match robot.distance_to_obstacle(mount) {
                    Ok(distance) => return Ok(distance),
                    // Broke down between the check and the query.
                    Err(RobotError::Sensor(SensorError::NotOperational)) => continue,
                    Err(err) => return Err(err.into()),
                }
            }
            if let Some(distance) = self.sense_with_substitute(robot, mount)? {
                return Ok(distance);
            }
            tracing::debug!("[follower] all sensors down, waiting for a repair");
            thread::sleep(self.repair_wait);
        }
        Err(DriverError::SensorsUnavailable(self.max_sense_attempts))
    }

    /// Rotates the robot so that some operational sensor covers the absolute
    /// direction `mount` currently points at, measures, and rotates back.
    /// Returns Ok(None) when no operational sensor exists right now.
    fn sense_with_substitute(
        &self,
        robot: &mut Robot,
        mount: RelativeDirection,
    ) -> Result<Option<SensedDistance>, DriverError> {
        let target = mount.to_absolute(robot.facing());
        for substitute in RelativeDirection::ALL {
            if substitute == mount || !robot.has_operational_sensor(substitute) {
                continue;
            }
            let Some(turn) = turn_aligning(robot, substitute, target) else {
                continue;
            };
            tracing::debug!(
                "[follower] {mount} sensor is down, borrowing the {substitute} sensor"
            );
            if let Some(turn) = turn {
                robot.rotate(turn)?;
            }
            let result = robot.distance_to_obstacle(substitute);
            // Undo the rotation before looking at the measurement so the
            // robot never ends up misaligned.
            if let Some(turn) = turn {
                robot.rotate(inverse(turn))?;
            }
            match result {
                Ok(distance) => return Ok(Some(distance)),
                Err(RobotError::Sensor(SensorError::NotOperational)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}

impl Default for WallFollower {
    fn default() -> Self {
        WallFollower::new()
    }
}

/// The rotation (None for "already aligned") after which the sensor mounted
/// at `substitute` points toward the absolute direction `target`.
fn turn_aligning(
    robot: &Robot,
    substitute: RelativeDirection,
    target: crate::maze::CardinalDirection,
) -> Option<Option<Turn>> {
    let facing = robot.facing();
    for turn in [None, Some(Turn::Left), Some(Turn::Right), Some(Turn::Around)] {
        let turned = match turn {
            None => facing,
            Some(Turn::Left) => facing.left(),
            Some(Turn::Right) => facing.right(),
            Some(Turn::Around) => facing.opposite(),
        };
        if substitute.to_absolute(turned) == target {
            return Some(turn);
        }
    }
    None
}

fn inverse(turn: Turn) -> Turn {
    match turn {
        Turn::Left => Turn::Right,
        Turn::Right => Turn::Left,
        Turn::Around => Turn::Around,
    }
}

fn is_open(distance: SensedDistance) -> bool {
    distance != SensedDistance::Steps(0)
}

impl RobotDriver for WallFollower {
    fn drive_one_step(&mut self, robot: &mut Robot) -> Result<bool, DriverError> {
        if robot.is_at_exit() {
            // Line up with the opening using sensors only: the forward gaze
            // leaves the grid exactly where the border is open.
            for _ in 0..4 {
                if self.sense(robot, RelativeDirection::Forward)? == SensedDistance::Unbounded {
                    break;
                }
                robot.rotate(Turn::Right)?;
            }
            return Ok(true);
        }
        if is_open(self.sense(robot, RelativeDirection::Left)?) {
            robot.rotate(Turn::Left)?;
            robot.move_forward(1)?;
        } else if is_open(self.sense(robot, RelativeDirection::Forward)?) {
            robot.move_forward(1)?;
        } else {
            robot.rotate(Turn::Right)?;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::tests::corridor_maze;
    use crate::maze::{CardinalDirection, Maze};
    use crate::robot::{DistanceSensor, ReliableSensor};
    use std::sync::Arc;

    /// A sensor that is permanently out of order.
    struct DeadSensor;

    impl DistanceSensor for DeadSensor {
        fn distance_to_obstacle(
            &self,
            _position: (u8, u8),
            _facing: CardinalDirection,
            _battery: &mut f32,
        ) -> Result<SensedDistance, SensorError> {
            Err(SensorError::NotOperational)
        }

        fn is_operational(&self) -> bool {
            false
        }

        fn start_failure_and_repair_process(
            &mut self,
            _mtbf: Duration,
            _mttr: Duration,
        ) -> Result<(), SensorError> {
            Ok(())
        }

        fn stop_failure_and_repair_process(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
    }

    fn dead_sensor() -> Box<dyn DistanceSensor> {
        Box::new(DeadSensor)
    }

    #[test]
    fn test_follower_walks_the_corridor() {
        let maze = Arc::new(corridor_maze());
        let mut robot = Robot::with_reliable_sensors(Arc::clone(&maze));
        let stats = WallFollower::new().drive_to_exit(&mut robot).unwrap();
        assert!(robot.is_at_exit());
        assert_eq!(robot.position(), (2, 2));
        assert_eq!(stats.cells_traveled, 8);
        // Arrives moving east, then turns until it looks out through the
        // opening on the south side.
        assert_eq!(robot.facing(), CardinalDirection::South);
    }

    #[test]
    fn test_follower_solves_a_generated_maze() {
        use crate::generators::{GenerationConfig, Generator, generate_maze};
        let config = GenerationConfig::perfect(6, 6, Some(71));
        let maze = Arc::new(generate_maze(&config, Generator::Dfs, None).unwrap());
        let mut robot = Robot::with_reliable_sensors(Arc::clone(&maze));
        WallFollower::new().drive_to_exit(&mut robot).unwrap();
        assert!(robot.is_at_exit());
    }

    #[test]
    fn test_follower_substitutes_a_broken_sensor() {
        let maze = Arc::new(corridor_maze());
        let mut robot = Robot::new(Arc::clone(&maze));
        // Only the backward sensor works; every left and forward reading
        // has to go through rotation and substitution.
        robot.add_sensor(RelativeDirection::Forward, dead_sensor());
        robot.add_sensor(RelativeDirection::Left, dead_sensor());
        robot.add_sensor(RelativeDirection::Right, dead_sensor());
        robot.add_sensor(
            RelativeDirection::Backward,
            Box::new(ReliableSensor::new(Arc::clone(&maze))),
        );
        let stats = WallFollower::new().drive_to_exit(&mut robot).unwrap();
        assert!(robot.is_at_exit());
        // Same route as with healthy sensors, just more turning.
        assert_eq!(stats.cells_traveled, 8);
        assert_eq!(robot.facing(), CardinalDirection::South);
    }

    #[test]
    fn test_follower_gives_up_when_every_sensor_is_dead() {
        let maze = Arc::new(corridor_maze());
        let mut robot = Robot::new(Arc::clone(&maze));
        for mount in RelativeDirection::ALL {
            robot.add_sensor(mount, dead_sensor());
        }
        let mut driver = WallFollower::with_sense_attempts(3);
        assert_eq!(
            driver.drive_to_exit(&mut robot),
            Err(DriverError::SensorsUnavailable(3))
        );
    }

    #[test]
    fn test_follower_stops_with_the_robot_on_an_empty_battery() {
        let maze = Arc::new(corridor_maze());
        let mut robot = Robot::with_reliable_sensors(Arc::clone(&maze));
        robot.set_battery_level(10.0);
        let err = WallFollower::new().drive_to_exit(&mut robot).unwrap_err();
        assert_eq!(err, DriverError::Robot(RobotError::OutOfEnergy));
        assert!(robot.has_stopped());
    }

    /// The follower has no map, only sensors, so it works on a loaded maze
    /// exactly as on a freshly generated one.
    #[test]
    fn test_follower_runs_on_a_reloaded_maze() {
        let saved = corridor_maze().save();
        let maze = Arc::new(Maze::load(&saved).unwrap());
        let mut robot = Robot::with_reliable_sensors(Arc::clone(&maze));
        WallFollower::new().drive_to_exit(&mut robot).unwrap();
        assert!(robot.is_at_exit());
    }
}
