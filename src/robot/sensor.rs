use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::maze::{CardinalDirection, Maze};
use crate::robot::SENSE_COST;

#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    #[error("sensor is currently not operational")]
    NotOperational,
    #[error("not enough energy to sense, needed {needed} but only {available} left")]
    PowerFailure { needed: f32, available: f32 },
    #[error("failure and repair process is already running")]
    ProcessAlreadyRunning,
    #[error("no failure and repair process is running")]
    ProcessNotRunning,
}

/// What a distance sensor reports along one gaze direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensedDistance {
    /// Number of open cells between the sensor and the first wall. Zero
    /// means the wall is directly adjacent.
    Steps(u32),
    /// The gaze left the maze through the exit opening without hitting
    /// any wall.
    Unbounded,
}

/// Measures the distance to the nearest obstacle in a given absolute
/// direction. Sensing drains the shared robot battery.
pub trait DistanceSensor: Send {
    /// Distance from `position` looking toward `facing`. Deducts the sensing
    /// cost from `battery` on success.
    fn distance_to_obstacle(
        &self,
        position: (u8, u8),
        facing: CardinalDirection,
        battery: &mut f32,
    ) -> Result<SensedDistance, SensorError>;

    /// Whether the sensor currently answers queries.
    fn is_operational(&self) -> bool;

    /// Starts a background process that alternates the sensor between
    /// working and broken, with the given mean time between failures and
    /// mean time to repair.
    fn start_failure_and_repair_process(
        &mut self,
        mtbf: Duration,
        mttr: Duration,
    ) -> Result<(), SensorError>;

    /// Stops the failure process and leaves the sensor operational.
    fn stop_failure_and_repair_process(&mut self) -> Result<(), SensorError>;
}

/// A sensor that always works. Failure process calls are rejected since
/// there is nothing to break.
pub struct ReliableSensor {
    maze: Arc<Maze>,
}

impl ReliableSensor {
    pub fn new(maze: Arc<Maze>) -> Self {
        ReliableSensor { maze }
    }
}

/// Walks cell by cell from `position` toward `facing` until a wall blocks the
/// gaze. Leaving the grid without hitting a wall is only possible through the
/// exit opening.
fn measure(
    maze: &Maze,
    position: (u8, u8),
    facing: CardinalDirection,
    battery: &mut f32,
) -> Result<SensedDistance, SensorError> {
    if *battery < SENSE_COST {
        return Err(SensorError::PowerFailure {
            needed: SENSE_COST,
            available: *battery,
        });
    }
    *battery -= SENSE_COST;

    let floorplan = maze.floorplan();
    let (mut x, mut y) = position;
    let mut steps = 0;
    loop {
        if floorplan.has_wall(x, y, facing) {
            return Ok(SensedDistance::Steps(steps));
        }
        match floorplan.neighbor(x, y, facing) {
            Some((nx, ny)) => {
                (x, y) = (nx, ny);
                steps += 1;
            }
            None => return Ok(SensedDistance::Unbounded),
        }
    }
}

impl DistanceSensor for ReliableSensor {
    fn distance_to_obstacle(
        &self,
        position: (u8, u8),
        facing: CardinalDirection,
        battery: &mut f32,
    ) -> Result<SensedDistance, SensorError> {
        measure(&self.maze, position, facing, battery)
    }

    fn is_operational(&self) -> bool {
        true
    }

    fn start_failure_and_repair_process(
        &mut self,
        _mtbf: Duration,
        _mttr: Duration,
    ) -> Result<(), SensorError> {
        Err(SensorError::ProcessAlreadyRunning)
    }

    fn stop_failure_and_repair_process(&mut self) -> Result<(), SensorError> {
        Err(SensorError::ProcessNotRunning)
    }
}

/// A sensor that periodically breaks down and gets repaired by a background
/// thread. While broken, queries fail with [`SensorError::NotOperational`];
/// the measurement itself is the same as [`ReliableSensor`]'s.
pub struct UnreliableSensor {
    maze: Arc<Maze>,
    operational: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    process: Option<JoinHandle<()>>,
}

impl UnreliableSensor {
    pub fn new(maze: Arc<Maze>) -> Self {
        UnreliableSensor {
            maze,
            operational: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(AtomicBool::new(false)),
            process: None,
        }
    }
}

/// Sleeps in small slices so a shutdown request interrupts the wait quickly.
fn interruptible_sleep(total: Duration, shutdown: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(10);
    let mut remaining = total;
    while !remaining.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        thread::sleep(remaining.min(SLICE));
        remaining = remaining.saturating_sub(SLICE);
    }
    !shutdown.load(Ordering::Relaxed)
}

impl DistanceSensor for UnreliableSensor {
    fn distance_to_obstacle(
        &self,
        position: (u8, u8),
        facing: CardinalDirection,
        battery: &mut f32,
    ) -> Result<SensedDistance, SensorError> {
        if !self.operational.load(Ordering::Relaxed) {
            return Err(SensorError::NotOperational);
        }
        measure(&self.maze, position, facing, battery)
    }

    fn is_operational(&self) -> bool {
        self.operational.load(Ordering::Relaxed)
    }

    fn start_failure_and_repair_process(
        &mut self,
        mtbf: Duration,
        mttr: Duration,
    ) -> Result<(), SensorError> {
        if self.process.is_some() {
            return Err(SensorError::ProcessAlreadyRunning);
        }
        self.shutdown.store(false, Ordering::Relaxed);
        let operational = Arc::clone(&self.operational);
        let shutdown = Arc::clone(&self.shutdown);
        self.process = Some(thread::spawn(move || {
            // Start in the working state, break after mtbf, repair after
            // mttr, repeat until asked to shut down.
            loop {
                if !interruptible_sleep(mtbf, &shutdown) {
                    break;
                }
                operational.store(false, Ordering::Relaxed);
                tracing::debug!("[sensor] failure process: sensor broke down");
                if !interruptible_sleep(mttr, &shutdown) {
                    break;
                }
                operational.store(true, Ordering::Relaxed);
                tracing::debug!("[sensor] failure process: sensor repaired");
            }
        }));
        Ok(())
    }

    fn stop_failure_and_repair_process(&mut self) -> Result<(), SensorError> {
        let Some(handle) = self.process.take() else {
            return Err(SensorError::ProcessNotRunning);
        };
        self.shutdown.store(true, Ordering::Relaxed);
        // A panicked process thread already did its damage; joining is only
        // about not leaking the thread.
        let _ = handle.join();
        // Stopping always hands back a working sensor.
        self.operational.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for UnreliableSensor {
    fn drop(&mut self) {
        if self.process.is_some() {
            let _ = self.stop_failure_and_repair_process();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::tests::corridor_maze;
    use crate::robot::INITIAL_BATTERY;

    #[test]
    fn test_reliable_sensor_measures_corridor() {
        let maze = Arc::new(corridor_maze());
        let sensor = ReliableSensor::new(Arc::clone(&maze));
        let mut battery = INITIAL_BATTERY;
        // (0, 0) looks east along the open top corridor
        let dist = sensor
            .distance_to_obstacle((0, 0), CardinalDirection::East, &mut battery)
            .unwrap();
        assert_eq!(dist, SensedDistance::Steps(2));
        assert_eq!(battery, INITIAL_BATTERY - SENSE_COST);
        // adjacent wall
        let dist = sensor
            .distance_to_obstacle((0, 0), CardinalDirection::West, &mut battery)
            .unwrap();
        assert_eq!(dist, SensedDistance::Steps(0));
    }

    #[test]
    fn test_sensor_sees_through_the_exit() {
        let maze = Arc::new(corridor_maze());
        let sensor = ReliableSensor::new(Arc::clone(&maze));
        let mut battery = INITIAL_BATTERY;
        // exit opens south of (2, 2); the gaze escapes the grid there
        let dist = sensor
            .distance_to_obstacle((2, 2), CardinalDirection::South, &mut battery)
            .unwrap();
        assert_eq!(dist, SensedDistance::Unbounded);
        // from the bottom corridor the east gaze ends at the outer wall
        let dist = sensor
            .distance_to_obstacle((0, 2), CardinalDirection::East, &mut battery)
            .unwrap();
        assert_eq!(dist, SensedDistance::Steps(2));
    }

    #[test]
    fn test_sensing_fails_on_an_empty_battery() {
        let maze = Arc::new(corridor_maze());
        let sensor = ReliableSensor::new(maze);
        let mut battery = 0.5;
        let err = sensor
            .distance_to_obstacle((0, 0), CardinalDirection::East, &mut battery)
            .unwrap_err();
        assert!(matches!(err, SensorError::PowerFailure { .. }));
        assert_eq!(battery, 0.5);
    }

    #[test]
    fn test_failure_process_breaks_and_repairs() {
        let maze = Arc::new(corridor_maze());
        let mut sensor = UnreliableSensor::new(maze);
        sensor
            .start_failure_and_repair_process(
                Duration::from_millis(40),
                Duration::from_millis(40),
            )
            .unwrap();
        assert!(sensor.is_operational());
        thread::sleep(Duration::from_millis(60));
        assert!(!sensor.is_operational());
        thread::sleep(Duration::from_millis(60));
        assert!(sensor.is_operational());
        sensor.stop_failure_and_repair_process().unwrap();
    }

    #[test]
    fn test_stopping_leaves_the_sensor_operational() {
        let maze = Arc::new(corridor_maze());
        let mut sensor = UnreliableSensor::new(maze);
        sensor
            .start_failure_and_repair_process(
                Duration::from_millis(20),
                Duration::from_secs(60),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(40));
        assert!(!sensor.is_operational());
        sensor.stop_failure_and_repair_process().unwrap();
        assert!(sensor.is_operational());
    }

    #[test]
    fn test_process_lifecycle_errors() {
        let maze = Arc::new(corridor_maze());
        let mut sensor = UnreliableSensor::new(maze);
        assert_eq!(
            sensor.stop_failure_and_repair_process(),
            Err(SensorError::ProcessNotRunning)
        );
        sensor
            .start_failure_and_repair_process(Duration::from_secs(60), Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            sensor
                .start_failure_and_repair_process(Duration::from_secs(60), Duration::from_secs(60)),
            Err(SensorError::ProcessAlreadyRunning)
        );
        sensor.stop_failure_and_repair_process().unwrap();
    }
}
