use rand::{Rng, rngs::StdRng};

use super::GenerationError;
use crate::maze::{self, Floorplan};

const MIN_ROOM_SIDE: u8 = 3;
const MAX_PLACEMENT_ATTEMPTS: usize = 25;

/// Carves open rectangular rooms into an already carved maze. Room count and
/// maximum side length grow with `skill`. Each placement is validated on a
/// scratch copy of the floorplan: a room whose doors would cut off part of
/// the maze is discarded and re-rolled rather than committed.
///
/// Grids too small to host a room with a one-cell margin are left untouched.
pub(super) fn carve_rooms(
    floorplan: &mut Floorplan,
    skill: u8,
    rng: &mut StdRng,
) -> Result<(), GenerationError> {
    let (width, height) = (floorplan.width(), floorplan.height());
    if width < MIN_ROOM_SIDE + 2 || height < MIN_ROOM_SIDE + 2 {
        tracing::debug!("[rooms] {}x{} grid too small for rooms, skipping", width, height);
        return Ok(());
    }
    // The margin keeps room perimeters off the grid boundary so the exit
    // opening can go on any border cell later.
    let max_room_width = (MIN_ROOM_SIDE + skill).min(width - 2);
    let max_room_height = (MIN_ROOM_SIDE + skill).min(height - 2);
    let target = (skill as usize).clamp(1, 5);

    let mut placed = 0;
    for _ in 0..target {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let room_width = rng.random_range(MIN_ROOM_SIDE..=max_room_width);
            let room_height = rng.random_range(MIN_ROOM_SIDE..=max_room_height);
            let x1 = rng.random_range(1..=width - 1 - room_width);
            let y1 = rng.random_range(1..=height - 1 - room_height);
            let (x2, y2) = (x1 + room_width - 1, y1 + room_height - 1);
            if floorplan.area_overlaps_with_room(x1, y1, x2, y2) {
                continue;
            }
            let mut candidate = floorplan.clone();
            candidate.mark_area_as_room(x1, y1, x2, y2, rng);
            if is_fully_connected(&candidate) {
                *floorplan = candidate;
                placed += 1;
                break;
            }
            tracing::debug!(
                "[rooms] room ({x1},{y1})-({x2},{y2}) would disconnect the maze, re-rolling"
            );
        }
    }
    if placed == 0 {
        return Err(GenerationError::RoomPlacement);
    }
    tracing::debug!("[rooms] placed {placed} of {target} rooms");
    Ok(())
}

fn is_fully_connected(floorplan: &Floorplan) -> bool {
    maze::compute_distances(floorplan, (0, 0))
        .iter()
        .all(|&dist| dist != maze::UNREACHABLE)
}
