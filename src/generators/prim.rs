use rand::{Rng, rngs::StdRng};
use std::sync::mpsc::Sender;

use super::report_progress;
use crate::maze::{CardinalDirection, Floorplan, Wallboard};

/// Randomized Prim's algorithm. Grows the maze from one random cell by
/// repeatedly tearing down a random wall on the frontier between visited and
/// unvisited territory. Produces shorter, bushier corridors than DFS.
pub(super) fn carve(floorplan: &mut Floorplan, rng: &mut StdRng, progress: Option<&Sender<u8>>) {
    let start: (u8, u8) = (
        rng.random_range(0..floorplan.width()),
        rng.random_range(0..floorplan.height()),
    );
    floorplan.set_cell_as_visited(start.0, start.1);

    let total = floorplan.width() as u32 * floorplan.height() as u32;
    let mut visited = 1u32;

    let mut frontier = Vec::new();
    push_tearable_walls(floorplan, start, &mut frontier);

    while !frontier.is_empty() {
        let wallboard = frontier.swap_remove(rng.random_range(0..frontier.len()));
        // Stale entries pile up as their far cells get visited through other
        // walls; re-checking here filters them out.
        if !floorplan.can_tear_down(wallboard) {
            continue;
        }
        let Some(neighbor) = floorplan.neighbor(wallboard.x, wallboard.y, wallboard.dir) else {
            continue;
        };
        floorplan.delete_wallboard(wallboard);
        floorplan.set_cell_as_visited(neighbor.0, neighbor.1);
        visited += 1;
        report_progress(progress, (visited * 100 / total) as u8);
        push_tearable_walls(floorplan, neighbor, &mut frontier);
    }
}

fn push_tearable_walls(floorplan: &Floorplan, (x, y): (u8, u8), frontier: &mut Vec<Wallboard>) {
    for dir in CardinalDirection::ALL {
        let wallboard = Wallboard::new(x, y, dir);
        if floorplan.can_tear_down(wallboard) {
            frontier.push(wallboard);
        }
    }
}
