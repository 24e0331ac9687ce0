use rand::{Rng, rngs::StdRng};
use std::sync::mpsc::Sender;

use super::report_progress;
use crate::maze::{CardinalDirection, Floorplan, Wallboard};

/// Randomized depth-first search with an explicit stack. Carves long winding
/// corridors; every cell ends up visited exactly once, so the open walls form
/// a spanning tree.
pub(super) fn carve(floorplan: &mut Floorplan, rng: &mut StdRng, progress: Option<&Sender<u8>>) {
    let start: (u8, u8) = (
        rng.random_range(0..floorplan.width()),
        rng.random_range(0..floorplan.height()),
    );
    floorplan.set_cell_as_visited(start.0, start.1);

    let total = floorplan.width() as u32 * floorplan.height() as u32;
    let mut visited = 1u32;

    // The stack only ever holds visited cells.
    let mut stack = vec![start];
    while let Some((x, y)) = stack.pop() {
        let candidates = CardinalDirection::ALL
            .into_iter()
            .filter(|&dir| floorplan.can_tear_down(Wallboard::new(x, y, dir)))
            .collect::<Vec<_>>();

        // can_tear_down guarantees the neighbor exists
        if let Some(&dir) = pick(&candidates, rng)
            && let Some((nx, ny)) = floorplan.neighbor(x, y, dir)
        {
            floorplan.delete_wallboard(Wallboard::new(x, y, dir));
            floorplan.set_cell_as_visited(nx, ny);
            visited += 1;
            report_progress(progress, (visited * 100 / total) as u8);
            // Put the cell back first so its remaining neighbors get another
            // look after the branch below is exhausted.
            stack.push((x, y));
            stack.push((nx, ny));
        }
    }
}

fn pick<'a, T>(candidates: &'a [T], rng: &mut StdRng) -> Option<&'a T> {
    if candidates.is_empty() {
        None
    } else {
        Some(&candidates[rng.random_range(0..candidates.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_dfs_visits_every_cell() {
        let mut floorplan = Floorplan::new(7, 5);
        floorplan.initialize();
        let mut rng = StdRng::seed_from_u64(1);
        carve(&mut floorplan, &mut rng, None);
        for y in 0..5 {
            for x in 0..7 {
                assert!(!floorplan.is_first_visit(x, y), "cell ({x},{y}) untouched");
            }
        }
    }

    #[test]
    fn test_dfs_keeps_borders_intact() {
        let mut floorplan = Floorplan::new(6, 6);
        floorplan.initialize();
        let mut rng = StdRng::seed_from_u64(2);
        carve(&mut floorplan, &mut rng, None);
        assert_eq!(floorplan.boundary_openings(), 0);
    }
}
