use rand::{Rng, rngs::StdRng};
use std::collections::{BTreeMap, HashSet};
use std::sync::mpsc::Sender;

use super::{GenerationError, report_progress};
use crate::maze::{CardinalDirection, Floorplan, Wallboard};

/// Weight of any wall that must never be torn down: grid borders and slots
/// with no neighboring cell.
const INFINITY: u64 = u64::MAX;

/// Random edge weights for Boruvka's algorithm, one `u64` per cell wall slot.
/// All finite weights are unique, which is what lets the algorithm skip the
/// usual tie-breaking machinery: the lowest-weight edge out of a component is
/// unambiguous.
struct EdgeWeights {
    width: u8,
    weights: Box<[u64]>,
}

impl EdgeWeights {
    /// Draws a weight for every interior wall. Both addressings of the same
    /// physical wall get the same value; boundary slots get [`INFINITY`].
    fn assign(floorplan: &Floorplan, rng: &mut StdRng) -> Self {
        let (width, height) = (floorplan.width(), floorplan.height());
        let mut weights =
            vec![INFINITY; width as usize * height as usize * 4].into_boxed_slice();
        let mut used = HashSet::new();
        for y in 0..height {
            for x in 0..width {
                for dir in CardinalDirection::ALL {
                    if floorplan.neighbor(x, y, dir).is_none() {
                        continue;
                    }
                    let slot = slot_index(width, x, y, dir);
                    // North and West mirror a slot assigned earlier in the
                    // row-major scan.
                    weights[slot] = match dir {
                        CardinalDirection::North => weights[slot_index(width, x, y - 1, CardinalDirection::South)],
                        CardinalDirection::West => weights[slot_index(width, x - 1, y, CardinalDirection::East)],
                        _ => {
                            let mut w = rng.random::<u64>();
                            while w == INFINITY || !used.insert(w) {
                                w = rng.random::<u64>();
                            }
                            w
                        }
                    };
                }
            }
        }
        EdgeWeights { width, weights }
    }

    fn get(&self, x: u8, y: u8, dir: CardinalDirection) -> u64 {
        self.weights[slot_index(self.width, x, y, dir)]
    }

    /// The direction of the cheapest wall around `(x, y)`, scanning in the
    /// fixed North, South, East, West order.
    fn lowest_direction(&self, x: u8, y: u8) -> CardinalDirection {
        let mut best = CardinalDirection::North;
        for dir in CardinalDirection::ALL {
            if self.get(x, y, dir) < self.get(x, y, best) {
                best = dir;
            }
        }
        best
    }
}

fn slot_index(width: u8, x: u8, y: u8, dir: CardinalDirection) -> usize {
    (y as usize * width as usize + x as usize) * 4 + dir.index()
}

/// Disjoint-set forest over cell indices with union by rank and path halving.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    /// Merges the sets of `a` and `b`. Returns false if they already share
    /// a root.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Boruvka's algorithm over the cell graph. Every cell first tears down its
/// single cheapest wall, which collapses the grid into a forest of small
/// components; each following round merges every component with its nearest
/// neighbor along the cheapest standing wall until one component remains.
///
/// With unique weights the torn-down walls form exactly the minimum spanning
/// tree, so the result is a perfect maze.
pub(super) fn carve(
    floorplan: &mut Floorplan,
    rng: &mut StdRng,
    progress: Option<&Sender<u8>>,
) -> Result<(), GenerationError> {
    let (width, height) = (floorplan.width(), floorplan.height());
    let total = width as usize * height as usize;
    let weights = EdgeWeights::assign(floorplan, rng);
    let cell_index = |x: u8, y: u8| y as usize * width as usize + x as usize;

    let mut forest = UnionFind::new(total);
    let mut components = total;

    // Round zero: every cell knocks out its cheapest wall. Two mutual lowest
    // neighbors both pick the same wall; the second delete is a no-op and the
    // union below reports it.
    for y in 0..height {
        for x in 0..width {
            let dir = weights.lowest_direction(x, y);
            let Some((nx, ny)) = floorplan.neighbor(x, y, dir) else {
                // A 1x1 grid has no interior walls at all.
                continue;
            };
            floorplan.delete_wallboard(Wallboard::new(x, y, dir));
            floorplan.set_cell_as_visited(x, y);
            floorplan.set_cell_as_visited(nx, ny);
            if forest.union(cell_index(x, y), cell_index(nx, ny)) {
                components -= 1;
            }
        }
    }
    report_progress(progress, 50);

    while components > 1 {
        // Cheapest standing wall out of each component, keyed by root. A
        // BTreeMap keeps the merge order stable across runs.
        let mut cheapest: BTreeMap<usize, (u64, Wallboard)> = BTreeMap::new();
        for y in 0..height {
            for x in 0..width {
                for dir in [CardinalDirection::South, CardinalDirection::East] {
                    let Some((nx, ny)) = floorplan.neighbor(x, y, dir) else {
                        continue;
                    };
                    if floorplan.has_no_wall(x, y, dir) {
                        continue;
                    }
                    let (ra, rb) = (
                        forest.find(cell_index(x, y)),
                        forest.find(cell_index(nx, ny)),
                    );
                    if ra == rb {
                        continue;
                    }
                    let weight = weights.get(x, y, dir);
                    let wallboard = Wallboard::new(x, y, dir);
                    for root in [ra, rb] {
                        let entry = cheapest.entry(root).or_insert((weight, wallboard));
                        if weight < entry.0 {
                            *entry = (weight, wallboard);
                        }
                    }
                }
            }
        }

        let before = components;
        for (_, (_, wallboard)) in cheapest {
            let Some((nx, ny)) = floorplan.neighbor(wallboard.x, wallboard.y, wallboard.dir)
            else {
                continue;
            };
            // Two components may nominate the same wall, or an earlier merge
            // this round may have joined them already.
            if forest.union(
                cell_index(wallboard.x, wallboard.y),
                cell_index(nx, ny),
            ) {
                floorplan.delete_wallboard(wallboard);
                components -= 1;
            }
        }
        if components == before {
            // Cannot happen on a grid graph; bail out instead of spinning.
            return Err(GenerationError::NoValidEdge(components));
        }
        report_progress(progress, (50 + (total - components) * 50 / total) as u8);
    }
    Ok(())
}
