use rand::{Rng, rngs::StdRng, seq::SliceRandom};

use super::direction::CardinalDirection;

// Per-cell bit layout: bits 0..=3 wall presence (N, S, E, W), bits 4..=7
// border markers in the same order, bit 8 visited, bit 9 in-room.
const WALL_SHIFT: u16 = 0;
const BORDER_SHIFT: u16 = 4;
const VISITED_BIT: u16 = 1 << 8;
const ROOM_BIT: u16 = 1 << 9;

/// Maximum number of doors punched into a room perimeter.
const MAX_ROOM_DOORS: usize = 5;

fn wall_bit(dir: CardinalDirection) -> u16 {
    1 << (WALL_SHIFT + dir.index() as u16)
}

fn border_bit(dir: CardinalDirection) -> u16 {
    1 << (BORDER_SHIFT + dir.index() as u16)
}

/// Addresses one wall segment: the wall of cell `(x, y)` facing `dir`.
/// Wallboards are constructed ad hoc; the same physical wall can be addressed
/// from either adjacent cell (see [`Wallboard::mirror`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wallboard {
    pub x: u8,
    pub y: u8,
    pub dir: CardinalDirection,
}

impl Wallboard {
    pub fn new(x: u8, y: u8, dir: CardinalDirection) -> Self {
        Wallboard { x, y, dir }
    }

    /// The same wall addressed from the neighboring cell, if that cell exists
    /// on a `width x height` grid.
    pub fn mirror(&self, width: u8, height: u8) -> Option<Wallboard> {
        let (dx, dy) = self.dir.delta();
        let nx = self.x as i16 + dx;
        let ny = self.y as i16 + dy;
        if nx < 0 || ny < 0 || nx >= width as i16 || ny >= height as i16 {
            return None;
        }
        Some(Wallboard::new(nx as u8, ny as u8, self.dir.opposite()))
    }
}

/// A `width x height` grid of cells, each a bitmask of wall presence, border
/// markers, a visited flag and a room flag. This is the mutable structure the
/// generation algorithms carve; once wrapped into a [`super::Maze`] it is
/// treated as read-only.
#[derive(Clone)]
pub struct Floorplan {
    width: u8,
    height: u8,
    cells: Box<[u16]>,
}

impl Floorplan {
    /// Creates a floorplan with every cell zeroed: no walls, no borders,
    /// unvisited, not in a room. Call [`Floorplan::initialize`] to raise all
    /// walls before carving.
    pub fn new(width: u8, height: u8) -> Self {
        let cells = vec![0u16; width as usize * height as usize].into_boxed_slice();
        Floorplan {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Checks if the given coordinate is within the bounds of the grid.
    pub fn is_in_bounds(&self, coord: (u8, u8)) -> bool {
        coord.0 < self.width && coord.1 < self.height
    }

    fn ravel_index(&self, x: u8, y: u8) -> usize {
        assert!(
            self.is_in_bounds((x, y)),
            "coordinate ({x}, {y}) out of bounds for {}x{} floorplan",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    /// Resets every cell to "all four walls up, unvisited, not in a room" and
    /// marks the outward-facing sides of boundary cells as borders.
    /// Idempotent.
    pub fn initialize(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let mut mask = wall_bit(CardinalDirection::North)
                    | wall_bit(CardinalDirection::South)
                    | wall_bit(CardinalDirection::East)
                    | wall_bit(CardinalDirection::West);
                if y == 0 {
                    mask |= border_bit(CardinalDirection::North);
                }
                if y == self.height - 1 {
                    mask |= border_bit(CardinalDirection::South);
                }
                if x == 0 {
                    mask |= border_bit(CardinalDirection::West);
                }
                if x == self.width - 1 {
                    mask |= border_bit(CardinalDirection::East);
                }
                let idx = self.ravel_index(x, y);
                self.cells[idx] = mask;
            }
        }
    }

    /// Whether the cell at `(x, y)` has a wall facing `dir`.
    ///
    /// # Panics
    /// If `(x, y)` is out of bounds. Callers that cannot guarantee bounds
    /// should go through [`super::Maze::has_wall`] which returns an error.
    pub fn has_wall(&self, x: u8, y: u8, dir: CardinalDirection) -> bool {
        self.cells[self.ravel_index(x, y)] & wall_bit(dir) != 0
    }

    /// Complement of [`Floorplan::has_wall`].
    ///
    /// # Panics
    /// If `(x, y)` is out of bounds.
    pub fn has_no_wall(&self, x: u8, y: u8, dir: CardinalDirection) -> bool {
        !self.has_wall(x, y, dir)
    }

    /// Whether the wall of cell `(x, y)` facing `dir` is a border: either an
    /// outer grid boundary or a room perimeter. Border walls are never torn
    /// down by generation (only the exit opening pierces one).
    pub fn is_border(&self, x: u8, y: u8, dir: CardinalDirection) -> bool {
        self.cells[self.ravel_index(x, y)] & border_bit(dir) != 0
    }

    /// The neighboring cell in the given direction, if it exists.
    pub fn neighbor(&self, x: u8, y: u8, dir: CardinalDirection) -> Option<(u8, u8)> {
        let (dx, dy) = dir.delta();
        let nx = x as i16 + dx;
        let ny = y as i16 + dy;
        if nx < 0 || ny < 0 || nx >= self.width as i16 || ny >= self.height as i16 {
            return None;
        }
        Some((nx as u8, ny as u8))
    }

    /// Clears the wall addressed by `wallboard` and its mirror in the
    /// neighboring cell. Deleting an absent wall is a no-op; a wallboard on
    /// the outer grid boundary (no neighbor) is left untouched.
    pub fn delete_wallboard(&mut self, wallboard: Wallboard) {
        let Some((nx, ny)) = self.neighbor(wallboard.x, wallboard.y, wallboard.dir) else {
            return;
        };
        let idx = self.ravel_index(wallboard.x, wallboard.y);
        self.cells[idx] &= !wall_bit(wallboard.dir);
        let nidx = self.ravel_index(nx, ny);
        self.cells[nidx] &= !wall_bit(wallboard.dir.opposite());
    }

    /// Raises the wall addressed by `wallboard`; mirrors into the neighbor
    /// when `also_update_neighbor` is set and the neighbor exists.
    pub fn add_wallboard(&mut self, wallboard: Wallboard, also_update_neighbor: bool) {
        let idx = self.ravel_index(wallboard.x, wallboard.y);
        self.cells[idx] |= wall_bit(wallboard.dir);
        if also_update_neighbor
            && let Some((nx, ny)) = self.neighbor(wallboard.x, wallboard.y, wallboard.dir)
        {
            let nidx = self.ravel_index(nx, ny);
            self.cells[nidx] |= wall_bit(wallboard.dir.opposite());
        }
    }

    /// Marks the border bit on both sides of the addressed wall, making it
    /// permanent for the rest of the generation run.
    fn set_wall_as_border(&mut self, wallboard: Wallboard) {
        let idx = self.ravel_index(wallboard.x, wallboard.y);
        self.cells[idx] |= border_bit(wallboard.dir);
        if let Some((nx, ny)) = self.neighbor(wallboard.x, wallboard.y, wallboard.dir) {
            let nidx = self.ravel_index(nx, ny);
            self.cells[nidx] |= border_bit(wallboard.dir.opposite());
        }
    }

    /// True iff the wall exists, is not a border, and leads to an in-bounds
    /// neighbor that generation has not visited yet. This is the guard the
    /// carving algorithms use to avoid reconnecting already-linked regions.
    pub fn can_tear_down(&self, wallboard: Wallboard) -> bool {
        if !self.has_wall(wallboard.x, wallboard.y, wallboard.dir)
            || self.is_border(wallboard.x, wallboard.y, wallboard.dir)
        {
            return false;
        }
        match self.neighbor(wallboard.x, wallboard.y, wallboard.dir) {
            Some((nx, ny)) => self.is_first_visit(nx, ny),
            None => false,
        }
    }

    /// Marks the cell as visited by the generation algorithm.
    pub fn set_cell_as_visited(&mut self, x: u8, y: u8) {
        let idx = self.ravel_index(x, y);
        self.cells[idx] |= VISITED_BIT;
    }

    /// Whether generation has not visited this cell yet.
    pub fn is_first_visit(&self, x: u8, y: u8) -> bool {
        self.cells[self.ravel_index(x, y)] & VISITED_BIT == 0
    }

    /// Opens the outward-facing border wall of a boundary cell, creating the
    /// single maze exit. Non-boundary cells are left unchanged. When the cell
    /// is a corner the northern/southern side wins over east/west.
    pub fn set_exit_position(&mut self, x: u8, y: u8) {
        let Some(dir) = self.outward_side(x, y) else {
            return;
        };
        let idx = self.ravel_index(x, y);
        self.cells[idx] &= !wall_bit(dir);
    }

    /// Whether `(x, y)` is a boundary cell whose outward border wall has been
    /// opened.
    pub fn is_exit_position(&self, x: u8, y: u8) -> bool {
        self.exit_direction(x, y).is_some()
    }

    /// The border side the exit opening faces, if `(x, y)` is the exit cell.
    pub fn exit_direction(&self, x: u8, y: u8) -> Option<CardinalDirection> {
        CardinalDirection::ALL.into_iter().find(|&dir| {
            self.neighbor(x, y, dir).is_none() && self.has_no_wall(x, y, dir)
        })
    }

    fn outward_side(&self, x: u8, y: u8) -> Option<CardinalDirection> {
        CardinalDirection::ALL
            .into_iter()
            .find(|&dir| self.neighbor(x, y, dir).is_none())
    }

    /// Number of openings in the outer boundary. A finished maze has exactly
    /// one: the exit.
    pub fn boundary_openings(&self) -> u32 {
        let mut count = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                for dir in CardinalDirection::ALL {
                    if self.neighbor(x, y, dir).is_none() && self.has_no_wall(x, y, dir) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Whether the cell carries the in-room flag.
    pub fn is_in_room(&self, x: u8, y: u8) -> bool {
        self.cells[self.ravel_index(x, y)] & ROOM_BIT != 0
    }

    /// True if any cell in the closed rectangle `[x1, x2] x [y1, y2]` already
    /// belongs to a room.
    pub fn area_overlaps_with_room(&self, x1: u8, y1: u8, x2: u8, y2: u8) -> bool {
        for y in y1..=y2 {
            for x in x1..=x2 {
                if self.is_in_room(x, y) {
                    return true;
                }
            }
        }
        false
    }

    /// Carves the closed rectangle `[x1, x2] x [y1, y2]` into a room: flags
    /// every cell as in-room, clears all walls between room cells, raises the
    /// perimeter walls as permanent borders and punches 1 to 5 doors at
    /// random perimeter positions (grid-boundary sides are never doors).
    ///
    /// The caller is responsible for keeping the rectangle in bounds and
    /// non-overlapping with existing rooms, checked beforehand via
    /// [`Floorplan::area_overlaps_with_room`].
    ///
    /// # Panics
    /// If the rectangle reaches outside the grid.
    pub fn mark_area_as_room(&mut self, x1: u8, y1: u8, x2: u8, y2: u8, rng: &mut StdRng) {
        assert!(x1 <= x2 && y1 <= y2, "degenerate room rectangle");
        assert!(
            self.is_in_bounds((x2, y2)),
            "room rectangle reaches outside the grid"
        );

        let inside =
            |x: u8, y: u8| -> bool { x >= x1 && x <= x2 && y >= y1 && y <= y2 };

        let mut perimeter = Vec::new();
        for y in y1..=y2 {
            for x in x1..=x2 {
                let idx = self.ravel_index(x, y);
                self.cells[idx] |= ROOM_BIT;
                for dir in CardinalDirection::ALL {
                    match self.neighbor(x, y, dir) {
                        Some((nx, ny)) if inside(nx, ny) => {
                            self.delete_wallboard(Wallboard::new(x, y, dir));
                        }
                        Some(_) => perimeter.push(Wallboard::new(x, y, dir)),
                        // Grid boundary, stays a border wall
                        None => {}
                    }
                }
            }
        }

        perimeter.shuffle(rng);
        let num_doors = rng.random_range(1..=MAX_ROOM_DOORS).min(perimeter.len());
        for (i, wallboard) in perimeter.into_iter().enumerate() {
            if i < num_doors {
                self.delete_wallboard(wallboard);
            } else {
                self.add_wallboard(wallboard, true);
                self.set_wall_as_border(wallboard);
            }
        }
    }

    /// Iterates over maximal contiguous runs of walls facing `dir`, sweeping
    /// from `(x, y)` along the wall line: along y for east/west walls, along
    /// x for north/south walls. Each yielded `(start, end)` pair has a wall
    /// present at every index in `[start, end)`; a run ends where the sweep
    /// leaves the grid, meets a missing wall, or meets a perpendicular wall
    /// forming a corner. Used to render long walls as single segments.
    pub fn iterator(&self, x: u8, y: u8, dir: CardinalDirection) -> WallRuns<'_> {
        let (pos, limit) = match dir {
            CardinalDirection::East | CardinalDirection::West => (y, self.height),
            CardinalDirection::North | CardinalDirection::South => (x, self.width),
        };
        WallRuns {
            floorplan: self,
            fixed: match dir {
                CardinalDirection::East | CardinalDirection::West => x,
                CardinalDirection::North | CardinalDirection::South => y,
            },
            dir,
            pos,
            limit,
        }
    }

    pub(crate) fn cell_mask(&self, x: u8, y: u8) -> u16 {
        self.cells[self.ravel_index(x, y)]
    }

    pub(crate) fn set_cell_mask(&mut self, x: u8, y: u8, mask: u16) {
        let idx = self.ravel_index(x, y);
        self.cells[idx] = mask;
    }
}

/// Lazy iterator over contiguous wall runs, see [`Floorplan::iterator`].
pub struct WallRuns<'a> {
    floorplan: &'a Floorplan,
    /// The coordinate that stays fixed during the sweep (x for vertical wall
    /// lines, y for horizontal ones).
    fixed: u8,
    dir: CardinalDirection,
    pos: u8,
    limit: u8,
}

impl WallRuns<'_> {
    fn wall_at(&self, pos: u8) -> bool {
        match self.dir {
            CardinalDirection::East | CardinalDirection::West => {
                self.floorplan.has_wall(self.fixed, pos, self.dir)
            }
            CardinalDirection::North | CardinalDirection::South => {
                self.floorplan.has_wall(pos, self.fixed, self.dir)
            }
        }
    }

    /// A perpendicular wall pair at `pos`/`pos - 1` forms a corner that
    /// terminates the current run.
    fn corner_at(&self, pos: u8) -> bool {
        if pos == 0 {
            return false;
        }
        match self.dir {
            CardinalDirection::East | CardinalDirection::West => {
                let blocked = CardinalDirection::North;
                self.floorplan.has_wall(self.fixed, pos, blocked)
                    && self
                        .floorplan
                        .has_wall(self.fixed, pos - 1, blocked.opposite())
            }
            CardinalDirection::North | CardinalDirection::South => {
                let blocked = CardinalDirection::West;
                self.floorplan.has_wall(pos, self.fixed, blocked)
                    && self
                        .floorplan
                        .has_wall(pos - 1, self.fixed, blocked.opposite())
            }
        }
    }
}

impl Iterator for WallRuns<'_> {
    type Item = (u8, u8);

    fn next(&mut self) -> Option<Self::Item> {
        let mut pos = self.pos;
        while pos < self.limit && !self.wall_at(pos) {
            pos += 1;
        }
        if pos >= self.limit {
            self.pos = self.limit;
            return None;
        }
        let start = pos;
        pos += 1;
        while pos < self.limit && self.wall_at(pos) && !self.corner_at(pos) {
            pos += 1;
        }
        self.pos = pos;
        Some((start, pos))
    }
}
