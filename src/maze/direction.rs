/// One of the four cardinal directions on the grid.
/// The origin is the top-left corner and y grows downward, so North
/// decrements y and South increments it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardinalDirection {
    North,
    South,
    East,
    West,
}

impl CardinalDirection {
    /// All directions in the fixed scan order North, South, East, West.
    pub const ALL: [CardinalDirection; 4] = [
        CardinalDirection::North,
        CardinalDirection::South,
        CardinalDirection::East,
        CardinalDirection::West,
    ];

    /// Returns the opposite direction. `d.opposite().opposite() == d`.
    pub fn opposite(self) -> Self {
        match self {
            CardinalDirection::North => CardinalDirection::South,
            CardinalDirection::South => CardinalDirection::North,
            CardinalDirection::East => CardinalDirection::West,
            CardinalDirection::West => CardinalDirection::East,
        }
    }

    /// The (dx, dy) offset of the neighboring cell in this direction.
    pub fn delta(self) -> (i16, i16) {
        match self {
            CardinalDirection::North => (0, -1),
            CardinalDirection::South => (0, 1),
            CardinalDirection::East => (1, 0),
            CardinalDirection::West => (-1, 0),
        }
    }

    /// The direction after a quarter turn counterclockwise (to the left
    /// when facing this direction, with y growing downward).
    pub fn left(self) -> Self {
        match self {
            CardinalDirection::North => CardinalDirection::West,
            CardinalDirection::West => CardinalDirection::South,
            CardinalDirection::South => CardinalDirection::East,
            CardinalDirection::East => CardinalDirection::North,
        }
    }

    /// The direction after a quarter turn clockwise.
    pub fn right(self) -> Self {
        self.left().opposite()
    }

    /// Index into per-cell direction slots (wall bits, edge weight tables).
    pub fn index(self) -> usize {
        match self {
            CardinalDirection::North => 0,
            CardinalDirection::South => 1,
            CardinalDirection::East => 2,
            CardinalDirection::West => 3,
        }
    }
}

impl std::fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardinalDirection::North => write!(f, "North"),
            CardinalDirection::South => write!(f, "South"),
            CardinalDirection::East => write!(f, "East"),
            CardinalDirection::West => write!(f, "West"),
        }
    }
}
