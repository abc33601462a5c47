//! Cell grid carved by the maze generator and queried by every mover.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec3;
use matrix_maze_core::{CellCoord, Direction};
use rand::Rng;
use thiserror::Error;

/// Errors raised while parsing an ASCII maze layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("layout is empty")]
    Empty,
    /// A row's length differed from the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Cells found on the row.
        found: usize,
        /// Cells on the first row.
        expected: usize,
    },
    /// A character other than `#` or `.` appeared.
    #[error("unexpected character {found:?} at column {column}, row {row}")]
    UnknownCell {
        /// Offending character.
        found: char,
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
}

/// Wall flags on the four faces of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Walls {
    /// Face toward the previous row.
    pub top: bool,
    /// Face toward the next row.
    pub bottom: bool,
    /// Face toward the previous column.
    pub left: bool,
    /// Face toward the next column.
    pub right: bool,
}

impl Walls {
    /// Every face walled.
    pub const CLOSED: Self = Self {
        top: true,
        bottom: true,
        left: true,
        right: true,
    };

    /// Whether the face in the provided direction is walled.
    #[must_use]
    pub const fn has(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.top,
            Direction::South => self.bottom,
            Direction::West => self.left,
            Direction::East => self.right,
        }
    }

    fn set(&mut self, direction: Direction, present: bool) {
        match direction {
            Direction::North => self.top = present,
            Direction::South => self.bottom = present,
            Direction::West => self.left = present,
            Direction::East => self.right = present,
        }
    }
}

/// A single maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    walls: Walls,
    visited: bool,
    path: bool,
}

impl Cell {
    const SOLID: Self = Self {
        walls: Walls::CLOSED,
        visited: false,
        path: false,
    };

    /// Wall flags of the cell.
    #[must_use]
    pub const fn walls(&self) -> Walls {
        self.walls
    }

    /// Whether the carver visited the cell as a corridor endpoint.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.visited
    }

    /// Whether the cell is traversable.
    #[must_use]
    pub const fn is_path(&self) -> bool {
        self.path
    }

    /// Whether the cell is a solid wall block.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        !self.path
    }
}

/// An open move out of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    /// Direction of the move.
    pub direction: Direction,
    /// Cell reached by the move.
    pub cell: CellCoord,
}

/// Up to four open moves out of a cell, in [`Direction::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Moves {
    entries: [Move; 4],
    len: usize,
}

impl Moves {
    fn empty(origin: CellCoord) -> Self {
        Self {
            entries: [Move {
                direction: Direction::North,
                cell: origin,
            }; 4],
            len: 0,
        }
    }

    fn push(&mut self, entry: Move) {
        if self.len < self.entries.len() {
            self.entries[self.len] = entry;
            self.len += 1;
        }
    }

    /// Open moves as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Move] {
        &self.entries[..self.len]
    }

    /// Number of open moves.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the cell is a dead end with no way out.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Dense grid of maze cells plus the mapping between cells and world space.
///
/// Every maze cell spans `grid_scale × grid_scale` wall blocks of
/// `cell_size` world units. The grid is centred on the world origin with
/// columns along positive X and rows along positive Z.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationGrid {
    width: u32,
    height: u32,
    grid_scale: u32,
    cell_size: f32,
    cells: Vec<Cell>,
}

impl NavigationGrid {
    pub(crate) fn solid(width: u32, height: u32, grid_scale: u32, cell_size: f32) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            grid_scale,
            cell_size,
            cells: vec![Cell::SOLID; count],
        }
    }

    /// Builds a grid from rows of `#` (wall) and `.` (path) characters.
    ///
    /// Walls between orthogonally adjacent path cells are opened; every other
    /// face stays closed. Path cells on odd coordinates count as visited.
    pub fn from_ascii(layout: &str, grid_scale: u32, cell_size: f32) -> Result<Self, LayoutError> {
        let rows: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let expected = rows.first().map(|row| row.chars().count()).ok_or(LayoutError::Empty)?;

        let mut grid = Self::solid(expected as u32, rows.len() as u32, grid_scale, cell_size);
        for (row_index, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(LayoutError::RaggedRow {
                    row: row_index,
                    found,
                    expected,
                });
            }

            for (column_index, symbol) in row.chars().enumerate() {
                let path = match symbol {
                    '.' => true,
                    '#' => false,
                    found => {
                        return Err(LayoutError::UnknownCell {
                            found,
                            column: column_index,
                            row: row_index,
                        })
                    }
                };
                let coord = CellCoord::new(column_index as u32, row_index as u32);
                if let Some(cell) = grid.cell_mut(coord) {
                    cell.path = path;
                    cell.visited = path && column_index % 2 == 1 && row_index % 2 == 1;
                }
            }
        }

        let paths: Vec<CellCoord> = grid.path_cells().collect();
        for coord in paths {
            for direction in [Direction::East, Direction::South] {
                let Some(neighbor) = grid.neighbor(coord, direction) else {
                    continue;
                };
                if grid.is_path(neighbor) {
                    grid.open_face(coord, direction);
                }
            }
        }

        Ok(grid)
    }

    /// Renders the grid as rows of `#` and `.` characters.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        let mut output = String::with_capacity(self.cells.len() + self.height as usize);
        for row in 0..self.height {
            for column in 0..self.width {
                let path = self.is_path(CellCoord::new(column, row));
                output.push(if path { '.' } else { '#' });
            }
            output.push('\n');
        }
        output
    }

    /// Number of cells along the X axis.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of cells along the Z axis.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Wall blocks per cell edge.
    #[must_use]
    pub const fn grid_scale(&self) -> u32 {
        self.grid_scale
    }

    /// Edge length of a wall block.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Edge length of a maze cell.
    #[must_use]
    pub fn cell_span(&self) -> f32 {
        self.grid_scale as f32 * self.cell_size
    }

    /// Cell at the provided coordinate, if it lies on the grid.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).and_then(|index| self.cells.get(index))
    }

    pub(crate) fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        let index = self.index(coord)?;
        self.cells.get_mut(index)
    }

    /// Whether the coordinate names a traversable cell.
    #[must_use]
    pub fn is_path(&self, coord: CellCoord) -> bool {
        self.cell(coord).is_some_and(Cell::is_path)
    }

    /// Neighbouring coordinate in the provided direction, if it lies on the grid.
    #[must_use]
    pub fn neighbor(&self, coord: CellCoord, direction: Direction) -> Option<CellCoord> {
        coord
            .offset(direction, 1)
            .filter(|next| next.column() < self.width && next.row() < self.height)
    }

    /// Cell reached by stepping from a path cell through an open face.
    #[must_use]
    pub fn can_traverse(&self, from: CellCoord, direction: Direction) -> Option<CellCoord> {
        let cell = self.cell(from)?;
        if !cell.is_path() || cell.walls().has(direction) {
            return None;
        }
        self.neighbor(from, direction)
            .filter(|next| self.is_path(*next))
    }

    /// Every open move out of the provided cell.
    #[must_use]
    pub fn open_moves(&self, from: CellCoord) -> Moves {
        let mut moves = Moves::empty(from);
        for direction in Direction::ALL {
            if let Some(cell) = self.can_traverse(from, direction) {
                moves.push(Move { direction, cell });
            }
        }
        moves
    }

    /// Iterator over every path cell in row-major order.
    pub fn path_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |column| CellCoord::new(column, row)))
            .filter(|coord| self.is_path(*coord))
    }

    /// Every path cell reachable from `start` through open faces.
    #[must_use]
    pub fn reachable_from(&self, start: CellCoord) -> BTreeSet<CellCoord> {
        let mut seen = BTreeSet::new();
        if !self.is_path(start) {
            return seen;
        }

        let mut queue = VecDeque::from([start]);
        let _ = seen.insert(start);
        while let Some(cell) = queue.pop_front() {
            for entry in self.open_moves(cell).as_slice() {
                if seen.insert(entry.cell) {
                    queue.push_back(entry.cell);
                }
            }
        }
        seen
    }

    /// Path cell closest to `coord`, preferring the coordinate itself.
    #[must_use]
    pub fn nearest_path(&self, coord: CellCoord) -> Option<CellCoord> {
        if self.is_path(coord) {
            return Some(coord);
        }
        self.path_cells()
            .min_by_key(|candidate| (candidate.distance_squared(coord), *candidate))
    }

    /// World-space centre of a cell on the floor plane.
    #[must_use]
    pub fn cell_center(&self, coord: CellCoord) -> Vec3 {
        let span = self.cell_span();
        Vec3::new(
            (coord.column() as f32 - self.width as f32 / 2.0 + 0.5) * span,
            0.0,
            (coord.row() as f32 - self.height as f32 / 2.0 + 0.5) * span,
        )
    }

    /// Cell containing the world-space position, if it lies on the grid.
    #[must_use]
    pub fn cell_at(&self, position: Vec3) -> Option<CellCoord> {
        let span = self.cell_span();
        let column = (position.x / span + self.width as f32 / 2.0).floor();
        let row = (position.z / span + self.height as f32 / 2.0).floor();
        if !(column >= 0.0 && row >= 0.0) {
            return None;
        }
        let (column, row) = (column as u32, row as u32);
        (column < self.width && row < self.height).then(|| CellCoord::new(column, row))
    }

    pub(crate) fn mark_carved(&mut self, coord: CellCoord) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.visited = true;
            cell.path = true;
        }
    }

    /// Opens the wall between `from` and the cell two steps away.
    ///
    /// The connector cell becomes a path and every face along the corridor is
    /// opened on both sides.
    pub(crate) fn carve_between(&mut self, from: CellCoord, direction: Direction) {
        let Some(connector) = self.neighbor(from, direction) else {
            return;
        };
        let Some(destination) = self.neighbor(connector, direction) else {
            return;
        };

        self.open_face(from, direction);
        self.open_face(connector, direction);
        if let Some(cell) = self.cell_mut(connector) {
            cell.path = true;
        }
        self.mark_carved(destination);
    }

    fn open_face(&mut self, from: CellCoord, direction: Direction) {
        let Some(neighbor) = self.neighbor(from, direction) else {
            return;
        };
        if let Some(cell) = self.cell_mut(from) {
            cell.walls.set(direction, false);
        }
        if let Some(cell) = self.cell_mut(neighbor) {
            cell.walls.set(direction.opposite(), false);
        }
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if coord.column() >= self.width || coord.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Picks a wandering step out of a cell.
///
/// Unless `force_random` is set, a mover with a heading avoids turning back
/// while any other move exists.
pub fn wander_step<R>(
    moves: &Moves,
    heading: Option<Direction>,
    force_random: bool,
    rng: &mut R,
) -> Option<Move>
where
    R: Rng + ?Sized,
{
    let all = moves.as_slice();
    if all.is_empty() {
        return None;
    }

    let reverse = heading.map(Direction::opposite);
    let mut forward = Moves::empty(all[0].cell);
    if !force_random && all.len() > 1 {
        for entry in all {
            if Some(entry.direction) != reverse {
                forward.push(*entry);
            }
        }
    }

    let pool = if forward.is_empty() { all } else { forward.as_slice() };
    Some(pool[rng.gen_range(0..pool.len())])
}

/// Picks the step whose destination lies closest to `goal`.
///
/// Turning back is only allowed when it is the single way out. Ties keep the
/// earliest move in [`Direction::ALL`] order.
pub fn pursue_step(moves: &Moves, heading: Option<Direction>, goal: CellCoord) -> Option<Move> {
    let all = moves.as_slice();
    let reverse = heading.map(Direction::opposite);
    all.iter()
        .filter(|entry| all.len() == 1 || Some(entry.direction) != reverse)
        .min_by_key(|entry| entry.cell.distance_squared(goal))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const CORRIDOR: &str = "
        #######
        #.....#
        #.###.#
        #.#...#
        #######
    ";

    fn corridor() -> NavigationGrid {
        NavigationGrid::from_ascii(CORRIDOR, 2, 10.0).expect("layout parses")
    }

    #[test]
    fn ascii_round_trips() {
        let grid = corridor();
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.height(), 5);
        let rendered = grid.to_ascii();
        let reparsed = NavigationGrid::from_ascii(&rendered, 2, 10.0).expect("render parses");
        assert_eq!(grid, reparsed);
    }

    #[test]
    fn ragged_layout_is_rejected() {
        let error = NavigationGrid::from_ascii("###\n#.\n###", 2, 10.0).expect_err("ragged");
        assert_eq!(
            error,
            LayoutError::RaggedRow {
                row: 1,
                found: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn open_moves_follow_corridors() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(1, 1));
        let directions: Vec<Direction> = moves.as_slice().iter().map(|m| m.direction).collect();
        assert_eq!(directions, vec![Direction::South, Direction::East]);
        assert!(grid.open_moves(CellCoord::new(0, 0)).is_empty());
    }

    #[test]
    fn cell_mapping_is_inverse_of_center() {
        let grid = corridor();
        for cell in grid.path_cells() {
            let center = grid.cell_center(cell);
            assert_eq!(grid.cell_at(center), Some(cell));
        }
        assert_eq!(grid.cell_at(Vec3::new(1_000.0, 0.0, 0.0)), None);
    }

    #[test]
    fn wander_avoids_reversal_when_possible() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(2, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..32 {
            let step = wander_step(&moves, Some(Direction::East), false, &mut rng)
                .expect("corridor has an exit");
            assert_eq!(step.direction, Direction::East);
        }
    }

    #[test]
    fn wander_reverses_out_of_dead_ends() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(1, 3));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let step = wander_step(&moves, Some(Direction::South), false, &mut rng)
            .expect("dead end still has the way back");
        assert_eq!(step.direction, Direction::North);
    }

    #[test]
    fn pursuit_prefers_the_closer_neighbour() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(1, 1));
        let step = pursue_step(&moves, None, CellCoord::new(5, 1)).expect("moves exist");
        assert_eq!(step.direction, Direction::East);
        let step = pursue_step(&moves, None, CellCoord::new(1, 3)).expect("moves exist");
        assert_eq!(step.direction, Direction::South);
    }

    #[test]
    fn pursuit_turns_back_only_when_cornered() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(2, 1));
        let step = pursue_step(&moves, Some(Direction::East), CellCoord::new(1, 3))
            .expect("moves exist");
        assert_eq!(step.direction, Direction::East);

        let dead_end = grid.open_moves(CellCoord::new(1, 3));
        let step = pursue_step(&dead_end, Some(Direction::South), CellCoord::new(5, 3))
            .expect("dead end still has the way back");
        assert_eq!(step.direction, Direction::North);
    }

    #[test]
    fn pursuit_ties_keep_the_first_direction() {
        let grid = corridor();
        let moves = grid.open_moves(CellCoord::new(1, 1));
        let step = pursue_step(&moves, None, CellCoord::new(1, 1)).expect("moves exist");
        assert_eq!(step.direction, moves.as_slice()[0].direction);
    }

    #[test]
    fn pursuit_without_moves_has_no_step() {
        let moves = Moves::empty(CellCoord::new(1, 1));
        assert!(pursue_step(&moves, Some(Direction::East), CellCoord::new(5, 1)).is_none());
    }

    #[test]
    fn nearest_path_recovers_wall_cells() {
        let grid = corridor();
        assert_eq!(grid.nearest_path(CellCoord::new(1, 1)), Some(CellCoord::new(1, 1)));
        assert_eq!(grid.nearest_path(CellCoord::new(0, 1)), Some(CellCoord::new(1, 1)));
    }
}
