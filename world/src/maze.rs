//! Randomised depth-first maze carving with extra cross-connections.

use matrix_maze_core::{CellCoord, Direction, MazeTuning};
use rand::Rng;

use crate::navigation::NavigationGrid;

/// Cell every maze is carved from and the player starts in.
pub const START_CELL: CellCoord = CellCoord::new(1, 1);

/// Builds navigation grids by carving corridors out of solid rock.
#[derive(Clone, Debug, PartialEq)]
pub struct MazeGenerator {
    width: u32,
    height: u32,
    grid_scale: u32,
    cell_size: f32,
    cross_connection_chance: f32,
}

impl MazeGenerator {
    /// Creates a generator from the maze tuning table.
    #[must_use]
    pub fn new(tuning: &MazeTuning) -> Self {
        Self {
            width: tuning.width,
            height: tuning.height,
            grid_scale: tuning.grid_scale,
            cell_size: tuning.cell_size,
            cross_connection_chance: tuning.cross_connection_chance,
        }
    }

    /// Carves a maze using the provided random source.
    ///
    /// Corridors join odd-coordinate cells two steps apart. The carve is an
    /// iterative depth-first walk from [`START_CELL`], so every corridor cell is
    /// reachable before cross-connections add loops.
    pub fn generate<R>(&self, rng: &mut R) -> NavigationGrid
    where
        R: Rng + ?Sized,
    {
        let mut grid =
            NavigationGrid::solid(self.width, self.height, self.grid_scale, self.cell_size);
        if !self.is_carvable(START_CELL) {
            return grid;
        }

        grid.mark_carved(START_CELL);
        let mut stack = vec![START_CELL];
        while let Some(current) = stack.pop() {
            let mut candidates = [(Direction::North, current); 4];
            let mut count = 0;
            for direction in Direction::ALL {
                let Some(next) = current.offset(direction, 2) else {
                    continue;
                };
                if !self.is_carvable(next) {
                    continue;
                }
                if grid.cell(next).is_some_and(|cell| cell.visited()) {
                    continue;
                }
                candidates[count] = (direction, next);
                count += 1;
            }

            if count == 0 {
                continue;
            }

            stack.push(current);
            let (direction, next) = candidates[rng.gen_range(0..count)];
            grid.carve_between(current, direction);
            stack.push(next);
        }

        self.cross_connect(&mut grid, rng);
        grid
    }

    fn cross_connect<R>(&self, grid: &mut NavigationGrid, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for row in 0..self.height {
            for column in 0..self.width {
                let coord = CellCoord::new(column, row);
                let Some(cell) = grid.cell(coord).copied() else {
                    continue;
                };
                if !cell.visited() {
                    continue;
                }

                for direction in [Direction::East, Direction::South] {
                    if !cell.walls().has(direction) {
                        continue;
                    }
                    let Some(other) = coord.offset(direction, 2) else {
                        continue;
                    };
                    if !self.is_carvable(other) {
                        continue;
                    }
                    if !grid.cell(other).is_some_and(|candidate| candidate.visited()) {
                        continue;
                    }
                    if rng.gen::<f32>() < self.cross_connection_chance {
                        grid.carve_between(coord, direction);
                    }
                }
            }
        }
    }

    fn is_carvable(&self, coord: CellCoord) -> bool {
        coord.column() >= 1
            && coord.row() >= 1
            && coord.column() + 1 < self.width
            && coord.row() + 1 < self.height
    }
}
