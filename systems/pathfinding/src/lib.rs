#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid-constrained A* planner that routes enemies toward the base line.
//!
//! The goal is a column rather than a single cell: the search succeeds the
//! first time it expands any cell whose column reaches the target column.
//! Only axis-aligned moves are generated, so every returned path changes
//! exactly one coordinate by one between consecutive cells.

use std::{cmp::Ordering, collections::BinaryHeap};

use lane_defence_core::{CellCoord, Direction, GridBounds, ObstacleMap};

/// Neighbour expansion order. Forward progress is tried first, which also
/// fixes tie-breaking between equally short routes.
const NEIGHBOR_ORDER: [Direction; 4] = [
    Direction::East,
    Direction::North,
    Direction::South,
    Direction::West,
];

/// Ordered cells from an enemy's current cell to the goal column.
///
/// An empty path means no route exists; it is a normal outcome that callers
/// branch on rather than an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Path that contains no cells.
    #[must_use]
    pub const fn empty() -> Self {
        Self { cells: Vec::new() }
    }

    /// Path consisting of a single cell, used when the start already lies on
    /// the goal column.
    #[must_use]
    pub fn single(cell: CellCoord) -> Self {
        Self { cells: vec![cell] }
    }

    /// Wraps an explicit cell sequence.
    #[must_use]
    pub fn from_cells(cells: Vec<CellCoord>) -> Self {
        Self { cells }
    }

    /// Reports whether the path holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the path leads anywhere beyond its first cell.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.cells.len() < 2
    }

    /// Number of cells in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cell at the provided position along the path.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CellCoord> {
        self.cells.get(index).copied()
    }

    /// Last cell of the path.
    #[must_use]
    pub fn last(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Borrowed view of the cells.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }
}

/// Convenience wrapper that plans with a throwaway [`PathPlanner`].
#[must_use]
pub fn find_path(
    start: CellCoord,
    target_column: u32,
    obstacles: &ObstacleMap,
    can_fly: bool,
) -> Path {
    PathPlanner::new().find_path(start, target_column, obstacles, can_fly)
}

/// A* planner that reuses its scratch buffers between searches.
#[derive(Debug, Default)]
pub struct PathPlanner {
    open: BinaryHeap<OpenNode>,
    g_scores: Vec<u32>,
    parents: Vec<Option<usize>>,
    closed: Vec<bool>,
    expansions: usize,
}

impl PathPlanner {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes expanded by the most recent search.
    #[must_use]
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Plans a route from `start` to any cell on `target_column`.
    ///
    /// Cells are valid neighbours when they lie inside the obstacle map's
    /// bounds and are either free or `can_fly` is set. The search expands at
    /// most `columns * rows` nodes; hitting that cap yields an empty path.
    pub fn find_path(
        &mut self,
        start: CellCoord,
        target_column: u32,
        obstacles: &ObstacleMap,
        can_fly: bool,
    ) -> Path {
        self.expansions = 0;
        let bounds = obstacles.bounds();
        let target_column = target_column.min(bounds.last_column());

        if start.column() >= target_column {
            return Path::single(start);
        }

        let Some(start_index) = bounds.index(start) else {
            return Path::empty();
        };

        let expansion_cap = bounds.cell_count();
        self.prepare(expansion_cap);

        let goal_row = start.row();
        let mut sequence: u64 = 0;
        self.g_scores[start_index] = 0;
        self.open.push(OpenNode {
            f: heuristic(start, target_column, goal_row),
            sequence,
            cell: start,
            index: start_index,
        });

        while let Some(node) = self.open.pop() {
            if self.closed[node.index] {
                continue;
            }
            if self.expansions >= expansion_cap {
                return Path::empty();
            }
            self.closed[node.index] = true;
            self.expansions += 1;

            if node.cell.column() >= target_column {
                return self.reconstruct(bounds, node.index);
            }

            let next_g = self.g_scores[node.index].saturating_add(1);
            for direction in NEIGHBOR_ORDER {
                let Some(neighbor) = node.cell.step(direction) else {
                    continue;
                };
                let Some(neighbor_index) = bounds.index(neighbor) else {
                    continue;
                };
                if self.closed[neighbor_index] {
                    continue;
                }
                if !can_fly && obstacles.is_blocked(neighbor) {
                    continue;
                }
                if next_g >= self.g_scores[neighbor_index] {
                    continue;
                }

                self.g_scores[neighbor_index] = next_g;
                self.parents[neighbor_index] = Some(node.index);
                sequence += 1;
                self.open.push(OpenNode {
                    f: next_g.saturating_add(heuristic(neighbor, target_column, goal_row)),
                    sequence,
                    cell: neighbor,
                    index: neighbor_index,
                });
            }
        }

        Path::empty()
    }

    fn prepare(&mut self, cell_count: usize) {
        self.open.clear();
        self.g_scores.clear();
        self.g_scores.resize(cell_count, u32::MAX);
        self.parents.clear();
        self.parents.resize(cell_count, None);
        self.closed.clear();
        self.closed.resize(cell_count, false);
    }

    fn reconstruct(&self, bounds: GridBounds, goal_index: usize) -> Path {
        let mut cells = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            if let Some(cell) = bounds.cell_at(index) {
                cells.push(cell);
            }
            cursor = self.parents[index];
        }
        cells.reverse();
        Path::from_cells(cells)
    }
}

/// Manhattan distance to the goal column, measured against the start row.
fn heuristic(cell: CellCoord, target_column: u32, goal_row: u32) -> u32 {
    cell.manhattan_distance(CellCoord::new(target_column, goal_row))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    sequence: u64,
    cell: CellCoord,
    index: usize,
}

impl Ord for OpenNode {
    // `BinaryHeap` is a max-heap: lower f first, then earlier discovery.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
