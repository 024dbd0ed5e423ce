//! Obstacle layouts: ASCII parsing and seeded scatter.

use lane_defence_core::{CellCoord, GridBounds, ObstacleMap};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

const BLOCKED: char = '#';
const FREE: char = '.';

/// Problems found while reading an ASCII layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LayoutError {
    /// The layout holds a different number of rows than the grid.
    #[error("layout has {found} rows but the grid has {expected}")]
    RowCount {
        /// Rows the grid expects.
        expected: u32,
        /// Rows found in the layout.
        found: usize,
    },
    /// A row is wider or narrower than the grid.
    #[error("layout row {line} has {found} columns but the grid has {expected}")]
    ColumnCount {
        /// One-based line number of the row.
        line: usize,
        /// Columns the grid expects.
        expected: u32,
        /// Columns found on the line.
        found: usize,
    },
    /// A character other than `#` or `.` appeared.
    #[error("unexpected {symbol:?} on layout line {line}")]
    UnknownSymbol {
        /// One-based line number of the symbol.
        line: usize,
        /// Offending character.
        symbol: char,
    },
}

/// Parses one line per grid row, `#` blocked and `.` free.
///
/// Blank lines are skipped and the first row maps to the grid's start row.
pub(crate) fn parse_layout(bounds: GridBounds, text: &str) -> Result<ObstacleMap, LayoutError> {
    let rows: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    if rows.len() != bounds.rows() as usize {
        return Err(LayoutError::RowCount {
            expected: bounds.rows(),
            found: rows.len(),
        });
    }

    let mut map = ObstacleMap::new(bounds);
    for (row, (line_number, line)) in bounds.row_range().zip(rows) {
        let width = line.chars().count();
        if width != bounds.columns() as usize {
            return Err(LayoutError::ColumnCount {
                line: line_number,
                expected: bounds.columns(),
                found: width,
            });
        }
        for (column, symbol) in (0..bounds.columns()).zip(line.chars()) {
            match symbol {
                BLOCKED => {
                    let _ = map.block(CellCoord::new(column, row));
                }
                FREE => {}
                other => {
                    return Err(LayoutError::UnknownSymbol {
                        line: line_number,
                        symbol: other,
                    })
                }
            }
        }
    }
    Ok(map)
}

/// Blocks up to `count` random cells, leaving the entry and exit columns clear.
pub(crate) fn scatter_obstacles(
    bounds: GridBounds,
    count: usize,
    rng: &mut ChaCha8Rng,
) -> ObstacleMap {
    let mut candidates: Vec<CellCoord> = bounds
        .row_range()
        .flat_map(|row| (1..bounds.last_column()).map(move |column| CellCoord::new(column, row)))
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(count);
    ObstacleMap::with_obstacles(bounds, candidates)
}

/// Renders the map in the format [`parse_layout`] reads.
pub(crate) fn render_layout(map: &ObstacleMap) -> String {
    let bounds = map.bounds();
    let mut text = String::with_capacity(bounds.cell_count() + bounds.rows() as usize);
    for row in bounds.row_range() {
        for column in 0..bounds.columns() {
            let blocked = map.is_blocked(CellCoord::new(column, row));
            text.push(if blocked { BLOCKED } else { FREE });
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn parses_blocked_cells_from_start_row() {
        let bounds = GridBounds::new(4, 2, 4);
        let map = parse_layout(bounds, "..#.\n\n#...\n").expect("layout is valid");

        assert_eq!(map.obstacle_count(), 2);
        assert!(map.is_blocked(CellCoord::new(2, 2)));
        assert!(map.is_blocked(CellCoord::new(0, 3)));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let bounds = GridBounds::new(3, 0, 2);

        assert_eq!(
            parse_layout(bounds, "...\n"),
            Err(LayoutError::RowCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            parse_layout(bounds, "...\n....\n"),
            Err(LayoutError::ColumnCount {
                line: 2,
                expected: 3,
                found: 4
            })
        );
        assert_eq!(
            parse_layout(bounds, "...\n.x.\n"),
            Err(LayoutError::UnknownSymbol {
                line: 2,
                symbol: 'x'
            })
        );
    }

    #[test]
    fn scatter_keeps_edge_columns_clear() {
        let bounds = GridBounds::new(6, 0, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let map = scatter_obstacles(bounds, 1_000, &mut rng);

        assert_eq!(map.obstacle_count(), 4 * 4);
        for row in bounds.row_range() {
            assert!(map.is_free(CellCoord::new(0, row)));
            assert!(map.is_free(CellCoord::new(bounds.last_column(), row)));
        }
    }

    #[test]
    fn scatter_is_seeded() {
        let bounds = GridBounds::new(12, 0, 6);
        let first = scatter_obstacles(bounds, 10, &mut ChaCha8Rng::seed_from_u64(9));
        let second = scatter_obstacles(bounds, 10, &mut ChaCha8Rng::seed_from_u64(9));

        assert_eq!(first, second);
        assert_eq!(first.obstacle_count(), 10);
    }

    #[test]
    fn rendered_layout_parses_back() {
        let bounds = GridBounds::new(5, 0, 3);
        let map = ObstacleMap::with_obstacles(
            bounds,
            [CellCoord::new(1, 0), CellCoord::new(3, 2)],
        );

        let text = render_layout(&map);
        assert_eq!(text, ".#...\n.....\n...#.\n");
        assert_eq!(parse_layout(bounds, &text), Ok(map));
    }
}
