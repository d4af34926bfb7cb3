//! Table geometry: grid column widths, span resolution, and slicing of rows
//! into page/column-sized fragments under the row-break policy.

use crate::model::{
    CellVAlign, HeightRule, RowBreak, TableBlock, TableMeasure, VMerge,
};

use super::lines::place_line;
use super::page::{Line, PlacedCell, PlacedRow, TableFragment};

const FIT_EPSILON: f32 = 0.01;

/// Grid column widths. Explicit widths win; missing or unusable entries get
/// `content_width / columns`, never narrower than `min_width`.
pub fn resolve_column_widths(table: &TableBlock, content_width: f32, min_width: f32) -> Vec<f32> {
    let n = table.grid_columns();
    if n == 0 {
        return Vec::new();
    }
    let fallback = (content_width / n as f32).max(min_width).max(0.0);
    (0..n)
        .map(|i| match table.column_widths.get(i) {
            Some(&w) if w.is_finite() && w > 0.0 => w,
            _ => fallback,
        })
        .collect()
}

/// Width of `span` grid columns starting at `grid_column`.
pub fn span_width(column_widths: &[f32], grid_column: usize, span: usize) -> f32 {
    let start = grid_column.min(column_widths.len());
    let end = (grid_column + span).min(column_widths.len());
    column_widths[start..end].iter().sum()
}

/// Where one cell sits in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub row: usize,
    pub cell_index: usize,
    pub grid_column: usize,
    pub grid_span: usize,
    /// Rows covered by a vertical merge starting here; 1 for plain cells.
    pub row_span: usize,
    /// Covered by a merge that started in an earlier row. Not emitted.
    pub is_continuation: bool,
}

/// Grid positions of every cell, row by row.
pub fn grid_map(table: &TableBlock) -> Vec<Vec<GridCell>> {
    let mut grid: Vec<Vec<GridCell>> = table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let mut grid_column = 0usize;
            row.cells
                .iter()
                .enumerate()
                .map(|(cell_index, cell)| {
                    let g = GridCell {
                        row: r,
                        cell_index,
                        grid_column,
                        grid_span: cell.span(),
                        row_span: 1,
                        is_continuation: cell.v_merge == VMerge::Continue,
                    };
                    grid_column += cell.span();
                    g
                })
                .collect()
        })
        .collect();

    for r in 0..grid.len() {
        for i in 0..grid[r].len() {
            if grid[r][i].is_continuation {
                continue;
            }
            let column = grid[r][i].grid_column;
            let covered = grid[r + 1..]
                .iter()
                .take_while(|row| {
                    row.iter()
                        .any(|g| g.is_continuation && g.grid_column == column)
                })
                .count();
            grid[r][i].row_span = 1 + covered;
        }
    }
    grid
}

/// Table override first, then the layout-wide default.
pub fn effective_row_break(table: &TableBlock, default: RowBreak) -> RowBreak {
    table.attrs.row_break.unwrap_or(default)
}

/// Whether `row` may be split across regions.
pub fn row_may_split(table: &TableBlock, row: usize, policy: RowBreak) -> bool {
    let Some(r) = table.rows.get(row) else {
        return false;
    };
    effective_row_break(table, policy) == RowBreak::Allow
        && !r.cant_split
        && r.height.is_none_or(|h| h.rule != HeightRule::Exact)
}

/// Leading rows that repeat on continuation slices.
pub fn header_row_count(table: &TableBlock) -> usize {
    table.rows.iter().take_while(|r| r.repeat_header).count()
}

/// Position within a table: the next row to place, plus per-cell line
/// offsets when that row was split.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCursor {
    pub row: usize,
    pub cell_lines: Vec<usize>,
}

impl TableCursor {
    pub fn is_mid_row(&self) -> bool {
        self.cell_lines.iter().any(|&l| l > 0)
    }

    fn is_continuation(&self) -> bool {
        self.row > 0 || self.is_mid_row()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliceRow {
    pub row_index: usize,
    pub height: f32,
    pub repeated_header: bool,
    /// Per cell, the half-open range of flattened cell lines shown here.
    pub line_ranges: Vec<(usize, usize)>,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSlice {
    pub rows: Vec<SliceRow>,
    pub height: f32,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
}

impl TableSlice {
    /// Rows that belong to this slice, excluding repeated headers.
    pub fn body_rows(&self) -> impl Iterator<Item = &SliceRow> {
        self.rows.iter().filter(|r| !r.repeated_header)
    }
}

fn vertical_padding(table: &TableBlock) -> f32 {
    let m = table.cell_margins();
    m.top + m.bottom
}

fn row_height(measure: &TableMeasure, row: usize) -> f32 {
    measure.rows.get(row).map_or(0.0, |r| r.height)
}

/// Flattened line heights of every cell in `row`.
fn cell_line_heights(measure: &TableMeasure, row: usize) -> Vec<Vec<f32>> {
    let Some(row) = measure.rows.get(row) else {
        return Vec::new();
    };
    row.cells
        .iter()
        .map(|c| {
            c.paragraphs
                .iter()
                .flat_map(|p| p.lines.iter().map(|l| l.line_height))
                .collect()
        })
        .collect()
}

fn full_ranges(lines: &[Vec<f32>], offsets: &[usize]) -> Vec<(usize, usize)> {
    lines
        .iter()
        .enumerate()
        .map(|(c, l)| (offsets.get(c).copied().unwrap_or(0).min(l.len()), l.len()))
        .collect()
}

/// Height still needed to finish `row` from `offsets`.
fn remaining_height(table: &TableBlock, measure: &TableMeasure, row: usize, offsets: &[usize]) -> f32 {
    if !offsets.iter().any(|&o| o > 0) {
        return row_height(measure, row);
    }
    let content = cell_line_heights(measure, row)
        .iter()
        .enumerate()
        .map(|(c, l)| {
            let from = offsets.get(c).copied().unwrap_or(0).min(l.len());
            l[from..].iter().sum::<f32>()
        })
        .fold(0.0f32, f32::max);
    content + vertical_padding(table)
}

/// Fit as many lines of each cell as `content_avail` allows. `None` when no
/// cell can advance, or when every cell would finish (not a real split).
fn split_row(
    lines: &[Vec<f32>],
    offsets: &[usize],
    content_avail: f32,
) -> Option<(Vec<(usize, usize)>, f32)> {
    if content_avail <= 0.0 {
        return None;
    }
    let mut ranges = Vec::with_capacity(lines.len());
    let mut used = 0.0f32;
    let mut advanced = false;
    let mut finished = true;
    for (c, cell) in lines.iter().enumerate() {
        let from = offsets.get(c).copied().unwrap_or(0).min(cell.len());
        let mut to = from;
        let mut h = 0.0f32;
        while to < cell.len() && h + cell[to] <= content_avail + FIT_EPSILON {
            h += cell[to];
            to += 1;
        }
        advanced |= to > from;
        finished &= to == cell.len();
        used = used.max(h);
        ranges.push((from, to));
    }
    (advanced && !finished).then_some((ranges, used))
}

/// Cut the next slice starting at `cursor` into a region with `available`
/// points of height. Returns the slice and the cursor after it, or `None` when
/// nothing can be placed here and the caller should move to a fresh region.
/// In a fresh region (`at_region_top`) at least one row is always placed,
/// overflowing if it must.
pub fn next_slice(
    table: &TableBlock,
    measure: &TableMeasure,
    cursor: &TableCursor,
    available: f32,
    at_region_top: bool,
    policy: RowBreak,
) -> Option<(TableSlice, TableCursor)> {
    let total_rows = table.rows.len();
    if cursor.row >= total_rows {
        return None;
    }
    let vpad = vertical_padding(table);
    let mut rows: Vec<SliceRow> = Vec::new();
    let mut used = 0.0f32;

    let headers = header_row_count(table);
    if cursor.is_continuation() && headers > 0 && cursor.row >= headers {
        let header_h: f32 = (0..headers).map(|r| row_height(measure, r)).sum();
        if header_h < available {
            for r in 0..headers {
                let lines = cell_line_heights(measure, r);
                rows.push(SliceRow {
                    row_index: r,
                    height: row_height(measure, r),
                    repeated_header: true,
                    line_ranges: full_ranges(&lines, &[]),
                    continues_from_prev: false,
                    continues_on_next: false,
                });
            }
            used = header_h;
        }
    }
    let first_body = rows.len();

    let mut row = cursor.row;
    let mut offsets = cursor.cell_lines.clone();
    while row < total_rows {
        let mid_row = offsets.iter().any(|&o| o > 0);
        let need = remaining_height(table, measure, row, &offsets);
        let lines = cell_line_heights(measure, row);

        if used + need <= available + FIT_EPSILON {
            rows.push(SliceRow {
                row_index: row,
                height: need,
                repeated_header: false,
                line_ranges: full_ranges(&lines, &offsets),
                continues_from_prev: mid_row,
                continues_on_next: false,
            });
            used += need;
            row += 1;
            offsets.clear();
            continue;
        }

        if row_may_split(table, row, policy)
            && let Some((ranges, content_h)) = split_row(&lines, &offsets, available - used - vpad)
        {
            let height = content_h + vpad;
            log::debug!(
                "table {} row {} split after {:.1}pt",
                table.id,
                row,
                height
            );
            offsets = ranges.iter().map(|&(_, to)| to).collect();
            rows.push(SliceRow {
                row_index: row,
                height,
                repeated_header: false,
                line_ranges: ranges,
                continues_from_prev: mid_row,
                continues_on_next: true,
            });
            used += height;
            break;
        }

        if rows.len() == first_body && at_region_top {
            log::debug!(
                "table {} row {} ({:.1}pt) overflows a fresh {:.1}pt region",
                table.id,
                row,
                need,
                available
            );
            rows.push(SliceRow {
                row_index: row,
                height: need,
                repeated_header: false,
                line_ranges: full_ranges(&lines, &offsets),
                continues_from_prev: mid_row,
                continues_on_next: false,
            });
            used += need;
            row += 1;
            offsets.clear();
        }
        break;
    }

    if rows.len() == first_body {
        return None;
    }
    let next = TableCursor {
        row,
        cell_lines: offsets,
    };
    let slice = TableSlice {
        rows,
        height: used,
        continues_from_prev: cursor.is_continuation(),
        continues_on_next: next.row < total_rows,
    };
    Some((slice, next))
}

/// Slice a whole table: the first region has `first_available` points left,
/// every later region is a fresh one of `fresh_height`.
pub fn paginate_table(
    table: &TableBlock,
    measure: &TableMeasure,
    first_available: f32,
    first_at_top: bool,
    fresh_height: f32,
    policy: RowBreak,
) -> Vec<TableSlice> {
    let mut slices = Vec::new();
    let mut cursor = TableCursor::default();
    let mut available = first_available;
    let mut at_top = first_at_top;
    while cursor.row < table.rows.len() {
        match next_slice(table, measure, &cursor, available, at_top, policy) {
            Some((slice, next)) => {
                slices.push(slice);
                cursor = next;
            }
            None if at_top => break,
            None => {}
        }
        available = fresh_height;
        at_top = true;
    }
    slices
}

/// Position a slice with its top-left corner at (`x`, `y`).
pub fn place_slice(
    table: &TableBlock,
    measure: &TableMeasure,
    slice: &TableSlice,
    column_widths: &[f32],
    x: f32,
    y: f32,
) -> TableFragment {
    let grid = grid_map(table);
    let margins = table.cell_margins();

    let mut rows = Vec::with_capacity(slice.rows.len());
    let mut row_y = y;
    for (k, slice_row) in slice.rows.iter().enumerate() {
        let Some(grid_row) = grid.get(slice_row.row_index) else {
            continue;
        };
        let cells = grid_row
            .iter()
            .filter(|g| !g.is_continuation)
            .map(|g| {
                // A merged cell stretches over the following rows of this
                // slice that it covers.
                let height: f32 = slice.rows[k..]
                    .iter()
                    .take_while(|r| {
                        r.repeated_header == slice_row.repeated_header
                            && r.row_index < g.row + g.row_span
                    })
                    .map(|r| r.height)
                    .sum();
                let cell_x = x + span_width(column_widths, 0, g.grid_column);
                let width = span_width(column_widths, g.grid_column, g.grid_span);
                let range = slice_row
                    .line_ranges
                    .get(g.cell_index)
                    .copied()
                    .unwrap_or((0, 0));
                let content = ContentBox {
                    x: cell_x + margins.left,
                    y: row_y + margins.top,
                    width: (width - margins.left - margins.right).max(0.0),
                    height: (height - margins.top - margins.bottom).max(0.0),
                };
                let lines = place_cell_lines(table, measure, g, range, content);
                PlacedCell {
                    cell_index: g.cell_index,
                    grid_column: g.grid_column,
                    grid_span: g.grid_span,
                    row_span: g.row_span,
                    x: cell_x,
                    y: row_y,
                    width,
                    height,
                    lines,
                }
            })
            .collect();
        rows.push(PlacedRow {
            row_index: slice_row.row_index,
            y: row_y,
            height: slice_row.height,
            repeated_header: slice_row.repeated_header,
            continues_from_prev: slice_row.continues_from_prev,
            continues_on_next: slice_row.continues_on_next,
            cells,
        });
        row_y += slice_row.height;
    }

    let mut body = slice.body_rows();
    let from_row = body.next().map_or(0, |r| r.row_index);
    let to_row = slice
        .body_rows()
        .last()
        .map_or(from_row, |r| r.row_index + 1);
    TableFragment {
        from_row,
        to_row,
        continues_from_prev: slice.continues_from_prev,
        continues_on_next: slice.continues_on_next,
        column_widths: column_widths.to_vec(),
        rows,
    }
}

/// Cell area inside the cell margins.
struct ContentBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn place_cell_lines(
    table: &TableBlock,
    measure: &TableMeasure,
    g: &GridCell,
    (from, to): (usize, usize),
    content: ContentBox,
) -> Vec<Line> {
    let Some(cell) = table.rows.get(g.row).and_then(|r| r.cells.get(g.cell_index)) else {
        return Vec::new();
    };
    let Some(cell_measure) = measure.rows.get(g.row).and_then(|r| r.cells.get(g.cell_index)) else {
        return Vec::new();
    };

    let mut flat = Vec::new();
    for (p, pm) in cell_measure.paragraphs.iter().enumerate() {
        for (l, lm) in pm.lines.iter().enumerate() {
            flat.push((p, l, lm));
        }
    }
    let to = to.min(flat.len());
    let from = from.min(to);
    let shown = &flat[from..to];

    let content_h: f32 = shown.iter().map(|(_, _, lm)| lm.line_height).sum();
    let slack = (content.height - content_h).max(0.0);
    let mut line_y = content.y + match cell.v_align {
        CellVAlign::Top => 0.0,
        CellVAlign::Center => slack / 2.0,
        CellVAlign::Bottom => slack,
    };

    let mut lines = Vec::with_capacity(shown.len());
    for &(p, l, lm) in shown {
        let Some(para) = cell.paragraphs.get(p) else {
            continue;
        };
        let line_count = cell_measure.paragraphs[p].lines.len();
        lines.push(place_line(para, lm, l, line_count, content.x, line_y, content.width));
        line_y += lm.line_height;
    }
    lines
}
