mod common;

use common::{LINE_H, cell, line, lines_measure, para, row, table};
use docxide_reflow::layout::page::FragmentKind;
use docxide_reflow::layout::table::{
    TableCursor, grid_map, header_row_count, next_slice, paginate_table, place_slice,
    resolve_column_widths, row_may_split, span_width,
};
use docxide_reflow::model::{
    Block, CellMeasure, HeightRule, Measure, ParagraphMeasure, RowBreak, RowHeight, RowMeasure,
    TableBlock, TableCell, TableMeasure, TableRow, VMerge,
};
use docxide_reflow::{LayoutOptions, layout_document};

/// A measure where cell `c` of row `r` holds `lines[r][c]` lines.
fn table_measure(lines: &[Vec<usize>]) -> TableMeasure {
    let rows: Vec<RowMeasure> = lines
        .iter()
        .map(|cells| {
            let cells: Vec<CellMeasure> = cells
                .iter()
                .map(|&n| CellMeasure {
                    width: 0.0,
                    height: n as f32 * LINE_H,
                    paragraphs: vec![ParagraphMeasure {
                        lines: (0..n).map(|_| line(1)).collect(),
                        total_height: n as f32 * LINE_H,
                    }],
                })
                .collect();
            RowMeasure {
                height: cells.iter().map(|c| c.height).fold(0.0, f32::max),
                cells,
            }
        })
        .collect();
    TableMeasure {
        total_height: rows.iter().map(|r| r.height).sum(),
        rows,
        column_widths: Vec::new(),
        total_width: 0.0,
    }
}

/// `n` single-line rows of one cell each.
fn simple_table(n: usize) -> (TableBlock, TableMeasure) {
    let rows = (0..n).map(|i| row(&[&format!("r{i}")])).collect();
    (table("t", rows), table_measure(&vec![vec![1]; n]))
}

fn no_margins(mut t: TableBlock) -> TableBlock {
    t.attrs.cell_margins = Some(docxide_reflow::model::CellMargins {
        top: 0.0,
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
    });
    t
}

#[test]
fn column_widths_fall_back_to_an_even_split_with_a_floor() {
    let t = table("t", vec![row(&["a", "b", "c"])]);
    assert_eq!(resolve_column_widths(&t, 468.0, 20.0), [156.0, 156.0, 156.0]);

    let wide = table("t", vec![row(&["x"; 40])]);
    assert!(resolve_column_widths(&wide, 468.0, 20.0).iter().all(|&w| w == 20.0));

    let explicit = TableBlock {
        column_widths: vec![100.0, 0.0, f32::NAN],
        ..t.clone()
    };
    assert_eq!(resolve_column_widths(&explicit, 468.0, 20.0), [100.0, 156.0, 156.0]);

    assert!(resolve_column_widths(&table("empty", Vec::new()), 468.0, 20.0).is_empty());
}

#[test]
fn spanned_width_is_the_sum_of_grid_columns() {
    let widths = [100.0, 50.0, 25.0];
    assert_eq!(span_width(&widths, 0, 2), 150.0);
    assert_eq!(span_width(&widths, 1, 2), 75.0);
    assert_eq!(span_width(&widths, 2, 5), 25.0);
}

fn merged_table() -> TableBlock {
    let spanning = |text: &str, span: u16| TableCell {
        grid_span: span,
        ..cell(text)
    };
    let merged = |text: &str, v_merge: VMerge| TableCell {
        v_merge,
        ..cell(text)
    };
    table(
        "merged",
        vec![
            TableRow {
                cells: vec![spanning("A", 2), merged("B", VMerge::Restart)],
                ..TableRow::default()
            },
            TableRow {
                cells: vec![cell("C"), cell("D"), merged("", VMerge::Continue)],
                ..TableRow::default()
            },
            TableRow {
                cells: vec![spanning("F", 2), merged("", VMerge::Continue)],
                ..TableRow::default()
            },
        ],
    )
}

#[test]
fn grid_map_resolves_column_and_row_spans() {
    let t = merged_table();
    assert_eq!(t.grid_columns(), 3);
    let grid = grid_map(&t);

    assert_eq!((grid[0][0].grid_column, grid[0][0].grid_span), (0, 2));
    assert_eq!((grid[0][1].grid_column, grid[0][1].row_span), (2, 3));
    assert_eq!(grid[1][1].grid_column, 1);
    assert!(grid[1][2].is_continuation);
    assert_eq!(grid[1][2].grid_column, 2);
    assert!(grid[2][1].is_continuation);
    assert_eq!(grid[2][0].row_span, 1);
}

#[test]
fn merged_cell_is_emitted_once_and_stretches() {
    let t = no_margins(merged_table());
    let m = table_measure(&[vec![1, 1], vec![1, 1, 0], vec![1, 0]]);
    let widths = [100.0, 100.0, 100.0];
    let (slice, _) = next_slice(&t, &m, &TableCursor::default(), 500.0, true, RowBreak::Allow)
        .expect("table fits");
    let fragment = place_slice(&t, &m, &slice, &widths, 10.0, 20.0);

    assert_eq!(fragment.rows.len(), 3);
    let first = &fragment.rows[0];
    assert_eq!(first.cells.len(), 2);
    assert_eq!((first.cells[0].x, first.cells[0].width), (10.0, 200.0));
    assert_eq!((first.cells[1].x, first.cells[1].width), (210.0, 100.0));
    assert_eq!(first.cells[1].height, 3.0 * LINE_H);
    assert_eq!(first.cells[1].row_span, 3);

    // Rows covered by the merge do not re-emit it.
    assert_eq!(fragment.rows[1].cells.len(), 2);
    assert_eq!(fragment.rows[2].cells.len(), 1);
    assert_eq!(fragment.rows[1].y, 20.0 + LINE_H);
}

#[test]
fn split_policy_combines_table_row_and_height_rule() {
    let mut t = table(
        "t",
        vec![
            row(&["plain"]),
            TableRow {
                cant_split: true,
                ..row(&["locked"])
            },
            TableRow {
                height: Some(RowHeight {
                    value: 30.0,
                    rule: HeightRule::Exact,
                }),
                ..row(&["exact"])
            },
            TableRow {
                height: Some(RowHeight {
                    value: 30.0,
                    rule: HeightRule::AtLeast,
                }),
                ..row(&["at least"])
            },
        ],
    );
    assert!(row_may_split(&t, 0, RowBreak::Allow));
    assert!(!row_may_split(&t, 0, RowBreak::Avoid));
    assert!(!row_may_split(&t, 1, RowBreak::Allow));
    assert!(!row_may_split(&t, 2, RowBreak::Allow));
    assert!(row_may_split(&t, 3, RowBreak::Allow));
    assert!(!row_may_split(&t, 9, RowBreak::Allow));

    t.attrs.row_break = Some(RowBreak::Avoid);
    assert!(!row_may_split(&t, 0, RowBreak::Allow));
    t.attrs.row_break = Some(RowBreak::Allow);
    assert!(row_may_split(&t, 0, RowBreak::Avoid));
}

#[test]
fn slice_takes_the_rows_that_fit() {
    let (t, m) = simple_table(10);
    let (slice, next) =
        next_slice(&t, &m, &TableCursor::default(), 50.0, false, RowBreak::Allow).expect("rows fit");
    assert_eq!(slice.rows.len(), 4);
    assert_eq!(slice.height, 4.0 * LINE_H);
    assert!(!slice.continues_from_prev);
    assert!(slice.continues_on_next);
    assert_eq!(next, TableCursor { row: 4, cell_lines: Vec::new() });
}

#[test]
fn tall_row_splits_between_cell_lines() {
    let t = no_margins(table("t", vec![row(&["long", "short"])]));
    let m = table_measure(&[vec![10, 3]]);

    let (first, cursor) =
        next_slice(&t, &m, &TableCursor::default(), 50.0, false, RowBreak::Allow).expect("split");
    assert_eq!(first.rows.len(), 1);
    assert_eq!(first.rows[0].line_ranges, [(0, 4), (0, 3)]);
    assert!(first.rows[0].continues_on_next);
    assert_eq!(first.height, 4.0 * LINE_H);
    assert_eq!(cursor.row, 0);
    assert_eq!(cursor.cell_lines, [4, 3]);
    assert!(cursor.is_mid_row());

    let (rest, done) = next_slice(&t, &m, &cursor, 648.0, true, RowBreak::Allow).expect("rest");
    assert_eq!(rest.rows[0].line_ranges, [(4, 10), (3, 3)]);
    assert!(rest.rows[0].continues_from_prev);
    assert!(rest.continues_from_prev);
    assert!(!rest.continues_on_next);
    assert_eq!(rest.height, 6.0 * LINE_H);
    assert_eq!(done.row, 1);
}

#[test]
fn avoid_policy_moves_the_row_or_overflows_a_fresh_region() {
    let t = no_margins(table("t", vec![row(&["long"])]));
    let m = table_measure(&[vec![10]]);

    assert!(next_slice(&t, &m, &TableCursor::default(), 50.0, false, RowBreak::Avoid).is_none());

    let (slice, next) =
        next_slice(&t, &m, &TableCursor::default(), 50.0, true, RowBreak::Avoid).expect("forced");
    assert_eq!(slice.height, 10.0 * LINE_H);
    assert!(!slice.rows[0].continues_on_next);
    assert_eq!(next.row, 1);
}

#[test]
fn header_rows_repeat_on_continuation_slices() {
    let mut rows = vec![TableRow {
        repeat_header: true,
        ..row(&["header"])
    }];
    rows.extend((1..11).map(|i| row(&[&format!("r{i}")])));
    let t = table("t", rows);
    let m = table_measure(&vec![vec![1]; 11]);
    assert_eq!(header_row_count(&t), 1);

    let slices = paginate_table(&t, &m, 40.0, false, 60.0, RowBreak::Allow);
    assert_eq!(slices.len(), 3);

    let body = |i: usize| -> Vec<usize> { slices[i].body_rows().map(|r| r.row_index).collect() };
    assert_eq!(body(0), [0, 1, 2]);
    assert_eq!(body(1), [3, 4, 5, 6]);
    assert_eq!(body(2), [7, 8, 9, 10]);

    assert!(!slices[0].rows[0].repeated_header);
    for slice in &slices[1..] {
        assert!(slice.rows[0].repeated_header);
        assert_eq!(slice.rows[0].row_index, 0);
        assert_eq!(slice.height, 5.0 * LINE_H);
    }
}

#[test]
fn table_flows_across_pages() {
    common::init_logging();
    let (t, m) = simple_table(60);
    let blocks = vec![Block::Table(t)];
    let measures = vec![Measure::Table(m)];
    let layout = layout_document(&blocks, &measures, &LayoutOptions::default());

    assert_eq!(layout.page_count(), 2);
    let slices: Vec<(usize, usize, bool, bool)> = layout
        .pages
        .iter()
        .map(|p| match &p.fragments[0].kind {
            FragmentKind::Table(f) => (f.from_row, f.to_row, f.continues_from_prev, f.continues_on_next),
            other => panic!("expected a table, got {other:?}"),
        })
        .collect();
    assert_eq!(slices, [(0, 54, false, true), (54, 60, true, false)]);

    let first = &layout.pages[0].fragments[0];
    assert_eq!(first.x, 72.0 - 5.4);
    assert_eq!(first.width, 468.0);
    assert_eq!(first.height, 54.0 * LINE_H);
}

#[test]
fn table_follows_preceding_text() {
    let (t, m) = simple_table(3);
    let blocks = vec![para("p", "intro"), Block::Table(t)];
    let measures = vec![lines_measure(2), Measure::Table(m)];
    let layout = layout_document(&blocks, &measures, &LayoutOptions::default());

    let page = &layout.pages[0];
    assert_eq!(page.fragments.len(), 2);
    assert_eq!(page.fragments[1].y, 72.0 + 2.0 * LINE_H);
    let FragmentKind::Table(table) = &page.fragments[1].kind else {
        panic!("expected a table fragment");
    };
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[2].cells[0].lines.len(), 1);
    assert_eq!(table.rows[2].cells[0].lines[0].spans[0].text, "r");
}
