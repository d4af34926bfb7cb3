//! Built-in measurement: greedy line breaking for paragraphs, list items and
//! table cells, plus declared geometry for images and drawings.

use crate::fonts::TextMeasure;
use crate::layout::LayoutOptions;
use crate::layout::sections::{resolve_sections, section_index_at};
use crate::layout::table::{resolve_column_widths, span_width};
use crate::model::{
    AtomicMeasure, Block, CellMeasure, HeightRule, LineMeasure, LineSegment, LineSpacing,
    ListBlock, ListItemMeasure, ListMeasure, Measure, ParagraphBlock, ParagraphMeasure,
    RowMeasure, Run, TabStop, TableBlock, TableMeasure, TextStyle, VMerge,
};

/// Indent per list level; the marker hangs one step left of the text.
pub const LIST_INDENT: f32 = 18.0;

const DEFAULT_TAB_INTERVAL: f32 = 36.0;
const DEFAULT_LINE_RATIO: f32 = 1.2;

/// Measure every block against the column width of the section it sits in.
pub fn measure_blocks(
    blocks: &[Block],
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> Vec<Measure> {
    let sections = resolve_sections(blocks, &options.body);
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let geometry = &sections[section_index_at(&sections, i)].geometry;
            measure_block(block, geometry.column_width(), options, metrics)
        })
        .collect()
}

pub fn measure_block(
    block: &Block,
    column_width: f32,
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> Measure {
    match block {
        Block::Paragraph(p) => {
            let width = column_width - p.attrs.indent_left() - p.attrs.indent_right();
            Measure::Paragraph(measure_paragraph(p, width, options, metrics))
        }
        Block::List(l) => Measure::List(measure_list(l, column_width, options, metrics)),
        Block::Table(t) => Measure::Table(measure_table(t, column_width, options, metrics)),
        Block::Image(img) => Measure::Image(AtomicMeasure {
            width: img.width.max(0.0),
            height: img.height.max(0.0),
        }),
        Block::Drawing(d) => Measure::Drawing(AtomicMeasure {
            width: d.geometry.width.max(0.0),
            height: d.geometry.height.max(0.0),
        }),
        Block::SectionBreak(_) => Measure::SectionBreak,
    }
}

fn resolve_line_h(ls: LineSpacing, natural: f32) -> f32 {
    match ls {
        LineSpacing::Auto(mult) => natural * mult,
        LineSpacing::Exact(pts) => pts,
        LineSpacing::AtLeast(min_pts) => natural.max(min_pts),
    }
}

fn first_style(para: &ParagraphBlock) -> TextStyle {
    para.runs.first().map(Run::style).unwrap_or_default()
}

/// The single line given to a paragraph that has no measured lines.
pub fn fallback_line(para: &ParagraphBlock, options: &LayoutOptions) -> LineMeasure {
    let ls = para.attrs.line_spacing().unwrap_or(options.line_spacing);
    LineMeasure {
        segments: Vec::new(),
        width: 0.0,
        line_height: resolve_line_h(ls, first_style(para).font_size * DEFAULT_LINE_RATIO),
    }
}

pub fn measure_paragraph(
    para: &ParagraphBlock,
    max_width: f32,
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> ParagraphMeasure {
    let ls = para.attrs.line_spacing().unwrap_or(options.line_spacing);
    let lines: Vec<LineMeasure> = if para.is_text_empty() {
        let style = first_style(para);
        let natural = style.font_size * metrics.line_height_ratio(&style);
        vec![LineMeasure {
            segments: Vec::new(),
            width: 0.0,
            line_height: resolve_line_h(ls, natural),
        }]
    } else {
        build_lines(para, max_width.max(1.0), metrics)
            .into_iter()
            .map(|l| LineMeasure {
                width: l.width,
                line_height: resolve_line_h(ls, l.natural_height),
                segments: l.segments,
            })
            .collect()
    };
    let total_height = para.attrs.space_before()
        + lines.iter().map(|l| l.line_height).sum::<f32>()
        + para.attrs.space_after();
    ParagraphMeasure {
        lines,
        total_height,
    }
}

struct RawLine {
    segments: Vec<LineSegment>,
    width: f32,
    natural_height: f32,
}

struct LineBuilder<'m> {
    metrics: &'m dyn TextMeasure,
    lines: Vec<RawLine>,
    segments: Vec<LineSegment>,
    x: f32,
    natural_height: f32,
}

impl LineBuilder<'_> {
    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first line may use the hanging indent.
    fn line_max(&self, max_width: f32, first_line_hanging: f32) -> f32 {
        if self.lines.is_empty() {
            max_width + first_line_hanging
        } else {
            max_width
        }
    }

    fn finish_line(&mut self) {
        let width = self.segments.last().map_or(0.0, |s| s.x + s.width);
        self.lines.push(RawLine {
            segments: std::mem::take(&mut self.segments),
            width,
            natural_height: self.natural_height,
        });
        self.x = 0.0;
        self.natural_height = 0.0;
    }

    /// Put `[from_char, to_char)` of run `run_index` at `x`, merging with the
    /// previous segment when it belongs to the same run.
    fn place(&mut self, run_index: usize, run: &Run, from_char: usize, to_char: usize, x: f32, width: f32) {
        let style = run.style();
        self.natural_height = self
            .natural_height
            .max(style.font_size * self.metrics.line_height_ratio(&style));
        match self.segments.last_mut() {
            Some(seg) if seg.run_index == run_index && !run.is_tab => {
                seg.to_char = to_char;
                seg.width = x + width - seg.x;
            }
            _ => self.segments.push(LineSegment {
                run_index,
                from_char,
                to_char,
                x,
                width,
            }),
        }
        self.x = x + width;
    }
}

/// Words of `text` with their char offsets.
fn words(text: &str) -> Vec<(usize, usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    for (i, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                out.push((start, i, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                start = i;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        let end = start + current.chars().count();
        out.push((start, end, current));
    }
    out
}

fn find_next_tab_stop(current_x: f32, tab_stops: &[TabStop], indent_left: f32) -> f32 {
    let abs_x = current_x + indent_left;
    if let Some(stop) = tab_stops.iter().find(|s| s.position > abs_x + 0.5) {
        return stop.position - indent_left;
    }
    ((abs_x / DEFAULT_TAB_INTERVAL).floor() + 1.0) * DEFAULT_TAB_INTERVAL - indent_left
}

/// Greedy line breaking. No space is inserted between runs unless the
/// preceding text ended with whitespace or the new run starts with it, so
/// "bold" + ", " stays "bold,".
fn build_lines(para: &ParagraphBlock, max_width: f32, metrics: &dyn TextMeasure) -> Vec<RawLine> {
    let first_line_hanging = para.attrs.first_line_hanging();
    let indent_left = para.attrs.indent_left();
    let mut b = LineBuilder {
        metrics,
        lines: Vec::new(),
        segments: Vec::new(),
        x: 0.0,
        natural_height: 0.0,
    };
    let mut prev_ended_with_ws = false;
    let mut prev_space_w = 0.0f32;

    for (run_index, run) in para.runs.iter().enumerate() {
        let style = run.style();

        if run.is_tab {
            let mut tab_x = find_next_tab_stop(b.x, &para.attrs.tab_stops, indent_left);
            if !b.is_empty() && tab_x > b.line_max(max_width, first_line_hanging) {
                b.finish_line();
                tab_x = find_next_tab_stop(0.0, &para.attrs.tab_stops, indent_left);
            }
            let x = b.x;
            b.place(run_index, run, 0, run.text.chars().count(), x, (tab_x - x).max(0.0));
            prev_ended_with_ws = false;
            continue;
        }

        let space_w = metrics.text_width(" ", &style);
        let letter_spacing = run.letter_spacing.unwrap_or(0.0);
        let starts_with_ws = run.text.starts_with(char::is_whitespace);

        for (i, (from, to, word)) in words(&run.text).into_iter().enumerate() {
            let ww = metrics.text_width(&word, &style) + letter_spacing * (to - from) as f32;
            let need_space = !b.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);
            // The space belongs to whichever run holds the whitespace.
            let effective_space_w = if i > 0 || starts_with_ws {
                space_w
            } else {
                prev_space_w
            };
            let proposed_x = if need_space {
                b.x + effective_space_w
            } else {
                b.x
            };

            let x = if !b.is_empty() && proposed_x + ww > b.line_max(max_width, first_line_hanging) {
                b.finish_line();
                0.0
            } else {
                proposed_x
            };
            b.place(run_index, run, from, to, x, ww);
        }

        if !run.text.is_empty() {
            prev_ended_with_ws = run.text.ends_with(char::is_whitespace);
            prev_space_w = space_w;
        }
    }

    if !b.is_empty() {
        b.finish_line();
    }
    if b.lines.is_empty() {
        let style = first_style(para);
        b.lines.push(RawLine {
            segments: Vec::new(),
            width: 0.0,
            natural_height: style.font_size * metrics.line_height_ratio(&style),
        });
    }
    b.lines
}

pub fn measure_list(
    list: &ListBlock,
    column_width: f32,
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> ListMeasure {
    let items: Vec<ListItemMeasure> = list
        .items
        .iter()
        .map(|item| {
            let attrs = &item.paragraph.attrs;
            let width = column_width
                - attrs.indent_left()
                - attrs.indent_right()
                - LIST_INDENT * (item.level as f32 + 1.0);
            ListItemMeasure {
                marker_width: metrics.text_width(&item.marker, &first_style(&item.paragraph)),
                paragraph: measure_paragraph(&item.paragraph, width, options, metrics),
            }
        })
        .collect();
    let total_height = items.iter().map(|i| i.paragraph.total_height).sum();
    ListMeasure {
        items,
        total_height,
    }
}

pub fn measure_table(
    table: &TableBlock,
    column_width: f32,
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> TableMeasure {
    let column_widths = resolve_column_widths(table, column_width, options.min_column_width);
    let cm = table.cell_margins();

    let rows: Vec<RowMeasure> = table
        .rows
        .iter()
        .map(|row| {
            let mut grid_col = 0usize;
            let mut max_h = cm.top + cm.bottom;
            let cells: Vec<CellMeasure> = row
                .cells
                .iter()
                .map(|cell| {
                    let width = span_width(&column_widths, grid_col, cell.span());
                    grid_col += cell.span();
                    if cell.v_merge == VMerge::Continue {
                        return CellMeasure {
                            width,
                            height: 0.0,
                            paragraphs: Vec::new(),
                        };
                    }
                    let text_w = (width - cm.left - cm.right).max(1.0);
                    let paragraphs: Vec<ParagraphMeasure> = cell
                        .paragraphs
                        .iter()
                        .map(|p| {
                            let w = text_w - p.attrs.indent_left() - p.attrs.indent_right();
                            measure_paragraph(p, w, options, metrics)
                        })
                        .collect();
                    // Cell height counts lines only; paragraph spacing inside
                    // cells is not applied.
                    let height = cm.top
                        + cm.bottom
                        + paragraphs
                            .iter()
                            .flat_map(|p| p.lines.iter())
                            .map(|l| l.line_height)
                            .sum::<f32>();
                    max_h = max_h.max(height);
                    CellMeasure {
                        width,
                        height,
                        paragraphs,
                    }
                })
                .collect();
            let height = match row.height {
                Some(h) if h.rule == HeightRule::Exact => h.value,
                Some(h) => max_h.max(h.value),
                None => max_h,
            };
            RowMeasure { height, cells }
        })
        .collect();

    TableMeasure {
        total_width: column_widths.iter().sum(),
        total_height: rows.iter().map(|r| r.height).sum(),
        rows,
        column_widths,
    }
}
