pub mod anchors;
pub mod incremental;
mod lines;
pub mod page;
pub mod sections;
pub mod table;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::measure::{LIST_INDENT, fallback_line};
use crate::model::{
    AnchorDescriptor, Block, DrawingBlock, HAlign, HRelativeFrom, ImageBlock, LineMeasure,
    LineSpacing, ListBlock, ListMeasure, Measure, ParagraphBlock, ParagraphMeasure, RowBreak,
    TableBlock, TableMeasure, VAlign,
};

use anchors::{Anchor, AnchorFrame, collect_anchored_drawings, collect_pre_registered_anchors};
use lines::place_line;
use page::{
    Fragment, FragmentKind, Layout, Marker, Page, PositionedContent, PositionedFragment,
    TextFragment,
};
use sections::{
    ResolvedSection, SectionDefaults, SectionGeometry, forces_page_break, parity_blank_pages,
    resolve_sections, section_index_at,
};
use table::{TableCursor, next_slice, place_slice, resolve_column_widths};

/// Positions closer than this are treated as the same.
const EPSILON: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Document-level section properties.
    pub body: SectionDefaults,
    /// Row-break policy for tables that do not set their own.
    pub row_break: RowBreak,
    /// Narrowest column a table without explicit widths may get.
    pub min_column_width: f32,
    /// Line spacing for paragraphs that do not set their own.
    pub line_spacing: LineSpacing,
    /// Vertical gap between pages in the painted element tree.
    pub page_gap: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            body: SectionDefaults::default(),
            row_break: RowBreak::Allow,
            min_column_width: 20.0,
            line_spacing: LineSpacing::Auto(1.0),
            page_gap: 24.0,
        }
    }
}

/// Lay out `blocks` into pages. `measures[i]` must describe `blocks[i]`;
/// pairs whose kinds disagree are skipped.
pub fn layout_document(blocks: &[Block], measures: &[Measure], options: &LayoutOptions) -> Layout {
    if blocks.len() != measures.len() {
        log::warn!(
            "layout: {} blocks but {} measures; unmatched blocks are skipped",
            blocks.len(),
            measures.len()
        );
    }
    Paginator::new(blocks, measures, options, Vec::new(), 0).run(0)
}

/// Continue a layout from `start_block` on a fresh page following `reused`.
pub(crate) fn layout_from(
    blocks: &[Block],
    measures: &[Measure],
    options: &LayoutOptions,
    reused: Vec<Page>,
    start_block: usize,
) -> Layout {
    Paginator::new(blocks, measures, options, reused, start_block).run(start_block)
}

/// Where a paragraph's first fragment landed, for placing the anchors it owns.
#[derive(Clone, Copy)]
struct FirstFragment {
    page: usize,
    y: f32,
    column_x: f32,
    column_width: f32,
}

/// One paragraph-like unit being flowed: a paragraph or a list item.
struct TextFlow<'b> {
    block_index: usize,
    block_id: &'b str,
    para: &'b ParagraphBlock,
    lines: &'b [LineMeasure],
    indent: f32,
    item: Option<(usize, &'b str, f32)>,
    space_before: f32,
    keep_with_next: f32,
}

struct Paginator<'a> {
    blocks: &'a [Block],
    measures: &'a [Measure],
    options: &'a LayoutOptions,
    sections: Vec<ResolvedSection>,
    section: usize,
    page_anchors: BTreeMap<usize, Anchor<'a>>,
    paragraph_anchors: BTreeMap<usize, Vec<Anchor<'a>>>,
    pages: Vec<Page>,
    page: Page,
    column: usize,
    region_top: f32,
    /// Lowest point reached by content on the current page.
    page_bottom: f32,
    y: f32,
    prev_space_after: f32,
}

impl<'a> Paginator<'a> {
    fn new(
        blocks: &'a [Block],
        measures: &'a [Measure],
        options: &'a LayoutOptions,
        pages: Vec<Page>,
        start_block: usize,
    ) -> Self {
        let sections = resolve_sections(blocks, &options.body);
        let section = section_index_at(&sections, start_block);
        let page_anchors = collect_pre_registered_anchors(blocks, measures)
            .into_iter()
            .map(|a| (a.block_index, a))
            .collect();
        let paragraph_anchors = collect_anchored_drawings(blocks, measures);
        let page = new_page(pages.len() + 1, section, &sections[section].geometry);
        let top = sections[section].geometry.content_top();
        Self {
            blocks,
            measures,
            options,
            sections,
            section,
            page_anchors,
            paragraph_anchors,
            pages,
            page,
            column: 0,
            region_top: top,
            page_bottom: top,
            y: top,
            prev_space_after: 0.0,
        }
    }

    fn run(mut self, start_block: usize) -> Layout {
        let blocks = self.blocks;
        for (i, block) in blocks.iter().enumerate().skip(start_block) {
            if let Block::SectionBreak(_) = block {
                self.enter_section(i);
                continue;
            }
            if block.is_anchored() {
                self.place_page_anchor(i);
                continue;
            }
            let measures = self.measures;
            match (block, measures.get(i)) {
                (Block::Paragraph(p), Some(Measure::Paragraph(m))) => self.place_paragraph(i, p, m),
                (Block::List(l), Some(Measure::List(m))) => self.place_list(i, l, m),
                (Block::Table(t), Some(Measure::Table(m))) => self.place_table(i, t, m),
                (Block::Image(img), Some(Measure::Image(m))) => self.place_atomic(
                    i,
                    &img.id,
                    m.width,
                    m.height,
                    FragmentKind::Image {
                        src: img.src.clone(),
                    },
                ),
                (Block::Drawing(d), Some(Measure::Drawing(m))) => self.place_atomic(
                    i,
                    &d.id,
                    m.width,
                    m.height,
                    FragmentKind::Drawing {
                        drawing_kind: d.drawing_kind,
                    },
                ),
                (b, Some(m)) => log::warn!(
                    "block {} is a {} but its measure is a {}; skipped",
                    b.id(),
                    b.kind().as_str(),
                    m.kind().as_str()
                ),
                (b, None) => log::warn!("block {} has no measure; skipped", b.id()),
            }
        }

        // A trailing empty page left by a final break is not emitted.
        if !self.page.is_empty() || self.pages.is_empty() {
            self.pages.push(self.page);
        }
        Layout { pages: self.pages }
    }

    fn geometry(&self) -> &SectionGeometry {
        &self.sections[self.section].geometry
    }

    fn column_x(&self) -> f32 {
        self.geometry().column_x(self.column)
    }

    fn column_width(&self) -> f32 {
        self.geometry().column_width()
    }

    fn bottom(&self) -> f32 {
        self.geometry().content_bottom()
    }

    fn available(&self) -> f32 {
        self.bottom() - self.y
    }

    fn at_region_top(&self) -> bool {
        (self.y - self.region_top).abs() < EPSILON
    }

    /// Nothing has flowed onto the page yet. A region opened mid-page by a
    /// continuous section does not count.
    fn at_page_top(&self) -> bool {
        self.column == 0 && (self.y - self.geometry().content_top()).abs() < EPSILON
    }

    /// Height of the next region if the current one is abandoned.
    fn fresh_height(&self) -> f32 {
        let g = self.geometry();
        if self.column + 1 < g.column_count() {
            g.content_bottom() - self.region_top
        } else {
            g.content_bottom() - g.content_top()
        }
    }

    fn start_page(&mut self) {
        let number = self.pages.len() + 2;
        let fresh = new_page(number, self.section, self.geometry());
        let done = std::mem::replace(&mut self.page, fresh);
        log::debug!(
            "page {} done ({} fragments), starting page {}",
            done.number,
            done.fragments.len(),
            number
        );
        self.pages.push(done);
        self.reset_region();
    }

    fn reset_region(&mut self) {
        let top = self.geometry().content_top();
        self.column = 0;
        self.region_top = top;
        self.page_bottom = top;
        self.y = top;
        self.prev_space_after = 0.0;
    }

    fn advance_region(&mut self) {
        if self.column + 1 < self.geometry().column_count() {
            self.column += 1;
            self.y = self.region_top;
            self.prev_space_after = 0.0;
            log::debug!("column break to column {} on page {}", self.column, self.page.number);
        } else {
            self.start_page();
        }
    }

    fn push_fragment(&mut self, fragment: Fragment) {
        self.page_bottom = self.page_bottom.max(fragment.bottom());
        self.page.fragments.push(fragment);
    }

    fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        if index == self.pages.len() {
            Some(&mut self.page)
        } else {
            self.pages.get_mut(index)
        }
    }

    fn enter_section(&mut self, block_index: usize) {
        let Some(next) = self
            .sections
            .iter()
            .position(|s| s.start_block == Some(block_index))
        else {
            return;
        };
        let prev = *self.geometry();
        self.section = next;
        let geometry = *self.geometry();

        if self.page.is_empty() {
            self.page = new_page(self.page.number, next, &geometry);
            self.reset_region();
            if parity_blank_pages(geometry.section_type, self.page.number) > 0 {
                self.page.blank = true;
                self.start_page();
            }
            log::debug!("section {next} starts on page {}", self.page.number);
        } else if forces_page_break(&prev, &geometry) {
            let blanks = parity_blank_pages(geometry.section_type, self.page.number + 1);
            self.start_page();
            for _ in 0..blanks {
                self.page.blank = true;
                self.start_page();
            }
            log::debug!(
                "section {next} ({:?}) starts on page {} after {blanks} blank page(s)",
                geometry.section_type,
                self.page.number
            );
        } else if prev.columns != geometry.columns {
            self.region_top = self.page_bottom.max(self.y);
            self.y = self.region_top;
            self.column = 0;
            self.prev_space_after = 0.0;
            log::debug!(
                "continuous section {next} opens a {}-column region at y={:.1}",
                geometry.column_count(),
                self.region_top
            );
        }
    }

    fn adjacent_paragraph(&self, index: Option<usize>) -> Option<&'a ParagraphBlock> {
        match self.blocks.get(index?)? {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Height the first line of the block after `index` needs, for keep-with-next.
    fn next_block_lead(&self, index: usize) -> f32 {
        let next = index + 1;
        match (self.blocks.get(next), self.measures.get(next)) {
            (Some(Block::Paragraph(p)), Some(Measure::Paragraph(m))) => {
                p.attrs.space_before() + m.lines.first().map_or(0.0, |l| l.line_height)
            }
            (Some(Block::List(_)), Some(Measure::List(m))) => m
                .items
                .first()
                .and_then(|i| i.paragraph.lines.first())
                .map_or(0.0, |l| l.line_height),
            (Some(Block::Table(_)), Some(Measure::Table(m))) => {
                m.rows.first().map_or(0.0, |r| r.height)
            }
            (Some(b), Some(Measure::Image(m) | Measure::Drawing(m))) if !b.is_anchored() => {
                m.height
            }
            _ => 0.0,
        }
    }

    fn place_paragraph(&mut self, index: usize, para: &'a ParagraphBlock, measure: &'a ParagraphMeasure) {
        let attrs = &para.attrs;
        if attrs.page_break_before && !self.at_page_top() {
            self.start_page();
        }
        if attrs.column_break_before && !self.at_region_top() {
            self.advance_region();
        }

        let prev = self.adjacent_paragraph(index.checked_sub(1));
        let next = self.adjacent_paragraph(Some(index + 1));
        let space_before = if attrs.contextual_spacing && prev.is_some_and(|p| p.attrs.contextual_spacing) {
            0.0
        } else {
            attrs.space_before()
        };
        let space_after = if attrs.contextual_spacing && next.is_some_and(|p| p.attrs.contextual_spacing) {
            0.0
        } else {
            attrs.space_after()
        };

        let fallback;
        let lines: &[LineMeasure] = if measure.lines.is_empty() {
            fallback = [fallback_line(para, self.options)];
            &fallback
        } else {
            &measure.lines
        };
        let keep_with_next = if attrs.keep_next {
            self.next_block_lead(index)
        } else {
            0.0
        };

        let first = self.flow_text(TextFlow {
            block_index: index,
            block_id: &para.id,
            para,
            lines,
            indent: 0.0,
            item: None,
            space_before,
            keep_with_next,
        });
        self.prev_space_after = space_after;

        if let Some(first) = first {
            self.place_paragraph_anchors(index, first);
        }
    }

    fn place_list(&mut self, index: usize, list: &'a ListBlock, measure: &'a ListMeasure) {
        for (item_index, (item, item_measure)) in list.items.iter().zip(&measure.items).enumerate() {
            let fallback;
            let lines: &[LineMeasure] = if item_measure.paragraph.lines.is_empty() {
                fallback = [fallback_line(&item.paragraph, self.options)];
                &fallback
            } else {
                &item_measure.paragraph.lines
            };
            let attrs = &item.paragraph.attrs;
            let contextual = attrs.contextual_spacing && item_index > 0;
            self.flow_text(TextFlow {
                block_index: index,
                block_id: &list.id,
                para: &item.paragraph,
                lines,
                indent: LIST_INDENT * (item.level as f32 + 1.0),
                item: Some((item_index, &item.marker, item_measure.marker_width)),
                space_before: if contextual { 0.0 } else { attrs.space_before() },
                keep_with_next: 0.0,
            });
            self.prev_space_after = if attrs.contextual_spacing && item_index + 1 < list.items.len() {
                0.0
            } else {
                attrs.space_after()
            };
        }
    }

    /// Flow lines into as many regions as needed. Returns where the first
    /// fragment went.
    fn flow_text(&mut self, flow: TextFlow<'_>) -> Option<FirstFragment> {
        let attrs = &flow.para.attrs;
        let total = flow.lines.len();
        let lines_h: f32 = flow.lines.iter().map(|l| l.line_height).sum();
        let mut first = None;
        let mut from = 0usize;

        while from < total {
            let at_top = self.at_region_top();
            let gap = if from == 0 && !at_top {
                self.prev_space_after.max(flow.space_before)
            } else {
                0.0
            };
            let avail = self.available() - gap;
            let remaining = total - from;
            let mut fit = lines_fitting(&flow.lines[from..], avail);

            if from == 0 && !at_top {
                if fit < remaining {
                    if attrs.keep_lines && lines_h <= self.fresh_height() {
                        fit = 0;
                    } else {
                        // At least two lines on each side of a split.
                        if remaining - fit < 2 {
                            fit = remaining.saturating_sub(2);
                        }
                        if fit < 2.min(remaining) {
                            fit = 0;
                        }
                    }
                } else if flow.keep_with_next > 0.0
                    && lines_h + flow.keep_with_next > avail
                    && lines_h + flow.keep_with_next <= self.fresh_height()
                {
                    fit = 0;
                }
            }

            if fit == 0 {
                if at_top {
                    fit = 1;
                } else {
                    self.advance_region();
                    continue;
                }
            }

            let to = from + fit;
            let top = self.y + gap;
            let x = self.column_x() + attrs.indent_left() + flow.indent;
            let width = (self.column_width() - attrs.indent_left() - attrs.indent_right() - flow.indent).max(1.0);

            let mut line_y = top;
            let placed: Vec<_> = (from..to)
                .map(|i| {
                    let line = place_line(flow.para, &flow.lines[i], i, total, x, line_y, width);
                    line_y += flow.lines[i].line_height;
                    line
                })
                .collect();

            let marker = flow
                .item
                .filter(|_| from == 0)
                .map(|(_, text, w)| Marker {
                    text: text.to_string(),
                    x: x - LIST_INDENT,
                    width: w,
                });
            let text = TextFragment {
                from_line: from,
                to_line: to,
                continues_from_prev: from > 0,
                continues_on_next: to < total,
                item_index: flow.item.map(|(i, _, _)| i),
                marker,
                lines: placed,
            };
            if first.is_none() {
                first = Some(FirstFragment {
                    page: self.pages.len(),
                    y: top,
                    column_x: self.column_x(),
                    column_width: self.column_width(),
                });
            }
            self.push_fragment(Fragment {
                block_id: flow.block_id.to_string(),
                block_index: flow.block_index,
                x,
                y: top,
                width,
                height: line_y - top,
                kind: if flow.item.is_some() {
                    FragmentKind::ListItem(text)
                } else {
                    FragmentKind::Paragraph(text)
                },
            });
            self.y = line_y;
            from = to;
            if from < total {
                self.advance_region();
            }
        }
        first
    }

    fn place_table(&mut self, index: usize, table: &'a TableBlock, measure: &'a TableMeasure) {
        if !self.at_region_top() {
            self.y += self.prev_space_after;
        }
        self.prev_space_after = 0.0;

        let widths = if !measure.column_widths.is_empty()
            && measure.column_widths.len() == table.grid_columns()
        {
            measure.column_widths.clone()
        } else {
            resolve_column_widths(table, self.column_width(), self.options.min_column_width)
        };
        let total_width: f32 = widths.iter().sum();

        let mut cursor = TableCursor::default();
        while cursor.row < table.rows.len() {
            let at_top = self.at_region_top();
            match next_slice(table, measure, &cursor, self.available(), at_top, self.options.row_break) {
                Some((slice, next)) => {
                    // Cell text lines up with the paragraph margin.
                    let x = self.column_x() + table.attrs.indent - table.cell_margins().left;
                    let fragment = place_slice(table, measure, &slice, &widths, x, self.y);
                    log::debug!(
                        "table {} rows {}..{} on page {} at y={:.1} ({:.1}pt)",
                        table.id,
                        fragment.from_row,
                        fragment.to_row,
                        self.page.number,
                        self.y,
                        slice.height
                    );
                    self.push_fragment(Fragment {
                        block_id: table.id.clone(),
                        block_index: index,
                        x,
                        y: self.y,
                        width: total_width,
                        height: slice.height,
                        kind: FragmentKind::Table(fragment),
                    });
                    self.y += slice.height;
                    cursor = next;
                    if cursor.row < table.rows.len() {
                        self.advance_region();
                    }
                }
                None if at_top => {
                    log::warn!("table {} could not be placed from row {}", table.id, cursor.row);
                    break;
                }
                None => self.advance_region(),
            }
        }
    }

    fn place_atomic(&mut self, index: usize, id: &str, width: f32, height: f32, kind: FragmentKind) {
        let mut gap = if self.at_region_top() { 0.0 } else { self.prev_space_after };
        if !self.at_region_top() && gap + height > self.available() {
            self.advance_region();
            gap = 0.0;
        }
        let y = self.y + gap;
        self.push_fragment(Fragment {
            block_id: id.to_string(),
            block_index: index,
            x: self.column_x(),
            y,
            width,
            height,
            kind,
        });
        self.y = y + height;
        self.prev_space_after = 0.0;
    }

    fn place_page_anchor(&mut self, index: usize) {
        let Some(anchor) = self.page_anchors.get(&index).copied() else {
            return;
        };
        let column_x = self.column_x();
        let column_width = self.column_width();
        if let Some(positioned) = position_anchor(&anchor, &self.page, column_x, column_width, self.y) {
            log::debug!(
                "anchored block {} ({:?}) on page {}",
                positioned.block_id,
                anchor.frame,
                self.page.number
            );
            self.page.anchored.push(positioned);
        }
    }

    fn place_paragraph_anchors(&mut self, owner: usize, first: FirstFragment) {
        let Some(anchors) = self.paragraph_anchors.get(&owner).cloned() else {
            return;
        };
        let Some(page) = self.page_mut(first.page) else {
            return;
        };
        for anchor in &anchors {
            if let Some(positioned) =
                position_anchor(anchor, page, first.column_x, first.column_width, first.y)
            {
                page.anchored.push(positioned);
            }
        }
    }
}

fn new_page(number: usize, section_index: usize, geometry: &SectionGeometry) -> Page {
    Page {
        number,
        section_index,
        orientation: geometry.orientation,
        size: geometry.page_size,
        margins: geometry.margins,
        columns: geometry.columns,
        blank: false,
        fragments: Vec::new(),
        anchored: Vec::new(),
    }
}

/// Lines from the start of `lines` that fit in `avail` points.
fn lines_fitting(lines: &[LineMeasure], avail: f32) -> usize {
    let mut used = 0.0f32;
    lines
        .iter()
        .take_while(|l| {
            used += l.line_height;
            used <= avail + 0.01
        })
        .count()
}

fn align_in(start: f32, extent: f32, size: f32, align: f32) -> f32 {
    start + (extent - size) * align
}

/// Resolve an anchor against its frame on `page`. `para_top` is the top of
/// the owning paragraph (or the flow position for page frames).
fn position_anchor(
    anchor: &Anchor<'_>,
    page: &Page,
    column_x: f32,
    column_width: f32,
    para_top: f32,
) -> Option<PositionedFragment> {
    let descriptor: &AnchorDescriptor = anchor.descriptor()?;
    let (width, height) = match anchor.measure {
        Measure::Image(m) | Measure::Drawing(m) => (m.width, m.height),
        _ => return None,
    };
    let margins = page.margins;
    let content_w = page.size.w - margins.left - margins.right;
    let content_h = page.size.h - margins.top - margins.bottom;

    let (frame_x, frame_w) = match descriptor.h_relative_from {
        Some(HRelativeFrom::Page) => (0.0, page.size.w),
        Some(HRelativeFrom::Column | HRelativeFrom::Character) => (column_x, column_width),
        Some(HRelativeFrom::Margin) | None => (margins.left, content_w),
    };
    let x = match descriptor.align_h {
        Some(HAlign::Left) => frame_x,
        Some(HAlign::Center) => align_in(frame_x, frame_w, width, 0.5),
        Some(HAlign::Right) => align_in(frame_x, frame_w, width, 1.0),
        None => frame_x + descriptor.offset_h,
    };

    let (frame_y, frame_h) = match anchor.frame {
        AnchorFrame::Page => (0.0, page.size.h),
        AnchorFrame::Margin => (margins.top, content_h),
        AnchorFrame::Paragraph => (para_top, page.size.h - margins.bottom - para_top),
    };
    let y = match descriptor.align_v {
        Some(VAlign::Top) => frame_y,
        Some(VAlign::Center) => align_in(frame_y, frame_h, height, 0.5),
        Some(VAlign::Bottom) => align_in(frame_y, frame_h, height, 1.0),
        None => frame_y + descriptor.offset_v,
    };

    let (z_index, pm_start, pm_end, content) = match anchor.block {
        Block::Image(ImageBlock {
            z_index,
            pm_start,
            pm_end,
            src,
            ..
        }) => (
            *z_index,
            *pm_start,
            *pm_end,
            PositionedContent::Image { src: src.clone() },
        ),
        Block::Drawing(DrawingBlock {
            z_index,
            pm_start,
            pm_end,
            drawing_kind,
            ..
        }) => (
            *z_index,
            *pm_start,
            *pm_end,
            PositionedContent::Drawing {
                drawing_kind: *drawing_kind,
            },
        ),
        _ => return None,
    };

    Some(PositionedFragment {
        block_id: anchor.block.id().to_string(),
        block_index: anchor.block_index,
        x,
        y,
        width,
        height,
        z_index: z_index.unwrap_or(0),
        behind_doc: descriptor.behind_doc,
        frame: anchor.frame,
        owner_block_index: anchor.owner_paragraph_index,
        pm_start,
        pm_end,
        content,
    })
}
