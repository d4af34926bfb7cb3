//! Dirty-region detection between two block sequences.
//!
//! Blocks are compared positionally in one linear pass. Two aligned blocks are
//! equivalent when their ids match and every layout-relevant attribute is equal
//! after normalization. The attribute lists below are the complete set of
//! layout determinants; anything not named here (structured-content metadata,
//! style ids, cached layout output, document positions) never marks a block
//! dirty.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::model::{
    Alignment, AnchorDescriptor, Block, BlockId, CellBorder, CellBorders, CellMargins, ColumnLayout,
    DrawingBlock, ImageBlock, Indent, LineSpacing, ListBlock, PageMargins, PageSize,
    ParagraphAttrs, ParagraphBlock, ParagraphBorder, ParagraphBorders, Run, SectionBreakBlock,
    Spacing, TabStop, TableAttrs, TableBlock, TableCell, TableRow,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirtyRegion {
    /// First index whose layout cannot be reused; `next.len()` when nothing changed.
    pub first_dirty_index: usize,
    /// Highest index proven unchanged, `None` when the very first block is dirty.
    pub last_stable_index: Option<usize>,
    pub inserted_block_ids: BTreeSet<BlockId>,
    pub deleted_block_ids: BTreeSet<BlockId>,
}

impl DirtyRegion {
    /// True when all `len` blocks of the next sequence can be reused as-is.
    pub fn is_fully_stable(&self, len: usize) -> bool {
        self.first_dirty_index >= len
            && self.inserted_block_ids.is_empty()
            && self.deleted_block_ids.is_empty()
    }
}

pub fn compute_dirty_regions(prev: &[Block], next: &[Block]) -> DirtyRegion {
    let first_dirty_index = prev
        .iter()
        .zip(next.iter())
        .position(|(a, b)| !blocks_equivalent(a, b))
        .unwrap_or_else(|| prev.len().min(next.len()));

    let fully_stable = first_dirty_index == next.len() && prev.len() == next.len();
    let (inserted_block_ids, deleted_block_ids) = if fully_stable {
        (BTreeSet::new(), BTreeSet::new())
    } else {
        id_changes(&prev[first_dirty_index..], &next[first_dirty_index..])
    };

    let region = DirtyRegion {
        first_dirty_index,
        last_stable_index: first_dirty_index.checked_sub(1),
        inserted_block_ids,
        deleted_block_ids,
    };
    if !fully_stable {
        log::debug!(
            "dirty from block {} (prev {} blocks, next {} blocks, +{} -{})",
            region.first_dirty_index,
            prev.len(),
            next.len(),
            region.inserted_block_ids.len(),
            region.deleted_block_ids.len(),
        );
    }
    region
}

/// Ids present on only one side of the diverging suffixes. The shared prefix is
/// identical on both sides, so the suffixes are the only place ids can differ.
fn id_changes(prev: &[Block], next: &[Block]) -> (BTreeSet<BlockId>, BTreeSet<BlockId>) {
    let prev_ids: HashSet<&str> = prev.iter().map(Block::id).collect();
    let next_ids: HashSet<&str> = next.iter().map(Block::id).collect();
    let inserted = next
        .iter()
        .map(Block::id)
        .filter(|id| !prev_ids.contains(id))
        .map(str::to_string)
        .collect();
    let deleted = prev
        .iter()
        .map(Block::id)
        .filter(|id| !next_ids.contains(id))
        .map(str::to_string)
        .collect();
    (inserted, deleted)
}

/// Layout equivalence of two blocks: same id and the same visual attributes.
pub fn blocks_equivalent(a: &Block, b: &Block) -> bool {
    if a.id() != b.id() {
        return false;
    }
    match (a, b) {
        (Block::Paragraph(a), Block::Paragraph(b)) => paragraph_eq(a, b),
        (Block::Table(a), Block::Table(b)) => table_eq(a, b),
        (Block::Image(a), Block::Image(b)) => image_eq(a, b),
        (Block::Drawing(a), Block::Drawing(b)) => drawing_eq(a, b),
        (Block::List(a), Block::List(b)) => list_eq(a, b),
        (Block::SectionBreak(a), Block::SectionBreak(b)) => section_break_eq(a, b),
        _ => false,
    }
}

// Numeric canonicalization: absence, NaN and zero all mean "no effect".
fn num(v: Option<f32>) -> f32 {
    match v {
        Some(x) if x.is_finite() => x,
        _ => 0.0,
    }
}

fn num_eq(a: Option<f32>, b: Option<f32>) -> bool {
    num(a) == num(b)
}

fn f32_eq(a: f32, b: f32) -> bool {
    num_eq(Some(a), Some(b))
}

fn slice_eq<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

fn paragraph_eq(a: &ParagraphBlock, b: &ParagraphBlock) -> bool {
    paragraph_attrs_eq(&a.attrs, &b.attrs) && slice_eq(&a.runs, &b.runs, run_eq)
}

fn paragraph_attrs_eq(a: &ParagraphAttrs, b: &ParagraphAttrs) -> bool {
    a.is_rtl() == b.is_rtl()
        && alignment(a) == alignment(b)
        && spacing_eq(a.spacing.as_ref(), b.spacing.as_ref())
        && indent_eq(a.indent.as_ref(), b.indent.as_ref())
        && paragraph_borders_eq(a.borders.as_ref(), b.borders.as_ref())
        && a.shading.as_ref().and_then(|s| s.fill) == b.shading.as_ref().and_then(|s| s.fill)
        && slice_eq(&a.tab_stops, &b.tab_stops, tab_stop_eq)
        && a.keep_next == b.keep_next
        && a.keep_lines == b.keep_lines
        && a.page_break_before == b.page_break_before
        && a.column_break_before == b.column_break_before
        && a.contextual_spacing == b.contextual_spacing
}

/// Unset alignment is start alignment, which is left for LTR text. For RTL text
/// an unset alignment is only equal to another unset alignment.
fn alignment(attrs: &ParagraphAttrs) -> Option<Alignment> {
    match attrs.alignment {
        None if !attrs.is_rtl() => Some(Alignment::Left),
        other => other,
    }
}

fn spacing_eq(a: Option<&Spacing>, b: Option<&Spacing>) -> bool {
    let unset = Spacing::default();
    let (a, b) = (a.unwrap_or(&unset), b.unwrap_or(&unset));
    num_eq(a.before, b.before) && num_eq(a.after, b.after) && line_spacing_eq(a.line, b.line)
}

fn line_spacing_eq(a: Option<LineSpacing>, b: Option<LineSpacing>) -> bool {
    // Single auto spacing is what an unset value resolves to.
    let canon = |ls: Option<LineSpacing>| match ls {
        None => LineSpacing::Auto(1.0),
        Some(LineSpacing::Auto(m)) if !m.is_finite() || m <= 0.0 => LineSpacing::Auto(1.0),
        Some(other) => other,
    };
    match (canon(a), canon(b)) {
        (LineSpacing::Auto(x), LineSpacing::Auto(y))
        | (LineSpacing::Exact(x), LineSpacing::Exact(y))
        | (LineSpacing::AtLeast(x), LineSpacing::AtLeast(y)) => f32_eq(x, y),
        _ => false,
    }
}

fn indent_eq(a: Option<&Indent>, b: Option<&Indent>) -> bool {
    let unset = Indent::default();
    let (a, b) = (a.unwrap_or(&unset), b.unwrap_or(&unset));
    num_eq(a.left, b.left)
        && num_eq(a.right, b.right)
        && num_eq(a.first_line, b.first_line)
        && num_eq(a.hanging, b.hanging)
}

// A zero-width border draws nothing.
fn visible_border(border: Option<&ParagraphBorder>) -> Option<&ParagraphBorder> {
    border.filter(|b| num(Some(b.width)) > 0.0)
}

fn paragraph_border_eq(a: Option<&ParagraphBorder>, b: Option<&ParagraphBorder>) -> bool {
    match (visible_border(a), visible_border(b)) {
        (None, None) => true,
        (Some(a), Some(b)) => f32_eq(a.width, b.width) && f32_eq(a.space, b.space) && a.color == b.color,
        _ => false,
    }
}

fn paragraph_borders_eq(a: Option<&ParagraphBorders>, b: Option<&ParagraphBorders>) -> bool {
    let unset = ParagraphBorders::default();
    let (a, b) = (a.unwrap_or(&unset), b.unwrap_or(&unset));
    paragraph_border_eq(a.top.as_ref(), b.top.as_ref())
        && paragraph_border_eq(a.bottom.as_ref(), b.bottom.as_ref())
        && paragraph_border_eq(a.left.as_ref(), b.left.as_ref())
        && paragraph_border_eq(a.right.as_ref(), b.right.as_ref())
        && paragraph_border_eq(a.between.as_ref(), b.between.as_ref())
}

fn tab_stop_eq(a: &TabStop, b: &TabStop) -> bool {
    f32_eq(a.position, b.position) && a.alignment == b.alignment && a.leader == b.leader
}

fn run_eq(a: &Run, b: &Run) -> bool {
    a.text == b.text
        && a.is_tab == b.is_tab
        && a.font_family == b.font_family
        && f32_eq(a.font_size, b.font_size)
        && a.bold == b.bold
        && a.italic == b.italic
        && a.underline == b.underline
        && a.strike == b.strike
        && a.color == b.color
        && a.highlight == b.highlight
        && num_eq(a.letter_spacing, b.letter_spacing)
}

// A descriptor that does not anchor behaves exactly like no descriptor.
fn active_anchor(anchor: Option<&AnchorDescriptor>) -> Option<&AnchorDescriptor> {
    anchor.filter(|a| a.is_anchored)
}

fn anchor_eq(a: Option<&AnchorDescriptor>, b: Option<&AnchorDescriptor>) -> bool {
    match (active_anchor(a), active_anchor(b)) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.h_relative_from == b.h_relative_from
                && a.v_relative_from == b.v_relative_from
                && a.align_h == b.align_h
                && a.align_v == b.align_v
                && f32_eq(a.offset_h, b.offset_h)
                && f32_eq(a.offset_v, b.offset_v)
                && a.behind_doc == b.behind_doc
                && a.wrap == b.wrap
        }
        _ => false,
    }
}

fn image_eq(a: &ImageBlock, b: &ImageBlock) -> bool {
    a.src == b.src
        && f32_eq(a.width, b.width)
        && f32_eq(a.height, b.height)
        && a.z_index.unwrap_or(0) == b.z_index.unwrap_or(0)
        && anchor_eq(a.anchor.as_ref(), b.anchor.as_ref())
}

fn drawing_eq(a: &DrawingBlock, b: &DrawingBlock) -> bool {
    let (ga, gb) = (&a.geometry, &b.geometry);
    a.drawing_kind == b.drawing_kind
        && f32_eq(ga.width, gb.width)
        && f32_eq(ga.height, gb.height)
        && f32_eq(ga.rotation, gb.rotation)
        && ga.flip_h == gb.flip_h
        && ga.flip_v == gb.flip_v
        && a.style.fill == b.style.fill
        && a.style.stroke == b.style.stroke
        && num_eq(a.style.stroke_width, b.style.stroke_width)
        && a.z_index.unwrap_or(0) == b.z_index.unwrap_or(0)
        && anchor_eq(a.anchor.as_ref(), b.anchor.as_ref())
}

fn list_eq(a: &ListBlock, b: &ListBlock) -> bool {
    slice_eq(&a.items, &b.items, |x, y| {
        x.marker == y.marker && x.level == y.level && paragraph_eq(&x.paragraph, &y.paragraph)
    })
}

fn cell_border_eq(a: &CellBorder, b: &CellBorder) -> bool {
    match (a.present, b.present) {
        (false, false) => true,
        (true, true) => a.color == b.color && f32_eq(a.width, b.width),
        _ => false,
    }
}

fn cell_borders_eq(a: &CellBorders, b: &CellBorders) -> bool {
    cell_border_eq(&a.top, &b.top)
        && cell_border_eq(&a.bottom, &b.bottom)
        && cell_border_eq(&a.left, &b.left)
        && cell_border_eq(&a.right, &b.right)
}

fn cell_eq(a: &TableCell, b: &TableCell) -> bool {
    a.span() == b.span()
        && a.v_merge == b.v_merge
        && a.v_align == b.v_align
        && a.shading == b.shading
        && cell_borders_eq(&a.borders, &b.borders)
        && num_eq(a.width, b.width)
        && slice_eq(&a.paragraphs, &b.paragraphs, paragraph_eq)
}

fn row_eq(a: &TableRow, b: &TableRow) -> bool {
    let height = |r: &TableRow| r.height.map(|h| (num(Some(h.value)), h.rule));
    height(a) == height(b)
        && a.cant_split == b.cant_split
        && a.repeat_header == b.repeat_header
        && slice_eq(&a.cells, &b.cells, cell_eq)
}

fn cell_margins_eq(a: &CellMargins, b: &CellMargins) -> bool {
    f32_eq(a.top, b.top) && f32_eq(a.left, b.left) && f32_eq(a.bottom, b.bottom) && f32_eq(a.right, b.right)
}

fn table_attrs_eq(a: &TableAttrs, b: &TableAttrs) -> bool {
    a.row_break == b.row_break
        && f32_eq(a.indent, b.indent)
        && cell_margins_eq(&a.cell_margins.unwrap_or_default(), &b.cell_margins.unwrap_or_default())
}

fn table_eq(a: &TableBlock, b: &TableBlock) -> bool {
    slice_eq(&a.column_widths, &b.column_widths, |x, y| f32_eq(*x, *y))
        && table_attrs_eq(&a.attrs, &b.attrs)
        && slice_eq(&a.rows, &b.rows, row_eq)
}

fn page_size_eq(a: Option<PageSize>, b: Option<PageSize>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => f32_eq(a.w, b.w) && f32_eq(a.h, b.h),
        _ => false,
    }
}

fn margins_eq(a: Option<PageMargins>, b: Option<PageMargins>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            f32_eq(a.top, b.top) && f32_eq(a.right, b.right) && f32_eq(a.bottom, b.bottom) && f32_eq(a.left, b.left)
        }
        _ => false,
    }
}

fn columns_eq(a: Option<ColumnLayout>, b: Option<ColumnLayout>) -> bool {
    // One column is the unset layout; its gap is irrelevant.
    let canon = |c: Option<ColumnLayout>| match c {
        Some(c) if c.count > 1 => Some((c.count, num(Some(c.gap)))),
        _ => None,
    };
    canon(a) == canon(b)
}

fn section_break_eq(a: &SectionBreakBlock, b: &SectionBreakBlock) -> bool {
    a.section_type == b.section_type
        && a.orientation == b.orientation
        && page_size_eq(a.page_size, b.page_size)
        && margins_eq(a.margins, b.margins)
        && columns_eq(a.columns, b.columns)
}
