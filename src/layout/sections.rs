use serde::{Deserialize, Serialize};

use crate::model::{
    Block, ColumnLayout, Orientation, PageMargins, PageSize, SectionBreakBlock, SectionType,
};

/// Geometry differences below this many points are treated as equal.
const GEOMETRY_EPSILON: f32 = 0.5;

/// Document-level section properties, used for content before the first
/// section break and for anything a break leaves unset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionDefaults {
    #[serde(rename = "type")]
    pub section_type: Option<SectionType>,
    pub orientation: Option<Orientation>,
    pub page_size: PageSize,
    pub margins: PageMargins,
    pub columns: ColumnLayout,
}

impl Default for SectionDefaults {
    fn default() -> Self {
        Self {
            section_type: None,
            orientation: None,
            page_size: PageSize::LETTER,
            margins: PageMargins::default(),
            columns: ColumnLayout::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionGeometry {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub orientation: Orientation,
    pub page_size: PageSize,
    pub margins: PageMargins,
    pub columns: ColumnLayout,
}

impl SectionGeometry {
    pub fn content_width(&self) -> f32 {
        (self.page_size.w - self.margins.left - self.margins.right).max(1.0)
    }

    pub fn content_top(&self) -> f32 {
        self.margins.top
    }

    pub fn content_bottom(&self) -> f32 {
        (self.page_size.h - self.margins.bottom).max(self.margins.top + 1.0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.count.max(1) as usize
    }

    pub fn column_width(&self) -> f32 {
        let n = self.column_count() as f32;
        let gaps = self.columns.gap.max(0.0) * (n - 1.0);
        ((self.content_width() - gaps) / n).max(1.0)
    }

    pub fn column_x(&self, column: usize) -> f32 {
        let column = column.min(self.column_count() - 1) as f32;
        self.margins.left + column * (self.column_width() + self.columns.gap.max(0.0))
    }

    /// True when the sheet itself (orientation or size) differs.
    pub fn page_geometry_differs(&self, other: &SectionGeometry) -> bool {
        self.orientation != other.orientation
            || (self.page_size.w - other.page_size.w).abs() > GEOMETRY_EPSILON
            || (self.page_size.h - other.page_size.h).abs() > GEOMETRY_EPSILON
    }
}

/// A section as the assembler sees it: the geometry in force from
/// `start_block` onwards (`None` for the leading body section).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSection {
    pub index: usize,
    pub start_block: Option<usize>,
    pub geometry: SectionGeometry,
}

/// Orientation and sheet size resolved together. A size without an
/// orientation implies one; an orientation without a size turns the default
/// sheet; neither falls back to the defaults.
fn resolve_sheet(
    orientation: Option<Orientation>,
    page_size: Option<PageSize>,
    defaults: &SectionDefaults,
) -> (Orientation, PageSize) {
    let valid = |s: &PageSize| s.w.is_finite() && s.h.is_finite() && s.w > 0.0 && s.h > 0.0;
    let default_size = if valid(&defaults.page_size) {
        defaults.page_size
    } else {
        PageSize::LETTER
    };
    match (orientation, page_size.filter(valid)) {
        (Some(o), Some(size)) => (o, size.oriented(o)),
        (None, Some(size)) => (size.orientation(), size),
        (Some(o), None) => (o, default_size.oriented(o)),
        (None, None) => {
            let o = defaults.orientation.unwrap_or(default_size.orientation());
            (o, default_size.oriented(o))
        }
    }
}

/// Geometry of the document body section. Its type is kept verbatim.
pub fn body_geometry(defaults: &SectionDefaults) -> SectionGeometry {
    let (orientation, page_size) = resolve_sheet(defaults.orientation, None, defaults);
    SectionGeometry {
        section_type: defaults.section_type.unwrap_or(SectionType::NextPage),
        orientation,
        page_size,
        margins: defaults.margins,
        columns: defaults.columns,
    }
}

/// Geometry introduced by one section break. Only the first break keeps a
/// missing type as a page-starting section; later breaks default to continuous.
pub fn resolve_section_break(
    brk: &SectionBreakBlock,
    defaults: &SectionDefaults,
    is_first: bool,
) -> SectionGeometry {
    let (orientation, page_size) = resolve_sheet(brk.orientation, brk.page_size, defaults);
    let section_type = match brk.section_type {
        Some(t) => t,
        None if is_first => defaults.section_type.unwrap_or(SectionType::NextPage),
        None => SectionType::Continuous,
    };
    SectionGeometry {
        section_type,
        orientation,
        page_size,
        margins: brk.margins.unwrap_or(defaults.margins),
        columns: brk.columns.unwrap_or(defaults.columns),
    }
}

/// All sections of a block sequence in document order. The first entry is
/// always the body section that governs content before any break.
pub fn resolve_sections(blocks: &[Block], defaults: &SectionDefaults) -> Vec<ResolvedSection> {
    let mut sections = vec![ResolvedSection {
        index: 0,
        start_block: None,
        geometry: body_geometry(defaults),
    }];
    for (i, block) in blocks.iter().enumerate() {
        if let Block::SectionBreak(brk) = block {
            let is_first = sections.len() == 1;
            sections.push(ResolvedSection {
                index: sections.len(),
                start_block: Some(i),
                geometry: resolve_section_break(brk, defaults, is_first),
            });
        }
    }
    sections
}

/// Index of the section governing `block_index`.
pub fn section_index_at(sections: &[ResolvedSection], block_index: usize) -> usize {
    sections
        .iter()
        .rposition(|s| s.start_block.is_none_or(|start| start <= block_index))
        .unwrap_or(0)
}

/// Whether the boundary into `next` must start a new page. Page-starting
/// types always do; a continuous section still does when the sheet changes.
pub fn forces_page_break(prev: &SectionGeometry, next: &SectionGeometry) -> bool {
    matches!(
        next.section_type,
        SectionType::NextPage | SectionType::EvenPage | SectionType::OddPage
    ) || prev.page_geometry_differs(next)
}

/// Blank pages to insert so that a section starting on `next_page_number`
/// (1-based) lands on the parity its type requires.
pub fn parity_blank_pages(section_type: SectionType, next_page_number: usize) -> usize {
    let is_even = next_page_number % 2 == 0;
    match section_type {
        SectionType::EvenPage if !is_even => 1,
        SectionType::OddPage if is_even => 1,
        _ => 0,
    }
}
