//! Layout output. All coordinates are page points with the origin at the
//! top-left corner and y growing downwards.

use serde::Serialize;

use crate::model::{
    BlockId, ColumnLayout, DrawingKind, Orientation, PageMargins, PageSize, SdtMetadata, TextStyle,
};

use super::anchors::AnchorFrame;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the first page holding a fragment of `block_index`.
    pub fn page_of_block(&self, block_index: usize) -> Option<usize> {
        self.pages.iter().position(|p| {
            p.fragments.iter().any(|f| f.block_index == block_index)
                || p.anchored.iter().any(|a| a.block_index == block_index)
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based physical page number.
    pub number: usize,
    pub section_index: usize,
    pub orientation: Orientation,
    pub size: PageSize,
    pub margins: PageMargins,
    pub columns: ColumnLayout,
    /// Inserted only to satisfy an even/odd section start.
    pub blank: bool,
    pub fragments: Vec<Fragment>,
    pub anchored: Vec<PositionedFragment>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.anchored.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub block_id: BlockId,
    pub block_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: FragmentKind,
}

impl Fragment {
    /// True when this fragment resumes a block started on an earlier page or column.
    pub fn continues_from_prev(&self) -> bool {
        match &self.kind {
            FragmentKind::Paragraph(t) | FragmentKind::ListItem(t) => t.continues_from_prev,
            FragmentKind::Table(t) => t.continues_from_prev,
            FragmentKind::Image { .. } | FragmentKind::Drawing { .. } => false,
        }
    }

    pub fn continues_on_next(&self) -> bool {
        match &self.kind {
            FragmentKind::Paragraph(t) | FragmentKind::ListItem(t) => t.continues_on_next,
            FragmentKind::Table(t) => t.continues_on_next,
            FragmentKind::Image { .. } | FragmentKind::Drawing { .. } => false,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FragmentKind {
    Paragraph(TextFragment),
    ListItem(TextFragment),
    Table(TableFragment),
    Image { src: String },
    Drawing { drawing_kind: DrawingKind },
}

/// A contiguous slice of a paragraph's (or list item's) lines.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    pub from_line: usize,
    pub to_line: usize,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    /// List items only.
    pub item_index: Option<usize>,
    pub marker: Option<Marker>,
    pub lines: Vec<Line>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub text: String,
    pub x: f32,
    pub width: f32,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub x: f32,
    pub y: f32,
    /// Width available to the line, not the width of its text.
    pub width: f32,
    pub height: f32,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub spans: Vec<Span>,
}

impl Line {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub text: String,
    pub x: f32,
    pub width: f32,
    pub run_index: usize,
    pub style: TextStyle,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub sdt: Option<SdtMetadata>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFragment {
    pub from_row: usize,
    /// Exclusive.
    pub to_row: usize,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub column_widths: Vec<f32>,
    pub rows: Vec<PlacedRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedRow {
    pub row_index: usize,
    pub y: f32,
    pub height: f32,
    pub repeated_header: bool,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub cells: Vec<PlacedCell>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedCell {
    pub cell_index: usize,
    pub grid_column: usize,
    pub grid_span: usize,
    pub row_span: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<Line>,
}

/// An anchored image or drawing, positioned outside the text flow.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedFragment {
    pub block_id: BlockId,
    pub block_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub z_index: i32,
    pub behind_doc: bool,
    pub frame: AnchorFrame,
    pub owner_block_index: Option<usize>,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub content: PositionedContent,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PositionedContent {
    Image { src: String },
    Drawing { drawing_kind: DrawingKind },
}
