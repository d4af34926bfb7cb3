use serde::{Deserialize, Serialize};

/// Stable block identifier, unique within one conversion and order-significant.
pub type BlockId = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabAlignment {
    Left,
    Center,
    Right,
    Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStop {
    pub position: f32,
    pub alignment: TabAlignment,
    #[serde(default)]
    pub leader: Option<char>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "camelCase")]
pub enum LineSpacing {
    Auto(f32),    // multiplier (e.g. 1.0 = single, 1.15 = default)
    Exact(f32),   // fixed height in points
    AtLeast(f32), // minimum height in points
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spacing {
    pub before: Option<f32>,
    pub after: Option<f32>,
    pub line: Option<LineSpacing>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Indent {
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub first_line: Option<f32>,
    pub hanging: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphBorder {
    pub width: f32,     // line thickness in points
    #[serde(default)]
    pub space: f32,     // gap between text and border in points
    #[serde(default)]
    pub color: [u8; 3], // RGB
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphBorders {
    pub top: Option<ParagraphBorder>,
    pub bottom: Option<ParagraphBorder>,
    pub left: Option<ParagraphBorder>,
    pub right: Option<ParagraphBorder>,
    pub between: Option<ParagraphBorder>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shading {
    pub fill: Option<[u8; 3]>,
}

/// Paragraph-level attributes. Every field here takes part in layout equivalence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphAttrs {
    pub alignment: Option<Alignment>,
    pub spacing: Option<Spacing>,
    pub indent: Option<Indent>,
    pub borders: Option<ParagraphBorders>,
    pub shading: Option<Shading>,
    pub tab_stops: Vec<TabStop>,
    pub direction: Option<Direction>,
    pub keep_next: bool,
    pub keep_lines: bool,
    pub page_break_before: bool,
    pub column_break_before: bool,
    pub contextual_spacing: bool,
}

impl ParagraphAttrs {
    pub fn space_before(&self) -> f32 {
        self.spacing.as_ref().and_then(|s| s.before).unwrap_or(0.0)
    }

    pub fn space_after(&self) -> f32 {
        self.spacing.as_ref().and_then(|s| s.after).unwrap_or(0.0)
    }

    pub fn line_spacing(&self) -> Option<LineSpacing> {
        self.spacing.as_ref().and_then(|s| s.line)
    }

    pub fn indent_left(&self) -> f32 {
        self.indent.as_ref().and_then(|i| i.left).unwrap_or(0.0)
    }

    pub fn indent_right(&self) -> f32 {
        self.indent.as_ref().and_then(|i| i.right).unwrap_or(0.0)
    }

    /// Extra width granted to the first line: positive for hanging indents,
    /// negative for first-line indents.
    pub fn first_line_hanging(&self) -> f32 {
        let Some(indent) = self.indent.as_ref() else {
            return 0.0;
        };
        match (indent.hanging, indent.first_line) {
            (Some(h), _) if h > 0.0 => h,
            (_, Some(f)) => -f,
            _ => 0.0,
        }
    }

    pub fn is_rtl(&self) -> bool {
        self.direction == Some(Direction::Rtl)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SdtScope {
    #[default]
    Inline,
    Block,
}

/// Structured-content (content control) metadata. Never a layout determinant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SdtMetadata {
    pub id: String,
    pub tag: Option<String>,
    pub alias: Option<String>,
    pub scope: SdtScope,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Run {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: Option<[u8; 3]>, // None = automatic (black)
    pub highlight: Option<[u8; 3]>,
    pub letter_spacing: Option<f32>,
    pub is_tab: bool,
    // Document positions and structured-content membership: carried through
    // to rendered spans, ignored by layout equivalence.
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub sdt: Option<SdtMetadata>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Calibri".to_string(),
            font_size: 12.0,
            bold: false,
            italic: false,
            underline: false,
            strike: false,
            color: None,
            highlight: None,
            letter_spacing: None,
            is_tab: false,
            pm_start: None,
            pm_end: None,
            sdt: None,
        }
    }
}

impl Run {
    pub fn style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            bold: self.bold,
            italic: self.italic,
        }
    }

    /// Document position of the character at `char_offset` within this run.
    pub fn position_at(&self, char_offset: usize) -> Option<u32> {
        let start = self.pm_start?;
        let pos = start.saturating_add(u32::try_from(char_offset).unwrap_or(u32::MAX));
        Some(match self.pm_end {
            Some(end) => pos.min(end),
            None => pos,
        })
    }
}

/// Font selection used for measuring text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Run::default().style()
    }
}

/// Metadata that travels with a block but never affects layout equivalence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockMeta {
    pub sdt: Option<SdtMetadata>,
    pub style_id: Option<String>,
    /// Height reported by the previous layout pass, if any.
    pub cached_height: Option<f32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphBlock {
    pub id: BlockId,
    pub runs: Vec<Run>,
    pub attrs: ParagraphAttrs,
    pub meta: BlockMeta,
}

impl ParagraphBlock {
    pub fn pm_range(&self) -> (Option<u32>, Option<u32>) {
        let start = self.runs.iter().find_map(|r| r.pm_start);
        let end = self.runs.iter().rev().find_map(|r| r.pm_end);
        (start, end)
    }

    /// True when the paragraph has no visible text.
    pub fn is_text_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty() && !r.is_tab)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItem {
    pub marker: String,
    pub level: u8,
    pub paragraph: ParagraphBlock,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListBlock {
    pub id: BlockId,
    pub items: Vec<ListItem>,
    pub meta: BlockMeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HRelativeFrom {
    Page,
    Margin,
    Column,
    Character,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VRelativeFrom {
    Page,
    Margin,
    Paragraph,
    Line,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapKind {
    #[default]
    None,
    Square,
    TopAndBottom,
    Tight,
    Through,
}

/// Floating placement of an image or drawing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnchorDescriptor {
    pub is_anchored: bool,
    pub h_relative_from: Option<HRelativeFrom>,
    pub v_relative_from: Option<VRelativeFrom>,
    pub align_h: Option<HAlign>,
    pub align_v: Option<VAlign>,
    pub offset_h: f32,
    pub offset_v: f32,
    pub behind_doc: bool,
    pub wrap: WrapKind,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageBlock {
    pub id: BlockId,
    pub src: String,
    pub width: f32,  // points
    pub height: f32, // points
    pub anchor: Option<AnchorDescriptor>,
    pub z_index: Option<i32>,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub meta: BlockMeta,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawingKind {
    #[default]
    Shape,
    Group,
    TextBox,
    Chart,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawingGeometry {
    pub width: f32,
    pub height: f32,
    pub rotation: f32, // degrees
    pub flip_h: bool,
    pub flip_v: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeStyle {
    pub fill: Option<[u8; 3]>,
    pub stroke: Option<[u8; 3]>,
    pub stroke_width: Option<f32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawingBlock {
    pub id: BlockId,
    pub drawing_kind: DrawingKind,
    pub geometry: DrawingGeometry,
    pub anchor: Option<AnchorDescriptor>,
    pub z_index: Option<i32>,
    pub style: ShapeStyle,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    pub meta: BlockMeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowBreak {
    Avoid,
    Allow,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VMerge {
    #[default]
    None,
    Restart,
    Continue,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellVAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellBorder {
    pub present: bool,
    pub color: Option<[u8; 3]>,
    pub width: f32,
}

impl Default for CellBorder {
    fn default() -> Self {
        Self {
            present: false,
            color: None,
            width: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellBorders {
    pub top: CellBorder,
    pub bottom: CellBorder,
    pub left: CellBorder,
    pub right: CellBorder,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellMargins {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Default for CellMargins {
    fn default() -> Self {
        Self {
            top: 0.0,
            left: 5.4,
            bottom: 0.0,
            right: 5.4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeightRule {
    AtLeast,
    Exact,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowHeight {
    pub value: f32,
    pub rule: HeightRule,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableCell {
    pub paragraphs: Vec<ParagraphBlock>,
    pub grid_span: u16,
    pub v_merge: VMerge,
    pub v_align: CellVAlign,
    pub shading: Option<[u8; 3]>,
    pub borders: CellBorders,
    pub width: Option<f32>, // points
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            grid_span: 1,
            v_merge: VMerge::None,
            v_align: CellVAlign::Top,
            shading: None,
            borders: CellBorders::default(),
            width: None,
        }
    }
}

impl TableCell {
    pub fn span(&self) -> usize {
        self.grid_span.max(1) as usize
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub height: Option<RowHeight>,
    pub cant_split: bool,
    pub repeat_header: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableAttrs {
    /// Table-level row break override; falls back to the layout default.
    pub row_break: Option<RowBreak>,
    pub indent: f32,
    pub cell_margins: Option<CellMargins>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableBlock {
    pub id: BlockId,
    pub rows: Vec<TableRow>,
    /// Explicit grid column widths in points; empty when the source had none.
    pub column_widths: Vec<f32>,
    pub attrs: TableAttrs,
    pub meta: BlockMeta,
}

impl TableBlock {
    /// Number of grid columns: the widest row by summed spans, or the explicit grid.
    pub fn grid_columns(&self) -> usize {
        let widest = self
            .rows
            .iter()
            .map(|r| r.cells.iter().map(TableCell::span).sum::<usize>())
            .max()
            .unwrap_or(0);
        widest.max(self.column_widths.len())
    }

    pub fn cell_margins(&self) -> CellMargins {
        self.attrs.cell_margins.unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionType {
    NextPage,
    Continuous,
    EvenPage,
    OddPage,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub w: f32,
    pub h: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { w: 612.0, h: 792.0 };

    pub fn orientation(&self) -> Orientation {
        if self.w > self.h {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// The same sheet turned to `orientation`.
    pub fn oriented(&self, orientation: Orientation) -> PageSize {
        if self.orientation() == orientation {
            *self
        } else {
            PageSize {
                w: self.h,
                h: self.w,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top: 72.0,
            right: 72.0,
            bottom: 72.0,
            left: 72.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub count: u16,
    pub gap: f32, // points between columns
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            count: 1,
            gap: 36.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionBreakBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub section_type: Option<SectionType>,
    pub orientation: Option<Orientation>,
    pub page_size: Option<PageSize>,
    pub margins: Option<PageMargins>,
    pub columns: Option<ColumnLayout>,
    pub meta: BlockMeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Paragraph,
    Table,
    Image,
    Drawing,
    List,
    SectionBreak,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Table => "table",
            BlockKind::Image => "image",
            BlockKind::Drawing => "drawing",
            BlockKind::List => "list",
            BlockKind::SectionBreak => "sectionBreak",
        }
    }
}

/// One paginatable unit of document content. Immutable once produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    Paragraph(ParagraphBlock),
    Table(TableBlock),
    Image(ImageBlock),
    Drawing(DrawingBlock),
    List(ListBlock),
    SectionBreak(SectionBreakBlock),
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Block::Paragraph(b) => &b.id,
            Block::Table(b) => &b.id,
            Block::Image(b) => &b.id,
            Block::Drawing(b) => &b.id,
            Block::List(b) => &b.id,
            Block::SectionBreak(b) => &b.id,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Paragraph(_) => BlockKind::Paragraph,
            Block::Table(_) => BlockKind::Table,
            Block::Image(_) => BlockKind::Image,
            Block::Drawing(_) => BlockKind::Drawing,
            Block::List(_) => BlockKind::List,
            Block::SectionBreak(_) => BlockKind::SectionBreak,
        }
    }

    pub fn meta(&self) -> &BlockMeta {
        match self {
            Block::Paragraph(b) => &b.meta,
            Block::Table(b) => &b.meta,
            Block::Image(b) => &b.meta,
            Block::Drawing(b) => &b.meta,
            Block::List(b) => &b.meta,
            Block::SectionBreak(b) => &b.meta,
        }
    }

    pub fn anchor(&self) -> Option<&AnchorDescriptor> {
        match self {
            Block::Image(b) => b.anchor.as_ref(),
            Block::Drawing(b) => b.anchor.as_ref(),
            _ => None,
        }
    }

    /// Only an explicit `isAnchored: true` makes a block float.
    pub fn is_anchored(&self) -> bool {
        self.anchor().is_some_and(|a| a.is_anchored)
    }
}

/// Hands out block ids for one conversion. Owned by the caller so numbering
/// can be reset between conversions or tests.
#[derive(Clone, Debug, Default)]
pub struct BlockIdAllocator {
    next: u64,
}

impl BlockIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, kind: BlockKind) -> BlockId {
        let id = format!("{}-{}", self.next, kind.as_str());
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// A run-relative slice of text placed on a measured line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSegment {
    pub run_index: usize,
    pub from_char: usize,
    pub to_char: usize,
    pub x: f32, // relative to line start
    pub width: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineMeasure {
    pub segments: Vec<LineSegment>,
    pub width: f32,
    pub line_height: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParagraphMeasure {
    pub lines: Vec<LineMeasure>,
    pub total_height: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItemMeasure {
    pub marker_width: f32,
    pub paragraph: ParagraphMeasure,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListMeasure {
    pub items: Vec<ListItemMeasure>,
    pub total_height: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CellMeasure {
    pub width: f32,
    pub height: f32,
    pub paragraphs: Vec<ParagraphMeasure>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RowMeasure {
    pub height: f32,
    pub cells: Vec<CellMeasure>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableMeasure {
    pub rows: Vec<RowMeasure>,
    pub column_widths: Vec<f32>,
    pub total_width: f32,
    pub total_height: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomicMeasure {
    pub width: f32,
    pub height: f32,
}

/// Measured geometry of the block at the same index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Measure {
    Paragraph(ParagraphMeasure),
    Table(TableMeasure),
    Image(AtomicMeasure),
    Drawing(AtomicMeasure),
    List(ListMeasure),
    SectionBreak,
}

impl Measure {
    pub fn kind(&self) -> BlockKind {
        match self {
            Measure::Paragraph(_) => BlockKind::Paragraph,
            Measure::Table(_) => BlockKind::Table,
            Measure::Image(_) => BlockKind::Image,
            Measure::Drawing(_) => BlockKind::Drawing,
            Measure::List(_) => BlockKind::List,
            Measure::SectionBreak => BlockKind::SectionBreak,
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            Measure::Paragraph(m) => m.total_height,
            Measure::Table(m) => m.total_height,
            Measure::Image(m) | Measure::Drawing(m) => m.height,
            Measure::List(m) => m.total_height,
            Measure::SectionBreak => 0.0,
        }
    }
}
