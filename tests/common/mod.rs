#![allow(dead_code)]

use docxide_reflow::fonts::ApproxMetrics;
use docxide_reflow::layout::page::{Fragment, FragmentKind, Layout, Page};
use docxide_reflow::model::{
    AnchorDescriptor, Block, DrawingBlock, DrawingGeometry, HAlign, ImageBlock, LineMeasure,
    LineSegment, ListBlock, ListItem, Measure, Orientation, PageSize, ParagraphAttrs,
    ParagraphBlock, ParagraphMeasure, Run, SectionBreakBlock, SectionType, TableBlock, TableCell,
    TableRow, VAlign, VRelativeFrom,
};
use docxide_reflow::{LayoutOptions, measure_blocks};

/// Height of every line in hand-built measures. A default Letter page has
/// 648pt of content height, i.e. exactly 54 such lines.
pub const LINE_H: f32 = 12.0;
pub const LINES_PER_PAGE: usize = 54;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn run(text: &str) -> Run {
    Run {
        text: text.to_string(),
        ..Run::default()
    }
}

/// A run whose characters occupy document positions `pm_start..`.
pub fn run_at(text: &str, pm_start: u32) -> Run {
    Run {
        text: text.to_string(),
        pm_start: Some(pm_start),
        pm_end: Some(pm_start + text.chars().count() as u32),
        ..Run::default()
    }
}

pub fn paragraph(id: &str, text: &str) -> ParagraphBlock {
    ParagraphBlock {
        id: id.to_string(),
        runs: vec![run(text)],
        ..ParagraphBlock::default()
    }
}

pub fn para(id: &str, text: &str) -> Block {
    Block::Paragraph(paragraph(id, text))
}

pub fn para_at(id: &str, text: &str, pm_start: u32) -> Block {
    Block::Paragraph(ParagraphBlock {
        id: id.to_string(),
        runs: vec![run_at(text, pm_start)],
        ..ParagraphBlock::default()
    })
}

pub fn para_with(id: &str, text: &str, attrs: ParagraphAttrs) -> Block {
    Block::Paragraph(ParagraphBlock {
        id: id.to_string(),
        runs: vec![run(text)],
        attrs,
        ..ParagraphBlock::default()
    })
}

pub fn section_break(id: &str, section_type: Option<SectionType>) -> SectionBreakBlock {
    SectionBreakBlock {
        id: id.to_string(),
        section_type,
        ..SectionBreakBlock::default()
    }
}

pub fn brk(id: &str, section_type: SectionType) -> Block {
    Block::SectionBreak(section_break(id, Some(section_type)))
}

pub fn landscape_brk(id: &str, section_type: SectionType) -> Block {
    Block::SectionBreak(SectionBreakBlock {
        orientation: Some(Orientation::Landscape),
        page_size: Some(PageSize::LETTER),
        ..section_break(id, Some(section_type))
    })
}

pub fn anchor(v_relative_from: Option<VRelativeFrom>) -> AnchorDescriptor {
    AnchorDescriptor {
        is_anchored: true,
        v_relative_from,
        ..AnchorDescriptor::default()
    }
}

pub fn aligned_anchor(v_relative_from: VRelativeFrom, h: HAlign, v: VAlign) -> AnchorDescriptor {
    AnchorDescriptor {
        align_h: Some(h),
        align_v: Some(v),
        ..anchor(Some(v_relative_from))
    }
}

pub fn image(id: &str, width: f32, height: f32, anchor: Option<AnchorDescriptor>) -> Block {
    Block::Image(ImageBlock {
        id: id.to_string(),
        src: format!("{id}.png"),
        width,
        height,
        anchor,
        ..ImageBlock::default()
    })
}

pub fn drawing(id: &str, width: f32, height: f32, anchor: Option<AnchorDescriptor>) -> Block {
    Block::Drawing(DrawingBlock {
        id: id.to_string(),
        geometry: DrawingGeometry {
            width,
            height,
            ..DrawingGeometry::default()
        },
        anchor,
        ..DrawingBlock::default()
    })
}

pub fn list(id: &str, items: &[&str]) -> Block {
    Block::List(ListBlock {
        id: id.to_string(),
        items: items
            .iter()
            .enumerate()
            .map(|(i, text)| ListItem {
                marker: format!("{}.", i + 1),
                level: 0,
                paragraph: paragraph(&format!("{id}-{i}"), text),
            })
            .collect(),
        ..ListBlock::default()
    })
}

pub fn cell(text: &str) -> TableCell {
    TableCell {
        paragraphs: vec![paragraph("cell", text)],
        ..TableCell::default()
    }
}

/// A cell holding one paragraph per entry of `texts`.
pub fn cell_lines(texts: &[&str]) -> TableCell {
    TableCell {
        paragraphs: texts.iter().map(|t| paragraph("cell", t)).collect(),
        ..TableCell::default()
    }
}

pub fn row(texts: &[&str]) -> TableRow {
    TableRow {
        cells: texts.iter().map(|t| cell(t)).collect(),
        ..TableRow::default()
    }
}

pub fn table(id: &str, rows: Vec<TableRow>) -> TableBlock {
    TableBlock {
        id: id.to_string(),
        rows,
        ..TableBlock::default()
    }
}

/// A measured line of `chars` characters of run 0, `LINE_H` tall.
pub fn line(chars: usize) -> LineMeasure {
    LineMeasure {
        segments: vec![LineSegment {
            run_index: 0,
            from_char: 0,
            to_char: chars,
            x: 0.0,
            width: chars as f32 * 6.0,
        }],
        width: chars as f32 * 6.0,
        line_height: LINE_H,
    }
}

/// A paragraph measure of `lines` lines, `LINE_H` each.
pub fn lines_measure(lines: usize) -> Measure {
    Measure::Paragraph(ParagraphMeasure {
        lines: (0..lines).map(|_| line(0)).collect(),
        total_height: lines as f32 * LINE_H,
    })
}

pub fn measure(blocks: &[Block], options: &LayoutOptions) -> Vec<Measure> {
    measure_blocks(blocks, options, &ApproxMetrics)
}

pub fn block_indices(page: &Page) -> Vec<usize> {
    page.fragments.iter().map(|f| f.block_index).collect()
}

pub fn fragment_ids(page: &Page) -> Vec<&str> {
    page.fragments.iter().map(|f| f.block_id.as_str()).collect()
}

pub fn text_lines(fragment: &Fragment) -> (usize, usize) {
    match &fragment.kind {
        FragmentKind::Paragraph(t) | FragmentKind::ListItem(t) => (t.from_line, t.to_line),
        other => panic!("not a text fragment: {other:?}"),
    }
}

/// Serialized form of a layout, for comparing two layouts structurally.
pub fn layout_json(layout: &Layout) -> serde_json::Value {
    serde_json::to_value(layout).expect("serialize layout")
}
