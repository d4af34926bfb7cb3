use crate::model::{Alignment, LineMeasure, ParagraphBlock};

use super::page::{Line, Span};

/// Alignment after applying paragraph direction. Right-to-left paragraphs
/// mirror left and right; an unset alignment means "start of line".
fn effective_alignment(para: &ParagraphBlock) -> Alignment {
    let alignment = para.attrs.alignment.unwrap_or_default();
    if !para.attrs.is_rtl() {
        return alignment;
    }
    match alignment {
        Alignment::Left => Alignment::Right,
        Alignment::Right => Alignment::Left,
        other => other,
    }
}

/// Place one measured line of `para` at (`x`, `y`) within a box `width`
/// wide. `line_index` is the line's index within the whole paragraph.
pub(crate) fn place_line(
    para: &ParagraphBlock,
    measure: &LineMeasure,
    line_index: usize,
    line_count: usize,
    x: f32,
    y: f32,
    width: f32,
) -> Line {
    let (x, width) = if line_index == 0 {
        let hanging = para.attrs.first_line_hanging();
        (x - hanging, (width + hanging).max(0.0))
    } else {
        (x, width)
    };

    let alignment = effective_alignment(para);
    let slack = (width - measure.width).max(0.0);
    let is_last = line_index + 1 >= line_count;
    let justified = alignment == Alignment::Justify && !is_last && measure.segments.len() > 1;
    let start_x = match alignment {
        Alignment::Center => x + slack / 2.0,
        Alignment::Right => x + slack,
        Alignment::Left | Alignment::Justify => x,
    };
    let extra_per_gap = if justified {
        slack / (measure.segments.len() - 1) as f32
    } else {
        0.0
    };

    let spans: Vec<Span> = measure
        .segments
        .iter()
        .enumerate()
        .filter_map(|(i, seg)| {
            let run = para.runs.get(seg.run_index)?;
            let text: String = run
                .text
                .chars()
                .skip(seg.from_char)
                .take(seg.to_char.saturating_sub(seg.from_char))
                .collect();
            Some(Span {
                text,
                x: start_x + seg.x + extra_per_gap * i as f32,
                width: seg.width,
                run_index: seg.run_index,
                style: run.style(),
                pm_start: run.position_at(seg.from_char),
                pm_end: run.position_at(seg.to_char),
                sdt: run.sdt.clone(),
            })
        })
        .collect();

    let (para_start, para_end) = para.pm_range();
    let pm_start = spans.iter().find_map(|s| s.pm_start).or(para_start);
    let pm_end = spans.iter().rev().find_map(|s| s.pm_end).or(pm_start).or(para_end);

    Line {
        x,
        y,
        width,
        height: measure.line_height,
        pm_start,
        pm_end,
        spans,
    }
}
