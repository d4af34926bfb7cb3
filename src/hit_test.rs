//! Map a point on the rendered element tree back to a document position.

use crate::dom::{Element, ElementRole};
use crate::fonts::{ApproxMetrics, TextMeasure};

/// Document position under (`x`, `y`), interpolating within text with the
/// built-in approximate metrics.
pub fn click_to_position(container: &Element, x: f32, y: f32) -> Option<u32> {
    click_to_position_with(container, x, y, &ApproxMetrics)
}

/// Like [`click_to_position`], measuring text with `metrics`. Returns `None`
/// only when no page, fragment, or line can be found.
pub fn click_to_position_with(
    container: &Element,
    x: f32,
    y: f32,
    metrics: &dyn TextMeasure,
) -> Option<u32> {
    let pages = container.find_all(ElementRole::Page);
    let page = pages.iter().find(|p| p.rect.contains(x, y))?;

    let fragments = page.find_all(ElementRole::Fragment);
    let fragment = fragments
        .iter()
        .find(|f| f.rect.contains(x, y))
        .or_else(|| nearest(&fragments, |f| f.rect.distance(x, y)))?;

    let lines = fragment.find_all(ElementRole::Line);
    let line = pick_line(&lines, x, y)?;
    position_in_line(line, x, metrics)
}

fn nearest<'s, 'e>(
    elements: &'s [&'e Element],
    distance: impl Fn(&Element) -> f32,
) -> Option<&'s &'e Element> {
    elements
        .iter()
        .min_by(|a, b| distance(a).total_cmp(&distance(b)))
}

/// The line whose vertical extent is closest to `y`; clamps to the first or
/// last line outside them all. Ties (side-by-side table cells) go to the
/// horizontally closer line.
fn pick_line<'e>(lines: &[&'e Element], x: f32, y: f32) -> Option<&'e Element> {
    let first = lines.first()?;
    let top = lines.iter().map(|l| l.rect.y).fold(f32::INFINITY, f32::min);
    let bottom = lines.iter().map(|l| l.rect.bottom()).fold(f32::NEG_INFINITY, f32::max);
    if y < top {
        return Some(*first);
    }
    if y > bottom {
        return lines.last().copied();
    }
    lines
        .iter()
        .min_by(|a, b| {
            a.rect
                .vertical_distance(y)
                .total_cmp(&b.rect.vertical_distance(y))
                .then(a.rect.horizontal_distance(x).total_cmp(&b.rect.horizontal_distance(x)))
        })
        .copied()
}

/// Inline elements that carry a position range. Structured-content wrappers
/// are never targets themselves; their children are.
fn collect_candidates<'e>(el: &'e Element, out: &mut Vec<&'e Element>) {
    for child in &el.children {
        if child.role == ElementRole::SdtWrapper {
            collect_candidates(child, out);
        } else if child.pm_start().is_some() || child.pm_end().is_some() {
            out.push(child);
        } else {
            collect_candidates(child, out);
        }
    }
}

fn position_in_line(line: &Element, x: f32, metrics: &dyn TextMeasure) -> Option<u32> {
    let mut candidates = Vec::new();
    collect_candidates(line, &mut candidates);
    candidates.sort_by(|a, b| a.rect.x.total_cmp(&b.rect.x));

    let line_start = line
        .pm_start()
        .or_else(|| candidates.iter().find_map(|c| c.pm_start().or(c.pm_end())));
    let line_end = line
        .pm_end()
        .or_else(|| candidates.iter().rev().find_map(|c| c.pm_end().or(c.pm_start())));

    let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
        return line_start.or(line_end);
    };
    if x < first.rect.x {
        return line_start.or(line_end);
    }
    if x > last.rect.right() {
        return line_end.or(line_start);
    }

    let target = candidates
        .iter()
        .find(|c| c.rect.horizontal_distance(x) == 0.0)
        .or_else(|| nearest(&candidates, |c| c.rect.horizontal_distance(x)))?;
    position_in_element(target, x, metrics)
        .or(line_start)
        .or(line_end)
}

/// Interpolate within one inline element, falling back to its nearer boundary.
fn position_in_element(el: &Element, x: f32, metrics: &dyn TextMeasure) -> Option<u32> {
    let (start, end) = (el.pm_start(), el.pm_end());
    let boundary = || {
        if x < el.rect.x + el.rect.width / 2.0 {
            start.or(end)
        } else {
            end.or(start)
        }
    };
    let (Some(s), Some(e), Some(text), Some(style)) = (start, end, el.text.as_deref(), el.style.as_ref())
    else {
        return boundary();
    };
    if text.is_empty() || e < s {
        return boundary();
    }

    let natural = metrics.text_width(text, style);
    if natural <= 0.0 || el.rect.width <= 0.0 {
        return boundary();
    }
    let scale = el.rect.width / natural;
    let local = x - el.rect.x;

    // Count characters whose midpoint lies left of the click.
    let mut offset = 0u32;
    let mut prefix = String::new();
    let mut prev_w = 0.0f32;
    for ch in text.chars() {
        prefix.push(ch);
        let w = metrics.text_width(&prefix, style) * scale;
        if local < (prev_w + w) / 2.0 {
            break;
        }
        offset += 1;
        prev_w = w;
    }
    Some(s.saturating_add(offset).min(e))
}
