//! Rendered element tree.
//!
//! [`paint`] turns a [`Layout`] into the nested elements a renderer would
//! emit: pages stacked vertically inside one container, fragments, lines and
//! inline text runs. Elements carry their document-position metadata as
//! string attributes, which is all the hit-test reads back.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::layout::LayoutOptions;
use crate::layout::page::{Fragment, FragmentKind, Layout, Line, Page, PositionedFragment, Span};
use crate::model::{SdtScope, TextStyle};

pub const ATTR_PAGE_INDEX: &str = "data-page-index";
pub const ATTR_BLOCK_ID: &str = "data-block-id";
pub const ATTR_PM_START: &str = "data-pm-start";
pub const ATTR_PM_END: &str = "data-pm-end";
pub const ATTR_SDT_ID: &str = "data-sdt-id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementRole {
    Container,
    Page,
    Fragment,
    /// Anchored image or drawing, outside the text flow.
    Anchored,
    Line,
    Inline,
    /// Groups the inline children of one structured-content range.
    SdtWrapper,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Distance from `x` to the horizontal extent; 0 inside it.
    pub fn horizontal_distance(&self, x: f32) -> f32 {
        if x < self.x {
            self.x - x
        } else if x > self.right() {
            x - self.right()
        } else {
            0.0
        }
    }

    pub fn vertical_distance(&self, y: f32) -> f32 {
        if y < self.y {
            self.y - y
        } else if y > self.bottom() {
            y - self.bottom()
        } else {
            0.0
        }
    }

    pub fn distance(&self, x: f32, y: f32) -> f32 {
        self.horizontal_distance(x).hypot(self.vertical_distance(y))
    }

    fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub role: ElementRole,
    pub rect: Rect,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub style: Option<TextStyle>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(role: ElementRole, rect: Rect) -> Self {
        Self {
            role,
            rect,
            attrs: BTreeMap::new(),
            text: None,
            style: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl ToString) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.text = Some(text.into());
        self.style = Some(style);
        self
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// A numeric attribute. Missing and non-numeric values are both `None`.
    pub fn numeric_attr(&self, name: &str) -> Option<u32> {
        self.attr(name)?.trim().parse().ok()
    }

    pub fn pm_start(&self) -> Option<u32> {
        self.numeric_attr(ATTR_PM_START)
    }

    pub fn pm_end(&self) -> Option<u32> {
        self.numeric_attr(ATTR_PM_END)
    }

    /// Every descendant with `role`, in document order, not descending into
    /// matches.
    pub fn find_all(&self, role: ElementRole) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(el) = stack.pop() {
            if el.role == role {
                out.push(el);
            } else {
                stack.extend(el.children.iter().rev());
            }
        }
        out
    }
}

fn with_pm(mut el: Element, start: Option<u32>, end: Option<u32>) -> Element {
    if let Some(s) = start {
        el = el.with_attr(ATTR_PM_START, s);
    }
    if let Some(e) = end {
        el = el.with_attr(ATTR_PM_END, e);
    }
    el
}

/// Paint a layout into an element tree, pages `options.page_gap` apart.
pub fn paint(layout: &Layout, options: &LayoutOptions) -> Element {
    let mut offset = 0.0f32;
    let mut width = 0.0f32;
    let mut pages = Vec::with_capacity(layout.pages.len());
    for (index, page) in layout.pages.iter().enumerate() {
        pages.push(paint_page(index, page, offset));
        width = width.max(page.size.w);
        offset += page.size.h + options.page_gap;
    }
    let height = (offset - options.page_gap).max(0.0);
    Element::new(ElementRole::Container, Rect::new(0.0, 0.0, width, height)).with_children(pages)
}

fn paint_page(index: usize, page: &Page, offset: f32) -> Element {
    let mut children: Vec<Element> = page
        .fragments
        .iter()
        .map(|f| paint_fragment(f, offset))
        .collect();
    children.extend(page.anchored.iter().map(|a| paint_anchored(a, offset)));
    Element::new(
        ElementRole::Page,
        Rect::new(0.0, offset, page.size.w, page.size.h),
    )
    .with_attr(ATTR_PAGE_INDEX, index)
    .with_children(children)
}

fn fragment_lines(fragment: &Fragment) -> Vec<&Line> {
    match &fragment.kind {
        FragmentKind::Paragraph(t) | FragmentKind::ListItem(t) => t.lines.iter().collect(),
        FragmentKind::Table(t) => t
            .rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.lines.iter())
            .collect(),
        FragmentKind::Image { .. } | FragmentKind::Drawing { .. } => Vec::new(),
    }
}

fn paint_fragment(fragment: &Fragment, offset: f32) -> Element {
    let lines = fragment_lines(fragment);
    let start = lines.iter().find_map(|l| l.pm_start);
    let end = lines.iter().rev().find_map(|l| l.pm_end);
    let el = Element::new(
        ElementRole::Fragment,
        Rect::new(fragment.x, fragment.y + offset, fragment.width, fragment.height),
    )
    .with_attr(ATTR_BLOCK_ID, &fragment.block_id);
    with_pm(el, start, end).with_children(lines.into_iter().map(|l| paint_line(l, offset)).collect())
}

fn paint_anchored(anchored: &PositionedFragment, offset: f32) -> Element {
    let el = Element::new(
        ElementRole::Anchored,
        Rect::new(anchored.x, anchored.y + offset, anchored.width, anchored.height),
    )
    .with_attr(ATTR_BLOCK_ID, &anchored.block_id);
    with_pm(el, anchored.pm_start, anchored.pm_end)
}

fn inline_sdt(span: &Span) -> Option<&str> {
    span.sdt
        .as_ref()
        .filter(|s| s.scope == SdtScope::Inline && !s.id.is_empty())
        .map(|s| s.id.as_str())
}

fn paint_span(span: &Span, line: &Line, offset: f32) -> Element {
    let el = Element::new(
        ElementRole::Inline,
        Rect::new(span.x, line.y + offset, span.width, line.height),
    )
    .with_text(&span.text, span.style.clone());
    with_pm(el, span.pm_start, span.pm_end)
}

fn paint_line(line: &Line, offset: f32) -> Element {
    let mut children: Vec<Element> = Vec::new();
    let mut i = 0;
    while i < line.spans.len() {
        let span = &line.spans[i];
        let Some(sdt_id) = inline_sdt(span) else {
            children.push(paint_span(span, line, offset));
            i += 1;
            continue;
        };
        let group_len = line.spans[i..]
            .iter()
            .take_while(|s| inline_sdt(s) == Some(sdt_id))
            .count();
        let group = &line.spans[i..i + group_len];
        let inner: Vec<Element> = group.iter().map(|s| paint_span(s, line, offset)).collect();
        let rect = inner
            .iter()
            .skip(1)
            .fold(inner[0].rect, |acc, el| acc.union(&el.rect));
        let sdt = span.sdt.as_ref();
        let start = sdt
            .and_then(|s| s.pm_start)
            .or_else(|| group.iter().find_map(|s| s.pm_start));
        let end = sdt
            .and_then(|s| s.pm_end)
            .or_else(|| group.iter().rev().find_map(|s| s.pm_end));
        let wrapper = Element::new(ElementRole::SdtWrapper, rect).with_attr(ATTR_SDT_ID, sdt_id);
        children.push(with_pm(wrapper, start, end).with_children(inner));
        i += group_len;
    }
    let el = Element::new(
        ElementRole::Line,
        Rect::new(line.x, line.y + offset, line.width, line.height),
    );
    with_pm(el, line.pm_start, line.pm_end).with_children(children)
}
