//! Relayout that reuses the pages before an edit.
//!
//! The diff engine names the first block that changed. Pages that hold only
//! blocks before it are kept; flow restarts on a fresh page at the first
//! block of the earliest page that could be affected.

use std::time::Instant;

use serde::Serialize;

use crate::diff::{DirtyRegion, compute_dirty_regions};
use crate::model::{Block, Measure, ParagraphBlock, Run, TableBlock};

use super::page::{FragmentKind, Layout, Page};
use super::{LayoutOptions, layout_document, layout_from};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutUpdate {
    pub dirty: DirtyRegion,
    /// Leading pages carried over unchanged.
    pub reused_pages: usize,
    /// Block the flow restarted from; `None` when nothing was laid out again.
    pub relaid_from_block: Option<usize>,
}

#[derive(Debug)]
pub struct IncrementalLayout {
    blocks: Vec<Block>,
    measures: Vec<Measure>,
    options: LayoutOptions,
    layout: Layout,
}

impl IncrementalLayout {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            blocks: Vec::new(),
            measures: Vec::new(),
            layout: layout_document(&[], &[], &options),
            options,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Replace the options. Any change lays the whole document out again.
    pub fn set_options(&mut self, options: LayoutOptions) {
        if options == self.options {
            return;
        }
        self.options = options;
        self.layout = layout_document(&self.blocks, &self.measures, &self.options);
    }

    /// Bring the layout up to date with a new block/measure snapshot.
    pub fn update(&mut self, blocks: Vec<Block>, measures: Vec<Measure>) -> LayoutUpdate {
        let t0 = Instant::now();
        let dirty = compute_dirty_regions(&self.blocks, &blocks);

        // A measure can change without its block changing (other fonts).
        let measure_dirty = self
            .measures
            .iter()
            .zip(&measures)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| self.measures.len().min(measures.len()));
        // Positions are not part of block equivalence but are copied into
        // spans, so a shift in them invalidates the pages that carry it.
        let position_dirty = first_position_change(&self.blocks, &blocks);
        let start = dirty.first_dirty_index.min(measure_dirty).min(position_dirty);

        if start >= blocks.len() && self.blocks.len() == blocks.len() && self.measures.len() == measures.len() {
            self.blocks = blocks;
            self.measures = measures;
            return LayoutUpdate {
                dirty,
                reused_pages: self.layout.pages.len(),
                relaid_from_block: None,
            };
        }

        let (reused, resume_block) = self.reusable_prefix(start);
        let reused_pages = reused.len();
        self.layout = if reused.is_empty() {
            layout_document(&blocks, &measures, &self.options)
        } else {
            layout_from(&blocks, &measures, &self.options, reused, resume_block)
        };
        self.blocks = blocks;
        self.measures = measures;

        log::info!(
            "Incremental layout: dirty from block {}, reused {} of {} pages, restarted at block {} ({:.1}ms)",
            start,
            reused_pages,
            self.layout.pages.len(),
            resume_block,
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        LayoutUpdate {
            dirty,
            reused_pages,
            relaid_from_block: Some(resume_block),
        }
    }

    /// Pages that cannot be affected by a change at block `start`, and the
    /// block flow restarts from.
    fn reusable_prefix(&self, start: usize) -> (Vec<Page>, usize) {
        let pages = &self.layout.pages;
        // The last stable block is laid out again too, so a shrinking edit can
        // pull content back onto its page.
        let first_flowed = start.saturating_sub(1);
        let touches = |p: &Page| {
            p.fragments.iter().any(|f| f.block_index >= first_flowed)
                || p.anchored.iter().any(|a| a.block_index >= start)
        };
        let mut p = pages
            .iter()
            .position(touches)
            .unwrap_or(pages.len().saturating_sub(1));

        while p > 0 {
            let starts_mid_block = pages[p]
                .fragments
                .first()
                .is_some_and(|f| f.continues_from_prev());
            let kept_with_next = pages[p - 1]
                .fragments
                .last()
                .is_some_and(|f| self.keeps_with_next(f.block_index, &f.kind));
            if starts_mid_block || kept_with_next || pages[p - 1].blank || pages[p].blank {
                p -= 1;
            } else {
                break;
            }
        }
        if p == 0 {
            return (Vec::new(), 0);
        }

        let reused = pages[..p].to_vec();
        let resume_block = reused
            .iter()
            .flat_map(|page| {
                let flowed = page.fragments.iter().map(|f| f.block_index);
                let page_framed = page
                    .anchored
                    .iter()
                    .filter(|a| a.owner_block_index.is_none())
                    .map(|a| a.block_index);
                flowed.chain(page_framed)
            })
            .max()
            .map_or(0, |i| i + 1);
        (reused, resume_block)
    }

    fn keeps_with_next(&self, block_index: usize, kind: &FragmentKind) -> bool {
        matches!(kind, FragmentKind::Paragraph(_))
            && matches!(self.blocks.get(block_index), Some(Block::Paragraph(p)) if p.attrs.keep_next)
    }
}

/// First index whose document positions or structured-content membership
/// differ; the shorter length when none do.
fn first_position_change(prev: &[Block], next: &[Block]) -> usize {
    prev.iter()
        .zip(next)
        .position(|(a, b)| !positions_eq(a, b))
        .unwrap_or_else(|| prev.len().min(next.len()))
}

fn positions_eq(a: &Block, b: &Block) -> bool {
    match (a, b) {
        (Block::Paragraph(a), Block::Paragraph(b)) => paragraph_positions_eq(a, b),
        (Block::List(a), Block::List(b)) => {
            a.items.len() == b.items.len()
                && a.items
                    .iter()
                    .zip(&b.items)
                    .all(|(x, y)| paragraph_positions_eq(&x.paragraph, &y.paragraph))
        }
        (Block::Table(a), Block::Table(b)) => {
            let (x, y) = (cell_paragraphs(a), cell_paragraphs(b));
            x.len() == y.len() && x.iter().zip(&y).all(|(p, q)| paragraph_positions_eq(p, q))
        }
        (Block::Image(a), Block::Image(b)) => (a.pm_start, a.pm_end) == (b.pm_start, b.pm_end),
        (Block::Drawing(a), Block::Drawing(b)) => (a.pm_start, a.pm_end) == (b.pm_start, b.pm_end),
        (Block::SectionBreak(_), Block::SectionBreak(_)) => true,
        _ => false,
    }
}

fn cell_paragraphs(table: &TableBlock) -> Vec<&ParagraphBlock> {
    table
        .rows
        .iter()
        .flat_map(|r| &r.cells)
        .flat_map(|c| &c.paragraphs)
        .collect()
}

fn paragraph_positions_eq(a: &ParagraphBlock, b: &ParagraphBlock) -> bool {
    let run_eq = |x: &Run, y: &Run| x.pm_start == y.pm_start && x.pm_end == y.pm_end && x.sdt == y.sdt;
    a.runs.len() == b.runs.len() && a.runs.iter().zip(&b.runs).all(|(x, y)| run_eq(x, y))
}
