//! Classification of floating images and drawings.
//!
//! Page- and margin-relative anchors do not depend on text flow and are
//! collected up front. Everything else hangs off a paragraph: the nearest
//! preceding paragraph block, or the nearest following one when the anchor
//! comes before all paragraphs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AnchorDescriptor, Block, Measure, VRelativeFrom};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorFrame {
    Page,
    Margin,
    Paragraph,
}

impl AnchorFrame {
    fn of(anchor: &AnchorDescriptor) -> AnchorFrame {
        match anchor.v_relative_from {
            Some(VRelativeFrom::Page) => AnchorFrame::Page,
            Some(VRelativeFrom::Margin) => AnchorFrame::Margin,
            _ => AnchorFrame::Paragraph,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Anchor<'a> {
    pub block_index: usize,
    pub block: &'a Block,
    pub measure: &'a Measure,
    pub frame: AnchorFrame,
    /// Set only for paragraph frames.
    pub owner_paragraph_index: Option<usize>,
}

impl Anchor<'_> {
    pub fn descriptor(&self) -> Option<&AnchorDescriptor> {
        self.block.anchor()
    }
}

/// Anchored blocks paired with their measures, in document order. Entries
/// whose measure is missing or of another kind are skipped.
fn anchored_entries<'a>(
    blocks: &'a [Block],
    measures: &'a [Measure],
) -> impl Iterator<Item = (usize, &'a Block, &'a Measure, AnchorFrame)> + 'a {
    if blocks.len() != measures.len() {
        log::warn!(
            "anchor collection: {} blocks but {} measures",
            blocks.len(),
            measures.len()
        );
    }
    blocks.iter().enumerate().filter_map(move |(i, block)| {
        let anchor = block.anchor().filter(|a| a.is_anchored)?;
        let Some(measure) = measures.get(i) else {
            log::warn!("anchored block {} has no measure; skipped", block.id());
            return None;
        };
        if measure.kind() != block.kind() {
            log::warn!(
                "anchored block {} is a {} but its measure is a {}; skipped",
                block.id(),
                block.kind().as_str(),
                measure.kind().as_str()
            );
            return None;
        }
        Some((i, block, measure, AnchorFrame::of(anchor)))
    })
}

/// Anchors positioned against the page or its margins.
pub fn collect_pre_registered_anchors<'a>(
    blocks: &'a [Block],
    measures: &'a [Measure],
) -> Vec<Anchor<'a>> {
    anchored_entries(blocks, measures)
        .filter(|(_, _, _, frame)| *frame != AnchorFrame::Paragraph)
        .map(|(block_index, block, measure, frame)| Anchor {
            block_index,
            block,
            measure,
            frame,
            owner_paragraph_index: None,
        })
        .collect()
}

/// Paragraph-relative anchors keyed by the block index of their owning
/// paragraph. Anchors in a document with no paragraphs are dropped.
pub fn collect_anchored_drawings<'a>(
    blocks: &'a [Block],
    measures: &'a [Measure],
) -> BTreeMap<usize, Vec<Anchor<'a>>> {
    let mut preceding = Vec::with_capacity(blocks.len());
    let mut last = None;
    for block in blocks {
        preceding.push(last);
        if matches!(block, Block::Paragraph(_)) {
            last = Some(preceding.len() - 1);
        }
    }
    let first_paragraph = blocks.iter().position(|b| matches!(b, Block::Paragraph(_)));

    let mut by_owner: BTreeMap<usize, Vec<Anchor<'a>>> = BTreeMap::new();
    for (block_index, block, measure, frame) in anchored_entries(blocks, measures) {
        if frame != AnchorFrame::Paragraph {
            continue;
        }
        // Anything without a preceding paragraph comes before the first one.
        let Some(owner) = preceding[block_index].or(first_paragraph) else {
            log::debug!("anchored block {} has no paragraph to own it", block.id());
            continue;
        };
        by_owner.entry(owner).or_default().push(Anchor {
            block_index,
            block,
            measure,
            frame,
            owner_paragraph_index: Some(owner),
        });
    }
    by_owner
}
