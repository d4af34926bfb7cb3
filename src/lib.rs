pub mod diff;
pub mod dom;
mod error;
pub mod fonts;
pub mod hit_test;
pub mod layout;
pub mod measure;
pub mod model;
pub mod passes;
pub mod snapshot;

pub use diff::{DirtyRegion, compute_dirty_regions};
pub use dom::{Element, paint};
pub use error::Error;
pub use fonts::{ApproxMetrics, FontMetrics, TextMeasure};
pub use hit_test::{click_to_position, click_to_position_with};
pub use layout::incremental::{IncrementalLayout, LayoutUpdate};
pub use layout::page::Layout;
pub use layout::{LayoutOptions, layout_document};
pub use measure::measure_blocks;
pub use model::{Block, BlockIdAllocator, Measure};
pub use passes::{DebouncedPass, DebouncedPassManager};
pub use snapshot::Snapshot;

use std::path::Path;
use std::time::Instant;

/// Measure and lay out `blocks` in one go.
pub fn layout_blocks(
    blocks: &[Block],
    options: &LayoutOptions,
    metrics: &dyn TextMeasure,
) -> (Vec<Measure>, Layout) {
    let t0 = Instant::now();

    let measures = measure_blocks(blocks, options, metrics);
    let t_measure = t0.elapsed();

    let layout = layout_document(blocks, &measures, options);
    let t_total = t0.elapsed();

    log::info!(
        "Timing: measure={:.1}ms, layout={:.1}ms, total={:.1}ms ({} blocks, {} pages)",
        t_measure.as_secs_f64() * 1000.0,
        (t_total - t_measure).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        blocks.len(),
        layout.pages.len(),
    );

    (measures, layout)
}

/// Load a snapshot file and lay it out, measuring with `metrics` when the
/// snapshot carries no measures.
pub fn layout_snapshot(
    path: &Path,
    options: Option<&LayoutOptions>,
    metrics: &dyn TextMeasure,
) -> Result<(Snapshot, Layout), Error> {
    let t0 = Instant::now();

    let snapshot = Snapshot::load(path)?;
    let t_load = t0.elapsed();

    let options = options.cloned().unwrap_or_else(|| snapshot.options_or_default());
    let measures = snapshot.resolve_measures(&options, metrics);
    let layout = layout_document(&snapshot.blocks, &measures, &options);
    let t_total = t0.elapsed();

    log::info!(
        "Timing: load={:.1}ms, layout={:.1}ms, total={:.1}ms ({} blocks, {} pages)",
        t_load.as_secs_f64() * 1000.0,
        (t_total - t_load).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        snapshot.blocks.len(),
        layout.pages.len(),
    );

    Ok((snapshot, layout))
}
