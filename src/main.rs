use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use docxide_reflow::fonts::{ApproxMetrics, FontMetrics, TextMeasure};
use docxide_reflow::model::{PageMargins, PageSize, RowBreak};
use docxide_reflow::{
    Error, LayoutOptions, Snapshot, click_to_position_with, compute_dirty_regions, layout_document,
    paint,
};

/// Font used for measuring text when a snapshot carries no measures.
const FONT_ENV: &str = "DOCXIDE_REFLOW_FONT";

#[derive(Parser)]
#[command(name = "docxide-reflow", version, about = "Paginate flowed document blocks")]
struct Cli {
    #[command(flatten)]
    page: PageArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out a block snapshot and print a page summary
    Layout {
        snapshot: PathBuf,

        /// Print the full layout as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Compare two block snapshots and print the dirty region
    Diff { prev: PathBuf, next: PathBuf },

    /// Map a point in the painted page stack to a document position
    Hit {
        snapshot: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        x: f32,

        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
}

/// Overrides for the document-level page setup.
#[derive(clap::Args)]
struct PageArgs {
    /// Page width in points
    #[arg(long, global = true)]
    page_width: Option<f32>,

    /// Page height in points
    #[arg(long, global = true)]
    page_height: Option<f32>,

    /// Uniform page margin in points
    #[arg(long, global = true)]
    margin: Option<f32>,

    /// Row-break policy for tables that do not set one
    #[arg(long, global = true, value_enum)]
    row_break: Option<RowBreakArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RowBreakArg {
    Allow,
    Avoid,
}

impl PageArgs {
    fn apply(&self, mut options: LayoutOptions) -> LayoutOptions {
        let PageSize { w, h } = options.body.page_size;
        options.body.page_size = PageSize {
            w: self.page_width.unwrap_or(w),
            h: self.page_height.unwrap_or(h),
        };
        if let Some(m) = self.margin {
            options.body.margins = PageMargins {
                top: m,
                right: m,
                bottom: m,
                left: m,
            };
        }
        if let Some(rb) = self.row_break {
            options.row_break = match rb {
                RowBreakArg::Allow => RowBreak::Allow,
                RowBreakArg::Avoid => RowBreak::Avoid,
            };
        }
        options
    }
}

fn load_metrics() -> Box<dyn TextMeasure> {
    let Some(path) = std::env::var_os(FONT_ENV) else {
        return Box::new(ApproxMetrics);
    };
    match FontMetrics::load(Path::new(&path)) {
        Ok(metrics) => Box::new(metrics),
        Err(e) => {
            log::warn!("{FONT_ENV}: {e}; using approximate metrics");
            Box::new(ApproxMetrics)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::Layout { snapshot, json } => {
            let snapshot = Snapshot::load(snapshot)?;
            let options = cli.page.apply(snapshot.options_or_default());
            let metrics = load_metrics();
            let measures = snapshot.resolve_measures(&options, metrics.as_ref());
            let layout = layout_document(&snapshot.blocks, &measures, &options);
            if *json {
                let out = serde_json::to_string_pretty(&layout).map_err(Error::Json)?;
                println!("{out}");
                return Ok(());
            }
            for page in &layout.pages {
                println!(
                    "page {:>3}  section {}  {}x{}  {} fragments, {} anchored{}",
                    page.number,
                    page.section_index,
                    page.size.w,
                    page.size.h,
                    page.fragments.len(),
                    page.anchored.len(),
                    if page.blank { "  (blank)" } else { "" },
                );
            }
            println!("{} pages", layout.page_count());
        }
        Command::Diff { prev, next } => {
            let prev = Snapshot::load(prev)?;
            let next = Snapshot::load(next)?;
            let region = compute_dirty_regions(&prev.blocks, &next.blocks);
            let out = serde_json::to_string_pretty(&region).map_err(Error::Json)?;
            println!("{out}");
        }
        Command::Hit { snapshot, x, y } => {
            let snapshot = Snapshot::load(snapshot)?;
            let options = cli.page.apply(snapshot.options_or_default());
            let metrics = load_metrics();
            let measures = snapshot.resolve_measures(&options, metrics.as_ref());
            let layout = layout_document(&snapshot.blocks, &measures, &options);
            let tree = paint(&layout, &options);
            match click_to_position_with(&tree, *x, *y, metrics.as_ref()) {
                Some(pos) => println!("{pos}"),
                None => println!("no position at ({x}, {y})"),
            }
        }
    }
    Ok(())
}
