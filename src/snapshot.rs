use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::fonts::TextMeasure;
use crate::layout::LayoutOptions;
use crate::measure::measure_blocks;
use crate::model::{Block, Measure};

/// Blocks as handed over by the content converter, optionally with their
/// measures and the options they were laid out with.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub blocks: Vec<Block>,
    pub measures: Option<Vec<Measure>>,
    pub options: Option<LayoutOptions>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", e, path.display()),
            ))
        })?;
        let snapshot = Self::from_json(&text)?;
        log::debug!(
            "Loaded snapshot {} ({} blocks, measures {})",
            path.display(),
            snapshot.blocks.len(),
            if snapshot.measures.is_some() { "present" } else { "absent" }
        );
        Ok(snapshot)
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        let snapshot: Snapshot = serde_json::from_str(text).map_err(Error::Json)?;
        if let Some(measures) = &snapshot.measures
            && measures.len() != snapshot.blocks.len()
        {
            return Err(Error::InvalidInput(format!(
                "{} blocks but {} measures",
                snapshot.blocks.len(),
                measures.len()
            )));
        }
        Ok(snapshot)
    }

    pub fn options_or_default(&self) -> LayoutOptions {
        self.options.clone().unwrap_or_default()
    }

    /// The stored measures, or fresh ones from `metrics` when absent.
    pub fn resolve_measures(&self, options: &LayoutOptions, metrics: &dyn TextMeasure) -> Vec<Measure> {
        match &self.measures {
            Some(m) => m.clone(),
            None => measure_blocks(&self.blocks, options, metrics),
        }
    }
}
